//! First-page PDF rendering through pdfium.

use super::FormatError;
use image::DynamicImage;
use pdfium_render::prelude::*;

/// Render resolution for receipt PDFs. 300 DPI against PDF's 72-point inch
/// keeps small print legible for the extractor.
const RENDER_DPI: f32 = 300.0;

/// Render the first page of a PDF document to a raster image. Receipts are
/// almost always single-page; later pages are ignored.
pub fn render_first_page(data: &[u8]) -> Result<DynamicImage, FormatError> {
    let bindings = Pdfium::bind_to_system_library().map_err(pdf_err)?;
    let pdfium = Pdfium::new(bindings);

    let document = pdfium.load_pdf_from_byte_slice(data, None).map_err(pdf_err)?;
    let page = document.pages().first().map_err(pdf_err)?;

    let config = PdfRenderConfig::new().scale_page_by_factor(RENDER_DPI / 72.0);
    let bitmap = page.render_with_config(&config).map_err(pdf_err)?;

    Ok(bitmap.as_image())
}

fn pdf_err(e: PdfiumError) -> FormatError {
    FormatError::Pdf(e.to_string())
}
