//! HEIC/HEIF decoding through libheif.

use super::FormatError;
use image::{DynamicImage, Rgb, RgbImage};
use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

/// Decode the primary image of a HEIC/HEIF container. Secondary images
/// (bursts, auxiliary depth maps) are ignored.
pub fn decode(data: &[u8]) -> Result<DynamicImage, FormatError> {
    let lib_heif = LibHeif::new();
    let context = HeifContext::read_from_bytes(data).map_err(heic_err)?;
    let handle = context.primary_image_handle().map_err(heic_err)?;
    let decoded = lib_heif
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(heic_err)?;

    let width = decoded.width();
    let height = decoded.height();
    let planes = decoded.planes();
    let interleaved = planes.interleaved.ok_or_else(|| {
        FormatError::Heic("decoder returned no interleaved RGB plane".to_string())
    })?;

    // Rows are padded to `stride` bytes; only the first width * 3 bytes of
    // each row carry pixel data.
    let stride = interleaved.stride;
    let row_bytes = width as usize * 3;
    let mut rgb = RgbImage::new(width, height);
    for y in 0..height as usize {
        let start = y * stride;
        let row = interleaved
            .data
            .get(start..start + row_bytes)
            .ok_or_else(|| FormatError::Heic("truncated pixel data".to_string()))?;
        for x in 0..width as usize {
            let p = x * 3;
            rgb.put_pixel(x as u32, y as u32, Rgb([row[p], row[p + 1], row[p + 2]]));
        }
    }

    Ok(DynamicImage::ImageRgb8(rgb))
}

fn heic_err(e: libheif_rs::HeifError) -> FormatError {
    FormatError::Heic(e.to_string())
}
