//! Document normalization: converts arbitrary receipt uploads (PDFs,
//! phone-native HEIC, common web rasters) into canonical PNG bytes before
//! the data reaches an extractor.

pub mod detect;
#[cfg(feature = "heic")]
mod heic;
mod pdf;

pub use detect::{normalize_content_type, InputFormat, CANONICAL_CONTENT_TYPE};

use image::DynamicImage;
use std::io::Cursor;
use thiserror::Error;
use tracing::debug;

/// Unsupported or corrupt input. Each variant names the format that was
/// being handled when decoding failed.
#[derive(Debug, Error)]
pub enum FormatError {
    #[error("unreadable PDF document: {0}")]
    Pdf(String),

    #[error("undecodable HEIC/HEIF image: {0}")]
    Heic(String),

    #[error("unsupported or undecodable raster image ({declared}): {message}")]
    Raster { declared: String, message: String },

    #[error("failed to encode canonical PNG: {0}")]
    Encode(String),
}

/// Result of normalizing one input document.
#[derive(Debug, Clone)]
pub struct Normalized {
    /// Canonical PNG bytes.
    pub bytes: Vec<u8>,
    /// Always [`CANONICAL_CONTENT_TYPE`].
    pub content_type: &'static str,
    /// False only when the input was returned unchanged.
    pub converted: bool,
}

/// Normalize a receipt document into canonical PNG bytes.
///
/// Detection precedence: exact declared PDF type first, then the HEIC byte
/// sniff (which outranks a declared-but-wrong content type), then the
/// generic raster decoder. Input that is already canonical PNG and does not
/// match the HEIC magic passes through unchanged. Only the first page or
/// frame of multi-page input is processed.
pub fn normalize(data: &[u8], declared_content_type: &str) -> Result<Normalized, FormatError> {
    let content_type = normalize_content_type(declared_content_type);

    let image = match detect::detect(data, &content_type) {
        InputFormat::Pdf => {
            let image = pdf::render_first_page(data)?;
            debug!(
                width = image.width(),
                height = image.height(),
                "Rendered first PDF page"
            );
            image
        }
        InputFormat::Heic => decode_heic(data)?,
        InputFormat::Png => {
            return Ok(Normalized {
                bytes: data.to_vec(),
                content_type: CANONICAL_CONTENT_TYPE,
                converted: false,
            });
        }
        InputFormat::Raster => image::load_from_memory(data).map_err(|e| FormatError::Raster {
            declared: content_type.clone(),
            message: e.to_string(),
        })?,
    };

    Ok(Normalized {
        bytes: encode_png(&image)?,
        content_type: CANONICAL_CONTENT_TYPE,
        converted: true,
    })
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, FormatError> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .map_err(|e| FormatError::Encode(e.to_string()))?;
    Ok(bytes)
}

#[cfg(feature = "heic")]
fn decode_heic(data: &[u8]) -> Result<DynamicImage, FormatError> {
    heic::decode(data)
}

#[cfg(not(feature = "heic"))]
fn decode_heic(_data: &[u8]) -> Result<DynamicImage, FormatError> {
    Err(FormatError::Heic(
        "HEIC support not compiled in (enable the `heic` feature)".to_string(),
    ))
}
