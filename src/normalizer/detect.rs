//! Pure format-detection predicates over the declared content type and the
//! raw byte prefix. No decoding library is involved here, so the detection
//! chain is unit-testable on its own.

/// Canonical raster content type the normalizer always converges on.
pub const CANONICAL_CONTENT_TYPE: &str = "image/png";

/// Content type assumed when the caller declares none.
pub const DEFAULT_CONTENT_TYPE: &str = "image/jpeg";

/// HEIC/HEIF brand tags accepted at offset 8 of the ftyp box.
const HEIC_BRANDS: [&[u8; 4]; 4] = [b"heic", b"heif", b"mif1", b"msf1"];

/// Detected input format, in detection-precedence order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Pdf,
    /// Mobile-native HEIC/HEIF container.
    Heic,
    /// Already in the canonical format.
    Png,
    /// Anything else the generic raster decoder should try.
    Raster,
}

/// Lowercase and trim a declared content type. Empty declarations default
/// to [`DEFAULT_CONTENT_TYPE`].
pub fn normalize_content_type(declared: &str) -> String {
    let normalized = declared.trim().to_ascii_lowercase();
    if normalized.is_empty() {
        DEFAULT_CONTENT_TYPE.to_string()
    } else {
        normalized
    }
}

pub fn is_pdf(content_type: &str) -> bool {
    content_type == "application/pdf"
}

/// ISO BMFF sniff: the 4-byte `ftyp` box tag at offset 4 followed by a
/// whitelisted brand tag. Phones routinely mislabel HEIC uploads, so this
/// byte check outranks the declared content type.
pub fn is_heic_bytes(data: &[u8]) -> bool {
    data.len() >= 12
        && &data[4..8] == b"ftyp"
        && HEIC_BRANDS.iter().any(|brand| &data[8..12] == *brand)
}

pub fn is_heic_content_type(content_type: &str) -> bool {
    content_type.contains("heic") || content_type.contains("heif")
}

/// Ordered detection chain. `content_type` must already be normalized via
/// [`normalize_content_type`].
pub fn detect(data: &[u8], content_type: &str) -> InputFormat {
    if is_pdf(content_type) {
        InputFormat::Pdf
    } else if is_heic_bytes(data) || is_heic_content_type(content_type) {
        InputFormat::Heic
    } else if content_type == CANONICAL_CONTENT_TYPE {
        InputFormat::Png
    } else {
        InputFormat::Raster
    }
}
