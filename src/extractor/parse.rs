//! Cleanup and parsing of model text responses.

use super::{ExtractorError, ScanFields};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawFields {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    date: Option<String>,
    #[serde(default)]
    amount: Option<f64>,
}

/// Parse the JSON object out of a model text response.
///
/// Vision models wrap output in markdown fences or surrounding chatter
/// despite prompt instructions, so fences are stripped and the text is
/// sliced from the first `{` to the last `}` before deserializing. Null
/// fields become empty / zero.
pub(super) fn parse_scan_response(text: &str) -> Result<ScanFields, ExtractorError> {
    let mut text = text.trim();
    text = text.strip_prefix("```json").unwrap_or(text);
    text = text.strip_prefix("```").unwrap_or(text);
    let text = text.trim();

    let start = text.find('{').ok_or_else(|| {
        ExtractorError::InvalidResponse("no JSON object in response".to_string())
    })?;
    let end = text.rfind('}').filter(|&end| end > start).ok_or_else(|| {
        ExtractorError::InvalidResponse("unterminated JSON object in response".to_string())
    })?;

    let raw: RawFields = serde_json::from_str(&text[start..=end])
        .map_err(|e| ExtractorError::InvalidResponse(e.to_string()))?;

    Ok(ScanFields {
        title: raw.title.unwrap_or_default().trim().to_string(),
        date: raw.date.unwrap_or_default().trim().to_string(),
        amount: raw.amount.unwrap_or(0.0),
    })
}
