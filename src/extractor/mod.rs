//! Extractor capability: turns a receipt document into a best-effort
//! structured guess of title, date and amount.
//!
//! Extraction is the dominant latency source in the engine (vision models
//! can block for tens of seconds), so the trait is async, takes a hard
//! deadline, and holds no engine lock while running.

mod ollama;
mod parse;

pub use ollama::OllamaExtractor;

use crate::normalizer::FormatError;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Structured fields extracted from one receipt document.
///
/// `date` is whatever string the backend produced; parsing and fallback
/// belong to the ingestion service. `amount` is a major-unit decimal;
/// minor-unit conversion also happens at ingestion.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanFields {
    pub title: String,
    pub date: String,
    pub amount: f64,
}

/// Options for one extraction request.
#[derive(Debug, Clone)]
pub struct ExtractOptions {
    /// Hard deadline for the whole extraction call.
    pub timeout: Duration,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(120),
        }
    }
}

/// Errors from an extraction backend.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The input could not be normalized into the canonical format.
    #[error(transparent)]
    Format(#[from] FormatError),

    #[error("connection error: {0}")]
    Connection(String),

    /// Backend API failure. The message is surfaced verbatim; rate-limit
    /// hints embedded in it are parsed by upstream callers for retry
    /// timing.
    #[error("extractor API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("invalid extractor response: {0}")]
    InvalidResponse(String),

    #[error("extraction timed out")]
    Timeout,
}

/// Trait for vision-capable extraction backends.
#[async_trait]
pub trait Extractor: Send + Sync {
    /// Backend name, e.g. "ollama".
    fn name(&self) -> &str;

    /// Extract structured fields from a receipt document.
    ///
    /// `data` is the original upload; implementations normalize it to the
    /// canonical raster format before inference.
    async fn extract(
        &self,
        data: &[u8],
        content_type: &str,
        options: &ExtractOptions,
    ) -> Result<ScanFields, ExtractorError>;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> Result<(), ExtractorError>;
}
