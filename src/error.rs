//! Engine-wide error taxonomy.
//!
//! The embedding transport layer maps these to responses: `Format`,
//! `Validation` and `AlreadyReimbursed` are caller errors and never
//! retried; `Extraction` may carry a provider rate-limit hint the caller
//! can parse for retry timing; the not-found variants map to 404.

use crate::extractor::ExtractorError;
use crate::normalizer::FormatError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Unsupported or corrupt input document. Fatal to the ingestion
    /// attempt; there is nothing to retry.
    #[error(transparent)]
    Format(#[from] FormatError),

    /// Extraction backend failure, surfaced verbatim.
    #[error("extraction failed: {0}")]
    Extraction(ExtractorError),

    #[error("receipt not found: {0}")]
    ReceiptNotFound(String),

    #[error("reimbursement not found: {0}")]
    ReimbursementNotFound(String),

    /// The receipt record exists but its blob is missing.
    #[error("file not found for receipt {0}")]
    FileNotFound(String),

    #[error("{0}")]
    Validation(String),

    #[error("receipt {0} is already reimbursed")]
    AlreadyReimbursed(String),

    /// Record or blob store failure.
    #[error("store error: {0}")]
    Store(#[from] anyhow::Error),
}
