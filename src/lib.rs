//! Receipt ingestion-and-consistency engine.
//!
//! The engine normalizes uploaded receipt documents (images, PDFs, phone
//! photos) into a canonical raster format, extracts structured expense data
//! through a pluggable vision-capable [`extractor::Extractor`], persists the
//! result through narrow [`store`] capabilities, and groups finalized
//! receipts into reimbursement batches with a minor-unit amount total.
//!
//! The HTTP layer, authentication, and the concrete persistence and
//! extraction backends are callers and collaborators of this crate, not part
//! of it. Errors are mapped to transport responses by the embedding server.

pub mod config;
pub mod error;
pub mod extractor;
pub mod models;
pub mod normalizer;
pub mod reimbursement;
pub mod service;
pub mod store;
pub mod util;

pub use error::EngineError;
pub use models::{Receipt, Reimbursement};
pub use reimbursement::ReimbursementAggregator;
pub use service::IngestionService;

use crate::config::EngineConfig;
use crate::extractor::{ExtractOptions, OllamaExtractor};
use crate::store::{LocalBlobStore, RecordStore, SqliteRecordStore};
use std::sync::Arc;

/// Wire up an engine from configuration: SQLite record store, filesystem
/// blob store, Ollama-backed extraction.
pub fn build_engine(
    config: &EngineConfig,
) -> anyhow::Result<(IngestionService, ReimbursementAggregator)> {
    let records: Arc<dyn RecordStore> = Arc::new(SqliteRecordStore::new(&config.db_path)?);
    let blobs = Arc::new(LocalBlobStore::new(&config.blob_dir)?);
    let extractor = Arc::new(OllamaExtractor::new(
        config.extractor.base_url.clone(),
        config.extractor.model.clone(),
    ));

    let service = IngestionService::new(records.clone(), blobs, extractor)
        .with_extract_options(ExtractOptions {
            timeout: config.extractor.timeout(),
        });
    let aggregator = ReimbursementAggregator::new(records);

    Ok((service, aggregator))
}
