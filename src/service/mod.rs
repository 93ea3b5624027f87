//! Ingestion orchestration: blob storage, extraction, and receipt
//! persistence with compensation on partial failure.

use crate::error::EngineError;
use crate::extractor::{ExtractOptions, Extractor, ExtractorError};
use crate::models::{Receipt, UNKNOWN_TITLE};
use crate::store::{BlobStore, RecordStore};
use crate::util::{sanitize_filename, to_minor_units};
use chrono::{DateTime, NaiveDate, Utc};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Generates unique record ids.
pub trait IdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// UUID v4 ids.
pub struct UuidIdGenerator;

impl IdGenerator for UuidIdGenerator {
    fn generate(&self) -> String {
        uuid::Uuid::new_v4().to_string()
    }
}

/// Provides the current time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Date formats extractors have been seen to emit besides ISO 8601.
const FALLBACK_DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%m/%d/%Y", "%d-%m-%Y"];

/// Orchestrates receipt ingestion over injected store and extractor
/// capabilities.
pub struct IngestionService {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    extractor: Arc<dyn Extractor>,
    extract_options: ExtractOptions,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl IngestionService {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        extractor: Arc<dyn Extractor>,
    ) -> Self {
        Self {
            records,
            blobs,
            extractor,
            extract_options: ExtractOptions::default(),
            ids: Arc::new(UuidIdGenerator),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the id and time sources (used by tests).
    pub fn with_sources(mut self, ids: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>) -> Self {
        self.ids = ids;
        self.clock = clock;
        self
    }

    /// Set the extraction deadline.
    pub fn with_extract_options(mut self, options: ExtractOptions) -> Self {
        self.extract_options = options;
        self
    }

    /// Ingest one uploaded document and return an **unpersisted** draft
    /// receipt.
    ///
    /// The original bytes are stored in the blob store before extraction is
    /// attempted: extraction is the slow, failure-prone step and must only
    /// run once the upload is durable. On extraction failure the stored
    /// blob is deleted again; if that compensating delete itself fails, the
    /// delete failure is logged and the extraction error is still the one
    /// returned. No record is written here — the caller reviews the draft
    /// and commits it with [`finalize`](Self::finalize).
    pub async fn process(
        &self,
        original_filename: &str,
        data: &[u8],
        declared_content_type: &str,
    ) -> Result<Receipt, EngineError> {
        let id = self.ids.generate();
        let now = self.clock.now();

        let clean_filename = sanitize_filename(original_filename);
        let key = format!("{id}_{clean_filename}");
        let blob_ref = self.blobs.put(&key, data)?;

        let fields = match self
            .extractor
            .extract(data, declared_content_type, &self.extract_options)
            .await
        {
            Ok(fields) => fields,
            Err(e) => {
                error!(
                    filename = original_filename,
                    content_type = declared_content_type,
                    file_size = data.len(),
                    error = %e,
                    "Failed to extract receipt"
                );
                if let Err(cleanup_err) = self.blobs.delete(&blob_ref) {
                    warn!(
                        key = %blob_ref,
                        error = %cleanup_err,
                        "Failed to delete blob after extraction failure"
                    );
                }
                return Err(match e {
                    ExtractorError::Format(format_err) => EngineError::Format(format_err),
                    other => EngineError::Extraction(other),
                });
            }
        };

        let date = parse_extracted_date(&fields.date).unwrap_or_else(|| now.date_naive());
        let title = match fields.title.trim() {
            "" => UNKNOWN_TITLE.to_string(),
            t => t.to_string(),
        };
        let amount = to_minor_units(fields.amount);

        info!(
            receipt_id = %id,
            title = %title,
            amount_cents = amount,
            date = %date,
            "Scanned receipt draft"
        );

        Ok(Receipt {
            id,
            title,
            date,
            amount,
            blob_ref,
            content_type: declared_content_type.to_string(),
            reimbursement_id: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Persist a caller-approved (possibly caller-edited) draft. This is
    /// the only path that writes a receipt record; timestamps are stamped
    /// at commit time.
    pub fn finalize(&self, mut receipt: Receipt) -> Result<Receipt, EngineError> {
        let now = self.clock.now();
        receipt.created_at = now;
        receipt.updated_at = now;
        self.records.put_receipt(&receipt)?;
        info!(receipt_id = %receipt.id, "Finalized receipt");
        Ok(receipt)
    }

    pub fn get(&self, id: &str) -> Result<Receipt, EngineError> {
        self.records
            .get_receipt(id)?
            .ok_or_else(|| EngineError::ReceiptNotFound(id.to_string()))
    }

    /// All receipts, unordered. An empty store yields an empty vec.
    pub fn list(&self) -> Result<Vec<Receipt>, EngineError> {
        Ok(self.records.list_receipts()?)
    }

    /// Delete a receipt and its blob.
    ///
    /// A blob-delete failure is logged and swallowed (the orphaned blob can
    /// be cleaned up by an operator) and the record deletion proceeds; a
    /// record-delete failure is returned.
    pub fn delete(&self, id: &str) -> Result<(), EngineError> {
        let receipt = self.get(id)?;

        if let Err(e) = self.blobs.delete(&receipt.blob_ref) {
            warn!(key = %receipt.blob_ref, error = %e, "Failed to delete receipt blob");
        }

        self.records.delete_receipt(id)?;
        info!(receipt_id = %id, "Deleted receipt");
        Ok(())
    }

    /// Fetch the original file bytes and content type for a receipt.
    pub fn get_file(&self, id: &str) -> Result<(Vec<u8>, String), EngineError> {
        let receipt = self.get(id)?;
        let data = self
            .blobs
            .get(&receipt.blob_ref)?
            .ok_or_else(|| EngineError::FileNotFound(id.to_string()))?;
        Ok((data, receipt.content_type))
    }
}

/// Parse the extractor's date string, trying ISO 8601 first and then the
/// formats misbehaving models fall back to. `None` when nothing matches.
fn parse_extracted_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    FALLBACK_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(raw, format).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::ScanFields;
    use crate::models::Reimbursement;
    use anyhow::anyhow;
    use async_trait::async_trait;
    use chrono::TimeZone;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryBlobStore {
        blobs: Mutex<HashMap<String, Vec<u8>>>,
        fail_deletes: bool,
    }

    impl MemoryBlobStore {
        fn failing_deletes() -> Self {
            Self {
                fail_deletes: true,
                ..Default::default()
            }
        }

        fn len(&self) -> usize {
            self.blobs.lock().unwrap().len()
        }
    }

    impl BlobStore for MemoryBlobStore {
        fn put(&self, key: &str, data: &[u8]) -> anyhow::Result<String> {
            self.blobs
                .lock()
                .unwrap()
                .insert(key.to_string(), data.to_vec());
            Ok(key.to_string())
        }

        fn get(&self, key: &str) -> anyhow::Result<Option<Vec<u8>>> {
            Ok(self.blobs.lock().unwrap().get(key).cloned())
        }

        fn delete(&self, key: &str) -> anyhow::Result<()> {
            if self.fail_deletes {
                return Err(anyhow!("delete refused"));
            }
            self.blobs
                .lock()
                .unwrap()
                .remove(key)
                .map(|_| ())
                .ok_or_else(|| anyhow!("no such blob: {key}"))
        }
    }

    #[derive(Default)]
    struct MemoryRecordStore {
        receipts: Mutex<HashMap<String, Receipt>>,
        reimbursements: Mutex<HashMap<String, Reimbursement>>,
    }

    impl RecordStore for MemoryRecordStore {
        fn put_receipt(&self, receipt: &Receipt) -> anyhow::Result<()> {
            self.receipts
                .lock()
                .unwrap()
                .insert(receipt.id.clone(), receipt.clone());
            Ok(())
        }

        fn get_receipt(&self, id: &str) -> anyhow::Result<Option<Receipt>> {
            Ok(self.receipts.lock().unwrap().get(id).cloned())
        }

        fn list_receipts(&self) -> anyhow::Result<Vec<Receipt>> {
            Ok(self.receipts.lock().unwrap().values().cloned().collect())
        }

        fn delete_receipt(&self, id: &str) -> anyhow::Result<()> {
            self.receipts.lock().unwrap().remove(id);
            Ok(())
        }

        fn put_reimbursement(&self, reimbursement: &Reimbursement) -> anyhow::Result<()> {
            self.reimbursements
                .lock()
                .unwrap()
                .insert(reimbursement.id.clone(), reimbursement.clone());
            Ok(())
        }

        fn get_reimbursement(&self, id: &str) -> anyhow::Result<Option<Reimbursement>> {
            Ok(self.reimbursements.lock().unwrap().get(id).cloned())
        }

        fn list_reimbursements(&self) -> anyhow::Result<Vec<Reimbursement>> {
            Ok(self
                .reimbursements
                .lock()
                .unwrap()
                .values()
                .cloned()
                .collect())
        }
    }

    /// Returns fixed fields, or a rate-limit-flavored API error when
    /// constructed with `failing()`.
    struct StubExtractor {
        fields: Option<ScanFields>,
    }

    impl StubExtractor {
        fn returning(fields: ScanFields) -> Self {
            Self {
                fields: Some(fields),
            }
        }

        fn failing() -> Self {
            Self { fields: None }
        }
    }

    #[async_trait]
    impl Extractor for StubExtractor {
        fn name(&self) -> &str {
            "stub"
        }

        async fn extract(
            &self,
            _data: &[u8],
            _content_type: &str,
            _options: &ExtractOptions,
        ) -> Result<ScanFields, ExtractorError> {
            match &self.fields {
                Some(fields) => Ok(fields.clone()),
                None => Err(ExtractorError::Api {
                    status: 429,
                    message: "rate limited, retry after 30s".to_string(),
                }),
            }
        }

        async fn health_check(&self) -> Result<(), ExtractorError> {
            Ok(())
        }
    }

    struct SeqIds(AtomicUsize);

    impl IdGenerator for SeqIds {
        fn generate(&self) -> String {
            format!("id-{}", self.0.fetch_add(1, Ordering::SeqCst))
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn cvs_fields() -> ScanFields {
        ScanFields {
            title: "CVS Pharmacy".to_string(),
            date: "2024-01-15".to_string(),
            amount: 25.99,
        }
    }

    fn service(
        records: Arc<MemoryRecordStore>,
        blobs: Arc<MemoryBlobStore>,
        extractor: StubExtractor,
    ) -> IngestionService {
        IngestionService::new(records, blobs, Arc::new(extractor)).with_sources(
            Arc::new(SeqIds(AtomicUsize::new(0))),
            Arc::new(FixedClock(fixed_now())),
        )
    }

    #[tokio::test]
    async fn process_returns_draft_without_persisting_a_record() {
        let records = Arc::new(MemoryRecordStore::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let svc = service(
            records.clone(),
            blobs.clone(),
            StubExtractor::returning(cvs_fields()),
        );

        let draft = svc
            .process("My Receipt!!.pdf", b"%PDF-", "application/pdf")
            .await
            .unwrap();

        assert_eq!(draft.id, "id-0");
        assert_eq!(draft.title, "CVS Pharmacy");
        assert_eq!(draft.amount, 2599);
        assert_eq!(draft.date, NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(draft.blob_ref, "id-0_My Receipt.pdf");
        assert_eq!(draft.content_type, "application/pdf");
        assert!(!draft.is_reimbursed());

        // Blob stored, but no record until finalize.
        assert_eq!(blobs.len(), 1);
        assert!(matches!(
            svc.get("id-0"),
            Err(EngineError::ReceiptNotFound(_))
        ));
    }

    #[tokio::test]
    async fn process_compensates_blob_on_extraction_failure() {
        let records = Arc::new(MemoryRecordStore::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let svc = service(records, blobs.clone(), StubExtractor::failing());

        let err = svc
            .process("receipt.jpg", b"jpeg bytes", "image/jpeg")
            .await
            .unwrap_err();

        // The extraction error is surfaced verbatim, rate-limit hint included.
        match &err {
            EngineError::Extraction(ExtractorError::Api { status, message }) => {
                assert_eq!(*status, 429);
                assert!(message.contains("rate limited"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(blobs.len(), 0);
    }

    #[tokio::test]
    async fn failed_compensation_does_not_mask_extraction_error() {
        let records = Arc::new(MemoryRecordStore::default());
        let blobs = Arc::new(MemoryBlobStore::failing_deletes());
        let svc = service(records, blobs, StubExtractor::failing());

        let err = svc
            .process("receipt.jpg", b"jpeg bytes", "image/jpeg")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Extraction(_)), "{err:?}");
    }

    #[tokio::test]
    async fn unparseable_date_falls_back_to_current_date() {
        let records = Arc::new(MemoryRecordStore::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let svc = service(
            records,
            blobs,
            StubExtractor::returning(ScanFields {
                title: "Target".to_string(),
                date: "sometime last week".to_string(),
                amount: 5.0,
            }),
        );

        let draft = svc.process("r.png", b"png", "image/png").await.unwrap();
        assert_eq!(draft.date, fixed_now().date_naive());
    }

    #[tokio::test]
    async fn blank_title_gets_sentinel() {
        let records = Arc::new(MemoryRecordStore::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let svc = service(
            records,
            blobs,
            StubExtractor::returning(ScanFields {
                title: "   ".to_string(),
                date: "2024-01-15".to_string(),
                amount: 1.0,
            }),
        );

        let draft = svc.process("r.png", b"png", "image/png").await.unwrap();
        assert_eq!(draft.title, UNKNOWN_TITLE);
    }

    #[tokio::test]
    async fn finalize_persists_and_stamps_timestamps() {
        let records = Arc::new(MemoryRecordStore::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let svc = service(
            records,
            blobs,
            StubExtractor::returning(cvs_fields()),
        );

        let draft = svc.process("r.png", b"png", "image/png").await.unwrap();
        let stored = svc.finalize(draft).unwrap();
        assert_eq!(stored.created_at, fixed_now());
        assert_eq!(stored.updated_at, fixed_now());

        let fetched = svc.get(&stored.id).unwrap();
        assert_eq!(fetched, stored);
        assert_eq!(svc.list().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn delete_swallows_blob_failure_but_removes_record() {
        let records = Arc::new(MemoryRecordStore::default());
        let blobs = Arc::new(MemoryBlobStore::failing_deletes());
        let svc = service(
            records.clone(),
            blobs,
            StubExtractor::returning(cvs_fields()),
        );

        let draft = svc.process("r.png", b"png", "image/png").await.unwrap();
        let stored = svc.finalize(draft).unwrap();

        svc.delete(&stored.id).unwrap();
        assert!(matches!(
            svc.get(&stored.id),
            Err(EngineError::ReceiptNotFound(_))
        ));
    }

    #[tokio::test]
    async fn get_file_distinguishes_missing_record_and_missing_blob() {
        let records = Arc::new(MemoryRecordStore::default());
        let blobs = Arc::new(MemoryBlobStore::default());
        let svc = service(
            records,
            blobs.clone(),
            StubExtractor::returning(cvs_fields()),
        );

        assert!(matches!(
            svc.get_file("ghost"),
            Err(EngineError::ReceiptNotFound(_))
        ));

        let draft = svc.process("r.png", b"png bytes", "image/png").await.unwrap();
        let stored = svc.finalize(draft).unwrap();

        let (bytes, content_type) = svc.get_file(&stored.id).unwrap();
        assert_eq!(bytes, b"png bytes");
        assert_eq!(content_type, "image/png");

        blobs.blobs.lock().unwrap().clear();
        assert!(matches!(
            svc.get_file(&stored.id),
            Err(EngineError::FileNotFound(_))
        ));
    }

    #[test]
    fn date_parsing_accepts_common_fallback_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(parse_extracted_date("2024-01-15"), Some(expected));
        assert_eq!(parse_extracted_date("2024/01/15"), Some(expected));
        assert_eq!(parse_extracted_date("01/15/2024"), Some(expected));
        assert_eq!(parse_extracted_date("15-01-2024"), Some(expected));
        assert_eq!(parse_extracted_date(""), None);
        assert_eq!(parse_extracted_date("last tuesday"), None);
    }
}
