//! Reimbursement batches: grouping finalized receipts and summing their
//! amounts.

use crate::error::EngineError;
use crate::models::{Receipt, Reimbursement};
use crate::service::{Clock, IdGenerator, SystemClock, UuidIdGenerator};
use crate::store::RecordStore;
use std::sync::Arc;
use tracing::{info, warn};

/// Creates and reads reimbursement batches over a [`RecordStore`].
pub struct ReimbursementAggregator {
    records: Arc<dyn RecordStore>,
    ids: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
}

impl ReimbursementAggregator {
    pub fn new(records: Arc<dyn RecordStore>) -> Self {
        Self {
            records,
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

    /// Create a batch over the given receipts.
    ///
    /// Two passes: first every receipt is validated (it must exist and not
    /// already belong to a batch) without writing anything, so a rejection
    /// anywhere in the list leaves the store untouched. Then the batch
    /// record is written, followed by a back-fill that re-reads each
    /// member, stamps its `reimbursement_id` and `updated_at`, and writes
    /// it back. Re-reading means a member deleted between the passes fails
    /// the call instead of being resurrected from a stale copy, and an
    /// edit landing between the passes is preserved.
    ///
    /// The passes do not run inside a transaction. A store failure mid
    /// back-fill leaves the batch created with only some members tagged,
    /// and a concurrent `create` racing the validation pass can book the
    /// same receipt into two batches. Single-writer callers never observe
    /// either; a partial back-fill is logged and the error returned.
    pub fn create(&self, receipt_ids: &[String]) -> Result<Reimbursement, EngineError> {
        if receipt_ids.is_empty() {
            return Err(EngineError::Validation(
                "at least one receipt is required".to_string(),
            ));
        }

        let mut total_amount = 0;
        for id in receipt_ids {
            let receipt = self
                .records
                .get_receipt(id)?
                .ok_or_else(|| EngineError::ReceiptNotFound(id.clone()))?;
            if receipt.is_reimbursed() {
                return Err(EngineError::AlreadyReimbursed(id.clone()));
            }
            total_amount += receipt.amount;
        }

        let now = self.clock.now();
        let batch = Reimbursement {
            id: self.ids.generate(),
            receipt_ids: receipt_ids.to_vec(),
            total_amount,
            created_at: now,
            updated_at: now,
        };
        self.records.put_reimbursement(&batch)?;

        for id in receipt_ids {
            let mut receipt = self
                .records
                .get_receipt(id)?
                .ok_or_else(|| EngineError::ReceiptNotFound(id.clone()))?;
            receipt.reimbursement_id = Some(batch.id.clone());
            receipt.updated_at = now;
            if let Err(e) = self.records.put_receipt(&receipt) {
                warn!(
                    reimbursement_id = %batch.id,
                    receipt_id = %receipt.id,
                    error = %e,
                    "Failed to tag receipt with its reimbursement"
                );
                return Err(e.into());
            }
        }

        info!(
            reimbursement_id = %batch.id,
            receipts = batch.receipt_ids.len(),
            total_amount = batch.total_amount,
            "Created reimbursement"
        );
        Ok(batch)
    }

    pub fn get(&self, id: &str) -> Result<Reimbursement, EngineError> {
        self.records
            .get_reimbursement(id)?
            .ok_or_else(|| EngineError::ReimbursementNotFound(id.to_string()))
    }

    /// All batches, unordered.
    pub fn list(&self) -> Result<Vec<Reimbursement>, EngineError> {
        Ok(self.records.list_reimbursements()?)
    }

    /// A batch together with its member receipts, in member order. A
    /// missing member is a store inconsistency and surfaces as
    /// [`EngineError::ReceiptNotFound`].
    pub fn get_with_receipts(&self, id: &str) -> Result<(Reimbursement, Vec<Receipt>), EngineError> {
        let batch = self.get(id)?;
        let mut receipts = Vec::with_capacity(batch.receipt_ids.len());
        for receipt_id in &batch.receipt_ids {
            let receipt = self
                .records
                .get_receipt(receipt_id)?
                .ok_or_else(|| EngineError::ReceiptNotFound(receipt_id.clone()))?;
            receipts.push(receipt);
        }
        Ok((batch, receipts))
    }
}
