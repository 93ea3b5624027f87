//! Record types persisted by the engine.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Sentinel title used when the extractor produces an empty title.
pub const UNKNOWN_TITLE: &str = "Unknown Expense";

/// One uploaded expense document.
///
/// `amount` is stored in integer minor currency units (cents); the
/// extractor's major-unit decimal is converted exactly once at ingestion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receipt {
    pub id: String,
    /// Merchant / free-text description. Never empty; falls back to
    /// [`UNKNOWN_TITLE`].
    pub title: String,
    /// Transaction date.
    pub date: NaiveDate,
    /// Amount in minor currency units. Non-negative.
    pub amount: i64,
    /// Key of the original (pre-normalization) file in the blob store,
    /// derived from the receipt id and the sanitized upload filename.
    pub blob_ref: String,
    /// MIME type of the original blob, retained for later retrieval.
    pub content_type: String,
    /// Back-reference to the reimbursement batch this receipt belongs to.
    /// `None` until reimbursed; set exactly once.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reimbursement_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Receipt {
    pub fn is_reimbursed(&self) -> bool {
        self.reimbursement_id.is_some()
    }
}

/// A batch of receipts marked as reimbursed together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reimbursement {
    pub id: String,
    /// Member receipt ids, in the order given at creation. Non-empty and
    /// fixed at creation.
    pub receipt_ids: Vec<String>,
    /// Sum of member receipt amounts in minor units, evaluated at creation
    /// time and never recomputed.
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
