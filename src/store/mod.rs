//! Persistence capabilities.
//!
//! The engine only ever talks to these two narrow traits; the supplied
//! implementations (filesystem blobs, SQLite records) live alongside them
//! but nothing in the engine depends on those concretely.

mod local_blob;
mod sqlite;

pub use local_blob::LocalBlobStore;
pub use sqlite::SqliteRecordStore;

use crate::models::{Receipt, Reimbursement};
use anyhow::Result;

/// Key-addressed storage for original receipt files.
pub trait BlobStore: Send + Sync {
    /// Store bytes under `key`, returning the stored key.
    fn put(&self, key: &str, data: &[u8]) -> Result<String>;

    /// Fetch bytes by key. `None` if the blob does not exist.
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Delete a blob. Deleting a missing key is an error.
    fn delete(&self, key: &str) -> Result<()>;
}

/// Key-addressed storage for the two record kinds. Individual operations
/// are safe for concurrent use across distinct ids; no cross-record
/// transaction is offered.
pub trait RecordStore: Send + Sync {
    /// Insert or overwrite a receipt.
    fn put_receipt(&self, receipt: &Receipt) -> Result<()>;

    /// `None` if no receipt has this id.
    fn get_receipt(&self, id: &str) -> Result<Option<Receipt>>;

    /// All receipts, unordered. Never `None`: an empty store yields an
    /// empty vec.
    fn list_receipts(&self) -> Result<Vec<Receipt>>;

    fn delete_receipt(&self, id: &str) -> Result<()>;

    /// Insert or overwrite a reimbursement.
    fn put_reimbursement(&self, reimbursement: &Reimbursement) -> Result<()>;

    /// `None` if no reimbursement has this id.
    fn get_reimbursement(&self, id: &str) -> Result<Option<Reimbursement>>;

    /// All reimbursements, unordered.
    fn list_reimbursements(&self) -> Result<Vec<Reimbursement>>;
}
