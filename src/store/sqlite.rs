//! SQLite-backed record store.
//!
//! Each record is stored as a JSON document keyed by id, one table per
//! record kind.

use super::RecordStore;
use crate::models::{Receipt, Reimbursement};
use anyhow::{Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;
use std::sync::{Arc, Mutex};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS receipts (
    id   TEXT PRIMARY KEY,
    data TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS reimbursements (
    id   TEXT PRIMARY KEY,
    data TEXT NOT NULL
);
";

/// SQLite-backed record store.
#[derive(Clone)]
pub struct SqliteRecordStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRecordStore {
    /// Open (or create) the database file and its tables.
    pub fn new<P: AsRef<Path>>(db_path: P) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref()).context("opening record database")?;
        conn.pragma_update(None, "journal_mode", "WAL")
            .context("setting WAL mode on record database")?;
        Self::init(conn)
    }

    /// In-memory store, for tests and ephemeral runs.
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("opening in-memory record database")?;
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA).context("creating record tables")?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn put<T: Serialize>(&self, table: &str, id: &str, record: &T) -> Result<()> {
        let data = serde_json::to_string(record).context("serializing record")?;
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {table} (id, data) VALUES (?1, ?2) \
                 ON CONFLICT(id) DO UPDATE SET data = excluded.data"
            ),
            params![id, data],
        )
        .with_context(|| format!("writing {table} record {id}"))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: &str, id: &str) -> Result<Option<T>> {
        let conn = self.conn.lock().unwrap();
        let data: Option<String> = conn
            .query_row(
                &format!("SELECT data FROM {table} WHERE id = ?1"),
                params![id],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("reading {table} record {id}"))?;
        data.map(|d| serde_json::from_str(&d).context("deserializing record"))
            .transpose()
    }

    fn list<T: DeserializeOwned>(&self, table: &str) -> Result<Vec<T>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!("SELECT data FROM {table}"))?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(serde_json::from_str(&row?).context("deserializing record")?);
        }
        Ok(records)
    }

    fn delete(&self, table: &str, id: &str) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(&format!("DELETE FROM {table} WHERE id = ?1"), params![id])
            .with_context(|| format!("deleting {table} record {id}"))?;
        Ok(())
    }
}

impl RecordStore for SqliteRecordStore {
    fn put_receipt(&self, receipt: &Receipt) -> Result<()> {
        self.put("receipts", &receipt.id, receipt)
    }

    fn get_receipt(&self, id: &str) -> Result<Option<Receipt>> {
        self.get("receipts", id)
    }

    fn list_receipts(&self) -> Result<Vec<Receipt>> {
        self.list("receipts")
    }

    fn delete_receipt(&self, id: &str) -> Result<()> {
        self.delete("receipts", id)
    }

    fn put_reimbursement(&self, reimbursement: &Reimbursement) -> Result<()> {
        self.put("reimbursements", &reimbursement.id, reimbursement)
    }

    fn get_reimbursement(&self, id: &str) -> Result<Option<Reimbursement>> {
        self.get("reimbursements", id)
    }

    fn list_reimbursements(&self) -> Result<Vec<Reimbursement>> {
        self.list("reimbursements")
    }
}
