//! Learning store: approved invoice history as a fallback rate source.
//!
//! Only APPROVED invoices are recorded, each at most once per invoice
//! number, so flagged prices never leak into future baselines.

mod history;
mod schema;

pub use history::*;
pub use schema::*;

use std::path::Path;

use rusqlite::Connection;
use serde::Serialize;
use thiserror::Error;

use crate::models::{DecisionStatus, RateStatistic, RawInvoice};

/// Learning store errors.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// What happened when an invoice was offered to the store.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    /// Invoice and its priced lines were appended
    Recorded,
    /// Invoice number already recorded; nothing written
    Duplicate,
    /// Decision was not APPROVED; nothing written
    NotApproved,
    /// Invoice has no number to key on; nothing written
    MissingInvoiceNumber,
}

impl RecordOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordOutcome::Recorded => "recorded",
            RecordOutcome::Duplicate => "duplicate",
            RecordOutcome::NotApproved => "not_approved",
            RecordOutcome::MissingInvoiceNumber => "missing_invoice_number",
        }
    }
}

/// Summary counts for the learning store.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct StoreStats {
    pub total_invoices: u64,
    pub unique_vendors: u64,
    /// Distinct (vendor, item) keys with at least one observation
    pub unique_items_tracked: u64,
    pub price_observations: u64,
}

/// Read/append interface to learned price history.
pub trait LearningStore {
    /// Rate statistic over learned prices for an exact (vendor, item) key.
    fn learned_rate(&self, vendor: &str, item: &str) -> StoreResult<Option<RateStatistic>>;

    /// Append an invoice's prices. Idempotent by invoice number and a no-op
    /// unless `status` is APPROVED.
    fn record_invoice(
        &self,
        invoice: &RawInvoice,
        status: DecisionStatus,
        vendor: &str,
    ) -> StoreResult<RecordOutcome>;
}

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> StoreResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> StoreResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory() {
        let db = Database::open_in_memory();
        assert!(db.is_ok());
    }

    #[test]
    fn test_schema_initialized() {
        let db = Database::open_in_memory().unwrap();

        let tables: Vec<String> = db
            .conn()
            .prepare("SELECT name FROM sqlite_master WHERE type='table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .filter_map(|r| r.ok())
            .collect();

        assert!(tables.contains(&"learned_invoices".to_string()));
        assert!(tables.contains(&"price_observations".to_string()));
    }

    #[test]
    fn test_outcome_strings() {
        assert_eq!(RecordOutcome::Recorded.as_str(), "recorded");
        assert_eq!(RecordOutcome::MissingInvoiceNumber.as_str(), "missing_invoice_number");
    }
}
