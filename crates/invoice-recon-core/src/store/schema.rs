//! SQLite schema definition.

/// Complete database schema for the learning store.
pub const SCHEMA: &str = r#"
-- Enable foreign keys
PRAGMA foreign_keys = ON;

-- ============================================================================
-- Learned Invoices
-- ============================================================================

-- One row per approved invoice; the primary key makes recording idempotent
CREATE TABLE IF NOT EXISTS learned_invoices (
    invoice_number TEXT PRIMARY KEY,
    vendor TEXT NOT NULL,
    invoice_date TEXT,
    subtotal REAL,
    tax REAL,
    shipping REAL,
    total REAL,
    payload_hash TEXT NOT NULL,                   -- SHA-256 of the invoice JSON
    recorded_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_learned_invoices_vendor ON learned_invoices(vendor);

-- ============================================================================
-- Price Observations
-- ============================================================================

CREATE TABLE IF NOT EXISTS price_observations (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    invoice_number TEXT NOT NULL REFERENCES learned_invoices(invoice_number),
    vendor TEXT NOT NULL,
    item TEXT NOT NULL,                           -- canonical item name
    unit_price REAL,
    quantity REAL,
    line_total REAL,
    invoice_date TEXT
);

CREATE INDEX IF NOT EXISTS idx_price_observations_key ON price_observations(vendor, item);
"#;
