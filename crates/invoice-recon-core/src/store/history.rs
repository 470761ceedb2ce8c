//! Learned price history operations.

use rusqlite::{params, OptionalExtension};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

use super::{Database, LearningStore, RecordOutcome, StoreResult, StoreStats};
use crate::models::{DecisionStatus, PriceRecord, RateSource, RateStatistic, RawInvoice};

impl Database {
    /// All learned price points for an exact (vendor, item) key, oldest first.
    pub fn learned_records(&self, vendor: &str, item: &str) -> StoreResult<Vec<PriceRecord>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT unit_price, quantity, invoice_number
            FROM price_observations
            WHERE vendor = ?1 AND item = ?2 AND unit_price IS NOT NULL
            ORDER BY id
            "#,
        )?;

        let rows = stmt.query_map(params![vendor, item], |row| {
            Ok(PriceRecord {
                price: row.get(0)?,
                quantity: row.get(1)?,
                source_invoice_id: row.get(2)?,
            })
        })?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row?);
        }
        Ok(records)
    }

    /// Whether an invoice number has already been recorded.
    pub fn is_recorded(&self, invoice_number: &str) -> StoreResult<bool> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM learned_invoices WHERE invoice_number = ?",
            [invoice_number],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// High-level counts.
    pub fn stats(&self) -> StoreResult<StoreStats> {
        let (total_invoices, unique_vendors): (i64, i64) = self.conn.query_row(
            "SELECT COUNT(*), COUNT(DISTINCT vendor) FROM learned_invoices",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let (unique_items, observations): (i64, i64) = self.conn.query_row(
            r#"
            SELECT
                (SELECT COUNT(*) FROM (SELECT DISTINCT vendor, item FROM price_observations)),
                (SELECT COUNT(*) FROM price_observations)
            "#,
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        Ok(StoreStats {
            total_invoices: total_invoices as u64,
            unique_vendors: unique_vendors as u64,
            unique_items_tracked: unique_items as u64,
            price_observations: observations as u64,
        })
    }
}

impl LearningStore for Database {
    fn learned_rate(&self, vendor: &str, item: &str) -> StoreResult<Option<RateStatistic>> {
        let records = self.learned_records(vendor, item)?;
        Ok(RateStatistic::from_records(&records, RateSource::Learned))
    }

    fn record_invoice(
        &self,
        invoice: &RawInvoice,
        status: DecisionStatus,
        vendor: &str,
    ) -> StoreResult<RecordOutcome> {
        if status != DecisionStatus::Approved {
            debug!(invoice = invoice.display_number(), %status, "Skipping learning for non-approved invoice");
            return Ok(RecordOutcome::NotApproved);
        }

        let invoice_number = match invoice.invoice_number.as_deref().map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => {
                warn!(vendor, "Approved invoice has no invoice number; not learning from it");
                return Ok(RecordOutcome::MissingInvoiceNumber);
            }
        };

        let payload_hash = hash_payload(&serde_json::to_vec(invoice)?);

        let tx = self.conn.unchecked_transaction()?;

        let existing: Option<String> = tx
            .query_row(
                "SELECT payload_hash FROM learned_invoices WHERE invoice_number = ?",
                [invoice_number],
                |row| row.get(0),
            )
            .optional()?;

        if let Some(existing_hash) = existing {
            if existing_hash != payload_hash {
                warn!(
                    invoice = invoice_number,
                    "Invoice number already recorded with different contents; keeping the original"
                );
            } else {
                debug!(invoice = invoice_number, "Invoice already recorded");
            }
            return Ok(RecordOutcome::Duplicate);
        }

        tx.execute(
            r#"
            INSERT INTO learned_invoices (
                invoice_number, vendor, invoice_date, subtotal, tax,
                shipping, total, payload_hash
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                invoice_number,
                vendor,
                invoice.invoice_date,
                invoice.subtotal,
                invoice.tax,
                invoice.shipping,
                invoice.total,
                payload_hash,
            ],
        )?;

        let mut lines = 0;
        for item in &invoice.line_items {
            let description = item.description.trim();
            if description.is_empty() {
                continue;
            }
            tx.execute(
                r#"
                INSERT INTO price_observations (
                    invoice_number, vendor, item, unit_price, quantity,
                    line_total, invoice_date
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    invoice_number,
                    vendor,
                    description,
                    item.unit_price,
                    item.quantity,
                    item.line_total,
                    invoice.invoice_date,
                ],
            )?;
            lines += 1;
        }

        tx.commit()?;
        info!(invoice = invoice_number, vendor, lines, "Recorded approved invoice");
        Ok(RecordOutcome::Recorded)
    }
}

/// SHA-256 of the serialized invoice, hex-encoded.
fn hash_payload(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::InvoiceLineItem;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn sample_invoice(number: &str) -> RawInvoice {
        RawInvoice {
            vendor_name: Some("Zenith Catering".into()),
            invoice_number: Some(number.into()),
            invoice_date: Some("2025-11-03".into()),
            line_items: vec![
                InvoiceLineItem::new("Lunch Platter", 10.0, 42.50, 425.00),
                InvoiceLineItem::new("Coffee Service", 2.0, 60.00, 120.00),
            ],
            subtotal: Some(545.00),
            ..Default::default()
        }
    }

    #[test]
    fn test_record_and_learn() {
        let db = setup_db();
        let outcome = db
            .record_invoice(&sample_invoice("INV-1"), DecisionStatus::Approved, "Zenith Catering Group Inc")
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Recorded);

        let stat = db
            .learned_rate("Zenith Catering Group Inc", "Lunch Platter")
            .unwrap()
            .unwrap();
        assert_eq!(stat.count, 1);
        assert_eq!(stat.avg, 42.50);
        assert_eq!(stat.avg_quantity, 10.0);
        assert_eq!(stat.source, RateSource::Learned);
    }

    #[test]
    fn test_lookup_is_exact_key() {
        let db = setup_db();
        db.record_invoice(&sample_invoice("INV-1"), DecisionStatus::Approved, "Zenith Catering Group Inc")
            .unwrap();

        assert!(db.learned_rate("Zenith Catering Group Inc", "lunch platter").unwrap().is_none());
        assert!(db.learned_rate("Other Vendor", "Lunch Platter").unwrap().is_none());
    }

    #[test]
    fn test_flagged_is_noop() {
        let db = setup_db();
        let outcome = db
            .record_invoice(&sample_invoice("INV-1"), DecisionStatus::Flagged, "Zenith Catering Group Inc")
            .unwrap();
        assert_eq!(outcome, RecordOutcome::NotApproved);
        assert_eq!(db.stats().unwrap().total_invoices, 0);
        assert!(!db.is_recorded("INV-1").unwrap());
    }

    #[test]
    fn test_missing_invoice_number() {
        let db = setup_db();
        let mut invoice = sample_invoice("INV-1");
        invoice.invoice_number = Some("  ".into());

        let outcome = db
            .record_invoice(&invoice, DecisionStatus::Approved, "Zenith Catering Group Inc")
            .unwrap();
        assert_eq!(outcome, RecordOutcome::MissingInvoiceNumber);
        assert_eq!(db.stats().unwrap().price_observations, 0);
    }

    #[test]
    fn test_duplicate_keeps_original() {
        let db = setup_db();
        let vendor = "Zenith Catering Group Inc";
        db.record_invoice(&sample_invoice("INV-1"), DecisionStatus::Approved, vendor)
            .unwrap();

        let mut changed = sample_invoice("INV-1");
        changed.line_items[0].unit_price = Some(99.0);
        let outcome = db
            .record_invoice(&changed, DecisionStatus::Approved, vendor)
            .unwrap();
        assert_eq!(outcome, RecordOutcome::Duplicate);

        let records = db.learned_records(vendor, "Lunch Platter").unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].price, 42.50);
    }

    #[test]
    fn test_unpriced_lines_are_not_learned() {
        let db = setup_db();
        let mut invoice = sample_invoice("INV-1");
        invoice.line_items[1].unit_price = None;
        db.record_invoice(&invoice, DecisionStatus::Approved, "Zenith Catering Group Inc")
            .unwrap();

        assert!(db
            .learned_rate("Zenith Catering Group Inc", "Coffee Service")
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_stats() {
        let db = setup_db();
        db.record_invoice(&sample_invoice("INV-1"), DecisionStatus::Approved, "Zenith Catering Group Inc")
            .unwrap();
        db.record_invoice(&sample_invoice("INV-2"), DecisionStatus::Approved, "Zenith Catering Group Inc")
            .unwrap();

        let stats = db.stats().unwrap();
        assert_eq!(stats.total_invoices, 2);
        assert_eq!(stats.unique_vendors, 1);
        assert_eq!(stats.unique_items_tracked, 2);
        assert_eq!(stats.price_observations, 4);
    }

    #[test]
    fn test_hash_payload() {
        let hash = hash_payload(b"hello");
        assert_eq!(hash.len(), 64);
        assert_eq!(hash, hash_payload(b"hello"));
        assert_ne!(hash, hash_payload(b"hello!"));
    }
}
