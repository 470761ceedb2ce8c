//! Reconciliation export for review tooling.

use serde::{Deserialize, Serialize};

use crate::models::{DecisionStatus, RawInvoice, Severity};
use crate::pipeline::ProcessedInvoice;

/// Reconciliation export for a single invoice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconciliationExport {
    /// Export metadata
    pub metadata: ExportMetadata,
    /// Machine-readable reasons, `KIND:subject`
    pub reason_codes: Vec<String>,
    pub observations: Vec<String>,
    pub clarifying_questions: Vec<String>,
    pub math_issues: Vec<String>,
    /// Per-line comparison results
    pub line_items: Vec<ExportLineItem>,
}

/// Reconciliation export metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub invoice_number: String,
    /// Vendor name as printed on the invoice
    pub vendor_name: Option<String>,
    /// Matched approved vendor
    pub canonical_vendor: Option<String>,
    pub match_type: String,
    pub match_confidence: f64,
    pub status: DecisionStatus,
    /// `hard` when any reason blocks outright, `soft` for price variance only
    pub severity: Option<Severity>,
    pub invoice_total: Option<f64>,
    /// Export timestamp
    pub exported_at: String,
}

/// Single compared line.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportLineItem {
    pub description: String,
    pub canonical_item: String,
    pub quantity: Option<f64>,
    pub unit_price: Option<f64>,
    pub historical_range: Option<String>,
    pub historical_avg: Option<f64>,
    pub variance_pct: Option<f64>,
    pub status: String,
    pub note: String,
}

impl ReconciliationExport {
    /// Create an export from an invoice and its processing result.
    pub fn from_processed(invoice: &RawInvoice, processed: &ProcessedInvoice) -> Self {
        let line_items = processed
            .comparisons
            .iter()
            .map(|c| ExportLineItem {
                description: c.description.clone(),
                canonical_item: c.canonical_item.clone(),
                quantity: c.quantity,
                unit_price: c.invoice_price,
                historical_range: c.range_display(),
                historical_avg: c.historical_avg().map(|avg| (avg * 100.0).round() / 100.0),
                variance_pct: c.variance_pct,
                status: c.status.as_str().to_string(),
                note: c.note.clone(),
            })
            .collect();

        let decision = &processed.decision;
        Self {
            metadata: ExportMetadata {
                invoice_number: processed.invoice_number.clone(),
                vendor_name: invoice.vendor_name.clone(),
                canonical_vendor: processed.vendor_match.canonical_name.clone(),
                match_type: processed.vendor_match.match_type.as_str().to_string(),
                match_confidence: processed.vendor_match.confidence,
                status: decision.status(),
                severity: decision.severity(),
                invoice_total: invoice.total,
                exported_at: chrono::Utc::now().to_rfc3339(),
            },
            reason_codes: decision.reason_strings(),
            observations: decision.observations().to_vec(),
            clarifying_questions: decision.clarifying_questions().to_vec(),
            math_issues: processed.math_issues.clone(),
            line_items,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export line comparisons to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        self.push_csv_rows(&mut csv);
        csv
    }

    fn push_csv_rows(&self, csv: &mut String) {
        for item in &self.line_items {
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{}\n",
                escape_csv(&self.metadata.invoice_number),
                escape_csv(self.metadata.canonical_vendor.as_deref().unwrap_or("")),
                self.metadata.status,
                escape_csv(&item.description),
                escape_csv(&item.canonical_item),
                optional_number(item.quantity),
                optional_number(item.unit_price),
                optional_number(item.historical_avg),
                item.status,
                escape_csv(&item.note),
            ));
        }
    }
}

const CSV_HEADER: &str =
    "invoice_number,vendor,decision,description,canonical_item,quantity,unit_price,historical_avg,line_status,note\n";

/// Batch reconciliation export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReconciliationExport {
    /// Export timestamp
    pub exported_at: String,
    pub invoices: Vec<ReconciliationExport>,
    pub approved: usize,
    pub flagged: usize,
}

impl BatchReconciliationExport {
    pub fn new(invoices: Vec<ReconciliationExport>) -> Self {
        let approved = invoices
            .iter()
            .filter(|e| e.metadata.status == DecisionStatus::Approved)
            .count();
        Self {
            exported_at: chrono::Utc::now().to_rfc3339(),
            flagged: invoices.len() - approved,
            approved,
            invoices,
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export to CSV format.
    pub fn to_csv(&self) -> String {
        let mut csv = String::from(CSV_HEADER);
        for export in &self.invoices {
            export.push_csv_rows(&mut csv);
        }
        csv
    }
}

fn optional_number(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Escape a string for CSV output.
fn escape_csv(s: &str) -> String {
    if s.contains(',') || s.contains('"') || s.contains('\n') {
        format!("\"{}\"", s.replace('"', "\"\""))
    } else {
        s.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ReconPolicy;
    use crate::models::InvoiceLineItem;
    use crate::pipeline::InvoiceProcessor;
    use crate::reference::ReferenceData;

    fn make_invoice() -> RawInvoice {
        RawInvoice {
            vendor_name: Some("Acme Supplies Inc.".into()),
            invoice_number: Some("INV-1001".into()),
            line_items: vec![
                InvoiceLineItem::new("A4 Paper Box", 24.0, 200.0, 4800.0),
                InvoiceLineItem::new("Pens (Box)", 30.0, 70.0, 2100.0),
            ],
            subtotal: Some(6900.0),
            tax: Some(569.25),
            shipping: Some(0.0),
            total: Some(7469.25),
            ..Default::default()
        }
    }

    fn make_export() -> ReconciliationExport {
        let reference = ReferenceData::builtin();
        let policy = ReconPolicy::default();
        let invoice = make_invoice();
        let processed = InvoiceProcessor::new(&reference, &policy)
            .process(&invoice)
            .unwrap();
        ReconciliationExport::from_processed(&invoice, &processed)
    }

    #[test]
    fn test_export_from_processed() {
        let export = make_export();

        assert_eq!(export.metadata.invoice_number, "INV-1001");
        assert_eq!(export.metadata.canonical_vendor.as_deref(), Some("Acme Supplies Inc."));
        assert_eq!(export.metadata.match_type, "exact");
        assert_eq!(export.metadata.status, DecisionStatus::Flagged);
        assert_eq!(export.metadata.severity, Some(Severity::Hard));
        assert_eq!(export.reason_codes, vec!["PRICE_ANOMALY:A4 Paper Box"]);
        assert_eq!(export.line_items.len(), 2);
        assert_eq!(export.line_items[0].status, "OUT_OF_RANGE");
        assert_eq!(export.line_items[0].historical_avg, Some(65.97));
    }

    #[test]
    fn test_export_json() {
        let json = make_export().to_json().unwrap();
        assert!(json.contains("\"status\": \"FLAGGED\""));
        assert!(json.contains("\"severity\": \"hard\""));
        assert!(json.contains("PRICE_ANOMALY:A4 Paper Box"));
    }

    #[test]
    fn test_export_csv() {
        let csv = make_export().to_csv();
        let lines: Vec<&str> = csv.lines().collect();

        assert_eq!(lines.len(), 3); // Header + 2 items
        assert!(lines[0].starts_with("invoice_number,"));
        assert!(lines[1].starts_with("INV-1001,Acme Supplies Inc.,FLAGGED,A4 Paper Box,"));
        assert!(lines[1].contains(",OUT_OF_RANGE,"));
    }

    #[test]
    fn test_batch_counts() {
        let batch = BatchReconciliationExport::new(vec![make_export(), make_export()]);
        assert_eq!(batch.approved, 0);
        assert_eq!(batch.flagged, 2);
        assert_eq!(batch.to_csv().lines().count(), 5);
    }

    #[test]
    fn test_csv_escaping() {
        assert_eq!(escape_csv("simple"), "simple");
        assert_eq!(escape_csv("with,comma"), "\"with,comma\"");
        assert_eq!(escape_csv("with\"quote"), "\"with\"\"quote\"");
    }
}
