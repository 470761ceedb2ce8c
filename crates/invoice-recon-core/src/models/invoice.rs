//! Raw invoice records as produced by the extractor.

use serde::{Deserialize, Serialize};

/// An invoice as extracted from a vendor document.
///
/// Every monetary field is optional: extraction is best-effort and an absent
/// value degrades the checks that need it instead of failing the run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct RawInvoice {
    /// Vendor name as printed on the invoice
    #[serde(default)]
    pub vendor_name: Option<String>,
    /// Invoice number (idempotency key for the learning store)
    #[serde(default)]
    pub invoice_number: Option<String>,
    /// Invoice date as printed (not parsed)
    #[serde(default)]
    pub invoice_date: Option<String>,
    /// Line items in document order
    #[serde(default)]
    pub line_items: Vec<InvoiceLineItem>,
    #[serde(default)]
    pub subtotal: Option<f64>,
    #[serde(default)]
    pub tax: Option<f64>,
    #[serde(default)]
    pub shipping: Option<f64>,
    #[serde(default)]
    pub total: Option<f64>,
    /// Extraction-quality warnings
    #[serde(default)]
    pub warnings: Vec<ExtractionWarning>,
}

/// A single invoiced line.
///
/// `description` is required; a record without one is rejected at
/// deserialization time.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InvoiceLineItem {
    pub description: String,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub line_total: Option<f64>,
}

impl InvoiceLineItem {
    /// Create a fully-populated line item.
    pub fn new(description: impl Into<String>, quantity: f64, unit_price: f64, line_total: f64) -> Self {
        Self {
            description: description.into(),
            quantity: Some(quantity),
            unit_price: Some(unit_price),
            line_total: Some(line_total),
        }
    }
}

impl RawInvoice {
    /// Parse an invoice from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Invoice number, or `"UNKNOWN"` for display.
    pub fn display_number(&self) -> &str {
        self.invoice_number.as_deref().unwrap_or("UNKNOWN")
    }
}

/// Extraction-quality warning emitted by the extractor.
///
/// The three critical kinds mean the document could not be trusted at all;
/// everything else is carried through verbatim as an observation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum ExtractionWarning {
    NoLineItemsFound,
    EmptyPdf,
    MissingTotal,
    Other(String),
}

impl ExtractionWarning {
    /// Whether this warning blocks approval.
    pub fn is_critical(&self) -> bool {
        !matches!(self, ExtractionWarning::Other(_))
    }

    pub fn as_str(&self) -> &str {
        match self {
            ExtractionWarning::NoLineItemsFound => "NO_LINE_ITEMS_FOUND",
            ExtractionWarning::EmptyPdf => "EMPTY_PDF",
            ExtractionWarning::MissingTotal => "MISSING_TOTAL",
            ExtractionWarning::Other(s) => s,
        }
    }
}

impl From<String> for ExtractionWarning {
    fn from(s: String) -> Self {
        match s.as_str() {
            "NO_LINE_ITEMS_FOUND" => ExtractionWarning::NoLineItemsFound,
            "EMPTY_PDF" => ExtractionWarning::EmptyPdf,
            "MISSING_TOTAL" => ExtractionWarning::MissingTotal,
            _ => ExtractionWarning::Other(s),
        }
    }
}

impl From<&str> for ExtractionWarning {
    fn from(s: &str) -> Self {
        ExtractionWarning::from(s.to_string())
    }
}

impl From<ExtractionWarning> for String {
    fn from(w: ExtractionWarning) -> Self {
        w.as_str().to_string()
    }
}

impl std::fmt::Display for ExtractionWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
