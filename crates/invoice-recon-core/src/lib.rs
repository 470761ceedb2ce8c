//! Invoice Recon Core Library
//!
//! Price comparison and decision engine for vendor invoice reconciliation.
//!
//! # Architecture
//!
//! ```text
//! Raw invoice (extractor JSON)
//!        │
//!        ▼
//!  Vendor match ──────────────┐
//!        │                    │
//!        ▼                    │
//!  Line comparison            │
//!  (normalize → rate → qty    │
//!   adjust → range classify)  │
//!        │                    │
//!        ▼                    ▼
//!  Math / Tax / Shipping ──► Decision synthesis
//!                                  │
//!                   ┌──────────────┼──────────────┐
//!                   ▼              ▼              ▼
//!             Learning store    Export       Advisory layer
//!            (APPROVED only)                 (read-only)
//! ```
//!
//! # Core Principle
//!
//! **Every invoice gets at least one clarifying question.** An APPROVED
//! decision still carries a human checkpoint; nothing downstream of the
//! decision can change it.
//!
//! # Modules
//!
//! - [`models`]: Domain types (RawInvoice, RateStatistic, LineItemComparison, DecisionRecord)
//! - [`reference`]: Approved vendors, price history, item aliases, shipping norms
//! - [`matcher`]: Vendor matching and item normalization
//! - [`pricing`]: Quantity adjustment, rate resolution, range classification
//! - [`checks`]: Math validation and tax/shipping observers
//! - [`decision`]: Decision synthesis
//! - [`store`]: SQLite learning store
//! - [`pipeline`]: End-to-end invoice processing
//! - [`export`]: JSON and CSV export
//! - [`config`]: Policy and runtime configuration

pub mod checks;
pub mod config;
pub mod decision;
pub mod export;
pub mod matcher;
pub mod models;
pub mod pipeline;
pub mod pricing;
pub mod reference;
pub mod store;

use thiserror::Error;

// Re-export commonly used types
pub use config::{ConfigError, LogFormat, LoggingConfig, ReconConfig, ReconPolicy};
pub use decision::{DecisionSignals, DecisionSynthesizer};
pub use export::{BatchReconciliationExport, ReconciliationExport};
pub use matcher::{ItemNormalizer, VendorMatcher};
pub use models::{
    DecisionRecord, DecisionStatus, ExtractionWarning, InvoiceLineItem, LineItemComparison,
    LineStatus, MatchType, RateStatistic, RawInvoice, ReasonCode, ReasonKind, Severity,
    VendorMatch,
};
pub use pipeline::{InvoiceProcessor, ProcessedInvoice};
pub use pricing::{PricingError, RateResolver};
pub use reference::{ReferenceData, ReferenceError};
pub use store::{Database, LearningStore, RecordOutcome, StoreError, StoreStats};

/// Top-level error type.
#[derive(Error, Debug)]
pub enum ReconError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Reference data error: {0}")]
    Reference(#[from] ReferenceError),

    #[error("Learning store error: {0}")]
    Store(#[from] StoreError),

    #[error("Pricing error: {0}")]
    Pricing(#[from] PricingError),

    #[error("Invalid invoice JSON: {0}")]
    Json(#[from] serde_json::Error),
}

pub type ReconResult<T> = Result<T, ReconError>;

/// Owns reference data, policy and the optional learning store.
pub struct ReconEngine {
    reference: ReferenceData,
    policy: ReconPolicy,
    store: Option<Database>,
}

impl ReconEngine {
    /// Build an engine from runtime configuration.
    ///
    /// Loads reference data from `reference_path` (built-in tables when
    /// unset) and opens the learning store at `store_path` if one is set.
    pub fn from_config(config: &ReconConfig) -> ReconResult<Self> {
        config.policy.validate()?;

        let reference = match &config.reference_path {
            Some(path) => ReferenceData::from_json_file(path)?,
            None => ReferenceData::builtin(),
        };
        let store = match &config.store_path {
            Some(path) => Some(Database::open(path)?),
            None => None,
        };

        Ok(Self {
            reference,
            policy: config.policy.clone(),
            store,
        })
    }

    /// Engine with built-in reference data, default policy and no store.
    pub fn builtin() -> Self {
        Self {
            reference: ReferenceData::builtin(),
            policy: ReconPolicy::default(),
            store: None,
        }
    }

    /// Attach a learning store.
    pub fn with_store(mut self, store: Database) -> Self {
        self.store = Some(store);
        self
    }

    /// A processor borrowing this engine's data.
    pub fn processor(&self) -> InvoiceProcessor<'_> {
        let processor = InvoiceProcessor::new(&self.reference, &self.policy);
        match &self.store {
            Some(store) => processor.with_store(store),
            None => processor,
        }
    }

    /// Process one invoice and, if `record` is set, offer it to the store.
    pub fn reconcile(
        &self,
        invoice: &RawInvoice,
        record: bool,
    ) -> ReconResult<(ProcessedInvoice, Option<RecordOutcome>)> {
        let processor = self.processor();
        let processed = processor.process(invoice)?;
        let outcome = if record {
            processor.record(invoice, &processed)?
        } else {
            None
        };
        Ok((processed, outcome))
    }

    /// Learning store stats, if a store is attached.
    pub fn store_stats(&self) -> ReconResult<Option<StoreStats>> {
        Ok(match &self.store {
            Some(store) => Some(store.stats()?),
            None => None,
        })
    }

    pub fn reference(&self) -> &ReferenceData {
        &self.reference
    }

    pub fn policy(&self) -> &ReconPolicy {
        &self.policy
    }
}
