//! End-to-end processing of one invoice.
//!
//! Pipeline: Vendor match → Line comparison → Math → Tax → Shipping → Decision
//!
//! The decision is final once `process` returns. Recording to the learning
//! store is a separate step that only ever reads the decision.

use serde::Serialize;
use tracing::{debug, info};

use crate::checks::{check_math, check_shipping, check_tax};
use crate::config::ReconPolicy;
use crate::decision::{DecisionSignals, DecisionSynthesizer};
use crate::matcher::{ItemNormalizer, VendorMatcher};
use crate::models::{DecisionRecord, LineItemComparison, PolicyCheck, RawInvoice, VendorMatch};
use crate::pricing::{LineComparator, PricingResult, RangeEvaluator, RateResolver};
use crate::reference::ReferenceData;
use crate::store::{LearningStore, RecordOutcome, StoreResult};

/// Everything produced for one invoice.
#[derive(Debug, Clone, Serialize)]
pub struct ProcessedInvoice {
    pub invoice_number: String,
    pub vendor_match: VendorMatch,
    pub comparisons: Vec<LineItemComparison>,
    pub math_issues: Vec<String>,
    pub tax: PolicyCheck,
    pub shipping: PolicyCheck,
    pub decision: DecisionRecord,
}

/// Runs invoices through matching, comparison, checks and decision.
pub struct InvoiceProcessor<'a> {
    reference: &'a ReferenceData,
    policy: &'a ReconPolicy,
    vendors: VendorMatcher,
    normalizer: ItemNormalizer,
    store: Option<&'a dyn LearningStore>,
}

impl<'a> InvoiceProcessor<'a> {
    /// Create a processor without a learning store.
    pub fn new(reference: &'a ReferenceData, policy: &'a ReconPolicy) -> Self {
        Self {
            reference,
            policy,
            vendors: VendorMatcher::new(reference.vendors.clone(), policy),
            normalizer: ItemNormalizer::from_reference(reference),
            store: None,
        }
    }

    /// Use a learning store as the fallback rate source and recording target.
    pub fn with_store(mut self, store: &'a dyn LearningStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Process one invoice to a final decision.
    pub fn process(&self, invoice: &RawInvoice) -> PricingResult<ProcessedInvoice> {
        let vendor_match = self.vendors.match_vendor(invoice.vendor_name.as_deref());
        let vendor = vendor_match.vendor_key();
        debug!(
            invoice = invoice.display_number(),
            vendor,
            match_type = %vendor_match.match_type,
            "Matched vendor"
        );

        let mut resolver = RateResolver::new(&self.reference.price_history);
        if let Some(store) = self.store {
            resolver = resolver.with_store(store);
        }
        let comparator =
            LineComparator::new(&self.normalizer, resolver, RangeEvaluator::new(self.policy));
        let comparisons = comparator.compare(vendor, &invoice.line_items)?;

        let math_issues = check_math(invoice, self.policy);
        let tax = check_tax(invoice.subtotal, invoice.tax, self.policy);
        let shipping = check_shipping(invoice.shipping, self.reference.max_shipping_seen(vendor));

        let decision = DecisionSynthesizer::new(self.policy).decide(&DecisionSignals {
            vendor_match: &vendor_match,
            comparisons: &comparisons,
            math_issues: &math_issues,
            tax: &tax,
            shipping: &shipping,
            warnings: &invoice.warnings,
        });

        info!(
            invoice = invoice.display_number(),
            status = %decision.status(),
            "Processed invoice"
        );

        Ok(ProcessedInvoice {
            invoice_number: invoice.display_number().to_string(),
            vendor_match,
            comparisons,
            math_issues,
            tax,
            shipping,
            decision,
        })
    }

    /// Offer a processed invoice to the learning store.
    ///
    /// Line descriptions are replaced by their canonical item names so
    /// learned rates are keyed the same way lookups are. Returns `None` when
    /// no store is configured.
    pub fn record(
        &self,
        invoice: &RawInvoice,
        processed: &ProcessedInvoice,
    ) -> StoreResult<Option<RecordOutcome>> {
        let store = match self.store {
            Some(store) => store,
            None => return Ok(None),
        };

        let mut canonical = invoice.clone();
        for (item, comparison) in canonical.line_items.iter_mut().zip(&processed.comparisons) {
            item.description = comparison.canonical_item.clone();
        }

        let outcome = store.record_invoice(
            &canonical,
            processed.decision.status(),
            processed.vendor_match.vendor_key(),
        )?;
        Ok(Some(outcome))
    }
}
