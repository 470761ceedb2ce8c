//! Per-invoice line comparison.

use tracing::debug;

use super::{PricingError, PricingResult, RangeEvaluator, RateResolver};
use crate::matcher::ItemNormalizer;
use crate::models::{InvoiceLineItem, LineItemComparison, LineStatus};

/// Compares every line of an invoice against expected pricing.
pub struct LineComparator<'a> {
    normalizer: &'a ItemNormalizer,
    resolver: RateResolver<'a>,
    evaluator: RangeEvaluator<'a>,
}

impl<'a> LineComparator<'a> {
    pub fn new(
        normalizer: &'a ItemNormalizer,
        resolver: RateResolver<'a>,
        evaluator: RangeEvaluator<'a>,
    ) -> Self {
        Self {
            normalizer,
            resolver,
            evaluator,
        }
    }

    /// Compare all line items for a canonical vendor, preserving input order.
    ///
    /// `vendor` is empty for unmatched vendors, in which case every priced
    /// line is `NoContractRate`.
    pub fn compare(
        &self,
        vendor: &str,
        line_items: &[InvoiceLineItem],
    ) -> PricingResult<Vec<LineItemComparison>> {
        line_items
            .iter()
            .enumerate()
            .map(|(index, item)| self.compare_line(vendor, index, item))
            .collect()
    }

    fn compare_line(
        &self,
        vendor: &str,
        index: usize,
        item: &InvoiceLineItem,
    ) -> PricingResult<LineItemComparison> {
        if item.description.trim().is_empty() {
            return Err(PricingError::BlankDescription { index });
        }

        let canonical_item = self.normalizer.normalize(&item.description);
        let stat = self.resolver.resolve(vendor, &canonical_item);

        let mut comparison = LineItemComparison {
            description: item.description.clone(),
            canonical_item,
            quantity: item.quantity,
            invoice_price: item.unit_price,
            line_total: item.line_total,
            rate_statistic: None,
            variance_pct: None,
            quantity_adjustment: None,
            price_ratio: None,
            status: LineStatus::NoContractRate,
            note: String::new(),
        };

        match (stat, item.unit_price) {
            (None, _) => {
                let vendor_label = if vendor.is_empty() { "an unapproved vendor" } else { vendor };
                comparison.note = format!(
                    "No historical rate data for '{}' from {}. Cannot compare; needs human review \
                     to establish baseline.",
                    comparison.canonical_item, vendor_label
                );
            }
            (Some(stat), None) => {
                comparison.status = LineStatus::MissingPrice;
                comparison.rate_statistic = Some(stat);
                comparison.note = "Invoice unit price could not be parsed from the document.".into();
            }
            (Some(stat), Some(price)) => {
                let eval = self.evaluator.evaluate(&stat, price, item.quantity);
                comparison.status = eval.status;
                comparison.variance_pct = Some(round_to(eval.variance_pct, 1));
                comparison.price_ratio = Some(eval.ratio);
                comparison.quantity_adjustment =
                    (eval.quantity_factor != 1.0).then(|| round_to(eval.quantity_factor, 2));
                comparison.note = eval.note;
                comparison.rate_statistic = Some(stat);
            }
        }

        debug!(
            item = %comparison.canonical_item,
            status = %comparison.status,
            "Compared line item"
        );
        Ok(comparison)
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}
