//! Decision synthesis: every signal for one invoice → approve or flag, with
//! clarifying questions.
//!
//! Signals are evaluated in fixed precedence:
//! 1. Vendor match gate
//! 2. Per-item price rollup (with systemic-pattern detection)
//! 3. Invoice math
//! 4. Tax and shipping observations
//! 5. Extraction quality
//!
//! Question order follows this precedence, so truncation keeps the most
//! important ones. Every decision carries at least one question.

use tracing::info;

use crate::config::ReconPolicy;
use crate::models::{
    DecisionRecord, ExtractionWarning, LineItemComparison, LineStatus, MatchType, PolicyCheck,
    ReasonCode, ReasonKind, VendorMatch,
};

const UNKNOWN_VENDOR_QUESTION: &str = "This vendor is not in our approved vendor list. Is this a \
    new vendor that needs onboarding, or a known vendor under a different name?";

const SYSTEMIC_PRICING_QUESTION: &str = "Every line item is priced outside the historical range. \
    Has there been a contract renegotiation or pricing restructure?";

const MATH_QUESTION: &str = "The invoice math doesn't add up. Is this a rounding issue, or could \
    there be a missing line item or incorrect amount?";

/// Unit prices in this band look plausible for an unknown vendor.
const PLAUSIBLE_PRICE_MIN: f64 = 1.0;
const PLAUSIBLE_PRICE_MAX: f64 = 1000.0;

/// Everything the synthesizer looks at for one invoice.
#[derive(Debug, Clone, Copy)]
pub struct DecisionSignals<'a> {
    pub vendor_match: &'a VendorMatch,
    pub comparisons: &'a [LineItemComparison],
    pub math_issues: &'a [String],
    pub tax: &'a PolicyCheck,
    pub shipping: &'a PolicyCheck,
    pub warnings: &'a [ExtractionWarning],
}

/// Turns per-invoice signals into a [`DecisionRecord`].
///
/// Holds no state between invoices.
pub struct DecisionSynthesizer<'a> {
    policy: &'a ReconPolicy,
}

/// Accumulates reason codes, observations and questions in generation order.
#[derive(Default)]
struct Draft {
    reasons: Vec<ReasonCode>,
    observations: Vec<String>,
    questions: Vec<String>,
}

impl<'a> DecisionSynthesizer<'a> {
    pub fn new(policy: &'a ReconPolicy) -> Self {
        Self { policy }
    }

    /// Synthesize the decision for one invoice.
    pub fn decide(&self, signals: &DecisionSignals<'_>) -> DecisionRecord {
        let mut draft = Draft::default();

        self.vendor_gate(signals.vendor_match, &mut draft);
        self.price_rollup(signals.vendor_match, signals.comparisons, &mut draft);
        self.math(signals.math_issues, &mut draft);

        draft.observations.push(format!("Tax: {}", signals.tax.note));
        draft.observations.push(format!("Shipping: {}", signals.shipping.note));

        self.extraction(signals.warnings, &mut draft);

        let record = DecisionRecord::new(
            draft.reasons,
            draft.observations,
            draft.questions,
            self.policy.max_questions,
        );

        info!(
            status = %record.status(),
            reasons = record.reason_codes().len(),
            questions = record.clarifying_questions().len(),
            "Decision synthesized"
        );
        record
    }

    fn vendor_gate(&self, vendor: &VendorMatch, draft: &mut Draft) {
        let name = vendor.vendor_key();
        match vendor.match_type {
            MatchType::None => {
                draft.reasons.push(ReasonCode::new(ReasonKind::VendorNotInApprovedList));
                draft.questions.push(UNKNOWN_VENDOR_QUESTION.to_string());
            }
            MatchType::FuzzyLowConfidence => {
                draft.reasons.push(ReasonCode::new(ReasonKind::VendorLowConfidenceMatch));
                draft.questions.push(format!(
                    "Vendor matched to '{}' with only {:.0}% confidence. Is this correct?",
                    name,
                    vendor.confidence * 100.0
                ));
            }
            MatchType::Fuzzy => draft.observations.push(format!(
                "Vendor fuzzy-matched to '{}' ({:.0}% confidence).",
                name,
                vendor.confidence * 100.0
            )),
            MatchType::Alias => draft
                .observations
                .push(format!("Vendor matched via known alias to '{}'.", name)),
            MatchType::Exact => {}
        }
    }

    fn price_rollup(&self, vendor: &VendorMatch, comparisons: &[LineItemComparison], draft: &mut Draft) {
        let bucket = |status: LineStatus| -> Vec<&LineItemComparison> {
            comparisons.iter().filter(|c| c.status == status).collect()
        };
        let no_rate = bucket(LineStatus::NoContractRate);
        let out_of_range = bucket(LineStatus::OutOfRange);
        let outside_range = bucket(LineStatus::OutsideRange);

        for comp in bucket(LineStatus::MissingPrice) {
            draft
                .reasons
                .push(ReasonCode::with_subject(ReasonKind::MissingPrice, &comp.canonical_item));
        }

        if !no_rate.is_empty() {
            if vendor.match_type == MatchType::None {
                // The vendor gate already asked about this vendor
                draft.reasons.push(ReasonCode::new(ReasonKind::VendorNotInApprovedList));
                assess_unknown_vendor_prices(&no_rate, &mut draft.observations);
            } else {
                for comp in &no_rate {
                    draft.reasons.push(ReasonCode::with_subject(
                        ReasonKind::NewItemNoRateHistory,
                        &comp.canonical_item,
                    ));
                }
                let names = no_rate
                    .iter()
                    .map(|c| c.canonical_item.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                draft.questions.push(format!(
                    "No historical pricing for: {}. Are these new products/services from this \
                     vendor? If approved, these prices become the baseline for future invoices.",
                    names
                ));
            }
        }

        if !out_of_range.is_empty() {
            for comp in &out_of_range {
                draft
                    .reasons
                    .push(ReasonCode::with_subject(ReasonKind::PriceAnomaly, &comp.canonical_item));
            }
            let details = out_of_range
                .iter()
                .map(|c| anomaly_detail(c))
                .collect::<Vec<_>>()
                .join("; ");
            draft.questions.push(format!(
                "Price anomalies beyond the {}x/{}x threshold: {}. Please verify these prices \
                 with the vendor before approving.",
                self.policy.max_price_ratio_high, self.policy.max_price_ratio_low, details
            ));
        }

        if !outside_range.is_empty() {
            for comp in &outside_range {
                draft.reasons.push(ReasonCode::with_subject(
                    ReasonKind::PriceOutsideRange,
                    &comp.canonical_item,
                ));
            }


            let details = outside_range
                .iter()
                .map(|c| {
                    format!(
                        "{} (${:.2} vs {})",
                        c.canonical_item,
                        c.invoice_price.unwrap_or_default(),
                        c.range_display().unwrap_or_default()
                    )
                })
                .collect::<Vec<_>>()
                .join("; ");
            draft
                .observations
                .push(format!("Price variance: {}. Verify with vendor.", details));
        }

        let total_priced = comparisons.iter().filter(|c| c.status.is_priced()).count();
        let deviating = outside_range.len() + out_of_range.len();
        if total_priced > 1 && deviating == total_priced {
            draft.questions.push(SYSTEMIC_PRICING_QUESTION.to_string());
        }
    }

    fn math(&self, issues: &[String], draft: &mut Draft) {
        if issues.is_empty() {
            return;
        }
        draft.reasons.push(ReasonCode::new(ReasonKind::MathDiscrepancy));
        draft
            .observations
            .extend(issues.iter().map(|issue| format!("Math issue: {}", issue)));
        draft.questions.push(MATH_QUESTION.to_string());
    }

    fn extraction(&self, warnings: &[ExtractionWarning], draft: &mut Draft) {
        let (critical, other): (Vec<_>, Vec<_>) = warnings.iter().partition(|w| w.is_critical());

        for warning in critical {
            draft
                .reasons
                .push(ReasonCode::with_subject(ReasonKind::ExtractionFailure, warning.as_str()));
        }
        if !other.is_empty() {
            let notes = other.iter().map(|w| w.as_str()).collect::<Vec<_>>().join(", ");
            draft.observations.push(format!("Extraction notes: {}", notes));
        }
    }
}

fn anomaly_detail(comp: &LineItemComparison) -> String {
    let ratio = comp.price_ratio.unwrap_or_default();
    let label = if ratio >= 1.0 { "OVERPRICED" } else { "UNDERPRICED" };
    format!(
        "{} (${:.2} vs avg ${:.2}, {:.2}x, {})",
        comp.canonical_item,
        comp.invoice_price.unwrap_or_default(),
        comp.historical_avg().unwrap_or_default(),
        ratio,
        label
    )
}

/// Sanity-check prices on lines from an unapproved vendor.
fn assess_unknown_vendor_prices(items: &[&LineItemComparison], observations: &mut Vec<String>) {
    let mut reasonable = Vec::new();
    let mut concerning = Vec::new();

    for comp in items {
        match comp.invoice_price {
            Some(price) if (PLAUSIBLE_PRICE_MIN..=PLAUSIBLE_PRICE_MAX).contains(&price) => {
                reasonable.push(format!("{} (${:.2})", comp.canonical_item, price))
            }
            Some(price) => concerning.push(format!("{} (${:.2})", comp.canonical_item, price)),
            None => concerning.push(comp.canonical_item.clone()),
        }
    }

    if !reasonable.is_empty() {
        observations.push(format!("Prices appear reasonable: {}.", reasonable.join(", ")));
    }
    if !concerning.is_empty() {
        observations.push(format!(
            "Unusual pricing, needs review: {}.",
            concerning.join(", ")
        ));
    }
}
