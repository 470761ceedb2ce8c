//! Prompts for the advisory model.
//!
//! The model only ever sees the structured output of the deterministic
//! engine, never raw invoice documents.

use invoice_recon_core::{ProcessedInvoice, RawInvoice, StoreStats};
use serde_json::json;

/// System prompt with the advisory constraints.
pub const SYSTEM_PROMPT: &str = r#"You are an invoice analysis assistant embedded in a deterministic invoice processing system.

STRICT CONSTRAINTS:
1. You CANNOT approve, override, or weaken any flags from the deterministic system.
2. You CANNOT change the status from FLAGGED to APPROVED.
3. You CANNOT ignore price anomalies. If the system says 2.8x, it IS 2.8x.
4. You CANNOT invent prices, rates, or data points that aren't in the input.
5. Your role is ADVISORY. You add explanations and sharper questions.

YOUR JOB:
- Explain why flagged items are concerning in plain business English
- Identify patterns (e.g. every item from this vendor is overpriced, a possible contract issue)
- Generate 1-3 specific, actionable clarifying questions for the human reviewer
- Assess overall risk level: low / medium / high / critical

Respond ONLY with a JSON object:
{
  "risk_level": "low|medium|high|critical",
  "executive_summary": "1-2 sentence summary of the invoice",
  "insights": ["insight 1", "insight 2"],
  "recommended_questions": ["question 1", "question 2"],
  "explanation": "Why this invoice was flagged (or why it passed)"
}"#;

/// Build the user prompt from a processed invoice.
///
/// The decision is embedded as read-only context; store stats are optional.
pub fn build_user_prompt(
    invoice: &RawInvoice,
    processed: &ProcessedInvoice,
    stats: Option<&StoreStats>,
) -> String {
    let vendor = &processed.vendor_match;
    let decision = &processed.decision;

    let line_items: Vec<_> = processed
        .comparisons
        .iter()
        .map(|c| {
            json!({
                "item": c.canonical_item,
                "quantity": c.quantity,
                "invoice_price": c.invoice_price,
                "historical_range": c.range_display(),
                "historical_avg": c.historical_avg(),
                "variance_pct": c.variance_pct,
                "qty_adjustment": c.quantity_adjustment,
                "rate_source": c.rate_statistic.as_ref().map(|s| s.source),
                "status": c.status,
                "note": c.note,
            })
        })
        .collect();

    let context = json!({
        "invoice": {
            "number": processed.invoice_number,
            "vendor_on_invoice": invoice.vendor_name,
            "matched_vendor": vendor.canonical_name,
            "vendor_match_type": vendor.match_type,
            "vendor_confidence": vendor.confidence,
            "date": invoice.invoice_date,
            "subtotal": invoice.subtotal,
            "tax": invoice.tax,
            "shipping": invoice.shipping,
            "total": invoice.total,
        },
        "line_items": line_items,
        "algorithmic_decision": {
            "status": decision.status(),
            "reason_codes": decision.reason_strings(),
            "observations": decision.observations(),
        },
        "math_issues": processed.math_issues,
        "tax_check": processed.tax,
        "shipping_check": processed.shipping,
        "learning_store_stats": stats,
    });

    let body = serde_json::to_string_pretty(&context).unwrap_or_else(|_| context.to_string());
    format!(
        "Analyze this invoice. The deterministic system has already run. \
         Your job is to add depth, not override.\n\n```json\n{}\n```",
        body
    )
}

/// Build a single-string chat prompt for backends without message roles.
pub fn build_full_prompt(user_prompt: &str) -> String {
    let mut prompt = String::new();

    prompt.push_str("<|system|>\n");
    prompt.push_str(SYSTEM_PROMPT);
    prompt.push_str("\n<|end|>\n");

    prompt.push_str("<|user|>\n");
    prompt.push_str(user_prompt);
    prompt.push_str("\n<|end|>\n");
    prompt.push_str("<|assistant|>\n");

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use invoice_recon_core::{InvoiceLineItem, InvoiceProcessor, ReconPolicy, ReferenceData};

    fn processed_overpriced() -> (RawInvoice, ProcessedInvoice) {
        let reference = ReferenceData::builtin();
        let policy = ReconPolicy::default();
        let invoice = RawInvoice {
            vendor_name: Some("Acme Supplies Inc.".into()),
            invoice_number: Some("INV-1001".into()),
            line_items: vec![InvoiceLineItem::new("A4 Paper Box", 24.0, 200.0, 4800.0)],
            subtotal: Some(4800.0),
            ..Default::default()
        };
        let processed = InvoiceProcessor::new(&reference, &policy)
            .process(&invoice)
            .unwrap();
        (invoice, processed)
    }

    #[test]
    fn test_user_prompt_carries_decision() {
        let (invoice, processed) = processed_overpriced();
        let prompt = build_user_prompt(&invoice, &processed, None);

        assert!(prompt.contains("INV-1001"));
        assert!(prompt.contains("\"FLAGGED\""));
        assert!(prompt.contains("PRICE_ANOMALY:A4 Paper Box"));
        assert!(prompt.contains("\"OUT_OF_RANGE\""));
        assert!(prompt.contains("\"learning_store_stats\": null"));
    }

    #[test]
    fn test_user_prompt_with_stats() {
        let (invoice, processed) = processed_overpriced();
        let stats = StoreStats {
            total_invoices: 4,
            unique_vendors: 2,
            unique_items_tracked: 7,
            price_observations: 12,
        };
        let prompt = build_user_prompt(&invoice, &processed, Some(&stats));
        assert!(prompt.contains("\"price_observations\": 12"));
    }

    #[test]
    fn test_full_prompt() {
        let prompt = build_full_prompt("Test context");
        assert!(prompt.starts_with("<|system|>"));
        assert!(prompt.contains("CANNOT change the status"));
        assert!(prompt.contains("Test context"));
        assert!(prompt.ends_with("<|assistant|>\n"));
    }
}
