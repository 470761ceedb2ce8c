//! Internal arithmetic validation.

use crate::config::ReconPolicy;
use crate::models::RawInvoice;

/// Recompute line totals, subtotal and grand total.
///
/// Returns human-readable issues in check order; empty means the math holds.
pub fn check_math(invoice: &RawInvoice, policy: &ReconPolicy) -> Vec<String> {
    let mut issues = Vec::new();

    for item in &invoice.line_items {
        let (qty, price, line_total) = match (item.quantity, item.unit_price, item.line_total) {
            (Some(q), Some(p), Some(t)) if q != 0.0 && p != 0.0 && t != 0.0 => (q, p, t),
            _ => continue,
        };
        let expected = round_cents(qty * price);
        if (expected - line_total).abs() > policy.line_math_tolerance {
            issues.push(format!(
                "Line math for {}: {} x ${:.2} = ${:.2}, but invoice shows ${:.2}",
                item.description, qty, price, expected, line_total
            ));
        }
    }

    if let Some(subtotal) = invoice.subtotal {
        let line_sum: f64 = invoice.line_items.iter().filter_map(|i| i.line_total).sum();
        if (line_sum - subtotal).abs() > policy.subtotal_tolerance {
            issues.push(format!(
                "Subtotal: lines sum to ${:.2}, invoice shows ${:.2}",
                line_sum, subtotal
            ));
        }
    }

    if let (Some(subtotal), Some(total)) = (invoice.subtotal, invoice.total) {
        let tax = invoice.tax.unwrap_or(0.0);
        let shipping = invoice.shipping.unwrap_or(0.0);
        let expected = subtotal + tax + shipping;
        if (expected - total).abs() > policy.total_tolerance {
            issues.push(format!(
                "Total: ${:.2} + tax(${:.2}) + shipping(${:.2}) = ${:.2}, but invoice shows ${:.2}",
                subtotal, tax, shipping, expected, total
            ));
        }
    }

    issues
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
