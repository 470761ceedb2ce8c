//! Tax and shipping observers. Both only annotate; neither flags.

use crate::config::ReconPolicy;
use crate::models::PolicyCheck;

/// Compare the effective tax rate against the recognised rates.
pub fn check_tax(subtotal: Option<f64>, tax: Option<f64>, policy: &ReconPolicy) -> PolicyCheck {
    let (subtotal, tax) = match (subtotal, tax) {
        (Some(s), Some(t)) => (s, t),
        _ => return PolicyCheck::observation("Missing subtotal or tax value."),
    };

    if tax == 0.0 {
        return PolicyCheck::observation(
            "No tax charged ($0). Could be tax-exempt or bundled into unit prices.",
        );
    }

    let effective = if subtotal > 0.0 { tax / subtotal } else { 0.0 };
    let rate_pct = round_hundredths(effective * 100.0);

    let known = policy
        .valid_tax_rates
        .iter()
        .copied()
        .filter(|rate| *rate > 0.0);

    if let Some(matched) = known
        .clone()
        .find(|rate| (effective - rate).abs() <= policy.tax_tolerance)
    {
        return PolicyCheck::ok(format!(
            "Tax rate {:.2}% matches known rate {:.2}%.",
            effective * 100.0,
            matched * 100.0
        ))
        .with_rate(rate_pct);
    }

    let known_list = known
        .map(|rate| format!("{:.2}%", rate * 100.0))
        .collect::<Vec<_>>()
        .join(", ");
    PolicyCheck::observation(format!(
        "Tax rate {:.2}% doesn't match known rates ({}).",
        effective * 100.0,
        known_list
    ))
    .with_rate(rate_pct)
}

/// Compare shipping against the largest charge seen from this vendor.
pub fn check_shipping(shipping: Option<f64>, max_seen: Option<f64>) -> PolicyCheck {
    let shipping = match shipping {
        Some(s) => s,
        None => return PolicyCheck::observation("No shipping field found."),
    };
    if shipping == 0.0 {
        return PolicyCheck::ok("No shipping charged.");
    }

    match max_seen {
        None => PolicyCheck::observation(format!(
            "Shipping ${:.2}. No history to compare.",
            shipping
        )),
        Some(max) if shipping <= max => PolicyCheck::ok(format!(
            "Shipping ${:.2} within norms (max seen: ${:.2}).",
            shipping, max
        )),
        Some(max) => PolicyCheck::observation(format!(
            "Shipping ${:.2} above max seen (${:.2}). Could be distance/rush.",
            shipping, max
        )),
    }
}

fn round_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
