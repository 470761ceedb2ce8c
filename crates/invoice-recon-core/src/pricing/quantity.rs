//! Quantity-aware price adjustment.
//!
//! Bulk orders are expected to carry volume discounts and small orders a
//! premium. The correction is log-scaled so it stays sub-linear and bounded:
//!
//! | quantity ratio | factor |
//! |----------------|--------|
//! | 0.5 – 2.0      | 1.00   |
//! | 5              | ~0.63  |
//! | 10             | ~0.55  |
//! | 0.25           | 2.00   |

/// Ratio band treated as normal order-size variance.
pub const NEUTRAL_RATIO_LOW: f64 = 0.5;
pub const NEUTRAL_RATIO_HIGH: f64 = 2.0;

/// Bounds on the adjustment factor.
pub const MIN_FACTOR: f64 = 0.4;
pub const MAX_FACTOR: f64 = 2.0;

const ELASTICITY: f64 = 0.25;
const RATIO_FLOOR: f64 = 0.1;

/// Expected-price adjustment factor for an order of `invoice_qty` against a
/// historical average of `historical_avg_qty`.
///
/// Returns exactly 1.0 when either quantity is absent or zero, or when the
/// ratio falls inside [`NEUTRAL_RATIO_LOW`, `NEUTRAL_RATIO_HIGH`].
pub fn quantity_adjustment(invoice_qty: Option<f64>, historical_avg_qty: f64) -> f64 {
    let invoice_qty = match invoice_qty {
        Some(q) if q != 0.0 => q,
        _ => return 1.0,
    };
    if historical_avg_qty <= 0.0 {
        return 1.0;
    }

    let ratio = invoice_qty / historical_avg_qty;
    if (NEUTRAL_RATIO_LOW..=NEUTRAL_RATIO_HIGH).contains(&ratio) {
        return 1.0;
    }

    let factor = 1.0 / (1.0 + ELASTICITY * ratio.max(RATIO_FLOOR).log2());
    factor.clamp(MIN_FACTOR, MAX_FACTOR)
}
