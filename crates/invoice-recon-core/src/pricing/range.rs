//! Buffered, quantity-adjusted range classification for one invoiced price.

use tracing::debug;

use super::quantity::quantity_adjustment;
use crate::config::ReconPolicy;
use crate::models::{LineStatus, RateStatistic};

/// Ratio reported when the adjusted average is not positive.
pub const SENTINEL_RATIO: f64 = 999.0;

/// Result of evaluating a price against a rate statistic.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeEvaluation {
    /// One of `InRange`, `OutsideRange`, `OutOfRange`
    pub status: LineStatus,
    pub buffer: f64,
    pub quantity_factor: f64,
    pub adjusted_min: f64,
    pub adjusted_max: f64,
    pub adjusted_avg: f64,
    /// Percent deviation from the adjusted average
    pub variance_pct: f64,
    /// price / adjusted average
    pub ratio: f64,
    pub note: String,
}

/// Classifies invoiced prices under a reconciliation policy.
pub struct RangeEvaluator<'a> {
    policy: &'a ReconPolicy,
}

impl<'a> RangeEvaluator<'a> {
    pub fn new(policy: &'a ReconPolicy) -> Self {
        Self { policy }
    }

    /// Evaluate `price` ordered at `quantity` against `stat`.
    ///
    /// The buffered range test runs first; the ratio gate only decides
    /// between hard and soft deviation once a price falls outside it.
    pub fn evaluate(&self, stat: &RateStatistic, price: f64, quantity: Option<f64>) -> RangeEvaluation {
        let buffer = self.policy.buffer_for(stat.count);
        let qty_factor = quantity_adjustment(quantity, stat.avg_quantity);

        let adjusted_min = stat.min * (1.0 - buffer) * qty_factor;
        let adjusted_max = stat.max * (1.0 + buffer) * qty_factor.max(1.0);
        let adjusted_avg = stat.avg * qty_factor;

        let (variance_pct, ratio) = if adjusted_avg > 0.0 {
            (
                (price - adjusted_avg) / adjusted_avg * 100.0,
                price / adjusted_avg,
            )
        } else {
            (0.0, SENTINEL_RATIO)
        };

        let range = stat.range_display();
        let (status, note) = if adjusted_min <= price && price <= adjusted_max {
            let mut note = format!(
                "${:.2} is within acceptable range ({}, {} data point{}, {:.0}% buffer",
                price,
                range,
                stat.count,
                if stat.count > 1 { "s" } else { "" },
                buffer * 100.0
            );
            if qty_factor != 1.0 {
                note.push_str(&format!(", qty-adjusted by {:.2}x", qty_factor));
            }
            note.push_str(").");
            (LineStatus::InRange, note)
        } else if ratio > self.policy.max_price_ratio_high {
            let note = format!(
                "OVERPRICED: ${:.2} is {:.1}x the historical avg (${:.2}). {}. Exceeds {}x ceiling.",
                price, ratio, stat.avg, range, self.policy.max_price_ratio_high
            );
            (LineStatus::OutOfRange, note)
        } else if ratio < self.policy.max_price_ratio_low {
            let note = format!(
                "UNDERPRICED: ${:.2} is {:.2}x the historical avg (${:.2}). {}. Below {}x floor; \
                 possible error, wrong item, or missing quantity.",
                price, ratio, stat.avg, range, self.policy.max_price_ratio_low
            );
            (LineStatus::OutOfRange, note)
        } else {
            let (direction, limit) = if price < adjusted_min {
                ("below", adjusted_min)
            } else {
                ("above", adjusted_max)
            };
            let beyond_pct = ((price - limit) / limit).abs() * 100.0;
            let note = format!(
                "${:.2} is {} the historical range ({}, avg ${:.2}), {:.0}% {} the buffered limit. \
                 Ratio: {:.2}x. Verify with vendor.",
                price, direction, range, stat.avg, beyond_pct, direction, ratio
            );
            (LineStatus::OutsideRange, note)
        };

        debug!(
            status = %status,
            price,
            adjusted_min,
            adjusted_max,
            ratio,
            "Evaluated price against range"
        );

        RangeEvaluation {
            status,
            buffer,
            quantity_factor: qty_factor,
            adjusted_min,
            adjusted_max,
            adjusted_avg,
            variance_pct,
            ratio,
            note,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PriceRecord, RateSource};

    fn stat(points: &[(f64, f64)]) -> RateStatistic {
        let records: Vec<PriceRecord> = points
            .iter()
            .map(|(p, q)| PriceRecord::new(*p, Some(*q), "INV"))
            .collect();
        RateStatistic::from_records(&records, RateSource::Historical).unwrap()
    }

    fn acme_paper() -> RateStatistic {
        stat(&[(88.72, 24.0), (24.19, 35.0), (84.99, 29.0)])
    }

    #[test]
    fn test_in_range_with_small_sample_buffer() {
        let policy = ReconPolicy::default();
        let eval = RangeEvaluator::new(&policy).evaluate(&acme_paper(), 90.0, Some(24.0));

        assert_eq!(eval.status, LineStatus::InRange);
        assert_eq!(eval.quantity_factor, 1.0);
        assert!((eval.buffer - 0.35).abs() < 1e-9);
        assert!((eval.adjusted_min - 15.7235).abs() < 0.001);
        assert!((eval.adjusted_max - 119.772).abs() < 0.001);
        assert_eq!(
            eval.note,
            "$90.00 is within acceptable range ($24.19 – $88.72, 3 data points, 35% buffer)."
        );
    }

    #[test]
    fn test_overpriced_beyond_ceiling() {
        let policy = ReconPolicy::default();
        let eval = RangeEvaluator::new(&policy).evaluate(&acme_paper(), 200.0, Some(24.0));

        assert_eq!(eval.status, LineStatus::OutOfRange);
        assert!((eval.ratio - 3.0318).abs() < 0.001);
        assert!(eval.note.starts_with("OVERPRICED: $200.00 is 3.0x the historical avg ($65.97)."));
        assert!(eval.note.ends_with("Exceeds 1.5x ceiling."));
    }

    #[test]
    fn test_underpriced_below_floor() {
        let policy = ReconPolicy::default();
        let eval = RangeEvaluator::new(&policy).evaluate(&acme_paper(), 10.0, Some(24.0));

        assert_eq!(eval.status, LineStatus::OutOfRange);
        assert!(eval.note.starts_with("UNDERPRICED: $10.00 is 0.15x"));
        assert!(eval.note.contains("Below 0.75x floor"));
    }

    #[test]
    fn test_soft_deviation_within_ratio_gate() {
        // Ergonomic Chair Rental: tight two-point history
        let policy = ReconPolicy::default();
        let chairs = stat(&[(40.00, 140.0), (38.86, 159.0)]);
        let eval = RangeEvaluator::new(&policy).evaluate(&chairs, 58.50, Some(150.0));

        assert_eq!(eval.status, LineStatus::OutsideRange);
        assert!(eval.ratio > 1.0 && eval.ratio < 1.5);
        assert_eq!(
            eval.note,
            "$58.50 is above the historical range ($38.86 – $40.00, avg $39.43), \
             1% above the buffered limit. Ratio: 1.48x. Verify with vendor."
        );
    }

    #[test]
    fn test_range_test_precedes_ratio_gate() {
        // Wide five-point history: 180 is 2x the average but inside the range
        let policy = ReconPolicy::default();
        let gloves = stat(&[
            (162.13, 49.0),
            (26.81, 2.0),
            (185.67, 17.0),
            (16.89, 35.0),
            (44.70, 22.0),
        ]);
        let eval = RangeEvaluator::new(&policy).evaluate(&gloves, 180.0, Some(25.0));

        assert!(eval.ratio > 1.5);
        assert_eq!(eval.status, LineStatus::InRange);
    }

    #[test]
    fn test_bulk_order_widens_lower_bound() {
        // Ten times the usual quantity: expected price drops
        let policy = ReconPolicy::default();
        let eval = RangeEvaluator::new(&policy).evaluate(&acme_paper(), 40.0, Some(290.0));

        assert!(eval.quantity_factor < 0.6);
        assert_eq!(eval.status, LineStatus::InRange);
        assert!(eval.note.contains("qty-adjusted by 0.55x"));
    }

    #[test]
    fn test_zero_average_uses_sentinel_ratio() {
        let policy = ReconPolicy::default();
        let free = stat(&[(0.0, 1.0), (0.0, 1.0)]);
        let eval = RangeEvaluator::new(&policy).evaluate(&free, 5.0, Some(1.0));

        assert_eq!(eval.ratio, SENTINEL_RATIO);
        assert_eq!(eval.variance_pct, 0.0);
        assert_eq!(eval.status, LineStatus::OutOfRange);
    }
}
