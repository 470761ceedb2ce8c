//! Historical pricing models.

use serde::{Deserialize, Serialize};

/// One observed price point for a (vendor, item) pair.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PriceRecord {
    /// Unit price on the source invoice
    pub price: f64,
    /// Quantity ordered, if known
    pub quantity: Option<f64>,
    /// Invoice the observation came from
    pub source_invoice_id: String,
}

impl PriceRecord {
    pub fn new(price: f64, quantity: Option<f64>, source_invoice_id: impl Into<String>) -> Self {
        Self {
            price,
            quantity,
            source_invoice_id: source_invoice_id.into(),
        }
    }
}

/// Where a rate statistic was derived from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RateSource {
    /// Static reference history
    Historical,
    /// Learning store built from approved invoices
    Learned,
}

/// Summary of observed prices for one (vendor, item) pair.
///
/// Never persisted. Construction guarantees `count >= 1` and
/// `min <= avg <= max`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RateStatistic {
    pub count: u32,
    pub min: f64,
    pub max: f64,
    pub avg: f64,
    /// Mean recorded quantity (1.0 when no quantities were recorded)
    pub avg_quantity: f64,
    pub source: RateSource,
}

impl RateStatistic {
    /// Summarize price records. Returns `None` for an empty slice.
    pub fn from_records(records: &[PriceRecord], source: RateSource) -> Option<Self> {
        if records.is_empty() {
            return None;
        }

        let prices = records.iter().map(|r| r.price);
        let min = prices.clone().fold(f64::INFINITY, f64::min);
        let max = prices.clone().fold(f64::NEG_INFINITY, f64::max);
        let avg = prices.sum::<f64>() / records.len() as f64;

        // Zero quantities carry no information about order size
        let quantities: Vec<f64> = records
            .iter()
            .filter_map(|r| r.quantity)
            .filter(|q| *q != 0.0)
            .collect();
        let avg_quantity = if quantities.is_empty() {
            1.0
        } else {
            quantities.iter().sum::<f64>() / quantities.len() as f64
        };

        Some(Self {
            count: records.len() as u32,
            min,
            max,
            // Guard against float drift pushing the mean outside [min, max]
            avg: avg.clamp(min, max),
            avg_quantity,
            source,
        })
    }

    /// Human-readable range, e.g. `$24.19 – $88.72` or `$5.91 (1 data point)`.
    pub fn range_display(&self) -> String {
        if self.count == 1 {
            format!("${:.2} (1 data point)", self.min)
        } else {
            format!("${:.2} – ${:.2}", self.min, self.max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn acme_paper() -> Vec<PriceRecord> {
        vec![
            PriceRecord::new(88.72, Some(24.0), "INV-20250003"),
            PriceRecord::new(24.19, Some(35.0), "INV-20250011"),
            PriceRecord::new(84.99, Some(29.0), "INV-20250018"),
        ]
    }

    #[test]
    fn test_summarize_history() {
        let stat = RateStatistic::from_records(&acme_paper(), RateSource::Historical).unwrap();

        assert_eq!(stat.count, 3);
        assert_eq!(stat.min, 24.19);
        assert_eq!(stat.max, 88.72);
        assert!((stat.avg - 65.9667).abs() < 0.001);
        assert!((stat.avg_quantity - 29.3333).abs() < 0.001);
        assert_eq!(stat.source, RateSource::Historical);
    }

    #[test]
    fn test_empty_history_has_no_statistic() {
        assert!(RateStatistic::from_records(&[], RateSource::Learned).is_none());
    }

    #[test]
    fn test_missing_quantities_default_to_one() {
        let records = vec![
            PriceRecord::new(10.0, None, "A"),
            PriceRecord::new(12.0, None, "B"),
        ];
        let stat = RateStatistic::from_records(&records, RateSource::Learned).unwrap();
        assert_eq!(stat.avg_quantity, 1.0);
    }

    #[test]
    fn test_range_display() {
        let stat = RateStatistic::from_records(&acme_paper(), RateSource::Historical).unwrap();
        assert_eq!(stat.range_display(), "$24.19 – $88.72");

        let single = RateStatistic::from_records(
            &[PriceRecord::new(5.91, Some(43.0), "INV-20250019")],
            RateSource::Historical,
        )
        .unwrap();
        assert_eq!(single.range_display(), "$5.91 (1 data point)");
    }
}
