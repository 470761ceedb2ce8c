//! Per-line price comparison results.

use serde::{Deserialize, Serialize};

use super::RateStatistic;

/// Classification of one invoiced line against its expected price range.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    /// Within the buffered, quantity-adjusted range
    InRange,
    /// Outside the buffered range but within the ratio gate (soft)
    OutsideRange,
    /// Beyond the ratio ceiling/floor (hard)
    OutOfRange,
    /// No historical or learned rate for this vendor and item
    NoContractRate,
    /// Unit price could not be read from the invoice
    MissingPrice,
}

impl LineStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            LineStatus::InRange => "IN_RANGE",
            LineStatus::OutsideRange => "OUTSIDE_RANGE",
            LineStatus::OutOfRange => "OUT_OF_RANGE",
            LineStatus::NoContractRate => "NO_CONTRACT_RATE",
            LineStatus::MissingPrice => "MISSING_PRICE",
        }
    }

    /// Whether the line had both a price and a rate to compare against.
    pub fn is_priced(&self) -> bool {
        !matches!(self, LineStatus::NoContractRate | LineStatus::MissingPrice)
    }

    /// Whether the price deviates from the expected range at all.
    pub fn is_deviation(&self) -> bool {
        matches!(self, LineStatus::OutsideRange | LineStatus::OutOfRange)
    }
}

impl std::fmt::Display for LineStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison record for a single invoiced line.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItemComparison {
    /// Description as printed on the invoice
    pub description: String,
    /// Canonical item name used as the lookup key
    pub canonical_item: String,
    pub quantity: Option<f64>,
    pub invoice_price: Option<f64>,
    pub line_total: Option<f64>,
    /// Expected price distribution, if one was resolved
    pub rate_statistic: Option<RateStatistic>,
    /// Deviation from the adjusted average, in percent (one decimal)
    pub variance_pct: Option<f64>,
    /// Quantity adjustment factor, present only when it is not 1.0
    pub quantity_adjustment: Option<f64>,
    /// invoice price / adjusted average
    pub price_ratio: Option<f64>,
    pub status: LineStatus,
    pub note: String,
}

impl LineItemComparison {
    /// Historical average, if a rate was resolved.
    pub fn historical_avg(&self) -> Option<f64> {
        self.rate_statistic.as_ref().map(|s| s.avg)
    }

    /// Display form of the historical range.
    pub fn range_display(&self) -> Option<String> {
        self.rate_statistic.as_ref().map(|s| s.range_display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_partitions() {
        assert!(LineStatus::InRange.is_priced());
        assert!(LineStatus::OutOfRange.is_priced());
        assert!(!LineStatus::MissingPrice.is_priced());
        assert!(!LineStatus::NoContractRate.is_priced());

        assert!(LineStatus::OutsideRange.is_deviation());
        assert!(LineStatus::OutOfRange.is_deviation());
        assert!(!LineStatus::InRange.is_deviation());
    }

    #[test]
    fn test_status_serialization() {
        let json = serde_json::to_string(&LineStatus::NoContractRate).unwrap();
        assert_eq!(json, "\"NO_CONTRACT_RATE\"");
        let parsed: LineStatus = serde_json::from_str("\"OUT_OF_RANGE\"").unwrap();
        assert_eq!(parsed, LineStatus::OutOfRange);
    }
}
