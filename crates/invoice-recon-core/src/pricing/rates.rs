//! Expected price resolution for a (vendor, item) pair.

use tracing::warn;

use crate::models::{RateSource, RateStatistic};
use crate::reference::PriceHistory;
use crate::store::LearningStore;

/// Resolves rate statistics: static history first, learning store second.
///
/// A statistic always comes from exactly one source and exactly one
/// (vendor, item) key.
pub struct RateResolver<'a> {
    history: &'a PriceHistory,
    store: Option<&'a dyn LearningStore>,
}

impl<'a> RateResolver<'a> {
    /// Create a resolver over static history only.
    pub fn new(history: &'a PriceHistory) -> Self {
        Self { history, store: None }
    }

    /// Add a learning store as the fallback source.
    pub fn with_store(mut self, store: &'a dyn LearningStore) -> Self {
        self.store = Some(store);
        self
    }

    /// Resolve the expected price distribution, or `None` if neither source
    /// has data for this exact key.
    pub fn resolve(&self, vendor: &str, item: &str) -> Option<RateStatistic> {
        if vendor.is_empty() || item.is_empty() {
            return None;
        }

        if let Some(stat) = self
            .history
            .get(vendor, item)
            .and_then(|records| RateStatistic::from_records(records, RateSource::Historical))
        {
            return Some(stat);
        }

        let store = self.store?;
        match store.learned_rate(vendor, item) {
            Ok(stat) => stat,
            Err(e) => {
                // Degraded read: treat as no history rather than failing the invoice
                warn!(vendor, item, error = %e, "Learning store lookup failed");
                None
            }
        }
    }
}
