//! Vendor name matching against the approved vendor list.
//!
//! Pipeline, in order of confidence:
//! 1. Exact match against canonical names (case-insensitive)
//! 2. Alias match against known aliases
//! 3. Fuzzy match over canonical names and aliases

use strsim::{jaro_winkler, normalized_levenshtein};

use crate::config::ReconPolicy;
use crate::models::{MatchType, VendorMatch};
use crate::reference::ApprovedVendor;

/// Confidence reported for alias matches.
const ALIAS_CONFIDENCE: f64 = 0.95;

/// Matcher over a fixed approved-vendor list.
pub struct VendorMatcher {
    vendors: Vec<ApprovedVendor>,
    fuzzy_threshold: f64,
    low_confidence_threshold: f64,
}

impl VendorMatcher {
    /// Create a matcher using the policy's fuzzy thresholds.
    pub fn new(vendors: Vec<ApprovedVendor>, policy: &ReconPolicy) -> Self {
        let vendors = vendors
            .into_iter()
            .map(|v| ApprovedVendor {
                aliases: v.aliases.iter().map(|a| a.trim().to_lowercase()).collect(),
                name: v.name,
            })
            .collect();

        Self {
            vendors,
            fuzzy_threshold: policy.vendor_fuzzy_threshold,
            low_confidence_threshold: policy.vendor_low_confidence_threshold,
        }
    }

    /// Match an invoice vendor name.
    pub fn match_vendor(&self, invoice_vendor: Option<&str>) -> VendorMatch {
        let name = match invoice_vendor.map(str::trim) {
            Some(n) if !n.is_empty() => n,
            _ => return VendorMatch::none(),
        };
        let lower = name.to_lowercase();

        if let Some(vendor) = self.vendors.iter().find(|v| v.name.to_lowercase() == lower) {
            return VendorMatch::new(&vendor.name, MatchType::Exact, 1.0);
        }

        if let Some(vendor) = self.vendors.iter().find(|v| v.aliases.contains(&lower)) {
            return VendorMatch::new(&vendor.name, MatchType::Alias, ALIAS_CONFIDENCE);
        }

        // Ties keep the earlier vendor in list order
        let best = self
            .vendors
            .iter()
            .map(|v| (v, self.best_score(v, &lower)))
            .fold(None, |best: Option<(&ApprovedVendor, f64)>, (vendor, score)| match best {
                Some((_, top)) if score <= top => best,
                _ => Some((vendor, score)),
            });

        match best {
            Some((vendor, score)) => match self.classify(score) {
                MatchType::None => VendorMatch::none(),
                match_type => VendorMatch::new(&vendor.name, match_type, score),
            },
            None => VendorMatch::none(),
        }
    }

    /// Map a fuzzy score onto a match type.
    pub fn classify(&self, score: f64) -> MatchType {
        if score >= self.fuzzy_threshold {
            MatchType::Fuzzy
        } else if score >= self.low_confidence_threshold {
            MatchType::FuzzyLowConfidence
        } else {
            MatchType::None
        }
    }

    fn best_score(&self, vendor: &ApprovedVendor, query: &str) -> f64 {
        std::iter::once(vendor.name.to_lowercase())
            .chain(vendor.aliases.iter().cloned())
            .map(|candidate| fuzzy_match(query, &candidate))
            .fold(0.0, f64::max)
    }
}

/// Compute fuzzy string similarity using combined metrics.
fn fuzzy_match(a: &str, b: &str) -> f64 {
    // Jaro-Winkler rewards shared prefixes, Levenshtein overall edit distance
    let jw = jaro_winkler(a, b);
    let lev = normalized_levenshtein(a, b);

    jw * 0.6 + lev * 0.4
}
