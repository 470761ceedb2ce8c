//! Vendor matching models.

use serde::{Deserialize, Serialize};

/// How an invoice vendor name was matched to the approved list.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    /// Case-insensitive equality with a canonical name
    Exact,
    /// Equality with a known alias
    Alias,
    /// High-similarity fuzzy match
    Fuzzy,
    /// Fuzzy match that needs a human to confirm it
    FuzzyLowConfidence,
    /// Not an approved vendor
    None,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Exact => "exact",
            MatchType::Alias => "alias",
            MatchType::Fuzzy => "fuzzy",
            MatchType::FuzzyLowConfidence => "fuzzy_low_confidence",
            MatchType::None => "none",
        }
    }
}

impl std::fmt::Display for MatchType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of matching an invoice vendor name.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VendorMatch {
    /// Canonical vendor name (None when unmatched)
    pub canonical_name: Option<String>,
    pub match_type: MatchType,
    /// Match confidence (0.0 - 1.0)
    pub confidence: f64,
}

impl VendorMatch {
    /// A non-match.
    pub fn none() -> Self {
        Self {
            canonical_name: None,
            match_type: MatchType::None,
            confidence: 0.0,
        }
    }

    pub fn new(canonical_name: impl Into<String>, match_type: MatchType, confidence: f64) -> Self {
        Self {
            canonical_name: Some(canonical_name.into()),
            match_type,
            confidence,
        }
    }

    /// Canonical name, or empty string when unmatched (used as a lookup key).
    pub fn vendor_key(&self) -> &str {
        self.canonical_name.as_deref().unwrap_or("")
    }
}
