//! Item description normalizer.
//!
//! Handles:
//! - Alias lookup ("cable mgmt kit" → "Cable Management Kit")
//! - Trailing billing-period context ("Standing Desk Rental - Nov")
//! - Abbreviation expansion (mgmt, maint, equip)

use std::collections::HashMap;

use crate::reference::ReferenceData;

/// Month prefixes recognised as trailing billing-period context.
const MONTH_PREFIXES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Normalizer from invoice descriptions to canonical item names.
pub struct ItemNormalizer {
    /// lowercase alias → canonical name
    aliases: HashMap<String, String>,
    /// abbreviation → expansion
    abbreviations: Vec<(String, String)>,
}

impl Default for ItemNormalizer {
    fn default() -> Self {
        Self::new()
    }
}

impl ItemNormalizer {
    /// Create a normalizer with no aliases and the default abbreviations.
    pub fn new() -> Self {
        Self {
            aliases: HashMap::new(),
            abbreviations: Self::default_abbreviations(),
        }
    }

    /// Create a normalizer from the reference alias table.
    pub fn from_reference(reference: &ReferenceData) -> Self {
        let mut normalizer = Self::new();
        for (alias, canonical) in &reference.item_aliases {
            normalizer.add_alias(alias, canonical);
        }
        normalizer
    }

    /// Normalize a description to its canonical item name.
    ///
    /// Unknown descriptions come back trimmed but otherwise unchanged.
    pub fn normalize(&self, description: &str) -> String {
        let cleaned = description.trim();
        if cleaned.is_empty() {
            return String::new();
        }
        let lower = cleaned.to_lowercase();

        if let Some(canonical) = self.aliases.get(&lower) {
            return canonical.clone();
        }

        if let Some(stripped) = strip_period_suffix(&lower) {
            if let Some(canonical) = self.aliases.get(stripped) {
                return canonical.clone();
            }
        }

        let expanded = self.expand_abbreviations(&lower);
        if let Some(canonical) = self.aliases.get(&expanded) {
            return canonical.clone();
        }

        cleaned.to_string()
    }

    /// Add a custom alias mapping.
    pub fn add_alias(&mut self, alias: &str, canonical: &str) {
        self.aliases
            .insert(alias.trim().to_lowercase(), canonical.to_string());
    }

    /// Add a custom abbreviation expansion.
    pub fn add_abbreviation(&mut self, short: &str, long: &str) {
        self.abbreviations
            .push((short.to_lowercase(), long.to_lowercase()));
    }

    /// Expand whole-word abbreviations only.
    fn expand_abbreviations(&self, lower: &str) -> String {
        lower
            .split_whitespace()
            .map(|word| {
                self.abbreviations
                    .iter()
                    .find(|(short, _)| short == word)
                    .map_or(word, |(_, long)| long.as_str())
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    fn default_abbreviations() -> Vec<(String, String)> {
        vec![
            ("mgmt".into(), "management".into()),
            ("maint".into(), "maintenance".into()),
            ("equip".into(), "equipment".into()),
        ]
    }
}

/// Strip a trailing `- <month>...` suffix (hyphen or en dash).
fn strip_period_suffix(lower: &str) -> Option<&str> {
    for (idx, ch) in lower.char_indices() {
        if ch != '-' && ch != '–' {
            continue;
        }
        let rest = lower[idx + ch.len_utf8()..].trim_start();
        if MONTH_PREFIXES.iter().any(|m| rest.starts_with(m)) {
            return Some(lower[..idx].trim_end());
        }
    }
    None
}
