//! Reconciliation policy and runtime configuration.
//!
//! Every field has a default, so an empty TOML file (or none at all) yields
//! the stock policy.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid policy: {0}")]
    Invalid(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// Thresholds used by the comparison and decision engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconPolicy {
    /// Buffer beyond observed min/max once the sample is large enough
    pub base_buffer: f64,
    /// Extra buffer per missing data point below `full_confidence_samples`
    pub small_sample_step: f64,
    /// Sample count at which the buffer stops widening
    pub full_confidence_samples: u32,
    /// price / adjusted average above this is a hard anomaly
    pub max_price_ratio_high: f64,
    /// price / adjusted average below this is a hard anomaly
    pub max_price_ratio_low: f64,
    /// Tax rates seen in practice (fractions, e.g. 0.0825)
    pub valid_tax_rates: Vec<f64>,
    /// Absolute tolerance around a known tax rate (0.005 = 0.5pp)
    pub tax_tolerance: f64,
    pub line_math_tolerance: f64,
    pub subtotal_tolerance: f64,
    pub total_tolerance: f64,
    pub max_questions: usize,
    /// Fuzzy vendor score at or above which a match is trusted
    pub vendor_fuzzy_threshold: f64,
    /// Fuzzy vendor score at or above which a match needs confirmation
    pub vendor_low_confidence_threshold: f64,
}

impl Default for ReconPolicy {
    fn default() -> Self {
        Self {
            base_buffer: 0.15,
            small_sample_step: 0.10,
            full_confidence_samples: 5,
            max_price_ratio_high: 1.5,
            max_price_ratio_low: 0.75,
            valid_tax_rates: vec![0.0, 0.075, 0.0825, 0.095],
            tax_tolerance: 0.005,
            line_math_tolerance: 0.50,
            subtotal_tolerance: 1.00,
            total_tolerance: 1.00,
            max_questions: 3,
            vendor_fuzzy_threshold: 0.85,
            vendor_low_confidence_threshold: 0.60,
        }
    }
}

impl ReconPolicy {
    /// Sample-size-aware buffer: `base + max(0, (full - n) * step)`.
    pub fn buffer_for(&self, sample_count: u32) -> f64 {
        let missing = self.full_confidence_samples.saturating_sub(sample_count);
        self.base_buffer + missing as f64 * self.small_sample_step
    }

    /// Reject policies that would make the classification meaningless.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.base_buffer < 0.0 || self.small_sample_step < 0.0 {
            return Err(ConfigError::Invalid("buffers must be non-negative".into()));
        }
        let tolerances = [
            ("tax_tolerance", self.tax_tolerance),
            ("line_math_tolerance", self.line_math_tolerance),
            ("subtotal_tolerance", self.subtotal_tolerance),
            ("total_tolerance", self.total_tolerance),
        ];
        if let Some((name, value)) = tolerances.iter().find(|(_, v)| *v < 0.0) {
            return Err(ConfigError::Invalid(format!(
                "{} must be non-negative (got {})",
                name, value
            )));
        }
        if !(self.max_price_ratio_low < 1.0 && self.max_price_ratio_high > 1.0) {
            return Err(ConfigError::Invalid(format!(
                "ratio gate must bracket 1.0 (got {}..{})",
                self.max_price_ratio_low, self.max_price_ratio_high
            )));
        }
        if self.vendor_low_confidence_threshold > self.vendor_fuzzy_threshold {
            return Err(ConfigError::Invalid(
                "vendor low-confidence threshold exceeds fuzzy threshold".into(),
            ));
        }
        if self.max_questions == 0 {
            return Err(ConfigError::Invalid("max_questions must be at least 1".into()));
        }
        Ok(())
    }
}

/// Log output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Compact,
        }
    }
}

/// Top-level runtime configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ReconConfig {
    pub policy: ReconPolicy,
    /// Learning store database (None = no learning fallback)
    pub store_path: Option<PathBuf>,
    /// Reference data JSON (None = built-in reference data)
    pub reference_path: Option<PathBuf>,
    pub logging: LoggingConfig,
}

impl ReconConfig {
    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> ConfigResult<Self> {
        let config: ReconConfig = toml::from_str(text)?;
        config.policy.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_scales_with_sample_size() {
        let policy = ReconPolicy::default();
        assert!((policy.buffer_for(1) - 0.55).abs() < 1e-9);
        assert!((policy.buffer_for(3) - 0.35).abs() < 1e-9);
        assert!((policy.buffer_for(5) - 0.15).abs() < 1e-9);
        assert!((policy.buffer_for(10) - 0.15).abs() < 1e-9);
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = ReconConfig::from_toml("").unwrap();
        assert_eq!(config, ReconConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides() {
        let config = ReconConfig::from_toml(
            r#"
            store_path = "data/history.sqlite"

            [policy]
            max_price_ratio_high = 1.4

            [logging]
            format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.policy.max_price_ratio_high, 1.4);
        assert_eq!(config.policy.max_price_ratio_low, 0.75);
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.store_path, Some(PathBuf::from("data/history.sqlite")));
    }

    #[test]
    fn test_invalid_ratio_gate_rejected() {
        let result = ReconConfig::from_toml("[policy]\nmax_price_ratio_low = 1.2\n");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_negative_tolerances_rejected() {
        for field in ["tax_tolerance", "line_math_tolerance", "subtotal_tolerance", "total_tolerance"] {
            let result = ReconConfig::from_toml(&format!("[policy]\n{} = -0.5\n", field));
            match result {
                Err(ConfigError::Invalid(msg)) => assert!(msg.starts_with(field), "{}", msg),
                other => panic!("{}: expected Invalid, got {:?}", field, other),
            }
        }
        assert!(ReconConfig::from_toml("[policy]\ntotal_tolerance = 0.0\n").is_ok());
    }

    #[test]
    fn test_missing_file() {
        let result = ReconConfig::load("/nonexistent/recon.toml");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }
}
