//! TOML configuration for the analysis thresholds.
//!
//! Resolution order: an explicit `--config` path, then the
//! `INTEGRITY_SIGNALS_CONFIG` environment variable, then compiled-in defaults.

use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const CONFIG_ENV: &str = "INTEGRITY_SIGNALS_CONFIG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SignalsConfig {
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

/// Baseline, trend and review thresholds applied during aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Number of prior windows averaged into the trailing baseline.
    pub baseline_windows: usize,
    /// Relative change from baseline needed before a trend counts as up/down.
    pub trend_delta: f64,
    /// A count above `baseline * review_multiplier` needs review.
    pub review_multiplier: f64,
    /// Review floor used when there is no history to compare against.
    pub min_count_for_review: u64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            baseline_windows: 7,
            trend_delta: 0.1,
            review_multiplier: 2.0,
            min_count_for_review: 3,
        }
    }
}

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.baseline_windows == 0 {
            bail!("analysis.baseline_windows must be at least 1");
        }
        if !(0.0..1.0).contains(&self.trend_delta) {
            bail!("analysis.trend_delta must be in [0, 1), got {}", self.trend_delta);
        }
        if !(self.review_multiplier >= 1.0) {
            bail!(
                "analysis.review_multiplier must be >= 1, got {}",
                self.review_multiplier
            );
        }
        Ok(())
    }
}

impl SignalsConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;
        let config: Self = toml::from_str(&content)
            .with_context(|| format!("failed to parse config file: {}", path.display()))?;
        config
            .analysis
            .validate()
            .with_context(|| format!("invalid config file: {}", path.display()))?;
        info!(path = %path.display(), "loaded configuration");
        Ok(config)
    }

    /// An explicit path must load; the environment fallback only warns.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Ok(env_path) = std::env::var(CONFIG_ENV) {
            let path = Path::new(&env_path);
            match Self::load(path) {
                Ok(config) => return Ok(config),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        error = %e,
                        "INTEGRITY_SIGNALS_CONFIG set but file could not be loaded, using defaults"
                    );
                }
            }
        }

        Ok(Self::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn defaults_match_reference_thresholds() {
        let config = AnalysisConfig::default();
        assert_eq!(config.baseline_windows, 7);
        assert_eq!(config.trend_delta, 0.1);
        assert_eq!(config.review_multiplier, 2.0);
        assert_eq!(config.min_count_for_review, 3);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_file_keeps_remaining_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\nbaseline_windows = 14\n").unwrap();
        let config = SignalsConfig::load(file.path()).unwrap();
        assert_eq!(config.analysis.baseline_windows, 14);
        assert_eq!(config.analysis.review_multiplier, 2.0);
    }

    #[test]
    fn empty_file_is_all_defaults() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let config = SignalsConfig::load(file.path()).unwrap();
        assert_eq!(config, SignalsConfig::default());
    }

    #[test]
    fn rejects_out_of_range_thresholds() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[analysis]\ntrend_delta = 1.5\n").unwrap();
        assert!(SignalsConfig::load(file.path()).is_err());

        let zero_windows = AnalysisConfig {
            baseline_windows: 0,
            ..AnalysisConfig::default()
        };
        assert!(zero_windows.validate().is_err());
    }

    #[test]
    fn explicit_missing_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(SignalsConfig::resolve(Some(&missing)).is_err());
    }
}
