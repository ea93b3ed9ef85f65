//! Detection configuration.
//!
//! Stored as pretty-printed JSON so a tuned setup can be saved next to the
//! images it was tuned on and reloaded by the CLI.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to access config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Parameters for background estimation, detection and identification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    /// Threshold multiplier: `threshold = background + threshold_sigma * dispersion`
    pub threshold_sigma: f64,
    /// Number of histogram bins used by the background fit
    pub histogram_bins: usize,
    /// Upper limit on pixels in one cluster (`None` for unlimited)
    pub max_cluster_pixels: Option<usize>,
    /// Cone radius for catalog lookups, in degrees
    pub search_radius_deg: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            threshold_sigma: 6.0,
            histogram_bins: 200,
            max_cluster_pixels: None,
            search_radius_deg: 0.003,
        }
    }
}

impl DetectionConfig {
    /// Check that every parameter is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold_sigma.is_finite() || self.threshold_sigma < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "threshold_sigma must be finite and non-negative, got {}",
                self.threshold_sigma
            )));
        }
        if self.histogram_bins == 0 {
            return Err(ConfigError::Invalid(
                "histogram_bins must be at least 1".to_string(),
            ));
        }
        if self.max_cluster_pixels == Some(0) {
            return Err(ConfigError::Invalid(
                "max_cluster_pixels must be at least 1 when set".to_string(),
            ));
        }
        if !(self.search_radius_deg.is_finite() && self.search_radius_deg > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "search_radius_deg must be positive, got {}",
                self.search_radius_deg
            )));
        }
        Ok(())
    }

    /// Save to JSON file
    pub fn save_to_file(&self, path: &Path) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from JSON file and validate. Missing fields take their defaults.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}
