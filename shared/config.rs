//! Analysis configuration loaded from TOML.
//!
//! Every section is optional; anything left out falls back to its default. A minimal file
//! looks like:
//!
//! ```toml
//! [pca]
//! components = 4
//! zero_strategy = { kind = "half-detection-limit" }
//!
//! [pca.detection_limits]
//! Au_ppb = 1.0
//!
//! [matching]
//! minimum_confidence = 30.0
//!
//! [elements]
//! Cu_ppm = "Cu"
//! Au_ppb = "Au"
//! ```

use crate::classify::matcher::MatchOptions;
use crate::fit::PcaOptions;
use crate::types::ElementMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse configuration TOML: {0}")]
    TomlParseError(#[from] toml::de::Error),
    #[error("Invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub pca: PcaOptions,
    pub matching: MatchOptions,
    /// Column name to element symbol. Unmapped columns are read as symbols themselves.
    pub elements: ElementMap,
}

impl AnalysisConfig {
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        let config = Self::from_toml_str(&text)?;
        log::info!("Loaded analysis configuration from {}", path.display());
        Ok(config)
    }

    pub fn detection_limits(&self) -> &HashMap<String, f64> {
        &self.pca.detection_limits
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let matching = &self.matching;
        if !(matching.loading_threshold.is_finite() && matching.loading_threshold >= 0.0) {
            return Err(ConfigError::InvalidValue {
                field: "matching.loading_threshold",
                reason: format!(
                    "expected a non-negative number, got {}",
                    matching.loading_threshold
                ),
            });
        }
        if !(0.0..=100.0).contains(&matching.minimum_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "matching.minimum_confidence",
                reason: format!("expected a percentage, got {}", matching.minimum_confidence),
            });
        }
        if let Some((column, limit)) = self
            .pca
            .detection_limits
            .iter()
            .find(|(_, limit)| !(limit.is_finite() && **limit > 0.0))
        {
            return Err(ConfigError::InvalidValue {
                field: "pca.detection_limits",
                reason: format!("limit for '{column}' must be positive, got {limit}"),
            });
        }
        Ok(())
    }
}

/// Reads a bare `column = "Symbol"` table, the format of `--elements` files.
pub fn load_element_map(path: &Path) -> Result<ElementMap, ConfigError> {
    let text = fs::read_to_string(path)?;
    Ok(toml::from_str(&text)?)
}
