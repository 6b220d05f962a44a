//! Trainer configuration.
//!
//! Defaults reproduce the fixed training recipe. A TOML file may override any field; command-line
//! flags are applied on top by the trainer binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifacts::DEFAULT_MODELS_DIR;
use crate::ml::forest::ForestParams;

/// Default training CSV, relative to the working directory.
pub const DEFAULT_DATA_PATH: &str = "data/wellness_data.csv";
/// Default directory for trainer log files.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Errors that may occur while loading a trainer config.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Failed to parse TOML config.
    #[error("Invalid config at {path}: {source}")]
    ParseToml {
        path: PathBuf,
        source: toml::de::Error,
    },
    /// A value parsed but is out of range.
    #[error("Invalid config value for {field}: {message}")]
    Invalid { field: &'static str, message: String },
}

/// Settings for one training run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// Training CSV.
    pub data_path: PathBuf,
    /// Directory receiving the model, encoder, and sidecar.
    pub models_dir: PathBuf,
    /// Directory receiving per-run log files.
    pub log_dir: PathBuf,
    /// Share of each class held out for evaluation.
    pub test_fraction: f64,
    /// Seed for the train/test split.
    pub split_seed: u64,
    pub forest: ForestParams,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from(DEFAULT_DATA_PATH),
            models_dir: PathBuf::from(DEFAULT_MODELS_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            test_fraction: 0.2,
            split_seed: 42,
            forest: ForestParams::default(),
        }
    }
}

impl TrainConfig {
    /// Load a config from a TOML file. Absent fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Self = toml::from_str(&text).map_err(|source| ConfigError::ParseToml {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Use one seed for both the split and the forest.
    pub fn set_seed(&mut self, seed: u64) {
        self.split_seed = seed;
        self.forest.random_state = seed;
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.test_fraction > 0.0 && self.test_fraction < 1.0) {
            return Err(ConfigError::Invalid {
                field: "test_fraction",
                message: format!("{} is not in (0, 1)", self.test_fraction),
            });
        }
        if self.forest.n_estimators == 0 {
            return Err(ConfigError::Invalid {
                field: "forest.n_estimators",
                message: "must be at least 1".to_string(),
            });
        }
        if self.forest.max_depth == 0 {
            return Err(ConfigError::Invalid {
                field: "forest.max_depth",
                message: "must be at least 1".to_string(),
            });
        }
        if self.forest.min_samples_leaf == 0 {
            return Err(ConfigError::Invalid {
                field: "forest.min_samples_leaf",
                message: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}
