//! TOML run configuration.
//!
//! Every field has a default, so an empty file (or no file) gives the
//! standard `Unix Timestamp` / `Close` layout with a 5x garbage threshold.

use crate::data::scan::{self, ScanSettings};
use crate::normalize::{NormalizeSettings, DEFAULT_TEMP_SUFFIX};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SymcatConfig {
    pub columns: ColumnsConfig,
    pub scan: ScanConfig,
    pub catalog: CatalogConfig,
    pub normalize: NormalizeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColumnsConfig {
    pub time: String,
    pub price: Option<String>,
}

impl Default for ColumnsConfig {
    fn default() -> Self {
        Self {
            time: scan::DEFAULT_TIME_COLUMN.into(),
            price: Some(scan::DEFAULT_PRICE_COLUMN.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub garbage_threshold: f64,
    pub millis_cutoff: i64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            garbage_threshold: scan::GARBAGE_THRESHOLD,
            millis_cutoff: scan::MILLIS_CUTOFF,
        }
    }
}

/// Exclusion list applied when none is configured and this file exists.
pub const DEFAULT_EXCLUSION_FILE: &str = "resources/corrupted_files.txt";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    pub exclusion_file: Option<PathBuf>,
    pub output: PathBuf,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            exclusion_file: None,
            output: PathBuf::from("resources/symbols.txt"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizeConfig {
    pub int_columns: Vec<String>,
    pub float_columns: Vec<String>,
    pub temp_suffix: String,
}

impl Default for NormalizeConfig {
    fn default() -> Self {
        let defaults = NormalizeSettings::default();
        Self {
            int_columns: defaults.int_columns,
            float_columns: defaults.float_columns,
            temp_suffix: DEFAULT_TEMP_SUFFIX.into(),
        }
    }
}

impl CatalogConfig {
    /// The configured exclusion file, else [`DEFAULT_EXCLUSION_FILE`] if present.
    pub fn exclusion_path(&self) -> Option<PathBuf> {
        self.exclusion_path_or(Path::new(DEFAULT_EXCLUSION_FILE))
    }

    /// A configured file is returned even when missing, so loading it fails
    /// loudly; `fallback` is only used when it is a file.
    pub fn exclusion_path_or(&self, fallback: &Path) -> Option<PathBuf> {
        self.exclusion_file
            .clone()
            .or_else(|| fallback.is_file().then(|| fallback.to_path_buf()))
    }
}

impl SymcatConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let threshold = self.scan.garbage_threshold;
        if !threshold.is_finite() || threshold < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "scan.garbage_threshold must be a finite ratio >= 1 (got {threshold})"
            )));
        }
        if self.columns.time.is_empty() {
            return Err(ConfigError::Invalid("columns.time must not be empty".into()));
        }
        if self.normalize.temp_suffix.is_empty() {
            return Err(ConfigError::Invalid(
                "normalize.temp_suffix must not be empty".into(),
            ));
        }
        Ok(())
    }

    pub fn scan_settings(&self) -> ScanSettings {
        ScanSettings {
            time_column: self.columns.time.clone(),
            price_column: self.columns.price.clone(),
            garbage_threshold: self.scan.garbage_threshold,
            millis_cutoff: self.scan.millis_cutoff,
        }
    }

    pub fn normalize_settings(&self) -> NormalizeSettings {
        NormalizeSettings {
            int_columns: self.normalize.int_columns.clone(),
            float_columns: self.normalize.float_columns.clone(),
            temp_suffix: self.normalize.temp_suffix.clone(),
        }
    }
}
