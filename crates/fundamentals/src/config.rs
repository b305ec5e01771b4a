//! TOML configuration for analysis runs.

use std::fs;
use std::path::{Path, PathBuf};

use fundamentals_core::{CacheVersion, ColumnMapping, FundamentalsError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use fundamentals_analysis::DEFAULT_HISTOGRAM_BINS;

/// Top-level analysis configuration.
///
/// Every section and field is optional in the TOML source and falls back to
/// its default.
///
/// ```toml
/// [database]
/// path = "database.sqlite"
///
/// [analysis]
/// years = 10
/// histogram_bins = 20
/// cache_version = "20240101000000"
///
/// [column_mapping.income_statement]
/// TOTAL_OPERATE_INCOME = "total_operating_revenue"
/// ```
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Statement store location.
    pub database: DatabaseConfig,
    /// Analysis parameters.
    pub analysis: AnalysisSettings,
    /// Provider column names to canonical line items, applied at import.
    pub column_mapping: ColumnMapping,
}

/// `[database]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file.
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("database.sqlite"),
        }
    }
}

/// `[analysis]` section.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisSettings {
    /// Years of history loaded for the company.
    pub years: u32,
    /// Histogram bins of the latest-period market distribution.
    pub histogram_bins: usize,
    /// Median-cache version; a run timestamp when unset.
    pub cache_version: Option<String>,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            years: 10,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            cache_version: None,
        }
    }
}

impl AnalysisConfig {
    /// Reads and validates a TOML configuration file.
    ///
    /// # Errors
    /// Returns [`FundamentalsError::Config`] if the file cannot be read, is not
    /// valid TOML, or fails validation.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            FundamentalsError::Config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let config = Self::from_toml_str(&content)?;
        debug!(path = %path.display(), "Loaded analysis configuration");
        Ok(config)
    }

    /// Parses and validates a TOML configuration string.
    ///
    /// # Errors
    /// Returns [`FundamentalsError::Config`] if the string is not valid TOML or
    /// fails validation.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)
            .map_err(|e| FundamentalsError::Config(format!("Invalid configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks parameter ranges.
    ///
    /// # Errors
    /// Returns [`FundamentalsError::Config`] if `years` or `histogram_bins` is zero.
    pub fn validate(&self) -> Result<()> {
        if self.analysis.years == 0 {
            return Err(FundamentalsError::Config(
                "analysis.years must be at least 1".to_string(),
            ));
        }
        if self.analysis.histogram_bins == 0 {
            return Err(FundamentalsError::Config(
                "analysis.histogram_bins must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Cache version for a run: the configured tag, or the current timestamp.
    #[must_use]
    pub fn cache_version(&self) -> CacheVersion {
        self.analysis
            .cache_version
            .as_deref()
            .map_or_else(CacheVersion::now, CacheVersion::new)
    }
}
