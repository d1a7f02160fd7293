//! Configuration for version stores.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ScdError, ScdResult};

/// Default number of rows written per batch chunk.
pub const DEFAULT_BATCH_SIZE: usize = 100;

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Path to the SQLite database (default: None = in-memory).
    pub db_path: Option<PathBuf>,
    /// Rows per chunk for `create_batch` (default: 100).
    pub batch_size: usize,
    /// How long a writer waits on a locked database file, in milliseconds.
    pub busy_timeout_ms: u64,
    /// Whether stores create their table and indexes on construction.
    pub create_schema: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            batch_size: DEFAULT_BATCH_SIZE,
            busy_timeout_ms: 5_000,
            create_schema: true,
        }
    }
}

impl StoreConfig {
    /// Load configuration from a file (TOML, JSON, or YAML).
    pub fn from_file(path: impl AsRef<Path>) -> ScdResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let ext = path.as_ref().extension().and_then(|e| e.to_str());

        let config: Self = match ext {
            Some("toml") => {
                toml::from_str(&content).map_err(|e| ScdError::Configuration(e.to_string()))?
            }
            Some("json") => serde_json::from_str(&content)
                .map_err(|e| ScdError::Configuration(e.to_string()))?,
            Some("yaml" | "yml") => serde_yaml::from_str(&content)
                .map_err(|e| ScdError::Configuration(e.to_string()))?,
            _ => {
                return Err(ScdError::Configuration(
                    "Unsupported config file format. Use .toml, .json, or .yaml".to_string(),
                ))
            }
        };

        config.validate()?;
        Ok(config)
    }

    /// Create config from environment variables.
    ///
    /// Reads:
    /// - `SCD_DB_PATH` (default: None = in-memory)
    /// - `SCD_BATCH_SIZE` (default: 100)
    /// - `SCD_BUSY_TIMEOUT_MS` (default: 5000)
    /// - `SCD_SKIP_SCHEMA` (default: unset = create schema)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(path) = std::env::var("SCD_DB_PATH") {
            if !path.is_empty() && path != ":memory:" {
                config.db_path = Some(PathBuf::from(path));
            }
        }

        if let Ok(size) = std::env::var("SCD_BATCH_SIZE") {
            if let Ok(size) = size.parse::<usize>() {
                config.batch_size = size.max(1);
            }
        }

        if let Ok(timeout) = std::env::var("SCD_BUSY_TIMEOUT_MS") {
            if let Ok(ms) = timeout.parse() {
                config.busy_timeout_ms = ms;
            }
        }

        if std::env::var("SCD_SKIP_SCHEMA").is_ok() {
            config.create_schema = false;
        }

        config
    }

    /// Set the database path.
    pub fn with_db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Set the batch chunk size (clamped to at least 1).
    pub fn with_batch_size(mut self, size: usize) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// Set the busy timeout.
    pub fn with_busy_timeout_ms(mut self, ms: u64) -> Self {
        self.busy_timeout_ms = ms;
        self
    }

    /// Skip table creation; the schema is managed elsewhere.
    pub fn without_schema(mut self) -> Self {
        self.create_schema = false;
        self
    }

    /// Check values that serde cannot.
    pub fn validate(&self) -> ScdResult<()> {
        if self.batch_size == 0 {
            return Err(ScdError::Configuration(
                "batch_size must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = StoreConfig::default();
        assert_eq!(config.batch_size, 100);
        assert!(config.db_path.is_none());
        assert!(config.create_schema);
    }

    #[test]
    fn test_builder_clamps_batch_size() {
        let config = StoreConfig::default().with_batch_size(0).without_schema();
        assert_eq!(config.batch_size, 1);
        assert!(!config.create_schema);
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "db_path = \"/tmp/scd.db\"\nbatch_size = 25").unwrap();

        let config = StoreConfig::from_file(file.path()).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/scd.db")));
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.busy_timeout_ms, 5_000);
    }

    #[test]
    fn test_from_yaml_file_rejects_zero_batch() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "batch_size: 0").unwrap();

        let err = StoreConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ScdError::Configuration(_)));
    }

    #[test]
    fn test_unknown_extension() {
        let file = tempfile::Builder::new().suffix(".ini").tempfile().unwrap();
        assert!(StoreConfig::from_file(file.path()).is_err());
    }
}
