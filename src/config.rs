//! Dashboard configuration, read from TOML.

use crate::data::{LoadOptions, LoaderError};
use crate::source::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Looked up in the working directory when no path is given.
pub const DEFAULT_FILE: &str = "vahan.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    /// CSV file read when no `source_url` is set.
    pub data_path: PathBuf,
    /// Live CSV endpoint; takes precedence over `data_path`.
    pub source_url: Option<String>,
    pub request_timeout_secs: u64,
    pub max_retries: u32,
    pub initial_backoff_ms: u64,
    /// Treat any rejected row as a load failure.
    pub strict: bool,
    pub top_n: usize,
    /// Use generated sample data when the live source is unavailable.
    pub fallback_to_sample: bool,
    pub export_dir: PathBuf,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("vahan_sample_data.csv"),
            source_url: None,
            request_timeout_secs: 30,
            max_retries: 3,
            initial_backoff_ms: 500,
            strict: false,
            top_n: 10,
            fallback_to_sample: true,
            export_dir: PathBuf::from("."),
        }
    }
}

impl DashboardConfig {
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Read `path`, or `vahan.toml` if present, or fall back to defaults.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file is not.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_FILE), false),
        };

        if !required && !path.exists() {
            debug!("No config file, using defaults");
            return Ok(Self::default());
        }

        let text = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text, &path)?;
        debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.max_retries,
            initial_backoff: Duration::from_millis(self.initial_backoff_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            strict: self.strict,
        }
    }

    /// Whether a failed load should be replaced by generated sample data.
    /// Only an unavailable live source qualifies; local file errors are reported.
    pub fn falls_back_on(&self, error: &LoaderError) -> bool {
        self.fallback_to_sample && matches!(error, LoaderError::SourceUnavailable { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let config = DashboardConfig::from_toml(
            "source_url = \"https://example.org/vahan.csv\"\nmax_retries = 5\nstrict = true\n",
            Path::new("inline.toml"),
        )
        .unwrap();

        assert_eq!(config.source_url.as_deref(), Some("https://example.org/vahan.csv"));
        assert_eq!(config.retry_policy().max_retries, 5);
        assert_eq!(config.retry_policy().initial_backoff, Duration::from_millis(500));
        assert!(config.load_options().strict);
        assert_eq!(config.top_n, 10);
        assert_eq!(config.request_timeout(), Duration::from_secs(30));
    }

    #[test]
    fn only_unavailable_sources_fall_back() {
        let config = DashboardConfig::default();
        let unavailable = LoaderError::SourceUnavailable {
            source_name: "live".to_string(),
            reason: "timed out".to_string(),
        };
        let missing_file = LoaderError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "typo.csv",
        ));

        assert!(config.falls_back_on(&unavailable));
        assert!(!config.falls_back_on(&missing_file));
        assert!(!config.falls_back_on(&LoaderError::Schema("bad".to_string())));

        let disabled = DashboardConfig {
            fallback_to_sample: false,
            ..DashboardConfig::default()
        };
        assert!(!disabled.falls_back_on(&unavailable));
    }

    #[test]
    fn bad_types_are_parse_errors() {
        let err = DashboardConfig::from_toml("top_n = \"ten\"", Path::new("bad.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
        assert!(err.to_string().contains("bad.toml"));
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.toml");
        assert!(matches!(
            DashboardConfig::load(Some(&missing)),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "data_path = \"data/regs.csv\"\nfallback_to_sample = false").unwrap();

        let config = DashboardConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.data_path, PathBuf::from("data/regs.csv"));
        assert!(!config.fallback_to_sample);
        assert_eq!(config.export_dir, PathBuf::from("."));
    }
}
