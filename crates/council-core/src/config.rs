//! Configuration types for the council evaluator.
//!
//! Loaded from TOML, then overridden by environment variables, then by
//! command-line flags (the CLI applies the last layer).

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::Result;

/// Environment variable overriding [`BackendConfig::base_url`].
pub const ENV_BACKEND_URL: &str = "COUNCIL_BACKEND_URL";

/// Environment variable overriding [`BackendConfig::timeout_secs`].
pub const ENV_TIMEOUT_SECS: &str = "COUNCIL_TIMEOUT_SECS";

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CouncilConfig {
    /// Evaluation backend connection.
    pub backend: BackendConfig,

    /// Log output.
    pub logging: LoggingConfig,
}

/// Evaluation backend connection settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the backend, without a trailing path.
    pub base_url: String,

    /// Per-request timeout in seconds. `0` disables the timeout.
    pub timeout_secs: u64,

    /// User-Agent header sent with every request.
    pub user_agent: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8001".to_string(),
            timeout_secs: 120,
            user_agent: concat!("council-eval/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl BackendConfig {
    /// The request timeout, if one is configured.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

/// Log output settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default `tracing` filter directive when `RUST_LOG` is unset.
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl CouncilConfig {
    /// Parses configuration from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    /// Loads configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml_str(&text)
    }

    /// Loads configuration from `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "config file not found, using defaults");
            Ok(Self::default())
        }
    }

    /// Applies `COUNCIL_*` environment overrides.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary variable source.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_BACKEND_URL) {
            self.backend.base_url = url;
        }
        if let Some(raw) = lookup(ENV_TIMEOUT_SECS) {
            self.backend.timeout_secs = raw.trim().parse().map_err(|_| {
                CoreError::Config(format!("{ENV_TIMEOUT_SECS} must be a whole number, got '{raw}'"))
            })?;
        }
        Ok(())
    }

    /// Checks the configuration for values that cannot work.
    pub fn validate(&self) -> Result<()> {
        let url = self.backend.base_url.trim();
        if url.is_empty() {
            return Err(CoreError::Config("backend.base_url is empty".to_string()));
        }
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(CoreError::Config(format!(
                "backend.base_url must start with http:// or https://, got '{url}'"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = CouncilConfig::default();
        assert_eq!(config.backend.base_url, "http://localhost:8001");
        assert_eq!(config.backend.timeout(), Some(Duration::from_secs(120)));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = CouncilConfig::from_toml_str(
            r#"
            [backend]
            base_url = "https://council.example.com"
            "#,
        )
        .unwrap();
        assert_eq!(config.backend.base_url, "https://council.example.com");
        assert_eq!(config.backend.timeout_secs, 120);
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = CouncilConfig::from_toml_str("[backend]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.backend.timeout(), None);
    }

    #[test]
    fn test_bad_toml_rejected() {
        let err = CouncilConfig::from_toml_str("[backend]\ntimeout_secs = \"soon\"\n").unwrap_err();
        assert!(matches!(err, CoreError::Toml(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[logging]\nlevel = \"council_pipeline=debug\"").unwrap();

        let config = CouncilConfig::load(file.path()).unwrap();
        assert_eq!(config.logging.level, "council_pipeline=debug");
    }

    #[test]
    fn test_load_or_default_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = CouncilConfig::load_or_default(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, CouncilConfig::default());
    }

    #[test]
    fn test_overrides() {
        let mut config = CouncilConfig::default();
        config
            .apply_overrides(|key| match key {
                ENV_BACKEND_URL => Some("http://10.0.0.2:9000".to_string()),
                ENV_TIMEOUT_SECS => Some("15".to_string()),
                _ => None,
            })
            .unwrap();
        assert_eq!(config.backend.base_url, "http://10.0.0.2:9000");
        assert_eq!(config.backend.timeout_secs, 15);
    }

    #[test]
    fn test_bad_timeout_override() {
        let mut config = CouncilConfig::default();
        let err = config
            .apply_overrides(|key| (key == ENV_TIMEOUT_SECS).then(|| "later".to_string()))
            .unwrap_err();
        assert!(err.to_string().contains(ENV_TIMEOUT_SECS));
    }

    #[test]
    fn test_validate_rejects_bad_url() {
        let mut config = CouncilConfig::default();
        config.backend.base_url = "localhost:8001".to_string();
        assert!(config.validate().is_err());

        config.backend.base_url = "  ".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization() {
        let config = CouncilConfig::default();
        let text = toml::to_string(&config).unwrap();
        let parsed = CouncilConfig::from_toml_str(&text).unwrap();
        assert_eq!(parsed, config);
    }
}
