//! Error types for the council core.
//!
//! Covers query admission, payload validation and configuration loading.
//! Stage transport failures live in `council-pipeline`, which wraps these.

use thiserror::Error;

/// Errors that can occur in core council operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The submitted question was empty or whitespace only.
    #[error("Query must not be empty")]
    EmptyQuery,

    /// A stage payload is structurally invalid.
    #[error("Invalid payload: {0}")]
    Validation(String),

    /// Configuration is missing or inconsistent.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Reading a configuration file failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A configuration file could not be parsed.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_query_display() {
        let err = CoreError::EmptyQuery;
        assert!(err.to_string().contains("empty"));
    }

    #[test]
    fn test_validation_display() {
        let err = CoreError::Validation("label 'Response C' is not mapped".to_string());
        assert!(err.to_string().contains("Response C"));
    }

    #[test]
    fn test_config_display() {
        let err = CoreError::Config("base_url is empty".to_string());
        assert!(err.to_string().contains("base_url"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "council.toml");
        let err: CoreError = io.into();
        assert!(matches!(err, CoreError::Io(_)));
        assert!(err.to_string().contains("council.toml"));
    }
}
