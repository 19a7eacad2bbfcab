//! Errors raised while locating, parsing or validating configuration.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A single setting holds an unusable value
    #[error("Invalid setting `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("Environment variable error: {0}")]
    EnvVarError(String),

    /// Two options that cannot be combined were both given
    #[error("Conflicting options: {0}")]
    MutualExclusivityError(String),

    #[error(transparent)]
    Other(#[from] config::ConfigError),
}

impl ConfigError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        ConfigError::ValidationError {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn file_not_found(path: impl Into<String>) -> Self {
        ConfigError::FileNotFound(path.into())
    }

    pub fn mutual_exclusivity(message: impl Into<String>) -> Self {
        ConfigError::MutualExclusivityError(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ConfigError::validation("server.port", "must be greater than 0");
        assert_eq!(err.to_string(), "Invalid setting `server.port`: must be greater than 0");
    }

    #[test]
    fn test_mutual_exclusivity_display() {
        let err = ConfigError::mutual_exclusivity("--config and --config-dir");
        assert!(err.to_string().contains("--config and --config-dir"));
    }
}
