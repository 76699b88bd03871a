use std::path::PathBuf;
use thiserror::Error;

/// Main error type for kwild
#[derive(Error, Debug)]
pub enum KwildError {
    /// A regular expression in the filter failed to compile
    #[error("Invalid {context} pattern '{pattern}': {source}")]
    InvalidPattern {
        context: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },

    /// A filter string does not follow its expected grammar
    #[error("Invalid {context} '{input}': {message}")]
    InvalidFilterSyntax {
        context: String,
        input: String,
        message: String,
    },

    /// Resource discovery failed
    #[error("Discovery error: {0}")]
    Discovery(String),

    /// Delete matched more items than the configured threshold
    #[error("Matched {matched} items which exceeds confirm threshold {threshold}; use --yes to force")]
    ConfirmThresholdExceeded { matched: usize, threshold: usize },

    /// Configuration related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Configuration validation errors
    #[error("Configuration validation failed: {errors:?}")]
    ConfigValidation { errors: Vec<ValidationError> },

    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    /// Invalid configuration value
    #[error("Invalid configuration value at {path}: {message}")]
    InvalidConfigValue { path: String, message: String },

    /// IO errors
    #[error("IO error: {context}: {source}")]
    Io {
        source: std::io::Error,
        context: String,
    },

    /// TOML deserialization errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialization(#[from] toml::ser::Error),

    /// JSON errors
    #[error("JSON error: {context}: {source}")]
    Json {
        source: serde_json::Error,
        context: String,
    },

    /// Generic errors
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl KwildError {
    pub(crate) fn invalid_pattern(
        context: impl Into<String>,
        pattern: impl Into<String>,
        source: regex::Error,
    ) -> Self {
        Self::InvalidPattern {
            context: context.into(),
            pattern: pattern.into(),
            source,
        }
    }

    pub(crate) fn invalid_syntax(
        context: impl Into<String>,
        input: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::InvalidFilterSyntax {
            context: context.into(),
            input: input.into(),
            message: message.into(),
        }
    }
}

/// Configuration validation error
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Path to the configuration key that failed validation
    pub path: String,
    /// Error message describing the validation failure
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Result type for kwild operations
pub type Result<T> = std::result::Result<T, KwildError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_pattern_message() {
        let source = regex::Regex::new("(").unwrap_err();
        let err = KwildError::invalid_pattern("namespace regex", "(", source);
        let msg = err.to_string();
        assert!(msg.starts_with("Invalid namespace regex pattern '('"));
    }

    #[test]
    fn test_invalid_syntax_message() {
        let err = KwildError::invalid_syntax("label filter", "app", "expected key=value");
        assert_eq!(
            err.to_string(),
            "Invalid label filter 'app': expected key=value"
        );
    }
}
