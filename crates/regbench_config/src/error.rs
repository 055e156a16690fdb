//! Error types for configuration loading and validation.

/// Errors that can occur when loading or validating a `regbench.toml` configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A duration field does not parse.
    #[error("invalid duration for {field}: {source}")]
    InvalidDuration {
        /// Dotted key of the offending field.
        field: &'static str,
        /// The underlying parse error.
        source: regbench_common::ParseDurationError,
    },

    /// The bus speed does not parse.
    #[error("invalid bus speed: {0}")]
    InvalidSpeed(#[from] regbench_common::ParseFrequencyError),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}
