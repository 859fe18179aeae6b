//! Error types for configuration loading and report writing.
//!
//! A failing conformance run is not an error: it is a
//! [`Verdict::Fail`](crate::harness::Verdict) carrying a
//! [`Failure`](crate::harness::Failure).

/// Errors that can occur when loading or validating a harness configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// An I/O error occurred while reading the configuration file.
    #[error("failed to read configuration: {0}")]
    IoError(#[from] std::io::Error),

    /// The TOML content could not be parsed.
    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    /// A configuration value failed validation.
    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Errors raised by the harness outside of the verdict itself.
#[derive(Debug, thiserror::Error)]
pub enum HarnessError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to write report: {0}")]
    Report(String),

    #[error("failed to create report file: {0}")]
    Io(#[from] std::io::Error),
}
