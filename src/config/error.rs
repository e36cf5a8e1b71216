//! Configuration error types.

/// Errors raised while loading configuration from the environment.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The underlying loader failed (missing variable, bad type).
    #[error("configuration error: {0}")]
    Load(#[from] config::ConfigError),
}

/// Errors raised by semantic validation of loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The model API key is absent; the service cannot start without it.
    #[error("GEMINI_API_KEY is not set; the model client cannot start")]
    MissingModelApiKey,

    /// The server port is zero.
    #[error("server port must be non-zero")]
    InvalidPort,

    /// The request timeout is out of range.
    #[error("request timeout must be between 1 and 300 seconds")]
    InvalidTimeout,
}
