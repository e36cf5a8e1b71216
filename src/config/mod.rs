//! Application configuration module
//!
//! Type-safe configuration loading from environment variables using the
//! `config` and `dotenvy` crates. Values are read with the `ESTATE_DESK`
//! prefix and `__` as the nesting separator; the model API key is also
//! accepted from the bare `GEMINI_API_KEY` variable, which is the deployment
//! contract this service has always had.
//!
//! # Example
//!
//! ```no_run
//! use estate_desk::config::AppConfig;
//!
//! let config = AppConfig::load().expect("Failed to load configuration");
//! config.validate().expect("Invalid configuration");
//!
//! println!("Server running on {}", config.server.socket_addr());
//! ```

mod error;
mod model;
mod server;

pub use error::{ConfigError, ValidationError};
pub use model::ModelConfig;
pub use server::ServerConfig;

use serde::Deserialize;

/// Orchestration strategy selection.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OrchestratorMode {
    /// Classify each request and route it to one specialist.
    #[default]
    Dispatch,
    /// Run the whole specialist team over every request.
    Pipeline,
}

/// Root application configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AppConfig {
    /// Server configuration (host, port, CORS)
    #[serde(default)]
    pub server: ServerConfig,

    /// Generative model configuration
    #[serde(default)]
    pub model: ModelConfig,

    /// Orchestration strategy
    #[serde(default)]
    pub orchestrator_mode: OrchestratorMode,
}

impl AppConfig {
    /// Load configuration from environment variables
    ///
    /// This function:
    /// 1. Loads `.env` if present (for development)
    /// 2. Reads environment variables with the `ESTATE_DESK` prefix
    ///    (`ESTATE_DESK__SERVER__PORT=5000` -> `server.port = 5000`)
    /// 3. Falls back to the bare `GEMINI_API_KEY` variable for the model key
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if values cannot be parsed into expected types.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let mut config: AppConfig = config::Config::builder()
            .add_source(
                config::Environment::default()
                    .prefix("ESTATE_DESK")
                    .separator("__"),
            )
            .build()?
            .try_deserialize()?;

        if !config.model.has_api_key() {
            if let Ok(key) = std::env::var("GEMINI_API_KEY") {
                config.model.api_key = Some(key);
            }
        }

        Ok(config)
    }

    /// Validate all configuration values
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if any value is invalid. A missing model
    /// API key is fatal here, at startup, never per-request.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.server.validate()?;
        self.model.validate()?;
        Ok(())
    }
}
