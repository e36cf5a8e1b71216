//! Model provider configuration

use serde::Deserialize;
use std::time::Duration;

use super::error::ValidationError;

/// Generative model configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// Gemini API key
    pub api_key: Option<String>,

    /// Model identifier
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL for the model API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Presentational pause between a greeting and the substantive reply,
    /// in milliseconds. Zero disables it.
    #[serde(default = "default_greeting_pause")]
    pub greeting_pause_ms: u64,
}

impl ModelConfig {
    /// Get timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Get the greeting pause as Duration
    pub fn greeting_pause(&self) -> Duration {
        Duration::from_millis(self.greeting_pause_ms)
    }

    /// Check if an API key is configured
    pub fn has_api_key(&self) -> bool {
        self.api_key.as_ref().is_some_and(|k| !k.is_empty())
    }

    /// Validate model configuration
    ///
    /// A missing API key is fatal at startup, not per-request.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.has_api_key() {
            return Err(ValidationError::MissingModelApiKey);
        }
        Ok(())
    }
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: default_model(),
            base_url: default_base_url(),
            timeout_secs: default_timeout(),
            greeting_pause_ms: default_greeting_pause(),
        }
    }
}

fn default_model() -> String {
    "gemini-2.0-flash-lite".to_string()
}

fn default_base_url() -> String {
    "https://generativelanguage.googleapis.com".to_string()
}

fn default_timeout() -> u64 {
    60
}

fn default_greeting_pause() -> u64 {
    2000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_config_defaults() {
        let config = ModelConfig::default();
        assert_eq!(config.model, "gemini-2.0-flash-lite");
        assert_eq!(config.timeout(), Duration::from_secs(60));
        assert_eq!(config.greeting_pause(), Duration::from_millis(2000));
        assert!(!config.has_api_key());
    }

    #[test]
    fn test_validation_requires_api_key() {
        let config = ModelConfig::default();
        assert_eq!(config.validate(), Err(ValidationError::MissingModelApiKey));

        let config = ModelConfig {
            api_key: Some(String::new()),
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ValidationError::MissingModelApiKey));

        let config = ModelConfig {
            api_key: Some("key-123".to_string()),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
