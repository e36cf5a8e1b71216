//! Model Client Port - Interface for generative language model integrations.
//!
//! This port abstracts the text-completion service the agents prompt against,
//! so orchestration and agent logic never couple to a specific provider API.
//!
//! # Design
//!
//! - Single-shot, non-streaming completions (the conversation surface never
//!   streams partial agent output)
//! - Provider-agnostic request/response types
//! - Error taxonomy for the common failure modes (auth, rate limit, network)
//! - No retry contract: a failed call surfaces immediately to the caller
//!
//! # Example
//!
//! ```ignore
//! use async_trait::async_trait;
//!
//! struct EchoClient;
//!
//! #[async_trait]
//! impl ModelClient for EchoClient {
//!     async fn complete(&self, request: GenerationRequest) -> Result<Completion, ModelError> {
//!         Ok(Completion {
//!             text: request.prompt,
//!             model: "echo".to_string(),
//!             finish_reason: FinishReason::Stop,
//!         })
//!     }
//!     // ... other methods
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for generative language model interactions.
///
/// Implementations connect to an external model service (or a test double)
/// and translate between the provider-specific API and these types.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate a single completion for the given request.
    async fn complete(&self, request: GenerationRequest) -> Result<Completion, ModelError>;

    /// Get model information (provider name, model id).
    fn model_info(&self) -> ModelInfo;
}

/// Request for a model completion.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// The full prompt text, persona and context already rendered in.
    pub prompt: String,
    /// Temperature for response randomness.
    pub temperature: Option<f32>,
    /// Maximum tokens to generate.
    pub max_output_tokens: Option<u32>,
}

impl GenerationRequest {
    /// Creates a request from a prompt, with provider defaults for the rest.
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: None,
            max_output_tokens: None,
        }
    }

    /// Sets the temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Sets the maximum tokens to generate.
    pub fn with_max_output_tokens(mut self, max: u32) -> Self {
        self.max_output_tokens = Some(max);
        self
    }
}

/// Response from a model completion.
#[derive(Debug, Clone)]
pub struct Completion {
    /// Generated text.
    pub text: String,
    /// Model that generated the response.
    pub model: String,
    /// Why the model stopped generating.
    pub finish_reason: FinishReason,
}

/// Reason the model stopped generating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    /// Natural stop (end of response).
    Stop,
    /// Hit the output token limit.
    Length,
    /// Content was filtered for safety.
    Safety,
    /// Provider reported some other terminal condition.
    Other,
}

/// Model provider information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfo {
    /// Provider name (e.g., "gemini", "mock").
    pub name: String,
    /// Model identifier (e.g., "gemini-2.0-flash-lite").
    pub model: String,
}

impl ModelInfo {
    /// Creates new model info.
    pub fn new(name: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: model.into(),
        }
    }
}

/// Model service errors.
///
/// These are the "service" failures of the system: they abort the agent chain
/// that issued the call and are only recovered at the orchestrator boundary.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Rate limited by the provider.
    #[error("rate limited: retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds until retry is allowed.
        retry_after_secs: u32,
    },

    /// Provider is unavailable.
    #[error("model unavailable: {message}")]
    Unavailable {
        /// Error details.
        message: String,
    },

    /// API key or authentication failed.
    #[error("authentication failed")]
    AuthenticationFailed,

    /// Network error during the request.
    #[error("network error: {0}")]
    Network(String),

    /// Failed to parse the provider response envelope.
    #[error("parse error: {0}")]
    Parse(String),

    /// Invalid request configuration.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Request timed out.
    #[error("request timed out after {timeout_secs}s")]
    Timeout {
        /// Configured timeout.
        timeout_secs: u32,
    },
}

impl ModelError {
    /// Creates a rate limited error.
    pub fn rate_limited(retry_after_secs: u32) -> Self {
        Self::RateLimited { retry_after_secs }
    }

    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable {
            message: message.into(),
        }
    }

    /// Creates a network error.
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network(message.into())
    }

    /// Creates a parse error.
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }
}
