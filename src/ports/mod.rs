//! Ports - Interfaces for external dependencies.
//!
//! Following hexagonal architecture, ports define the contracts between
//! the application core and the outside world. Adapters implement them.
//!
//! The only external dependency of this service is the generative language
//! model, exposed through the `ModelClient` port.

mod model_client;

pub use model_client::{
    Completion, FinishReason, GenerationRequest, ModelClient, ModelError, ModelInfo,
};
