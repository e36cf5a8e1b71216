//! Mock Model Client for testing.
//!
//! Provides a configurable mock implementation of the ModelClient port,
//! allowing tests to run without calling the real model API.
//!
//! # Features
//!
//! - Pre-configured responses, consumed in order
//! - Error injection for resilience testing
//! - Simulated latency for timing-sensitive tests
//! - Call tracking for verification
//!
//! # Example
//!
//! ```ignore
//! let client = MockModelClient::new()
//!     .with_text("property_search")
//!     .with_text("Here are three homes you might like...");
//!
//! let completion = client.complete(request).await?;
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

use crate::ports::{Completion, FinishReason, GenerationRequest, ModelClient, ModelError, ModelInfo};

/// A configured mock reply.
#[derive(Debug)]
pub enum MockReply {
    /// Return a successful completion with this text.
    Text(String),
    /// Return an error.
    Error(MockFailure),
}

/// Mock failure kinds for testing error handling.
#[derive(Debug, Clone)]
pub enum MockFailure {
    /// Simulate the provider being unavailable.
    Unavailable { message: String },
    /// Simulate rate limiting.
    RateLimited { retry_after_secs: u32 },
    /// Simulate a network error.
    Network { message: String },
    /// Simulate a timeout.
    Timeout { timeout_secs: u32 },
}

impl From<MockFailure> for ModelError {
    fn from(failure: MockFailure) -> Self {
        match failure {
            MockFailure::Unavailable { message } => ModelError::unavailable(message),
            MockFailure::RateLimited { retry_after_secs } => {
                ModelError::rate_limited(retry_after_secs)
            }
            MockFailure::Network { message } => ModelError::network(message),
            MockFailure::Timeout { timeout_secs } => ModelError::Timeout { timeout_secs },
        }
    }
}

/// Mock model client for testing.
#[derive(Clone, Default)]
pub struct MockModelClient {
    /// Pre-configured replies (consumed in order).
    replies: Arc<Mutex<VecDeque<MockReply>>>,
    /// Simulated latency per request.
    delay: Duration,
    /// Call history for verification.
    calls: Arc<Mutex<Vec<GenerationRequest>>>,
}

impl MockModelClient {
    /// Creates a new mock client with no configured replies.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a successful text reply to the queue.
    pub fn with_text(self, text: impl Into<String>) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(MockReply::Text(text.into()));
        self
    }

    /// Adds a JSON reply to the queue.
    pub fn with_json(self, value: serde_json::Value) -> Self {
        self.with_text(value.to_string())
    }

    /// Adds an error reply to the queue.
    pub fn with_failure(self, failure: MockFailure) -> Self {
        self.replies
            .lock()
            .unwrap()
            .push_back(MockReply::Error(failure));
        self
    }

    /// Sets simulated latency per request.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Returns the number of calls made to this client.
    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Returns the prompts of all recorded calls, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    /// Gets the next reply, or a default completion when exhausted.
    fn next_reply(&self) -> MockReply {
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::Text("Mock response".to_string()))
    }
}

#[async_trait]
impl ModelClient for MockModelClient {
    async fn complete(&self, request: GenerationRequest) -> Result<Completion, ModelError> {
        self.calls.lock().unwrap().push(request);

        if !self.delay.is_zero() {
            sleep(self.delay).await;
        }

        match self.next_reply() {
            MockReply::Text(text) => Ok(Completion {
                text,
                model: "mock-model-1".to_string(),
                finish_reason: FinishReason::Stop,
            }),
            MockReply::Error(failure) => Err(failure.into()),
        }
    }

    fn model_info(&self) -> ModelInfo {
        ModelInfo::new("mock", "mock-model-1")
    }
}
