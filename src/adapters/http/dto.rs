//! Data transfer objects for the HTTP surface.

use serde::{Deserialize, Serialize};

use crate::domain::ConversationTurn;

/// Response body for `GET /welcome` and `POST /chat`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationResponse {
    pub conversation: Vec<ConversationTurn>,
}

impl ConversationResponse {
    pub fn new(conversation: Vec<ConversationTurn>) -> Self {
        Self { conversation }
    }
}

/// Response body for `GET /health`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

impl HealthResponse {
    pub fn healthy() -> Self {
        Self { status: "healthy" }
    }
}

/// Error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ConversationTurn;

    #[test]
    fn health_response_serializes() {
        let json = serde_json::to_string(&HealthResponse::healthy()).unwrap();
        assert_eq!(json, r#"{"status":"healthy"}"#);
    }

    #[test]
    fn error_response_serializes() {
        let json = serde_json::to_string(&ErrorResponse::new("No message provided")).unwrap();
        assert_eq!(json, r#"{"error":"No message provided"}"#);
    }

    #[test]
    fn conversation_response_wraps_turns() {
        let response = ConversationResponse::new(vec![ConversationTurn::user("hi")]);
        let value = serde_json::to_value(&response).unwrap();
        assert!(value["conversation"].is_array());
        assert_eq!(value["conversation"][0]["message"], "hi");
    }
}
