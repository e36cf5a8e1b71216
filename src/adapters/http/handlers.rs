//! HTTP handlers for the conversation endpoints.
//!
//! These handlers connect Axum routes to the orchestrator. Model failures
//! never surface here - the orchestrator degrades them into clarification
//! turns - so the only error statuses are the two documented ones: 400 for a
//! missing message and 500 for an unexpected internal failure.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Json, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::Value;

use crate::application::Orchestrator;

use super::dto::{ConversationResponse, ErrorResponse, HealthResponse};

/// Shared application state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
}

impl AppState {
    pub fn new(orchestrator: Arc<Orchestrator>) -> Self {
        Self { orchestrator }
    }
}

/// GET /health - liveness probe; never consults the model.
pub async fn health() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse::healthy()))
}

/// GET /welcome - the static team introduction.
pub async fn welcome(State(state): State<AppState>) -> impl IntoResponse {
    let conversation = state.orchestrator.welcome();
    (StatusCode::OK, Json(ConversationResponse::new(conversation)))
}

/// POST /chat - process one user message.
///
/// # Errors
/// - 400 Bad Request: body is not JSON or carries no `message` string
/// - 500 Internal Server Error: unexpected failure outside the recovery path
pub async fn chat(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(body) = payload.map_err(|_| ApiError::BadRequest("No message provided"))?;

    let message = body
        .get("message")
        .and_then(Value::as_str)
        .ok_or(ApiError::BadRequest("No message provided"))?;

    tracing::info!("processing chat request");
    let conversation = state.orchestrator.process(message).await;

    Ok((StatusCode::OK, Json(ConversationResponse::new(conversation))))
}

/// API error type that converts to the documented HTTP responses.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(&'static str),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let (status, error) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            ApiError::Internal(msg) => {
                tracing::error!("internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("Failed to process your request"),
                )
            }
        };

        (status, Json(error)).into_response()
    }
}
