//! Axum routes for the conversation service.
//!
//! Endpoints:
//! - `GET /health` - liveness probe
//! - `GET /welcome` - static team introduction
//! - `POST /chat` - process one user message

use axum::http::{HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::handlers::{chat, health, welcome, AppState};

/// Creates the route table without state, for composition and tests.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/welcome", get(welcome))
        .route("/chat", post(chat))
}

/// Creates the complete router with state and request tracing.
pub fn api_router(state: AppState) -> Router {
    api_routes()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Builds the CORS layer from configured origins.
///
/// Origins that fail header parsing are skipped rather than failing startup.
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    let parsed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(parsed))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([axum::http::header::CONTENT_TYPE])
}
