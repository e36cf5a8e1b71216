//! HTTP adapter - the REST surface of the service.

pub mod dto;
pub mod handlers;
pub mod routes;

pub use handlers::{ApiError, AppState};
pub use routes::{api_router, api_routes, cors_layer};
