//! HTTP API module for the numbers endpoint, health checks, metrics and docs.

pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;

pub use error::ApiError;
pub use handlers::{AppState, ErrorResponse, NumbersResponse};
pub use routes::create_router;
