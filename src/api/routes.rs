//! HTTP API route definitions.

use std::time::Duration;

use axum::routing::{get, post};
use axum::Router;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{add_number, health, ready, render_metrics, AppState};
use super::openapi::{ApiDoc, OPENAPI_PATH};

/// Create the API router.
///
/// Every request is bounded by `request_timeout`; on expiry the handler is
/// dropped and the client gets 408.
pub fn create_router(state: AppState, request_timeout: Duration) -> Router {
    Router::new()
        // Numbers endpoint
        .route("/numbers", post(add_number))
        // Health endpoints
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/metrics", get(render_metrics))
        .with_state(state)
        .merge(SwaggerUi::new("/swagger-ui").url(OPENAPI_PATH, ApiDoc::openapi()))
        .layer(TimeoutLayer::new(request_timeout))
        .layer(TraceLayer::new_for_http())
}
