//! HTTP API handlers.

use std::fmt;
use std::sync::Arc;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::{Deserialize, Serialize};
use tracing::debug;
use utoipa::{IntoParams, ToSchema};

use crate::metrics;
use crate::store::NumberStore;

use super::error::ApiError;

/// Application state shared with handlers.
#[derive(Clone)]
pub struct AppState {
    /// Backing store for the numbers endpoint.
    pub store: Arc<dyn NumberStore>,
    /// Prometheus handle, when a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

impl AppState {
    /// Create new app state without a metrics endpoint.
    pub fn new(store: Arc<dyn NumberStore>) -> Self {
        Self {
            store,
            metrics: None,
        }
    }

    /// Expose `handle` on `/metrics`.
    pub fn with_metrics(mut self, handle: PrometheusHandle) -> Self {
        self.metrics = Some(handle);
        self
    }
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState")
            .field("store", &self.store)
            .field("metrics", &self.metrics.is_some())
            .finish()
    }
}

/// Query parameters of `POST /numbers`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct AddNumberParams {
    /// Integer to store.
    pub number: i32,
}

/// Every stored value in ascending order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct NumbersResponse {
    pub numbers: Vec<i32>,
}

/// Error body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable message wrapping the underlying cause.
    pub error: String,
}

/// Health check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Status: "ok".
    #[schema(value_type = String)]
    pub status: &'static str,
}

/// Readiness check response.
#[derive(Debug, Serialize, ToSchema)]
pub struct ReadyResponse {
    /// Whether the store answered a ping.
    pub ready: bool,
    /// Ping failure, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Store `number`, then read back every stored value in ascending order.
///
/// The insert and the read are separate statements. If the read fails the
/// insert stays committed and the caller still gets an error.
pub async fn store_and_list(store: &dyn NumberStore, number: i32) -> Result<Vec<i32>, ApiError> {
    let record = store.insert(number).await.map_err(|e| {
        metrics::inc_store_errors("insert");
        ApiError::Insert(e)
    })?;
    metrics::inc_numbers_inserted();
    debug!(id = %record.id, number, "Stored number");

    let records = store.list_sorted().await.map_err(|e| {
        metrics::inc_store_errors("list");
        ApiError::List(e)
    })?;

    Ok(records.into_iter().map(|r| r.value).collect())
}

/// Add a number and return all stored numbers sorted ascending.
#[utoipa::path(
    post,
    path = "/numbers",
    tag = "numbers",
    params(AddNumberParams),
    responses(
        (status = 200, description = "Number stored; all numbers sorted ascending", body = NumbersResponse),
        (status = 400, description = "Missing or malformed number", body = ErrorResponse),
        (status = 500, description = "Store failure", body = ErrorResponse)
    )
)]
pub async fn add_number(
    State(state): State<AppState>,
    params: Result<Query<AddNumberParams>, QueryRejection>,
) -> Result<Json<NumbersResponse>, ApiError> {
    let _timer = metrics::timer_add_number();

    let Query(params) = params.map_err(|e| ApiError::InvalidParams(e.body_text()))?;
    let numbers = store_and_list(state.store.as_ref(), params.number).await?;

    Ok(Json(NumbersResponse { numbers }))
}

/// Health check handler - always returns 200.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Process is up", body = HealthResponse))
)]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// Readiness check handler - returns 200 if the store answers, 503 otherwise.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "health",
    responses(
        (status = 200, description = "Store reachable", body = ReadyResponse),
        (status = 503, description = "Store unreachable", body = ReadyResponse)
    )
)]
pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                ready: true,
                error: None,
            }),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyResponse {
                ready: false,
                error: Some(e.to_string()),
            }),
        ),
    }
}

/// Prometheus exposition, 404 when no recorder is installed.
pub async fn render_metrics(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => handle.render().into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}
