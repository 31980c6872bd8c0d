//! OpenAPI document for the HTTP API.

use utoipa::OpenApi;

use super::handlers::{self, ErrorResponse, HealthResponse, NumbersResponse, ReadyResponse};

/// Path serving the generated document.
pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(
        title = "sorted-numbers",
        description = "Store integers and read back every stored integer in ascending order"
    ),
    paths(handlers::add_number, handlers::health, handlers::ready),
    components(schemas(NumbersResponse, ErrorResponse, HealthResponse, ReadyResponse)),
    tags(
        (name = "numbers", description = "Insert-and-list operation"),
        (name = "health", description = "Liveness and readiness checks")
    )
)]
pub struct ApiDoc;
