//! Top-level router assembly (spec §4.8): one [`crate::routes::terminology_router`]
//! nested under each configured endpoint's mount path, wrapped in the
//! shared middleware stack.

use axum::response::{IntoResponse, Json};
use axum::routing::get;
use axum::Router;
use serde_json::json;

use crate::middleware;
use crate::routes::{self, EndpointPath};
use crate::state::AppState;

/// Build the full dispatcher router: `/health`, then every configured
/// endpoint's terminology routes nested under its mount path, all
/// sharing one [`AppState`].
pub fn build(state: AppState) -> Router {
    let mut router = Router::new().route("/health", get(health_check));

    for endpoint in state.all_endpoints() {
        let sub = routes::terminology_router().layer(axum::Extension(EndpointPath(endpoint.path.clone())));
        router = router.nest(&endpoint.path, sub);
    }

    router
        .with_state(state.clone())
        .layer(axum::middleware::from_fn(middleware::security_headers_middleware))
        .layer(axum::middleware::from_fn(middleware::request_id_middleware))
        .layer(axum::middleware::from_fn_with_state(
            state,
            middleware::stats_middleware,
        ))
        .layer(middleware::compression())
        .layer(middleware::cors())
}

async fn health_check() -> impl IntoResponse {
    Json(json!({"status": "ok", "service": "fhirsmith-server"}))
}
