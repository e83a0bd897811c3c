//! Request-scoped middleware (spec §4.8): a request id on every
//! request/response, permissive CORS, and baseline security headers.
//! Simplified from the generic store's version: no OpenTelemetry trace
//! context, since this service has no collector to report spans to.

use std::time::Instant;

use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::Response,
};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tracing::Span;
use uuid::Uuid;

use crate::stats::operation_name;
use crate::state::AppState;

/// Request id carried in request extensions for handlers to read back
/// (e.g. to echo it into an `OperationOutcome`).
#[derive(Debug, Clone)]
pub struct RequestId(pub String);

/// Terminology endpoints are read-only public lookups with no cookie-based
/// session, so CORS defaults to permissive here rather than the generic
/// store's closed-unless-configured posture.
pub fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Expansions and search bundles can run large; compress them the same
/// way the generic store does for its own JSON responses.
pub fn compression() -> CompressionLayer {
    CompressionLayer::new()
}

#[tracing::instrument(
    name = "http_request",
    skip_all,
    fields(
        http.method = %req.method(),
        http.route = %req.uri().path(),
        http.response.status_code = tracing::field::Empty,
        request_id = tracing::field::Empty,
    )
)]
pub async fn request_id_middleware(req: Request, next: Next) -> Response {
    let current_span = Span::current();
    let start = Instant::now();

    let client_id = req
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from);

    let request_id = client_id.clone().unwrap_or_else(|| Uuid::new_v4().to_string());
    current_span.record("request_id", &request_id);

    let mut req = req;
    req.extensions_mut().insert(RequestId(request_id.clone()));

    let path = req.uri().path().to_string();
    let method = req.method().clone();

    let mut response = next.run(req).await;

    let status = response.status();
    current_span.record("http.response.status_code", status.as_u16());
    tracing::info!(
        method = %method,
        path = %path,
        status = %status.as_u16(),
        duration_ms = start.elapsed().as_millis(),
        request_id = %request_id,
        "request completed"
    );

    if let Ok(value) = HeaderValue::from_str(&request_id) {
        response.headers_mut().insert("x-request-id", value);
    }

    response
}

/// Counts every request against the endpoint's per-operation statistics
/// (spec §4.8 step 4), keyed by a name derived from the request's
/// method and path tail (spec: "operation name, latency").
pub async fn stats_middleware(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let start = Instant::now();
    let response = next.run(req).await;
    state.stats.record(&operation_name(&method, &path), start.elapsed());
    response
}

pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let is_https = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok())
        .map(|v| v.eq_ignore_ascii_case("https"))
        .unwrap_or(false);

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    headers.insert("x-content-type-options", HeaderValue::from_static("nosniff"));
    headers.insert("x-frame-options", HeaderValue::from_static("DENY"));
    headers.insert("referrer-policy", HeaderValue::from_static("no-referrer"));
    headers.insert(
        "cross-origin-resource-policy",
        HeaderValue::from_static("cross-origin"),
    );

    if is_https {
        headers.insert(
            "strict-transport-security",
            HeaderValue::from_static("max-age=31536000; includeSubDomains"),
        );
    }

    response
}
