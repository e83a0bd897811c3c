//! End-to-end dispatcher tests (spec §4.8): build a real `AppState`
//! with zero configured endpoints (no package fetch needed), run the
//! assembled router through `tower::ServiceExt::oneshot`, and check the
//! ambient routes every endpoint gets for free: `/health`, CORS
//! preflight, and the `X-Request-Id` header stamped by the middleware
//! stack.

use http_body_util::BodyExt;
use tower::ServiceExt;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};

use fhirsmith_server::config::{CacheConfig, Config, LoggingConfig};
use fhirsmith_server::{router, AppState};

async fn test_state() -> (tempfile::TempDir, AppState) {
    let dir = tempfile::tempdir().unwrap();
    let config = Config {
        listen_addr: "127.0.0.1:0".parse().unwrap(),
        data_dir: Some(dir.path().to_path_buf()),
        servers: vec![],
        endpoints: vec![],
        cache: CacheConfig {
            resource_cache_timeout_secs: 1800,
            expansion_cache_capacity: 100,
            expansion_cache_memory_mb: None,
        },
        logging: LoggingConfig {
            json: false,
            level: "info".to_string(),
        },
    };
    let state = AppState::new(config).await.expect("app state");
    (dir, state)
}

#[tokio::test]
async fn health_check_returns_ok_with_request_id() {
    let (_dir, state) = test_state().await;
    let app = router::build(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(response.headers().get("x-request-id").is_some());

    let body = response.into_body().collect().await.unwrap().to_bytes();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn cors_preflight_is_permissive_on_every_route() {
    let (_dir, state) = test_state().await;
    let app = router::build(state);

    let response = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/health")
                .header("origin", "https://example.org")
                .header("access-control-request-method", "GET")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert!(response.headers().get("access-control-allow-origin").is_some());
}

#[tokio::test]
async fn unconfigured_endpoint_path_is_not_found() {
    let (_dir, state) = test_state().await;
    let app = router::build(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/r4/CodeSystem")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
