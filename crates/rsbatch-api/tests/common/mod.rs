//! Shared test utilities for rsbatch API tests.
//!
//! Provides an in-process upstream service and request helpers used across
//! the integration suites.

// Allow dead_code because helpers are used across different test files,
// but each test file is compiled as its own crate.
#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Path, RawQuery},
    http::{header, HeaderMap, Request, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower::ServiceExt;

use rsbatch_api::adapters::RouterDispatcher;
use rsbatch_api::http::{create_router, create_router_with_config, AppState, RouterConfig};
use rsbatch_server::BatchHandlerConfig;

// =============================================================================
// Test Constants
// =============================================================================

/// Number of concurrent batches for concurrency tests.
pub const CONCURRENT_BATCH_COUNT: usize = 50;

/// Artificial latency of the upstream `/slow` route.
pub const SLOW_ROUTE_DELAY: Duration = Duration::from_millis(100);

// =============================================================================
// Upstream Service
// =============================================================================

/// Counts hits on the upstream so tests can assert how often it was called.
#[derive(Clone, Default)]
pub struct UpstreamHits(Arc<AtomicUsize>);

impl UpstreamHits {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }

    fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Builds the upstream service that sub-requests are dispatched to.
///
/// Routes:
/// - `GET /users/me` returns a user with `id` 42
/// - `GET /users/:id/profile` returns a profile for `id`
/// - `GET /emails/me` returns a value unsafe to embed in a path
/// - `GET /search` echoes its raw query string
/// - `POST /items` echoes its JSON body with 201
/// - `POST /items/legacy` redirects to `/items` with 307
/// - `GET /old-me` redirects to `/users/me` with 301
/// - `GET /elsewhere` redirects to a scheme-relative `//evil.example/users/me`
/// - `GET /loop` always redirects to itself
/// - `GET /bare-redirect` answers 302 without a Location
/// - `GET /status/:code` answers with the given status
/// - `GET /whoami` echoes the forwarded identity headers
/// - `GET /slow` answers after [`SLOW_ROUTE_DELAY`]
pub fn upstream(hits: UpstreamHits) -> Router {
    let counted = |hits: UpstreamHits| {
        move |request: axum::extract::Request, next: axum::middleware::Next| {
            let hits = hits.clone();
            async move {
                hits.bump();
                next.run(request).await
            }
        }
    };

    Router::new()
        .route(
            "/users/me",
            get(|| async { Json(json!({"id": "42", "name": "alice", "team": {"id": "t_7"}})) }),
        )
        .route(
            "/users/:id/profile",
            get(|Path(id): Path<String>| async move {
                Json(json!({"userId": id, "bio": "hello"}))
            }),
        )
        .route(
            "/emails/me",
            get(|| async { Json(json!({"email": "alice@example.com"})) }),
        )
        .route(
            "/search",
            get(|RawQuery(query): RawQuery| async move { Json(json!({"query": query})) }),
        )
        .route(
            "/items",
            post(|Json(body): Json<Value>| async move {
                (StatusCode::CREATED, Json(json!({"created": body})))
            }),
        )
        .route(
            "/items/legacy",
            post(|| async {
                (StatusCode::TEMPORARY_REDIRECT, [(header::LOCATION, "/items")]).into_response()
            }),
        )
        .route(
            "/old-me",
            get(|| async {
                (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, "/users/me")]).into_response()
            }),
        )
        .route(
            "/elsewhere",
            get(|| async {
                (StatusCode::FOUND, [(header::LOCATION, "//evil.example/users/me")])
                    .into_response()
            }),
        )
        .route(
            "/loop",
            get(|| async { (StatusCode::FOUND, [(header::LOCATION, "/loop")]).into_response() }),
        )
        .route("/bare-redirect", get(|| async { StatusCode::FOUND }))
        .route(
            "/status/:code",
            get(|Path(code): Path<u16>| async move {
                let status = StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, Json(json!({"status": code})))
            }),
        )
        .route(
            "/whoami",
            get(|headers: HeaderMap| async move {
                let read = |name: &str| {
                    headers
                        .get(name)
                        .and_then(|v| v.to_str().ok())
                        .map(str::to_string)
                };
                Json(json!({
                    "authorization": read("authorization"),
                    "requestId": read("x-request-id"),
                    "contentType": read("content-type"),
                }))
            }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(SLOW_ROUTE_DELAY).await;
                Json(json!({"slow": true}))
            }),
        )
        .layer(axum::middleware::from_fn(counted(hits)))
}

// =============================================================================
// App Construction
// =============================================================================

/// Create a batch app dispatching into a fresh upstream.
pub fn create_test_app() -> Router {
    create_test_app_with_hits(UpstreamHits::default())
}

/// Create a batch app whose upstream counts hits into `hits`.
pub fn create_test_app_with_hits(hits: UpstreamHits) -> Router {
    let dispatcher = RouterDispatcher::new(upstream(hits));
    create_router(AppState::new(Arc::new(dispatcher)))
}

/// Create a batch app with a custom maximum batch size.
pub fn create_test_app_with_max_batch_size(max_batch_size: usize) -> Router {
    let dispatcher = RouterDispatcher::new(upstream(UpstreamHits::default()));
    let state = AppState::with_config(Arc::new(dispatcher), BatchHandlerConfig { max_batch_size });
    create_router_with_config(state, RouterConfig::default())
}

// =============================================================================
// Request Helpers
// =============================================================================

/// Make a JSON POST request and return status + parsed JSON response.
pub async fn post_json(app: Router, uri: &str, body: Value) -> (StatusCode, Value) {
    post_with_headers(app, uri, body, &[]).await
}

/// Make a JSON POST request with extra headers.
pub async fn post_with_headers(
    app: Router,
    uri: &str,
    body: Value,
    headers: &[(&str, &str)],
) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }

    let response = app
        .oneshot(
            builder
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();

    read_json(response).await
}

/// Make a raw POST request with a string body.
pub async fn post_raw(app: Router, uri: &str, body: &str) -> (StatusCode, Value) {
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();

    read_json(response).await
}

async fn read_json(response: axum::response::Response) -> (StatusCode, Value) {
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if body.is_empty() {
        json!({})
    } else {
        serde_json::from_slice(&body).unwrap_or_else(|_| {
            json!({ "raw_body": String::from_utf8_lossy(&body).to_string() })
        })
    };
    (status, json)
}
