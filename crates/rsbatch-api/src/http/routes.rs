//! HTTP route definitions and handlers.

use std::time::Instant;

use axum::{
    async_trait,
    extract::{FromRequest, Request, State},
    http::{HeaderMap, Method, StatusCode},
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::error;

use rsbatch_domain::error::DispatchError;
use rsbatch_domain::{Dispatcher, FailureCode};
use rsbatch_server::config::BatchSettings;
use rsbatch_server::handlers::batch::{
    BatchError, BatchRequest, BatchResponse, BatchResult, SubRequest,
};

use super::state::AppState;
use crate::middleware::{RequestIdLayer, RequestTraceLayer};
use crate::observability::{batch_outcome, metrics_handler, record_batch_request, MetricsState};

/// Custom JSON extractor that returns 400 Bad Request instead of 422 Unprocessable Entity
/// for deserialization errors.
///
/// Preserves 413 Payload Too Large for body limit errors.
pub struct JsonBadRequest<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonBadRequest<T>
where
    T: serde::de::DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(JsonBadRequest(value)),
            Err(rejection) => {
                use axum::extract::rejection::JsonRejection;

                // Body limit errors surface as a BytesRejection carrying 413
                let too_large = matches!(rejection, JsonRejection::BytesRejection(_))
                    && rejection.status() == StatusCode::PAYLOAD_TOO_LARGE;

                let message = rejection.body_text();
                Err(if too_large {
                    ApiError::new(error_codes::PAYLOAD_TOO_LARGE, message)
                } else {
                    ApiError::validation_error(message)
                })
            }
        }
    }
}

/// Default request body size limit (1MB).
pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Default path of the batch endpoint.
pub const DEFAULT_BATCH_ENDPOINT: &str = "/batch";

/// Where the batch endpoint is mounted and how large its bodies may be.
#[derive(Debug, Clone, PartialEq)]
pub struct RouterConfig {
    pub endpoint: String,
    pub body_limit: usize,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_BATCH_ENDPOINT.to_string(),
            body_limit: DEFAULT_BODY_LIMIT,
        }
    }
}

impl From<&BatchSettings> for RouterConfig {
    fn from(settings: &BatchSettings) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            body_limit: settings.body_limit_bytes,
        }
    }
}

fn batch_routes<D: Dispatcher + 'static>(state: AppState<D>, config: &RouterConfig) -> Router {
    Router::new()
        .route(&config.endpoint, post(execute_batch::<D>))
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(config.body_limit))
}

fn with_middleware(router: Router) -> Router {
    // Last layer is outermost: request IDs exist before the trace span opens
    router
        .layer(RequestTraceLayer::new())
        .layer(RequestIdLayer::new())
}

/// Creates the HTTP router with the batch endpoint at `/batch`.
pub fn create_router<D: Dispatcher + 'static>(state: AppState<D>) -> Router {
    create_router_with_config(state, RouterConfig::default())
}

/// Creates the HTTP router with a custom endpoint path and body limit.
pub fn create_router_with_config<D: Dispatcher + 'static>(
    state: AppState<D>,
    config: RouterConfig,
) -> Router {
    let router = batch_routes(state, &config).route("/health", get(health_check));
    with_middleware(router)
}

/// Creates the HTTP router with the batch endpoint plus `/health` and `/metrics`.
///
/// The body limit applies to the batch endpoint only.
pub fn create_router_with_observability<D: Dispatcher + 'static>(
    state: AppState<D>,
    metrics_state: MetricsState,
    config: RouterConfig,
) -> Router {
    let observability_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .route("/health", get(health_check))
        .with_state(metrics_state);

    with_middleware(batch_routes(state, &config).merge(observability_router))
}

// ============================================================
// Error Handling
// ============================================================

/// Error codes returned in [`ApiError::code`].
///
/// Each code maps to an HTTP status in [`ApiError::into_response`].
pub mod error_codes {
    /// Malformed batch: bad JSON, missing `requests`, bad path, bad method, too many items.
    pub const VALIDATION_ERROR: &str = "validation_error";
    /// Request body exceeds the configured limit.
    pub const PAYLOAD_TOO_LARGE: &str = "payload_too_large";
    /// A sub-request could not be delivered at all.
    pub const DISPATCH_FAILED: &str = "dispatch_failed";
    /// A sub-request exceeded the dispatch timeout.
    pub const TIMEOUT: &str = "timeout";
    /// Unexpected internal server error.
    pub const INTERNAL_ERROR: &str = "internal_error";
}

/// Error response body.
#[derive(Debug, Serialize, Deserialize, PartialEq)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    pub fn validation_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::VALIDATION_ERROR, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(error_codes::INTERNAL_ERROR, message)
    }

    /// HTTP status for this error's code.
    pub fn status(&self) -> StatusCode {
        use error_codes::*;

        match self.code.as_str() {
            VALIDATION_ERROR => StatusCode::BAD_REQUEST,
            PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
            DISPATCH_FAILED => StatusCode::BAD_GATEWAY,
            TIMEOUT => StatusCode::GATEWAY_TIMEOUT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status(), Json(self)).into_response()
    }
}

impl From<BatchError> for ApiError {
    fn from(err: BatchError) -> Self {
        match err {
            err if err.is_validation_error() => ApiError::validation_error(err.to_string()),
            BatchError::Dispatch { index, source } => {
                // Transport details may name internal hosts; log them, don't return them
                error!(index, error = %source, "batch aborted by dispatch failure");
                match source {
                    DispatchError::Timeout { timeout_secs } => ApiError::new(
                        error_codes::TIMEOUT,
                        format!("sub-request {index} timed out after {timeout_secs}s"),
                    ),
                    _ => ApiError::new(
                        error_codes::DISPATCH_FAILED,
                        format!("sub-request {index} could not be dispatched"),
                    ),
                }
            }
            other => {
                error!(error = %other, "internal error in batch handler");
                ApiError::internal_error("internal error while processing batch")
            }
        }
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ============================================================
// Health Check
// ============================================================

/// Liveness probe; does not check the upstream.
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

// ============================================================
// Batch Endpoint
// ============================================================

/// Batch request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequestBody {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub include_responses: bool,
    /// Kept optional so a missing array is reported as such, not as a JSON error.
    #[serde(default)]
    pub requests: Option<Vec<SubRequestBody>>,
}

#[derive(Debug, Deserialize)]
pub struct SubRequestBody {
    pub path: String,
    /// Defaults to `GET`; matched case-insensitively.
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub query: Option<Map<String, Value>>,
    /// `null` and absent both mean no body.
    #[serde(default)]
    pub payload: Option<Value>,
}

impl SubRequestBody {
    fn into_sub_request(self, item: usize) -> BatchResult<SubRequest> {
        let method = match self.method {
            None => Method::GET,
            Some(name) => Method::from_bytes(name.to_ascii_uppercase().as_bytes())
                .map_err(|_| BatchError::InvalidMethod { item, method: name })?,
        };

        Ok(SubRequest {
            path: self.path,
            method,
            query: self.query,
            payload: self.payload,
        })
    }
}

impl BatchRequestBody {
    /// Converts the wire body into a batch request carrying `headers`.
    pub fn into_batch_request(self, headers: HeaderMap) -> BatchResult<BatchRequest> {
        let requests = self
            .requests
            .ok_or(BatchError::MissingRequests)?
            .into_iter()
            .enumerate()
            .map(|(item, sub)| sub.into_sub_request(item))
            .collect::<BatchResult<Vec<_>>>()?;

        Ok(BatchRequest {
            request_id: self.request_id,
            include_responses: self.include_responses,
            requests,
            headers,
        })
    }
}

/// Batch response body.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchResponseBody {
    pub success: u64,
    pub failure_codes: Vec<FailureCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responses: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl From<BatchResponse> for BatchResponseBody {
    fn from(response: BatchResponse) -> Self {
        Self {
            success: response.success,
            failure_codes: response.failure_codes,
            responses: response.responses,
            request_id: response.request_id,
        }
    }
}

async fn execute_batch<D: Dispatcher + 'static>(
    State(state): State<AppState<D>>,
    headers: HeaderMap,
    JsonBadRequest(body): JsonBadRequest<BatchRequestBody>,
) -> ApiResult<Json<BatchResponseBody>> {
    let started = Instant::now();

    let result = match body.into_batch_request(headers) {
        Ok(request) => state.batch_handler.execute(request).await,
        Err(err) => Err(err),
    };
    record_batch_request(batch_outcome(&result), started.elapsed().as_secs_f64());

    Ok(Json(result?.into()))
}
