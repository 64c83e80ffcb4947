//! Dispatcher implementations that connect the batch engine to real services.
//!
//! The server layer (rsbatch-server) only knows the abstract `Dispatcher`
//! trait. This module provides two ways to execute sub-requests:
//! - `RouterDispatcher`: injects requests into an in-process `axum::Router`
//! - `HttpDispatcher`: forwards requests to an upstream service over HTTP

use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::Router;
use serde_json::Value;
use tower::ServiceExt;
use url::Url;

use rsbatch_domain::error::{DispatchError, DispatchResult};
use rsbatch_domain::{DispatchRequest, DispatchResponse, Dispatcher};

/// Largest sub-request response body that will be buffered.
pub const MAX_RESPONSE_BYTES: usize = 16 * 1024 * 1024;

/// Interprets a response body as JSON, falling back to text.
///
/// Empty bodies become `null`; bodies that are not valid JSON are kept as a
/// string so they can still be returned to the caller.
pub fn parse_response_body(bytes: &[u8]) -> Value {
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(bytes)
        .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(bytes).into_owned()))
}

/// Dispatches sub-requests into an in-process router.
///
/// No network hop is involved; each sub-request is a `oneshot` call on a
/// clone of the router.
#[derive(Clone)]
pub struct RouterDispatcher {
    router: Router,
}

impl RouterDispatcher {
    pub fn new(router: Router) -> Self {
        Self { router }
    }
}

#[async_trait]
impl Dispatcher for RouterDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> DispatchResult<DispatchResponse> {
        let mut builder = Request::builder()
            .method(request.method)
            .uri(request.path.as_str());
        if let Some(headers) = builder.headers_mut() {
            headers.extend(request.headers);
        }

        let body = request.payload.map(Body::from).unwrap_or_else(Body::empty);
        let http_request = builder
            .body(body)
            .map_err(|e| DispatchError::InvalidRequest {
                message: format!("cannot build request for {}: {e}", request.path),
            })?;

        let response = match self.router.clone().oneshot(http_request).await {
            Ok(response) => response,
            Err(infallible) => match infallible {},
        };

        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, MAX_RESPONSE_BYTES)
            .await
            .map_err(|e| DispatchError::Transport {
                message: format!("failed to read response body: {e}"),
            })?;

        Ok(DispatchResponse {
            status: parts.status,
            headers: parts.headers,
            result: parse_response_body(&bytes),
        })
    }
}

/// Dispatches sub-requests to an upstream HTTP service.
///
/// Resolved paths are appended to the base URL's path, so a path of
/// `/users/42` against `http://api.internal:3000/api` requests
/// `http://api.internal:3000/api/users/42`. The scheme, host and port always
/// come from the base URL. Redirects are returned to the caller rather than
/// followed by the client.
#[derive(Clone)]
pub struct HttpDispatcher {
    client: reqwest::Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpDispatcher {
    /// Creates a dispatcher for `base_url` with a per-request `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidRequest`] if `base_url` does not parse
    /// and [`DispatchError::Transport`] if the HTTP client cannot be built.
    pub fn new(base_url: &str, timeout: Duration) -> DispatchResult<Self> {
        let base_url = Url::parse(base_url).map_err(|e| DispatchError::InvalidRequest {
            message: format!("invalid upstream url '{base_url}': {e}"),
        })?;
        if base_url.cannot_be_a_base() {
            return Err(DispatchError::InvalidRequest {
                message: format!("upstream url '{base_url}' has no host to dispatch to"),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| DispatchError::Transport {
                message: format!("failed to build http client: {e}"),
            })?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Builds the upstream URL for a resolved sub-request path.
    ///
    /// Only the path and query of the base URL are replaced, so a path such
    /// as `//other-host/x` stays on the upstream origin.
    pub fn target_url(&self, path_and_query: &str) -> Url {
        let (path, query) = match path_and_query.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (path_and_query, None),
        };

        let mut url = self.base_url.clone();
        let prefix = self.base_url.path().trim_end_matches('/');
        url.set_path(&format!("{prefix}{path}"));
        url.set_query(query);
        url.set_fragment(None);
        url
    }

    fn map_error(&self, err: reqwest::Error) -> DispatchError {
        if err.is_timeout() {
            DispatchError::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            DispatchError::Transport {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait]
impl Dispatcher for HttpDispatcher {
    async fn dispatch(&self, request: DispatchRequest) -> DispatchResult<DispatchResponse> {
        let url = self.target_url(&request.path);

        let mut builder = self
            .client
            .request(request.method, url)
            .headers(request.headers);
        if let Some(payload) = request.payload {
            builder = builder.body(payload);
        }

        let response = builder.send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response.bytes().await.map_err(|e| self.map_error(e))?;

        Ok(DispatchResponse {
            status,
            headers,
            result: parse_response_body(&bytes),
        })
    }
}
