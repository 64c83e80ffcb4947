//! Contract between the batch engine and whatever actually executes a sub-request.
//!
//! The engine never performs I/O itself. A [`Dispatcher`] may inject the
//! request into an in-process router, call an internal RPC, or make a real
//! HTTP call; the engine only relies on the request/response shapes below.

use std::sync::Arc;

use async_trait::async_trait;
use http::header::LOCATION;
use http::{HeaderMap, Method, StatusCode};
use serde_json::Value;

use crate::error::DispatchResult;

/// A fully resolved sub-request, ready to execute.
#[derive(Debug, Clone)]
pub struct DispatchRequest {
    pub method: Method,
    /// Resolved path, including any query string.
    pub path: String,
    pub headers: HeaderMap,
    /// Serialized JSON body, if the sub-request has one.
    pub payload: Option<Vec<u8>>,
}

impl DispatchRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: HeaderMap::new(),
            payload: None,
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    pub fn with_payload(mut self, payload: Vec<u8>) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Response to a dispatched sub-request.
#[derive(Debug, Clone)]
pub struct DispatchResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    /// Parsed response body. Non-JSON bodies are carried as a string,
    /// empty bodies as `null`.
    pub result: Value,
}

impl DispatchResponse {
    pub fn new(status: StatusCode, result: Value) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            result,
        }
    }

    pub fn with_header(mut self, name: http::header::HeaderName, value: http::HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn is_redirect(&self) -> bool {
        self.status.is_redirection()
    }

    /// The `Location` header, if present and valid UTF-8.
    pub fn location(&self) -> Option<&str> {
        self.headers.get(LOCATION).and_then(|v| v.to_str().ok())
    }
}

/// Executes sub-requests on behalf of the batch engine.
///
/// Implementations return `Ok` for any HTTP response, including error
/// statuses. `Err` is reserved for failures where no response exists at all,
/// and aborts the whole batch.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(&self, request: DispatchRequest) -> DispatchResult<DispatchResponse>;
}

#[async_trait]
impl<T: Dispatcher + ?Sized> Dispatcher for Arc<T> {
    async fn dispatch(&self, request: DispatchRequest) -> DispatchResult<DispatchResponse> {
        (**self).dispatch(request).await
    }
}
