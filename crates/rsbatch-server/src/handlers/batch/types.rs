//! Data types for batch operations.

use http::{HeaderMap, Method};
use serde_json::{Map, Value};

use rsbatch_domain::error::{DispatchError, PathError, StoreError};
use rsbatch_domain::FailureCode;

/// Default maximum number of sub-requests per batch.
pub const DEFAULT_MAX_BATCH_SIZE: usize = 50;

/// A single sub-request within a batch.
#[derive(Debug, Clone)]
pub struct SubRequest {
    /// Path template, possibly containing `$N.field` references.
    pub path: String,
    /// HTTP method to dispatch with.
    pub method: Method,
    /// Query parameters appended to the resolved path.
    pub query: Option<Map<String, Value>>,
    /// JSON body sent with the sub-request.
    pub payload: Option<Value>,
}

impl SubRequest {
    /// Creates a sub-request with no query or payload.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            method,
            query: None,
            payload: None,
        }
    }

    /// Shorthand for a `GET` sub-request.
    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn with_query(mut self, query: Map<String, Value>) -> Self {
        self.query = Some(query);
        self
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = Some(payload);
        self
    }
}

/// Request for a batch of sub-requests.
#[derive(Debug, Clone, Default)]
pub struct BatchRequest {
    /// Caller-supplied identifier echoed in the response.
    pub request_id: Option<String>,
    /// Whether the response should carry every item's result.
    pub include_responses: bool,
    /// Sub-requests in batch order.
    pub requests: Vec<SubRequest>,
    /// Headers forwarded to every sub-request.
    pub headers: HeaderMap,
}

impl BatchRequest {
    /// Creates a new batch request.
    pub fn new(requests: Vec<SubRequest>) -> Self {
        Self {
            requests,
            ..Default::default()
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn including_responses(mut self) -> Self {
        self.include_responses = true;
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }
}

/// Aggregated response from a batch operation.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResponse {
    /// Number of dispatched items whose final status was below 400.
    pub success: u64,
    /// Error statuses and their counts, in first-seen order.
    pub failure_codes: Vec<FailureCode>,
    /// Per-item results in batch order, when requested.
    pub responses: Option<Vec<Value>>,
    /// Echo of the caller's request ID.
    pub request_id: Option<String>,
}

/// Errors that abort a whole batch.
///
/// Failures scoped to a single item (unresolvable references, HTTP error
/// statuses) are reported inside [`BatchResponse`] instead.
#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    /// The batch envelope has no `requests` array.
    #[error("Request missing requests array")]
    MissingRequests,

    /// The batch request exceeds the maximum allowed size.
    #[error("batch size {size} exceeds maximum allowed {max}")]
    BatchTooLarge { size: usize, max: usize },

    /// A sub-request names a method that is not a valid HTTP method.
    #[error("invalid method '{method}' in item: {item}")]
    InvalidMethod { item: usize, method: String },

    /// A sub-request path could not be parsed.
    #[error(transparent)]
    Path(#[from] PathError),

    /// The dispatcher failed outright for a sub-request.
    #[error("sub-request {index} failed: {source}")]
    Dispatch {
        index: usize,
        #[source]
        source: DispatchError,
    },

    /// Bookkeeping failure inside the handler.
    #[error("internal batch error: {message}")]
    Internal { message: String },
}

impl BatchError {
    /// Returns true for errors caused by the batch envelope itself.
    ///
    /// These are detected before any sub-request runs.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            BatchError::MissingRequests
                | BatchError::BatchTooLarge { .. }
                | BatchError::InvalidMethod { .. }
                | BatchError::Path(_)
        )
    }
}

impl From<StoreError> for BatchError {
    fn from(err: StoreError) -> Self {
        BatchError::Internal {
            message: err.to_string(),
        }
    }
}

/// Result type for batch operations.
pub type BatchResult<T> = Result<T, BatchError>;
