//! Domain error types for batch request processing.

use thiserror::Error;

/// Errors raised while parsing a sub-request path template.
///
/// Both variants reject the entire batch before anything executes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path contains input that is neither a literal nor a reference segment.
    #[error("Invalid request format in item: {item}")]
    InvalidFormat { item: usize },

    /// A reference points at the item itself or at a later item.
    #[error("Request reference is beyond array size: {item}")]
    ForwardReference { item: usize, index: usize },
}

impl PathError {
    /// Position of the offending item in the batch.
    pub fn item(&self) -> usize {
        match self {
            PathError::InvalidFormat { item } | PathError::ForwardReference { item, .. } => *item,
        }
    }
}

/// Errors raised while substituting a reference into a dependent path.
///
/// These are scoped to a single item: the item is recorded as failed and the
/// rest of the batch keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReferenceError {
    /// The referenced item has no usable result.
    #[error("Missing reference response: item {index}")]
    MissingReference { index: usize },

    /// The referenced result has nothing at the requested field path.
    #[error("Reference not found: '{field}' in item {index}")]
    ReferenceNotFound { index: usize, field: String },

    /// The referenced value is not safe to embed in a path.
    #[error("Reference value includes illegal characters: '{field}' in item {index}")]
    IllegalReferenceValue { index: usize, field: String },
}

impl ReferenceError {
    /// Stable machine-readable code reported in the per-item result.
    pub fn code(&self) -> &'static str {
        match self {
            ReferenceError::MissingReference { .. } => "missing_reference",
            ReferenceError::ReferenceNotFound { .. } => "reference_not_found",
            ReferenceError::IllegalReferenceValue { .. } => "illegal_reference_value",
        }
    }
}

/// Errors raised by a [`Dispatcher`](crate::dispatch::Dispatcher) itself.
///
/// An HTTP error status is not a dispatch error; it is returned as a normal
/// response. These variants mean the sub-request could not be carried out at all.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// The sub-request could not be turned into a valid request.
    #[error("invalid sub-request: {message}")]
    InvalidRequest { message: String },

    /// Transport or processing failure while executing the sub-request.
    #[error("transport error: {message}")]
    Transport { message: String },

    /// The dispatcher gave up waiting for a response.
    #[error("sub-request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },
}

/// Errors raised by the results store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// A slot was written twice.
    #[error("result slot {index} already written")]
    SlotAlreadyWritten { index: usize },

    /// A slot index outside the batch.
    #[error("result slot {index} out of range (batch size {len})")]
    SlotOutOfRange { index: usize, len: usize },
}

/// Result type for path parsing.
pub type PathResult<T> = Result<T, PathError>;

/// Result type for reference resolution.
pub type ReferenceResult<T> = Result<T, ReferenceError>;

/// Result type for dispatch operations.
pub type DispatchResult<T> = Result<T, DispatchError>;

/// Result type for results store writes.
pub type StoreResult<T> = Result<T, StoreError>;
