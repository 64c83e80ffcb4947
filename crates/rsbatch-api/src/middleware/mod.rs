//! API middleware.
//!
//! Includes:
//! - Request ID assignment
//! - Request tracing, access logging and HTTP metrics

mod request_id;
mod trace;

pub use request_id::{RequestId, RequestIdLayer, REQUEST_ID_HEADER};
pub use trace::RequestTraceLayer;
