//! Batch handler with reference-aware two-phase scheduling.
//!
//! A batch is a list of sub-requests. Paths may reference an earlier item's
//! response with `$N.field`, e.g. `/users/$0.id/profile`.
//!
//! 1. **Validation**: size limit and path parsing; any failure rejects the
//!    whole batch before anything runs
//! 2. **Independent phase**: items without references run concurrently
//! 3. **Dependent phase**: items with references run serially in index order,
//!    each resolved against the results recorded so far
//!
//! A reference that cannot be resolved skips that item only: its slot carries
//! a `{"code", "message"}` object and it is not counted in `success` or
//! `failure_codes`. A dispatcher error aborts the whole batch.
//!
//! Each dispatched item follows at most one redirect.

mod dispatch;
mod handler;
mod types;

pub use handler::{BatchHandler, BatchHandlerConfig};
pub use types::{
    BatchError, BatchRequest, BatchResponse, BatchResult, SubRequest, DEFAULT_MAX_BATCH_SIZE,
};
