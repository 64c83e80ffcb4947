//! rsbatch-domain: Core batch request logic
//!
//! This crate contains the pure parts of batch processing:
//! - Path template parsing and dependency classification
//! - Reference resolution against earlier results
//! - Per-batch result aggregation
//! - The dispatch contract implemented by the host
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsbatch-domain                 │
//! ├─────────────────────────────────────────────┤
//! │  path/      - Path template tokenizer       │
//! │  reference/ - Reference substitution        │
//! │  aggregate/ - Results store & tallies       │
//! │  dispatch/  - Dispatcher trait              │
//! └─────────────────────────────────────────────┘
//! ```

pub mod aggregate;
pub mod dispatch;
pub mod error;
pub mod path;
pub mod reference;

// Re-export commonly used types at the crate root
pub use aggregate::{BatchAggregate, FailureCode, ResultsStore, SlotState};
pub use dispatch::{DispatchRequest, DispatchResponse, Dispatcher};
pub use error::{DispatchError, PathError, ReferenceError, StoreError};
pub use path::{parse_batch, parse_path, ParsedPath, PathSegment};
