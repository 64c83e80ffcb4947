//! rsbatch-server: Batch execution and configuration
//!
//! This crate contains the execution layer including:
//! - Batch handler with two-phase scheduling
//! - Sub-request construction and redirect handling
//! - Configuration management
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │               rsbatch-server                 │
//! ├─────────────────────────────────────────────┤
//! │  config.rs   - Configuration management     │
//! │  handlers/   - Request handlers             │
//! │    batch/         - Batch execution         │
//! └─────────────────────────────────────────────┘
//! ```

pub mod config;
pub mod handlers;

// Re-exports for convenience
pub use config::{ConfigLoadError, ServerConfig};
pub use handlers::batch::{
    BatchError, BatchHandler, BatchHandlerConfig, BatchRequest, BatchResponse, SubRequest,
};
