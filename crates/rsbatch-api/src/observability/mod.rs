//! Observability infrastructure for rsbatch.
//!
//! This module provides:
//! - Prometheus metrics endpoint and recording helpers
//! - Structured logging configuration

mod logging;
mod metrics;

pub use logging::{create_json_layer, init_logging, parse_log_level, LoggingConfig};
pub use metrics::{
    batch_outcome, init_metrics, metrics_handler, record_batch_request, record_http_request,
    MetricsError, MetricsState,
};
