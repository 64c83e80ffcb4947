//! Prometheus metrics infrastructure.
//!
//! This module provides Prometheus-compatible metrics using the `metrics` crate
//! with `metrics-exporter-prometheus` for exposition.
//!
//! # Metrics Exposed
//!
//! - `rsbatch_batch_requests_total` - Batches by outcome (completed, rejected, failed)
//! - `rsbatch_batch_duration_seconds` - Batch duration histogram
//! - `rsbatch_sub_requests_total` - Dispatched sub-requests by final status class
//! - `rsbatch_sub_request_redirects_total` - Redirects followed by sub-requests
//! - `rsbatch_http_requests_total` - HTTP requests by method, route, status class
//! - `rsbatch_http_request_duration_seconds` - HTTP request duration histogram

use std::sync::Arc;

use axum::{extract::State, http::header::CONTENT_TYPE, response::IntoResponse};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use rsbatch_server::BatchError;

/// Shared state containing the Prometheus handle for metrics rendering.
#[derive(Clone)]
pub struct MetricsState {
    handle: Arc<PrometheusHandle>,
}

impl MetricsState {
    pub fn new(handle: PrometheusHandle) -> Self {
        Self {
            handle: Arc::new(handle),
        }
    }

    /// Renders the current metrics in Prometheus text format.
    pub fn render(&self) -> String {
        self.handle.render()
    }
}

/// Error type for metrics initialization.
#[derive(Debug, thiserror::Error)]
pub enum MetricsError {
    #[error("failed to install Prometheus recorder: recorder already installed")]
    AlreadyInstalled,
}

/// Installs the global Prometheus recorder.
///
/// Call once at startup, before any metric is recorded.
///
/// # Errors
///
/// Returns an error if a recorder is already installed.
pub fn init_metrics() -> Result<MetricsState, MetricsError> {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .map_err(|_| MetricsError::AlreadyInstalled)?;

    describe_metrics();

    Ok(MetricsState::new(handle))
}

fn describe_metrics() {
    metrics::describe_counter!(
        "rsbatch_batch_requests_total",
        "Total number of batch requests by outcome"
    );
    metrics::describe_histogram!(
        "rsbatch_batch_duration_seconds",
        "Batch request duration in seconds"
    );
    metrics::describe_counter!(
        "rsbatch_sub_requests_total",
        "Total number of dispatched sub-requests by final status class"
    );
    metrics::describe_counter!(
        "rsbatch_sub_request_redirects_total",
        "Total number of redirects followed by sub-requests"
    );
    metrics::describe_counter!("rsbatch_http_requests_total", "Total number of HTTP requests");
    metrics::describe_histogram!(
        "rsbatch_http_request_duration_seconds",
        "HTTP request duration in seconds"
    );
}

/// Prometheus exposition format content type.
const PROMETHEUS_CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Handler for the `/metrics` endpoint.
pub async fn metrics_handler(State(state): State<MetricsState>) -> impl IntoResponse {
    ([(CONTENT_TYPE, PROMETHEUS_CONTENT_TYPE)], state.render())
}

/// Outcome label for a finished batch.
pub fn batch_outcome<T>(result: &Result<T, BatchError>) -> &'static str {
    match result {
        Ok(_) => "completed",
        Err(err) if err.is_validation_error() => "rejected",
        Err(_) => "failed",
    }
}

/// Records one batch request.
pub fn record_batch_request(outcome: &'static str, duration_seconds: f64) {
    metrics::counter!("rsbatch_batch_requests_total", "outcome" => outcome).increment(1);
    metrics::histogram!("rsbatch_batch_duration_seconds", "outcome" => outcome)
        .record(duration_seconds);
}

/// Records one HTTP request served by the router.
pub fn record_http_request(method: &str, route: &str, status: u16, duration_seconds: f64) {
    let status_class = match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    };
    let labels = [
        ("method", method.to_string()),
        ("route", route.to_string()),
        ("status_class", status_class.to_string()),
    ];

    metrics::counter!("rsbatch_http_requests_total", &labels).increment(1);
    metrics::histogram!("rsbatch_http_request_duration_seconds", &labels)
        .record(duration_seconds);
}
