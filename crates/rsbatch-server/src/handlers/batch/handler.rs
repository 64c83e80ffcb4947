//! Batch execution handler implementation.

use std::sync::Arc;
use std::time::Instant;

use http::uri::PathAndQuery;
use rsbatch_domain::error::PathError;
use rsbatch_domain::reference::resolve_path;
use rsbatch_domain::{parse_batch, BatchAggregate, Dispatcher, ParsedPath, PathSegment};
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use super::dispatch::{build_request, send_with_redirect, DispatchOutcome};
use super::types::{BatchError, BatchRequest, BatchResponse, BatchResult, DEFAULT_MAX_BATCH_SIZE};

/// Limits applied to every batch.
#[derive(Debug, Clone)]
pub struct BatchHandlerConfig {
    /// Maximum number of sub-requests in one batch.
    pub max_batch_size: usize,
}

impl Default for BatchHandlerConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        }
    }
}

/// Handler for batches of sub-requests.
///
/// Execution runs in two phases:
/// 1. Independent: items without references are dispatched concurrently
/// 2. Dependent: items with references run one at a time, in batch order,
///    after every independent item has finished
///
/// A dependent item can therefore reference any earlier independent item
/// and any earlier dependent item.
pub struct BatchHandler<D>
where
    D: Dispatcher,
{
    /// Executes the sub-requests.
    dispatcher: Arc<D>,
    config: BatchHandlerConfig,
}

impl<D> BatchHandler<D>
where
    D: Dispatcher + 'static,
{
    /// Creates a new batch handler with default limits.
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self::with_config(dispatcher, BatchHandlerConfig::default())
    }

    pub fn with_config(dispatcher: Arc<D>, config: BatchHandlerConfig) -> Self {
        Self { dispatcher, config }
    }

    pub fn config(&self) -> &BatchHandlerConfig {
        &self.config
    }

    /// Validates a batch request and parses every path template.
    ///
    /// Nothing is dispatched if this fails.
    pub fn validate(&self, request: &BatchRequest) -> BatchResult<Vec<ParsedPath>> {
        if request.requests.len() > self.config.max_batch_size {
            return Err(BatchError::BatchTooLarge {
                size: request.requests.len(),
                max: self.config.max_batch_size,
            });
        }

        let parsed = parse_batch(request.requests.iter().map(|sub| sub.path.as_str()))?;
        for (item, path) in parsed.iter().enumerate() {
            if !is_valid_uri_path(path) {
                return Err(PathError::InvalidFormat { item }.into());
            }
        }
        Ok(parsed)
    }

    /// Executes a batch request.
    ///
    /// Item results are returned in the same order as the input sub-requests.
    pub async fn execute(&self, request: BatchRequest) -> BatchResult<BatchResponse> {
        let started = Instant::now();
        let parsed = self.validate(&request)?;

        let (independent, dependent): (Vec<usize>, Vec<usize>) =
            (0..parsed.len()).partition(|&index| !parsed[index].has_reference());

        debug!(
            total = parsed.len(),
            independent = independent.len(),
            dependent = dependent.len(),
            "executing batch"
        );

        let mut aggregate = BatchAggregate::new(parsed.len());
        self.run_independent(&request, &parsed, &independent, &mut aggregate)
            .await?;
        self.run_dependent(&request, &parsed, &dependent, &mut aggregate)
            .await?;

        let (success, failure_codes, results) = aggregate.finish();

        info!(
            total = parsed.len(),
            success,
            failure_codes = failure_codes.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "batch completed"
        );

        Ok(BatchResponse {
            success,
            failure_codes,
            responses: request.include_responses.then_some(results),
            request_id: request.request_id,
        })
    }

    /// Dispatches every independent item concurrently.
    ///
    /// Outcomes are recorded as tasks complete. The first dispatcher error
    /// cancels the remaining tasks.
    async fn run_independent(
        &self,
        request: &BatchRequest,
        parsed: &[ParsedPath],
        indices: &[usize],
        aggregate: &mut BatchAggregate,
    ) -> BatchResult<()> {
        let mut tasks = JoinSet::new();

        for &index in indices {
            let dispatch_request = build_request(
                &request.requests[index],
                parsed[index].to_string(),
                &request.headers,
            )?;
            let dispatcher = Arc::clone(&self.dispatcher);
            tasks.spawn(async move {
                let outcome = send_with_redirect(dispatcher.as_ref(), dispatch_request).await;
                (index, outcome)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            let (index, outcome) = match joined {
                Ok(pair) => pair,
                Err(e) => {
                    tasks.abort_all();
                    error!(error = %e, "sub-request task did not complete");
                    return Err(BatchError::Internal {
                        message: format!("sub-request task did not complete: {e}"),
                    });
                }
            };

            match outcome {
                Ok(outcome) => record_outcome(aggregate, index, outcome)?,
                Err(source) => {
                    tasks.abort_all();
                    error!(index, error = %source, "sub-request dispatch failed");
                    return Err(BatchError::Dispatch { index, source });
                }
            }
        }

        Ok(())
    }

    /// Resolves and dispatches dependent items one at a time, in batch order.
    async fn run_dependent(
        &self,
        request: &BatchRequest,
        parsed: &[ParsedPath],
        indices: &[usize],
        aggregate: &mut BatchAggregate,
    ) -> BatchResult<()> {
        for &index in indices {
            debug!(
                index,
                references = ?parsed[index].referenced_indices().collect::<Vec<_>>(),
                "resolving dependent sub-request"
            );
            let path = match resolve_path(&parsed[index], aggregate.store()) {
                Ok(path) => path,
                Err(err) => {
                    warn!(
                        index,
                        code = err.code(),
                        error = %err,
                        "skipping sub-request with unresolved reference"
                    );
                    aggregate.record_reference_error(index, err)?;
                    continue;
                }
            };

            let dispatch_request =
                build_request(&request.requests[index], path, &request.headers)?;
            let outcome = send_with_redirect(self.dispatcher.as_ref(), dispatch_request)
                .await
                .map_err(|source| {
                    error!(index, error = %source, "sub-request dispatch failed");
                    BatchError::Dispatch { index, source }
                })?;

            record_outcome(aggregate, index, outcome)?;
        }

        Ok(())
    }
}

fn record_outcome(
    aggregate: &mut BatchAggregate,
    index: usize,
    outcome: DispatchOutcome,
) -> BatchResult<()> {
    let status = outcome.status.as_u16();
    metrics::counter!("rsbatch_sub_requests_total", "status_class" => status_class(status))
        .increment(1);
    debug!(
        index,
        status,
        redirected = outcome.redirected,
        "sub-request completed"
    );

    aggregate.record_response(index, status, outcome.result)?;
    Ok(())
}

/// Placeholder standing in for a reference value when checking a template.
///
/// Resolved values are restricted to `[A-Za-z0-9_:]`, so any of them yields
/// a valid URI exactly when this placeholder does.
const REFERENCE_PLACEHOLDER: &str = "0";

/// Returns true if the literal parts of `path` form valid URI path text.
fn is_valid_uri_path(path: &ParsedPath) -> bool {
    let rendered: String = path
        .segments()
        .iter()
        .map(|segment| match segment {
            PathSegment::Literal { value } => format!("/{value}"),
            PathSegment::Reference { .. } => format!("/{REFERENCE_PLACEHOLDER}"),
        })
        .collect();

    PathAndQuery::try_from(rendered.as_str()).is_ok()
}

fn status_class(status: u16) -> &'static str {
    match status {
        100..=199 => "1xx",
        200..=299 => "2xx",
        300..=399 => "3xx",
        400..=499 => "4xx",
        _ => "5xx",
    }
}
