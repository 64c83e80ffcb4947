//! Application state for HTTP handlers.

use std::sync::Arc;

use rsbatch_domain::Dispatcher;
use rsbatch_server::handlers::batch::{BatchHandler, BatchHandlerConfig};

/// Application state shared across all HTTP handlers.
///
/// # Type Parameters
///
/// * `D` - The dispatcher that executes sub-requests
pub struct AppState<D: Dispatcher> {
    /// The batch handler with two-phase scheduling.
    pub batch_handler: Arc<BatchHandler<D>>,
}

impl<D: Dispatcher> Clone for AppState<D> {
    fn clone(&self) -> Self {
        Self {
            batch_handler: Arc::clone(&self.batch_handler),
        }
    }
}

impl<D: Dispatcher + 'static> AppState<D> {
    /// Creates a new application state with default batch limits.
    pub fn new(dispatcher: Arc<D>) -> Self {
        Self::with_config(dispatcher, BatchHandlerConfig::default())
    }

    pub fn with_config(dispatcher: Arc<D>, config: BatchHandlerConfig) -> Self {
        Self {
            batch_handler: Arc::new(BatchHandler::with_config(dispatcher, config)),
        }
    }
}
