//! HTTP endpoints.
//!
//! | Endpoint | Method | Description |
//! |----------|--------|-------------|
//! | `/batch` (configurable) | POST | Execute a batch of sub-requests |
//! | `/health` | GET | Liveness check |
//! | `/metrics` | GET | Prometheus metrics (when enabled) |

pub mod routes;
pub mod state;

pub use routes::{
    create_router, create_router_with_config, create_router_with_observability, ApiError,
    BatchRequestBody, BatchResponseBody, RouterConfig, SubRequestBody, DEFAULT_BATCH_ENDPOINT,
    DEFAULT_BODY_LIMIT,
};
pub use state::AppState;
