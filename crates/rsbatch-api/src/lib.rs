//! rsbatch-api: HTTP surface for the batch orchestrator
//!
//! This crate provides the API layer including:
//! - The batch endpoint via Axum
//! - Dispatchers that deliver sub-requests (in-process router, upstream HTTP)
//! - Middleware (request IDs, tracing) and observability setup
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                rsbatch-api                   │
//! ├─────────────────────────────────────────────┤
//! │  http/          - Batch endpoint, health    │
//! │  adapters       - Dispatcher implementations│
//! │  middleware/    - Request IDs, tracing      │
//! │  observability/ - Logging, metrics          │
//! └─────────────────────────────────────────────┘
//! ```

pub mod adapters;
pub mod http;
pub mod middleware;
pub mod observability;
