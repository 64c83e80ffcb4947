//! Per-request span, access log and HTTP metrics.

use std::{
    future::Future,
    pin::Pin,
    task::{Context, Poll},
    time::Instant,
};

use axum::{
    extract::MatchedPath,
    http::{Request, Response},
};
use tower::{Layer, Service};
use tracing::{field::Empty, info, info_span, Instrument, Span};

use super::request_id::RequestId;
use crate::observability::record_http_request;

/// Route label for requests that matched no route.
const UNMATCHED_ROUTE: &str = "unmatched";

/// Layer that wraps each request in an `http_request` span, logs its start
/// and completion, and records HTTP metrics.
///
/// Metrics are labelled by the matched route pattern, never the raw path.
#[derive(Clone, Default)]
pub struct RequestTraceLayer;

impl RequestTraceLayer {
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestTraceLayer {
    type Service = RequestTraceService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestTraceService { inner }
    }
}

#[derive(Clone)]
pub struct RequestTraceService<S> {
    inner: S,
}

impl<S, ReqBody, ResBody> Service<Request<ReqBody>> for RequestTraceService<S>
where
    S: Service<Request<ReqBody>, Response = Response<ResBody>> + Clone + Send + 'static,
    S::Future: Send,
    ReqBody: Send + 'static,
    ResBody: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, request: Request<ReqBody>) -> Self::Future {
        let method = request.method().clone();
        let uri = request.uri().clone();
        let route = request
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_string())
            .unwrap_or_else(|| UNMATCHED_ROUTE.to_string());
        let request_id = request
            .extensions()
            .get::<RequestId>()
            .map(|id| id.as_str().to_string())
            .unwrap_or_default();

        let span = info_span!(
            "http_request",
            method = %method,
            route = %route,
            request_id = %request_id,
            http.status_code = Empty,
        );

        let start = Instant::now();
        let mut inner = self.inner.clone();

        Box::pin(
            async move {
                info!(target: "rsbatch::http", uri = %uri, "request started");

                let response = inner.call(request).await?;
                let status = response.status().as_u16();
                let elapsed = start.elapsed();

                Span::current().record("http.status_code", status);
                info!(
                    target: "rsbatch::http",
                    uri = %uri,
                    status,
                    duration_ms = elapsed.as_millis() as u64,
                    "request completed"
                );
                record_http_request(method.as_str(), &route, status, elapsed.as_secs_f64());

                Ok(response)
            }
            .instrument(span),
        )
    }
}
