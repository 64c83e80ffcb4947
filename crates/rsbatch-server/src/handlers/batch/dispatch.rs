//! Issuing one sub-request through a [`Dispatcher`].
//!
//! Turns a sub-request and its resolved path into a [`DispatchRequest`],
//! sends it, and follows at most one redirect.

use http::header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING};
use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::{Map, Value};
use tracing::debug;
use url::{form_urlencoded, Url};

use rsbatch_domain::error::DispatchResult;
use rsbatch_domain::{DispatchRequest, Dispatcher};

use super::types::{BatchError, BatchResult, SubRequest};

/// Final outcome of a dispatched sub-request.
#[derive(Debug, Clone)]
pub(crate) struct DispatchOutcome {
    pub status: StatusCode,
    pub result: Value,
    pub redirected: bool,
}

/// Builds the request for `sub` against its already-resolved path.
///
/// Incoming batch headers are forwarded except those describing the batch
/// body itself. A JSON content type is set when the sub-request has a payload.
pub(crate) fn build_request(
    sub: &SubRequest,
    resolved_path: String,
    headers: &HeaderMap,
) -> BatchResult<DispatchRequest> {
    let path = match sub.query.as_ref().filter(|query| !query.is_empty()) {
        Some(query) => append_query(&resolved_path, query),
        None => resolved_path,
    };

    let mut forwarded = headers.clone();
    forwarded.remove(CONTENT_LENGTH);
    forwarded.remove(TRANSFER_ENCODING);
    forwarded.remove(HOST);
    forwarded.remove(CONTENT_TYPE);

    let mut request = DispatchRequest::new(sub.method.clone(), path);

    // A JSON `null` payload was already folded into `None` by deserialization;
    // falsy values such as `0` or `""` still go out as a body.
    if let Some(payload) = &sub.payload {
        let body = serde_json::to_vec(payload).map_err(|e| BatchError::Internal {
            message: format!("failed to encode payload: {e}"),
        })?;
        forwarded.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        request = request.with_payload(body);
    }

    Ok(request.with_headers(forwarded))
}

/// Appends `query` to `path` as a form-urlencoded query string.
///
/// Scalars are stringified, arrays repeat the key, and `null` or nested
/// objects encode as an empty value.
pub(crate) fn append_query(path: &str, query: &Map<String, Value>) -> String {
    let mut serializer = form_urlencoded::Serializer::new(String::new());
    for (key, value) in query {
        match value {
            Value::Array(items) => {
                for item in items {
                    serializer.append_pair(key, &query_text(item));
                }
            }
            other => {
                serializer.append_pair(key, &query_text(other));
            }
        }
    }

    let encoded = serializer.finish();
    let separator = if path.contains('?') { '&' } else { '?' };
    format!("{path}{separator}{encoded}")
}

fn query_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}

/// Sends `request`, re-issuing it once to the `Location` of a 3xx response.
///
/// The second response is final even if it is another redirect. A redirect
/// without a usable `Location` is returned as-is.
pub(crate) async fn send_with_redirect<D>(
    dispatcher: &D,
    request: DispatchRequest,
) -> DispatchResult<DispatchOutcome>
where
    D: Dispatcher + ?Sized,
{
    let response = dispatcher.dispatch(request.clone()).await?;

    let target = response
        .location()
        .filter(|_| response.is_redirect())
        .and_then(redirect_target);
    let target = match target {
        Some(target) => target,
        None => {
            return Ok(DispatchOutcome {
                status: response.status,
                result: response.result,
                redirected: false,
            })
        }
    };

    debug!(
        from = %request.path,
        to = %target,
        status = response.status.as_u16(),
        "following sub-request redirect"
    );
    metrics::counter!("rsbatch_sub_request_redirects_total").increment(1);

    let follow_up = DispatchRequest {
        path: target,
        ..request
    };
    let response = dispatcher.dispatch(follow_up).await?;

    Ok(DispatchOutcome {
        status: response.status,
        result: response.result,
        redirected: true,
    })
}

/// Base that every `Location` is resolved against before its origin is dropped.
const REDIRECT_BASE: &str = "http://localhost/";

/// Reduces a `Location` value to a path on the same host.
///
/// The location is resolved like a browser would (absolute, scheme-relative
/// or relative) and only its path and query are kept, so a redirect can never
/// send the sub-request to a different origin. Returns `None` if the location
/// cannot be resolved at all.
fn redirect_target(location: &str) -> Option<String> {
    let url = Url::parse(REDIRECT_BASE).ok()?.join(location).ok()?;
    Some(match url.query() {
        Some(query) => format!("{}?{}", url.path(), query),
        None => url.path().to_string(),
    })
}
