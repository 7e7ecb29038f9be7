//! JSON responses and the `x-mockgate-*` header names.
//!
//! Every response mockgate produces itself (mocks, debug dumps, errors) is
//! JSON. Proxied responses are relayed as received and do not go through here.

use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderName, HeaderValue, CONTENT_TYPE};
use hyper::{Response, StatusCode};
use serde::Serialize;
use serde_json::json;
use tracing::error;

/// Index of the rule that produced a mock response.
pub static X_MOCKGATE_RULE: HeaderName = HeaderName::from_static("x-mockgate-rule");
/// Request header switching the server into debug mode.
pub static X_MOCKGATE_DEBUG: HeaderName = HeaderName::from_static("x-mockgate-debug");
/// Set on responses relayed from the upstream target.
pub static X_MOCKGATE_PROXIED: HeaderName = HeaderName::from_static("x-mockgate-proxied");

/// Serialize `body` as a JSON response.
pub fn json_response<T: Serialize>(status: StatusCode, body: &T) -> Response<Full<Bytes>> {
    json_response_with_headers(status, [], body)
}

/// Like [`json_response`], with extra headers appended after `content-type`.
///
/// A body that fails to serialize becomes a 500 with an empty JSON object.
pub fn json_response_with_headers<'a, T: Serialize>(
    status: StatusCode,
    headers: impl IntoIterator<Item = (&'a HeaderName, HeaderValue)>,
    body: &T,
) -> Response<Full<Bytes>> {
    let (status, json) = match serde_json::to_vec(body) {
        Ok(json) => (status, json),
        Err(e) => {
            error!("Failed to serialize response body: {}", e);
            (StatusCode::INTERNAL_SERVER_ERROR, b"{}".to_vec())
        }
    };

    let mut response = Response::new(Full::new(Bytes::from(json)));
    *response.status_mut() = status;
    let map = response.headers_mut();
    map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    for (name, value) in headers {
        map.append(name.clone(), value);
    }
    response
}

/// `{"error": {"status": <code>, "message": <message>}}`
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(
        status,
        &json!({
            "error": {
                "status": status.as_u16(),
                "message": message,
            }
        }),
    )
}
