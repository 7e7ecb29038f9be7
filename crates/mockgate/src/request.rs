//! Read-only request view handed to matchers, responders and passthroughs.

use bytes::Bytes;
use hyper::header::HeaderName;
use hyper::{HeaderMap, Method};
use serde_json::Value;

/// An incoming request as seen by the matcher engine.
///
/// The body has already been collected and parsed by the server; matchers
/// only ever see the parsed [`Value`]. The raw bytes and query string are kept
/// for the passthrough, which needs to replay the request upstream.
#[derive(Debug, Clone)]
pub struct MockRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Value,
    raw_body: Bytes,
}

impl MockRequest {
    /// Create a request with an empty header map and an empty JSON object as body.
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: None,
            headers: HeaderMap::new(),
            body: Value::Object(Default::default()),
            raw_body: Bytes::new(),
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Add a single header. Invalid names or values are ignored.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            hyper::header::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    /// Set the parsed body. The raw bytes are derived from its JSON encoding.
    pub fn with_json(mut self, body: Value) -> Self {
        self.raw_body = Bytes::from(body.to_string());
        self.body = body;
        self
    }

    /// Set both the parsed body and the bytes it was parsed from.
    pub fn with_body(mut self, body: Value, raw_body: Bytes) -> Self {
        self.body = body;
        self.raw_body = raw_body;
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Case-insensitive header lookup. Non-UTF-8 values are decoded lossily.
    pub fn header(&self, name: &str) -> Option<String> {
        self.headers
            .get(name)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
    }

    pub fn body(&self) -> &Value {
        &self.body
    }

    pub fn raw_body(&self) -> &Bytes {
        &self.raw_body
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_header_lookup_is_case_insensitive() {
        let req = MockRequest::new(Method::GET, "/").with_header("Accept", "text/xml");
        assert_eq!(req.header("accept").as_deref(), Some("text/xml"));
        assert_eq!(req.header("ACCEPT").as_deref(), Some("text/xml"));
        assert_eq!(req.header("content-type"), None);
    }

    #[test]
    fn test_empty_header_value_is_present() {
        let req = MockRequest::new(Method::GET, "/").with_header("x-empty", "");
        assert_eq!(req.header("x-empty").as_deref(), Some(""));
    }

    #[test]
    fn test_with_json_sets_raw_body() {
        let req = MockRequest::new(Method::POST, "/api").with_json(json!({"status": "open"}));
        assert_eq!(req.body()["status"], "open");
        assert_eq!(req.raw_body().as_ref(), br#"{"status":"open"}"#);
    }
}
