//! Header presence and equality matching.

use super::{Matcher, MatcherResult, SharedMatcher};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::request::MockRequest;
use async_trait::async_trait;
use hyper::header::HeaderName;
use std::sync::Arc;

/// Leaf matcher over a single header.
#[derive(Debug, Clone)]
pub struct HeaderMatcher {
    key: HeaderName,
    /// `None` means "present with any value"
    value: Option<String>,
    name: String,
}

impl HeaderMatcher {
    pub fn new(key: &str, value: Option<&str>) -> Result<Self> {
        let key = HeaderName::from_bytes(key.as_bytes())
            .map_err(|_| Error::InvalidHeaderName(key.to_string()))?;
        let name = match value {
            Some(v) => format!("header({}={v})", key.as_str()),
            None => format!("header({})", key.as_str()),
        };
        Ok(Self {
            key,
            value: value.map(str::to_string),
            name,
        })
    }
}

#[async_trait]
impl Matcher for HeaderMatcher {
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult> {
        let actual = request
            .headers()
            .get(&self.key)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned());

        let found = match (&actual, &self.value) {
            (Some(actual), Some(expected)) => actual == expected,
            (Some(_), None) => true,
            (None, _) => false,
        };

        Ok(match actual {
            Some(actual) if found => {
                let headers = Context::new().with(self.key.as_str(), actual);
                MatcherResult::matched(self.name.as_str(), Context::new().with("headers", headers))
            }
            _ => MatcherResult::leaf(self.name.as_str(), false),
        })
    }
}

/// Match a header by name (case-insensitive).
///
/// With `value` the header must equal it exactly; with `None` any value,
/// including an empty one, matches. On success the context holds
/// `headers.<name>` with the lower-cased header name.
pub fn header<'a>(key: &str, value: impl Into<Option<&'a str>>) -> Result<SharedMatcher> {
    Ok(Arc::new(HeaderMatcher::new(key, value.into())?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;

    fn request_with(name: &str, value: &str) -> MockRequest {
        MockRequest::new(Method::GET, "/").with_header(name, value)
    }

    #[tokio::test]
    async fn test_header_value_equality() {
        let matcher = header("accept", "text/xml").unwrap();

        let result = matcher
            .evaluate(&request_with("Accept", "text/xml"))
            .await
            .unwrap();
        assert!(result.found);
        assert_eq!(
            result.ctx.unwrap().lookup_str("headers.accept"),
            Some("text/xml")
        );

        let result = matcher
            .evaluate(&request_with("accept", "application/json"))
            .await
            .unwrap();
        assert!(!result.found);
        assert!(result.ctx.is_none());
    }

    #[tokio::test]
    async fn test_header_presence() {
        let matcher = header("accept", None).unwrap();

        assert!(
            matcher
                .evaluate(&request_with("ACCEPT", "anything"))
                .await
                .unwrap()
                .found
        );
        assert!(
            matcher
                .evaluate(&request_with("accept", ""))
                .await
                .unwrap()
                .found
        );
        assert!(
            !matcher
                .evaluate(&MockRequest::new(Method::GET, "/"))
                .await
                .unwrap()
                .found
        );
    }

    #[tokio::test]
    async fn test_header_key_normalized_in_context() {
        let result = header("X-Request-Id", None)
            .unwrap()
            .evaluate(&request_with("x-request-id", "abc"))
            .await
            .unwrap();
        assert_eq!(
            result.ctx.unwrap().lookup_str("headers.x-request-id"),
            Some("abc")
        );
    }

    #[test]
    fn test_invalid_header_name() {
        assert!(matches!(
            header("bad header", None),
            Err(Error::InvalidHeaderName(_))
        ));
    }
}
