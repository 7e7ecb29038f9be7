//! HTTP method matching.

use super::{Matcher, MatcherResult, SharedMatcher};
use crate::context::Context;
use crate::error::Result;
use crate::request::MockRequest;
use async_trait::async_trait;
use std::sync::Arc;

/// Leaf matcher comparing the request method to a fixed verb.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    /// Upper-cased at construction
    verb: String,
    name: String,
}

impl MethodMatcher {
    pub fn new(verb: &str) -> Self {
        let verb = verb.to_uppercase();
        Self {
            name: format!("method({verb})"),
            verb,
        }
    }
}

#[async_trait]
impl Matcher for MethodMatcher {
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult> {
        let method = request.method().as_str();
        Ok(if method.eq_ignore_ascii_case(&self.verb) {
            MatcherResult::matched(
                self.name.as_str(),
                Context::new().with("method", self.verb.as_str()),
            )
        } else {
            MatcherResult::leaf(self.name.as_str(), false)
        })
    }
}

/// Match the request method, case-insensitively.
///
/// On success the context holds `method` (upper-cased).
pub fn method(verb: &str) -> SharedMatcher {
    Arc::new(MethodMatcher::new(verb))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;

    #[tokio::test]
    async fn test_method_matches_case_insensitively() {
        let matcher = method("get");

        let result = matcher
            .evaluate(&MockRequest::new(Method::GET, "/"))
            .await
            .unwrap();
        assert!(result.found);
        assert_eq!(result.name, "method(GET)");
        assert_eq!(result.ctx.unwrap().lookup_str("method"), Some("GET"));
    }

    #[tokio::test]
    async fn test_method_mismatch() {
        let result = method("get")
            .evaluate(&MockRequest::new(Method::POST, "/"))
            .await
            .unwrap();
        assert!(!result.found);
        assert!(result.ctx.is_none());
    }

    #[tokio::test]
    async fn test_extension_method() {
        let purge = Method::from_bytes(b"PURGE").unwrap();
        let result = method("purge")
            .evaluate(&MockRequest::new(purge, "/cache"))
            .await
            .unwrap();
        assert!(result.found);
    }
}
