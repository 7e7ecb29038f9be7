//! Predicates over the parsed request body.

use super::{Matcher, MatcherResult, SharedMatcher};
use crate::error::{Error, Result};
use crate::request::MockRequest;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

type BodyPredicate = dyn Fn(&Value) -> anyhow::Result<bool> + Send + Sync;

/// Leaf matcher running a user predicate against the parsed body.
///
/// A predicate error is a hard failure ([`Error::Predicate`]); it is not
/// reported as a non-match.
pub struct BodyMatcher {
    predicate: Box<BodyPredicate>,
}

impl BodyMatcher {
    pub fn new<F>(predicate: F) -> Self
    where
        F: Fn(&Value) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        Self {
            predicate: Box::new(predicate),
        }
    }
}

#[async_trait]
impl Matcher for BodyMatcher {
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult> {
        let found = (self.predicate)(request.body()).map_err(Error::Predicate)?;
        Ok(MatcherResult::leaf("body", found))
    }
}

/// Match when `predicate` returns true for the parsed body.
pub fn body<F>(predicate: F) -> SharedMatcher
where
    F: Fn(&Value) -> bool + Send + Sync + 'static,
{
    Arc::new(BodyMatcher::new(move |value| Ok(predicate(value))))
}

/// Like [`body`], for predicates that can fail.
///
/// An `Err` from the predicate propagates out of every enclosing combinator
/// and out of the rule evaluator.
pub fn try_body<F>(predicate: F) -> SharedMatcher
where
    F: Fn(&Value) -> anyhow::Result<bool> + Send + Sync + 'static,
{
    Arc::new(BodyMatcher::new(predicate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper::Method;
    use serde_json::json;

    fn post(body: Value) -> MockRequest {
        MockRequest::new(Method::POST, "/api/merchant/1").with_json(body)
    }

    #[tokio::test]
    async fn test_body_predicate() {
        let matcher = body(|b| b["status"] == "open");

        let result = matcher.evaluate(&post(json!({"status": "open"}))).await.unwrap();
        assert!(result.found);
        assert_eq!(result.name, "body");
        assert!(result.ctx.is_none());

        let result = matcher.evaluate(&post(json!({"status": "closed"}))).await.unwrap();
        assert!(!result.found);
    }

    #[tokio::test]
    async fn test_body_predicate_on_missing_body() {
        let matcher = body(|b| *b == json!({}));
        let result = matcher
            .evaluate(&MockRequest::new(Method::GET, "/"))
            .await
            .unwrap();
        assert!(result.found);
    }

    #[tokio::test]
    async fn test_failing_predicate_is_an_error() {
        let matcher = try_body(|b| {
            let status = b
                .get("status")
                .and_then(Value::as_str)
                .ok_or_else(|| anyhow::anyhow!("status missing"))?;
            Ok(status == "open")
        });

        let err = matcher.evaluate(&post(json!({}))).await.unwrap_err();
        assert!(matches!(err, Error::Predicate(_)));
        assert!(err.to_string().contains("status missing"));

        let ok = matcher.evaluate(&post(json!({"status": "open"}))).await.unwrap();
        assert!(ok.found);
    }
}
