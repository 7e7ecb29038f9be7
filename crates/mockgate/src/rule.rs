//! Mock rules: a matcher paired with a response generator.

use crate::context::Context;
use crate::error::{Error, Result};
use crate::matcher::SharedMatcher;
use crate::request::MockRequest;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Produces the mock response payload for a matched request.
///
/// Only called after the rule's matcher succeeded, with the merged context.
/// The payload is serialized as JSON by the transport; status codes and
/// headers are not part of it.
#[async_trait]
pub trait Responder: Send + Sync {
    async fn respond(&self, request: &MockRequest, ctx: &Context) -> Result<Value>;
}

/// Shared handle to a responder.
pub type SharedResponder = Arc<dyn Responder>;

struct FnResponder<F> {
    f: F,
}

#[async_trait]
impl<F> Responder for FnResponder<F>
where
    F: Fn(&MockRequest, &Context) -> anyhow::Result<Value> + Send + Sync,
{
    async fn respond(&self, request: &MockRequest, ctx: &Context) -> Result<Value> {
        (self.f)(request, ctx).map_err(Error::Respond)
    }
}

/// Lift an infallible closure into a responder.
pub fn respond_with<F>(f: F) -> SharedResponder
where
    F: Fn(&MockRequest, &Context) -> Value + Send + Sync + 'static,
{
    Arc::new(FnResponder {
        f: move |req: &MockRequest, ctx: &Context| Ok::<_, anyhow::Error>(f(req, ctx)),
    })
}

/// Lift a fallible closure into a responder. Errors surface as [`Error::Respond`].
pub fn try_respond_with<F>(f: F) -> SharedResponder
where
    F: Fn(&MockRequest, &Context) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    Arc::new(FnResponder { f })
}

/// What a rule matches on: one matcher, or a list that must all match.
#[derive(Clone)]
pub enum RuleMatch {
    One(SharedMatcher),
    All(Vec<SharedMatcher>),
}

impl From<SharedMatcher> for RuleMatch {
    fn from(matcher: SharedMatcher) -> Self {
        RuleMatch::One(matcher)
    }
}

impl From<Vec<SharedMatcher>> for RuleMatch {
    fn from(matchers: Vec<SharedMatcher>) -> Self {
        RuleMatch::All(matchers)
    }
}

/// One mockable case.
#[derive(Clone)]
pub struct MockRule {
    pub matcher: RuleMatch,
    pub responder: SharedResponder,
}

impl MockRule {
    pub fn new(matcher: impl Into<RuleMatch>, responder: SharedResponder) -> Self {
        Self {
            matcher: matcher.into(),
            responder,
        }
    }
}
