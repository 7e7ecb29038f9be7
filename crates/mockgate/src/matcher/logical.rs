//! Logical combinators for composing matchers.
//!
//! `all_of` and `any_of` start every child evaluation at once and wait for
//! all of them, so the diagnostic tree always lists every child result in
//! argument order. Child contexts are deep-merged left to right (see
//! [`Context::merge`]). `not` negates a single child and drops its context.

use super::{Matcher, MatcherResult, SharedMatcher};
use crate::context::Context;
use crate::error::Result;
use crate::request::MockRequest;
use async_trait::async_trait;
use futures::future::try_join_all;
use std::sync::Arc;

/// A composite matcher.
pub enum LogicalMatcher {
    /// Matches if ALL of the inner matchers match (vacuously true when empty)
    All(Vec<SharedMatcher>),

    /// Matches if ANY of the inner matchers match (false when empty)
    Any(Vec<SharedMatcher>),

    /// Negates the inner matcher
    Not(SharedMatcher),
}

impl LogicalMatcher {
    fn name(&self) -> &'static str {
        match self {
            LogicalMatcher::All(_) => "allOf",
            LogicalMatcher::Any(_) => "anyOf",
            LogicalMatcher::Not(_) => "not",
        }
    }
}

async fn evaluate_children(
    matchers: &[SharedMatcher],
    request: &MockRequest,
) -> Result<Vec<MatcherResult>> {
    try_join_all(matchers.iter().map(|m| m.evaluate(request))).await
}

fn merge_results(name: &str, found: bool, children: Vec<MatcherResult>) -> MatcherResult {
    let ctx = Context::merge_all(children.iter().map(|c| c.ctx.clone()));
    MatcherResult {
        found,
        name: name.to_string(),
        children: Some(children),
        ctx,
    }
}

#[async_trait]
impl Matcher for LogicalMatcher {
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult> {
        match self {
            LogicalMatcher::All(matchers) => {
                let children = evaluate_children(matchers, request).await?;
                let found = children.iter().all(|c| c.found);
                Ok(merge_results(self.name(), found, children))
            }
            LogicalMatcher::Any(matchers) => {
                let children = evaluate_children(matchers, request).await?;
                let found = children.iter().any(|c| c.found);
                Ok(merge_results(self.name(), found, children))
            }
            LogicalMatcher::Not(inner) => {
                let child = inner.evaluate(request).await?;
                Ok(MatcherResult::leaf(self.name(), !child.found).with_children(vec![child]))
            }
        }
    }
}

/// Matcher that overrides the name of another matcher's result.
pub struct Renamed {
    name: String,
    inner: SharedMatcher,
}

#[async_trait]
impl Matcher for Renamed {
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult> {
        Ok(self.inner.evaluate(request).await?.renamed(self.name.as_str()))
    }
}

/// Conjunction of `matchers`, named `allOf`.
pub fn all_of(matchers: Vec<SharedMatcher>) -> SharedMatcher {
    Arc::new(LogicalMatcher::All(matchers))
}

/// Disjunction of `matchers`, named `anyOf`.
pub fn any_of(matchers: Vec<SharedMatcher>) -> SharedMatcher {
    Arc::new(LogicalMatcher::Any(matchers))
}

/// Negation of `matcher`, named `not`. Never carries a context.
pub fn not(matcher: SharedMatcher) -> SharedMatcher {
    Arc::new(LogicalMatcher::Not(matcher))
}

/// Wrap `matcher` so its result is reported under `name`.
pub fn renamed(name: impl Into<String>, matcher: SharedMatcher) -> SharedMatcher {
    Arc::new(Renamed {
        name: name.into(),
        inner: matcher,
    })
}

/// `all_of([method(verb), path(pattern)])`, named `request`.
pub fn request(verb: &str, pattern: &str) -> Result<SharedMatcher> {
    Ok(renamed(
        "request",
        all_of(vec![super::method(verb), super::path(pattern)?]),
    ))
}
