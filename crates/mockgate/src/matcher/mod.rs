//! Composable request matchers.
//!
//! A [`Matcher`] is an asynchronous predicate over a [`MockRequest`] that
//! produces a [`MatcherResult`]: whether it matched, a diagnostic name, the
//! child results it was built from and the facts it extracted.
//!
//! # Module Structure
//!
//! - `result` - `MatcherResult` diagnostic tree
//! - `path_matcher` - parametrized path patterns (`/api/:id`)
//! - `method_matcher` - HTTP method comparison
//! - `header_matcher` - header presence / equality
//! - `body_matcher` - predicates over the parsed body
//! - `logical` - `all_of`, `any_of`, `not`, `request`
//!
//! Matchers are built once and shared behind [`SharedMatcher`]. They hold no
//! mutable state, so one instance can serve any number of concurrent
//! requests.

mod body_matcher;
mod header_matcher;
mod logical;
mod method_matcher;
mod path_matcher;
mod result;

pub use body_matcher::{body, try_body, BodyMatcher};
pub use header_matcher::{header, HeaderMatcher};
pub use logical::{all_of, any_of, not, renamed, request, LogicalMatcher};
pub use method_matcher::{method, MethodMatcher};
pub use path_matcher::{path, PathMatcher, PathPattern};
pub use result::MatcherResult;

use crate::error::Result;
use crate::request::MockRequest;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;

/// An asynchronous predicate over a request.
///
/// Returning `Ok` with `found: false` is the normal negative outcome. `Err`
/// is reserved for hard failures (a user predicate that failed) and is never
/// turned into a non-match by the engine.
#[async_trait]
pub trait Matcher: Send + Sync {
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult>;
}

/// Shared handle to a matcher. Combinators and rules hold these.
pub type SharedMatcher = Arc<dyn Matcher>;

/// Matcher backed by a synchronous closure.
pub struct FnMatcher<F> {
    f: F,
}

#[async_trait]
impl<F> Matcher for FnMatcher<F>
where
    F: Fn(&MockRequest) -> MatcherResult + Send + Sync,
{
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult> {
        Ok((self.f)(request))
    }
}

/// Lift a synchronous closure into a matcher.
pub fn from_fn<F>(f: F) -> SharedMatcher
where
    F: Fn(&MockRequest) -> MatcherResult + Send + Sync + 'static,
{
    Arc::new(FnMatcher { f })
}

/// Matcher backed by an asynchronous closure.
pub struct AsyncFnMatcher<F> {
    f: F,
}

#[async_trait]
impl<F, Fut> Matcher for AsyncFnMatcher<F>
where
    F: Fn(MockRequest) -> Fut + Send + Sync,
    Fut: Future<Output = Result<MatcherResult>> + Send + 'static,
{
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult> {
        (self.f)(request.clone()).await
    }
}

/// Lift an asynchronous closure into a matcher.
///
/// The closure receives its own copy of the request so the returned future
/// can be `'static`.
pub fn from_async_fn<F, Fut>(f: F) -> SharedMatcher
where
    F: Fn(MockRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<MatcherResult>> + Send + 'static,
{
    Arc::new(AsyncFnMatcher { f })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use hyper::Method;

    #[tokio::test]
    async fn test_from_fn_matcher() {
        let matcher = from_fn(|req| MatcherResult::leaf("is-root", req.path() == "/"));

        let hit = matcher
            .evaluate(&MockRequest::new(Method::GET, "/"))
            .await
            .unwrap();
        assert!(hit.found);
        assert_eq!(hit.name, "is-root");

        let miss = matcher
            .evaluate(&MockRequest::new(Method::GET, "/other"))
            .await
            .unwrap();
        assert!(!miss.found);
    }

    #[tokio::test]
    async fn test_from_async_fn_matcher() {
        let matcher = from_async_fn(|req: MockRequest| async move {
            tokio::task::yield_now().await;
            Ok::<_, Error>(MatcherResult::leaf(
                "is-post",
                req.method() == Method::POST,
            ))
        });

        let result = matcher
            .evaluate(&MockRequest::new(Method::POST, "/"))
            .await
            .unwrap();
        assert!(result.found);
    }

    #[tokio::test]
    async fn test_from_async_fn_error_propagates() {
        let matcher = from_async_fn(|_req: MockRequest| async move {
            Err::<MatcherResult, _>(Error::Predicate(anyhow::anyhow!("lookup failed")))
        });

        let err = matcher
            .evaluate(&MockRequest::new(Method::GET, "/"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Predicate(_)));
    }
}
