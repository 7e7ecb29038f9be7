//! Ordered rule dispatch with a passthrough fallback.

use crate::error::Result;
use crate::evaluator::{Evaluator, RuleResult};
use crate::passthrough::Passthrough;
use crate::request::MockRequest;
use crate::response::{json_response_with_headers, X_MOCKGATE_RULE};
use crate::rule::MockRule;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::HeaderValue;
use hyper::{Response, StatusCode};
use serde_json::Value;
use tracing::debug;

/// Outcome of [`Dispatcher::dispatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    /// Rule `rule` (index in declaration order) matched and produced `response`.
    Mock { rule: usize, response: Value },
    /// No rule matched.
    Passthrough,
}

/// Tries evaluators in declaration order; the first match wins.
#[derive(Clone, Default)]
pub struct Dispatcher {
    evaluators: Vec<Evaluator>,
}

impl Dispatcher {
    pub fn new(rules: impl IntoIterator<Item = MockRule>) -> Self {
        Self {
            evaluators: rules.into_iter().map(Evaluator::new).collect(),
        }
    }

    pub fn from_evaluators(evaluators: Vec<Evaluator>) -> Self {
        Self { evaluators }
    }

    pub fn len(&self) -> usize {
        self.evaluators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.evaluators.is_empty()
    }

    /// Evaluate rules in order until one matches.
    ///
    /// Evaluators after the first match are never invoked. An error from any
    /// evaluator stops dispatch and is returned.
    pub async fn dispatch(&self, request: &MockRequest) -> Result<Dispatch> {
        for (index, evaluator) in self.evaluators.iter().enumerate() {
            if let RuleResult::Matched { response, .. } = evaluator.evaluate(request).await? {
                debug!(
                    "Rule {} matched {} {}",
                    index,
                    request.method(),
                    request.path()
                );
                return Ok(Dispatch::Mock {
                    rule: index,
                    response,
                });
            }
        }
        debug!(
            "No rule matched {} {}, passing through",
            request.method(),
            request.path()
        );
        Ok(Dispatch::Passthrough)
    }

    /// Dispatch and turn the outcome into an HTTP response.
    ///
    /// A mock is sent as a JSON 200; otherwise `passthrough` is called exactly
    /// once with the same request.
    pub async fn handle(
        &self,
        request: &MockRequest,
        passthrough: &dyn Passthrough,
    ) -> Result<Response<Full<Bytes>>> {
        match self.dispatch(request).await? {
            Dispatch::Mock { rule, response } => Ok(json_response_with_headers(
                StatusCode::OK,
                [(&X_MOCKGATE_RULE, HeaderValue::from(rule))],
                &response,
            )),
            Dispatch::Passthrough => passthrough.forward(request).await,
        }
    }

    /// Evaluate every rule, without short-circuiting. Used by debug mode.
    pub async fn evaluate_all(&self, request: &MockRequest) -> Result<Vec<RuleResult>> {
        let mut results = Vec::with_capacity(self.evaluators.len());
        for evaluator in &self.evaluators {
            results.push(evaluator.evaluate(request).await?);
        }
        Ok(results)
    }
}
