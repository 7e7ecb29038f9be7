//! Compiles a [`MockRule`] into a single asynchronous decision procedure.

use crate::error::Result;
use crate::matcher::{all_of, MatcherResult, SharedMatcher};
use crate::request::MockRequest;
use crate::rule::{MockRule, RuleMatch, SharedResponder};
use serde::ser::{Serialize, SerializeStruct, Serializer};
use serde_json::Value;
use tracing::debug;

/// Outcome of evaluating one rule against one request.
///
/// The matcher tree is always present, matched or not, for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub enum RuleResult {
    Matched {
        matcher: MatcherResult,
        response: Value,
    },
    Unmatched {
        matcher: MatcherResult,
    },
}

impl RuleResult {
    pub fn is_ok(&self) -> bool {
        matches!(self, RuleResult::Matched { .. })
    }

    pub fn matcher(&self) -> &MatcherResult {
        match self {
            RuleResult::Matched { matcher, .. } | RuleResult::Unmatched { matcher } => matcher,
        }
    }

    pub fn response(&self) -> Option<&Value> {
        match self {
            RuleResult::Matched { response, .. } => Some(response),
            RuleResult::Unmatched { .. } => None,
        }
    }

    pub fn into_response(self) -> Option<Value> {
        match self {
            RuleResult::Matched { response, .. } => Some(response),
            RuleResult::Unmatched { .. } => None,
        }
    }
}

// Serialized as `{ "ok": bool, "matcher": ..., "response"? }`
impl Serialize for RuleResult {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RuleResult::Matched { matcher, response } => {
                let mut state = serializer.serialize_struct("RuleResult", 3)?;
                state.serialize_field("ok", &true)?;
                state.serialize_field("matcher", matcher)?;
                state.serialize_field("response", response)?;
                state.end()
            }
            RuleResult::Unmatched { matcher } => {
                let mut state = serializer.serialize_struct("RuleResult", 2)?;
                state.serialize_field("ok", &false)?;
                state.serialize_field("matcher", matcher)?;
                state.end()
            }
        }
    }
}

/// A compiled rule.
#[derive(Clone)]
pub struct Evaluator {
    matcher: SharedMatcher,
    responder: SharedResponder,
}

impl Evaluator {
    pub fn new(rule: MockRule) -> Self {
        let matcher = match rule.matcher {
            RuleMatch::One(matcher) => matcher,
            RuleMatch::All(matchers) => all_of(matchers),
        };
        Self {
            matcher,
            responder: rule.responder,
        }
    }

    /// Run the matcher and, if it succeeds, the responder.
    ///
    /// The responder is never invoked for a non-match. Matcher and responder
    /// errors are returned unchanged.
    pub async fn evaluate(&self, request: &MockRequest) -> Result<RuleResult> {
        let matcher = self.matcher.evaluate(request).await?;

        if !matcher.found {
            debug!(
                "Rule did not match {} {}:\n{}",
                request.method(),
                request.path(),
                matcher.describe()
            );
            return Ok(RuleResult::Unmatched { matcher });
        }

        let ctx = matcher.ctx_or_default();
        let response = self.responder.respond(request, &ctx).await?;
        Ok(RuleResult::Matched { matcher, response })
    }
}

/// Compile `rule` into an [`Evaluator`].
pub fn create_evaluator(rule: MockRule) -> Evaluator {
    Evaluator::new(rule)
}
