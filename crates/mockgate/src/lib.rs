//! Request matching and response synthesis for a development HTTP mock server.
//!
//! Rules pair a [`Matcher`](matcher::Matcher) with a
//! [`Responder`](rule::Responder). A [`Dispatcher`] tries rules in order; the
//! first one that matches produces a JSON response, and unmatched requests go
//! to a [`Passthrough`](passthrough::Passthrough).
//!
//! ```no_run
//! use mockgate::matcher::{method, path};
//! use mockgate::{respond_with, Dispatcher, MockRule, MockServer, ServerConfig};
//! use serde_json::json;
//!
//! # async fn run() -> mockgate::Result<()> {
//! let rules = vec![MockRule::new(
//!     vec![method("get"), path("/api/orders/:id")?],
//!     respond_with(|_req, ctx| json!({ "id": ctx.lookup_str("params.id") })),
//! )];
//!
//! let handle = MockServer::new(ServerConfig::default(), Dispatcher::new(rules))
//!     .start()
//!     .await?;
//! handle.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod context;
pub mod demo;
pub mod dispatcher;
pub mod error;
pub mod evaluator;
pub mod matcher;
pub mod passthrough;
pub mod request;
pub mod response;
pub mod rule;
pub mod server;

pub use config::{ConfigOverrides, ServerConfig};
pub use context::{Context, ContextValue};
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::{Error, Result};
pub use evaluator::{create_evaluator, Evaluator, RuleResult};
pub use matcher::{Matcher, MatcherResult, SharedMatcher};
pub use passthrough::{NotFound, Passthrough, ProxyPassthrough, SharedPassthrough};
pub use request::MockRequest;
pub use rule::{respond_with, try_respond_with, MockRule, Responder, RuleMatch, SharedResponder};
pub use server::{MockServer, ServerHandle};
