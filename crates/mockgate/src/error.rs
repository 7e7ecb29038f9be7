//! Error types shared by the matcher engine and the server wiring.
//!
//! A request that simply does not match a rule is never an error; it shows up
//! as `found: false` in a [`MatcherResult`](crate::matcher::MatcherResult).
//! Everything here is either a construction-time fault in a rule definition
//! or a hard failure while evaluating one.

use std::net::SocketAddr;

/// Convenience alias used throughout the crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A path pattern could not be compiled when the matcher was built.
    #[error("Invalid path pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A header matcher was built with a name that is not a valid HTTP header name.
    #[error("Invalid header name '{0}'")]
    InvalidHeaderName(String),

    /// A user supplied body predicate failed while inspecting the request.
    #[error("Body predicate failed: {0}")]
    Predicate(#[source] anyhow::Error),

    /// A rule's responder failed after its matcher succeeded.
    #[error("Responder failed: {0}")]
    Respond(#[source] anyhow::Error),

    /// The incoming request body could not be read or parsed.
    #[error("Invalid request body: {0}")]
    Body(String),

    /// The incoming request body exceeded the configured limit.
    #[error("Request body exceeds limit of {0} bytes")]
    BodyTooLarge(usize),

    /// Forwarding an unmatched request to the upstream failed.
    #[error("Upstream request to {target} failed: {reason}")]
    Upstream { target: String, reason: String },

    /// The listener could not be bound.
    #[error("Failed to bind {0}: {1}")]
    Bind(SocketAddr, #[source] std::io::Error),

    /// The configuration file or overrides were invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),
}

impl Error {
    /// Whether this error was caused by a rule author (predicate or responder)
    /// rather than by the request or the environment.
    pub fn is_rule_fault(&self) -> bool {
        matches!(self, Error::Predicate(_) | Error::Respond(_))
    }
}
