//! Parametrized path matching.
//!
//! Patterns use Express-style segments:
//!
//! - literal segments: `/api/users`
//! - named segments: `/api/:id` (one whole path segment)
//! - a trailing catch-all: `/files/*rest` (one or more remaining segments)
//!
//! Patterns are compiled once into a `matchit` radix router. A request path
//! with or without a trailing slash matches the same pattern. Literal segments
//! compare ASCII case-insensitively; captured values keep the request's case.

use super::{Matcher, MatcherResult, SharedMatcher};
use crate::context::Context;
use crate::error::{Error, Result};
use crate::request::MockRequest;
use async_trait::async_trait;
use matchit::Router;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

/// A named or catch-all segment, by position in the path.
#[derive(Debug, Clone)]
struct Capture {
    index: usize,
    name: String,
    catch_all: bool,
}

/// A compiled path pattern.
pub struct PathPattern {
    pattern: String,
    /// Routes are stored lower-cased
    router: Router<()>,
    captures: Vec<Capture>,
}

impl PathPattern {
    /// Compile a pattern. Malformed patterns are rejected here, never at match time.
    pub fn compile(pattern: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::InvalidPattern {
            pattern: pattern.to_string(),
            reason: reason.to_string(),
        };

        let Some(rest) = pattern.strip_prefix('/') else {
            return Err(invalid("pattern must start with '/'"));
        };

        let segments: Vec<&str> = rest.split('/').collect();
        let mut route = String::with_capacity(pattern.len() + 8);
        let mut names = HashSet::new();
        let mut captures = Vec::new();
        let mut has_catch_all = false;

        for (i, segment) in segments.iter().enumerate() {
            route.push('/');

            if let Some(name) = segment.strip_prefix(':') {
                validate_param_name(name).map_err(|reason| invalid(&reason))?;
                if !names.insert(name) {
                    return Err(invalid(&format!("duplicate parameter name '{name}'")));
                }
                route.push('{');
                route.push_str(name);
                route.push('}');
                captures.push(Capture {
                    index: i,
                    name: name.to_string(),
                    catch_all: false,
                });
            } else if let Some(name) = segment.strip_prefix('*') {
                validate_param_name(name).map_err(|reason| invalid(&reason))?;
                if i != segments.len() - 1 {
                    return Err(invalid("catch-all segment must be last"));
                }
                if !names.insert(name) {
                    return Err(invalid(&format!("duplicate parameter name '{name}'")));
                }
                route.push_str("{*");
                route.push_str(name);
                route.push('}');
                captures.push(Capture {
                    index: i,
                    name: name.to_string(),
                    catch_all: true,
                });
                has_catch_all = true;
            } else {
                // matchit treats braces as parameters; escape literal ones
                let literal = segment.to_ascii_lowercase();
                route.push_str(&literal.replace('{', "{{").replace('}', "}}"));
            }
        }

        let mut router = Router::new();
        router
            .insert(route.clone(), ())
            .map_err(|e| invalid(&e.to_string()))?;

        if !has_catch_all && route != "/" {
            let alternate = match route.strip_suffix('/') {
                Some(trimmed) => trimmed.to_string(),
                None => format!("{route}/"),
            };
            // Conflicts here only mean the alternate form is already covered
            let _ = router.insert(alternate, ());
        }

        Ok(Self {
            pattern: pattern.to_string(),
            router,
            captures,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.pattern
    }

    /// Match a request path, returning the named segment values on success.
    ///
    /// Routing runs on the lower-cased path; values are cut from the raw path
    /// by segment position.
    pub fn matches(&self, path: &str) -> Option<Context> {
        self.router.at(&path.to_ascii_lowercase()).ok()?;

        let segments: Vec<&str> = path.strip_prefix('/').unwrap_or(path).split('/').collect();
        Some(self.captures.iter().fold(Context::new(), |params, capture| {
            let value = if capture.catch_all {
                segments.get(capture.index..).unwrap_or_default().join("/")
            } else {
                segments.get(capture.index).copied().unwrap_or_default().to_string()
            };
            params.with(capture.name.as_str(), value)
        }))
    }
}

impl fmt::Debug for PathPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PathPattern").field(&self.pattern).finish()
    }
}

fn validate_param_name(name: &str) -> std::result::Result<(), String> {
    if name.is_empty() {
        return Err("empty parameter name".to_string());
    }
    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(format!("invalid character '{c}' in parameter name '{name}'"));
    }
    Ok(())
}

/// Leaf matcher over the request path.
#[derive(Debug)]
pub struct PathMatcher {
    pattern: PathPattern,
    name: String,
}

impl PathMatcher {
    pub fn new(pattern: &str) -> Result<Self> {
        Ok(Self {
            pattern: PathPattern::compile(pattern)?,
            name: format!("path({pattern})"),
        })
    }
}

#[async_trait]
impl Matcher for PathMatcher {
    async fn evaluate(&self, request: &MockRequest) -> Result<MatcherResult> {
        let path = request.path();
        Ok(match self.pattern.matches(path) {
            Some(params) => MatcherResult::matched(
                self.name.as_str(),
                Context::new().with("path", path).with("params", params),
            ),
            None => MatcherResult::leaf(self.name.as_str(), false),
        })
    }
}

/// Match the request path against `pattern`.
///
/// On success the context holds `path` (the raw request path) and `params`
/// (the named segment values).
pub fn path(pattern: &str) -> Result<SharedMatcher> {
    Ok(Arc::new(PathMatcher::new(pattern)?))
}
