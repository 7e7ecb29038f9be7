//! Extracted request facts and their deep merge.
//!
//! Successful matchers record what they found (path parameters, the matched
//! method, header values) in a [`Context`]. Combinators merge their children's
//! contexts with [`Context::merge`]:
//!
//! - nested maps under the same key are merged recursively (keys unioned)
//! - any other collision is won by the later context
//!
//! There are no arrays or other value kinds, so those are the only two cases.

use serde::Serialize;
use serde_json::Value;
use std::collections::btree_map::{self, BTreeMap};

/// A single context value: a string or a nested map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum ContextValue {
    String(String),
    Map(Context),
}

impl ContextValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            ContextValue::String(s) => Some(s),
            ContextValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&Context> {
        match self {
            ContextValue::Map(m) => Some(m),
            ContextValue::String(_) => None,
        }
    }
}

impl From<String> for ContextValue {
    fn from(value: String) -> Self {
        ContextValue::String(value)
    }
}

impl From<&str> for ContextValue {
    fn from(value: &str) -> Self {
        ContextValue::String(value.to_string())
    }
}

impl From<Context> for ContextValue {
    fn from(value: Context) -> Self {
        ContextValue::Map(value)
    }
}

/// Ordered string-keyed map of extracted facts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Context(BTreeMap<String, ContextValue>);

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value, replacing any previous value under `key`.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ContextValue>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ContextValue>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.0.get(key)
    }

    /// Look up a value by dotted path, e.g. `params.id` or `headers.accept`.
    pub fn lookup(&self, path: &str) -> Option<&ContextValue> {
        let mut segments = path.split('.');
        let mut current = self.0.get(segments.next()?)?;
        for segment in segments {
            current = current.as_map()?.0.get(segment)?;
        }
        Some(current)
    }

    /// Look up a string value by dotted path.
    pub fn lookup_str(&self, path: &str) -> Option<&str> {
        self.lookup(path).and_then(ContextValue::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, ContextValue> {
        self.0.iter()
    }

    /// Deep-merge `other` into `self`; `other` wins on non-map collisions.
    pub fn merge(&mut self, other: Context) {
        for (key, incoming) in other.0 {
            match self.0.entry(key) {
                btree_map::Entry::Vacant(slot) => {
                    slot.insert(incoming);
                }
                btree_map::Entry::Occupied(mut slot) => match (slot.get_mut(), incoming) {
                    (ContextValue::Map(existing), ContextValue::Map(incoming)) => {
                        existing.merge(incoming);
                    }
                    (_, incoming) => {
                        slot.insert(incoming);
                    }
                },
            }
        }
    }

    /// Merge an ordered sequence of optional contexts left to right.
    ///
    /// Returns `None` when none of the inputs carried a context.
    pub fn merge_all<I>(contexts: I) -> Option<Context>
    where
        I: IntoIterator<Item = Option<Context>>,
    {
        contexts
            .into_iter()
            .flatten()
            .fold(None, |acc: Option<Context>, next| {
                let mut merged = acc.unwrap_or_default();
                merged.merge(next);
                Some(merged)
            })
    }

    /// Convert to a JSON object, handy for building responses.
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl FromIterator<(String, ContextValue)> for Context {
    fn from_iter<T: IntoIterator<Item = (String, ContextValue)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Context {
    type Item = (String, ContextValue);
    type IntoIter = btree_map::IntoIter<String, ContextValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a Context {
    type Item = (&'a String, &'a ContextValue);
    type IntoIter = btree_map::Iter<'a, String, ContextValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl From<Context> for Value {
    fn from(ctx: Context) -> Self {
        ctx.to_json()
    }
}
