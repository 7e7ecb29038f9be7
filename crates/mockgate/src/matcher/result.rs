//! Structured matcher outcome.

use crate::context::Context;
use serde::Serialize;

/// Result of evaluating one matcher against one request.
///
/// Leaves have no `children`; combinators list every child result in
/// argument order, matched or not, so the tree explains the decision.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatcherResult {
    pub found: bool,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MatcherResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ctx: Option<Context>,
}

impl MatcherResult {
    /// A leaf result without context.
    pub fn leaf(name: impl Into<String>, found: bool) -> Self {
        Self {
            found,
            name: name.into(),
            children: None,
            ctx: None,
        }
    }

    /// A successful leaf result carrying extracted facts.
    pub fn matched(name: impl Into<String>, ctx: Context) -> Self {
        Self {
            found: true,
            name: name.into(),
            children: None,
            ctx: Some(ctx),
        }
    }

    pub fn with_ctx(mut self, ctx: Context) -> Self {
        self.ctx = Some(ctx);
        self
    }

    pub fn with_children(mut self, children: Vec<MatcherResult>) -> Self {
        self.children = Some(children);
        self
    }

    pub fn renamed(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// The extracted context, or an empty one when none was produced.
    pub fn ctx_or_default(&self) -> Context {
        self.ctx.clone().unwrap_or_default()
    }

    /// Render the tree as indented lines for logging.
    pub fn describe(&self) -> String {
        let mut out = String::new();
        self.describe_into(&mut out, 0);
        out
    }

    fn describe_into(&self, out: &mut String, depth: usize) {
        let mark = if self.found { '+' } else { '-' };
        out.push_str(&"  ".repeat(depth));
        out.push(mark);
        out.push(' ');
        out.push_str(&self.name);
        out.push('\n');
        for child in self.children.iter().flatten() {
            child.describe_into(out, depth + 1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_serialization_omits_absent_fields() {
        let result = MatcherResult::leaf("method(GET)", false);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({"found": false, "name": "method(GET)"})
        );
    }

    #[test]
    fn test_tree_serialization() {
        let result = MatcherResult::leaf("allOf", true).with_children(vec![
            MatcherResult::matched("method(GET)", Context::new().with("method", "GET")),
        ]);
        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "found": true,
                "name": "allOf",
                "children": [
                    {"found": true, "name": "method(GET)", "ctx": {"method": "GET"}}
                ]
            })
        );
    }

    #[test]
    fn test_describe() {
        let result = MatcherResult::leaf("anyOf", true).with_children(vec![
            MatcherResult::leaf("method(GET)", false),
            MatcherResult::leaf("path(/api)", true),
        ]);
        assert_eq!(
            result.describe(),
            "+ anyOf\n  - method(GET)\n  + path(/api)\n"
        );
    }
}
