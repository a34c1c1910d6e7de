//! Parsed binding path AST
//!
//! Produced by the path grammar, consumed by the resolver. Immutable once
//! built and cached per raw string.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "name")]
pub enum AnyNode {
    /// Literal segment
    Value(ValueNode),
    /// Nested binding (`{{path}}`)
    PathNode(PathNode),
    /// Embedded expression source (`` `expr()` ``)
    Expression(ExpressionNode),
    /// Array element match (`[key=value]`)
    Query(QueryNode),
    /// Adjacent parts joined into one segment (`pre_{{path}}`)
    Concatenated(ConcatenatedNode),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueNode {
    pub value: String,
    /// Written inside quotes; never coerced to an integer
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub quoted: bool,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct PathNode {
    pub path: Vec<AnyNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExpressionNode {
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryNode {
    pub key: Box<AnyNode>,
    pub value: Option<Box<AnyNode>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ConcatenatedNode {
    pub value: Vec<AnyNode>,
}

impl AnyNode {
    pub fn name(&self) -> &'static str {
        match self {
            AnyNode::Value(_) => "Value",
            AnyNode::PathNode(_) => "PathNode",
            AnyNode::Expression(_) => "Expression",
            AnyNode::Query(_) => "Query",
            AnyNode::Concatenated(_) => "Concatenated",
        }
    }
}

pub fn to_value(value: impl Into<String>) -> AnyNode {
    AnyNode::Value(ValueNode {
        value: value.into(),
        quoted: false,
    })
}

pub fn to_quoted_value(value: impl Into<String>) -> AnyNode {
    AnyNode::Value(ValueNode {
        value: value.into(),
        quoted: true,
    })
}

pub fn to_expression(value: impl Into<String>) -> AnyNode {
    AnyNode::Expression(ExpressionNode {
        value: value.into(),
    })
}

pub fn to_path(path: Vec<AnyNode>) -> PathNode {
    PathNode { path }
}

pub fn to_nested(path: Vec<AnyNode>) -> AnyNode {
    AnyNode::PathNode(PathNode { path })
}

pub fn to_query(key: AnyNode, value: Option<AnyNode>) -> AnyNode {
    AnyNode::Query(QueryNode {
        key: Box::new(key),
        value: value.map(Box::new),
    })
}

/// A single part stays as-is; several parts become a `Concatenated` node
pub fn to_concatenated_node(mut parts: Vec<AnyNode>) -> AnyNode {
    if parts.len() == 1 {
        if let Some(only) = parts.pop() {
            return only;
        }
    }
    AnyNode::Concatenated(ConcatenatedNode { value: parts })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenated_collapses_single_part() {
        assert_eq!(to_concatenated_node(vec![to_value("foo")]), to_value("foo"));

        let joined = to_concatenated_node(vec![to_value("a"), to_nested(vec![to_value("b")])]);
        assert_eq!(joined.name(), "Concatenated");
    }

    #[test]
    fn serializes_with_node_names() {
        let node = to_query(to_value("x"), Some(to_quoted_value("1")));
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["name"], "Query");
        assert_eq!(json["key"]["name"], "Value");
        assert_eq!(json["value"]["quoted"], true);
    }
}
