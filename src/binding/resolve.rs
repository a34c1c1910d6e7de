//! Binding AST resolution
//!
//! Walks a parsed path depth-first and produces the canonical segment list.
//! Nested references, expressions and queries call back into the host through
//! [`ResolveOptions`]; queries that miss record the element to create in the
//! returned [`Updates`].

use std::borrow::Cow;

use serde_json::Value;
use tracing::{debug, trace};

use crate::error::{Result, ViewbindError};
use crate::hooks::WaterfallHook;

use super::ast::{AnyNode, PathNode, QueryNode};
use super::segment::{join_segments, maybe_convert_to_num, Segment};

/// Host callbacks the resolver needs while walking a path
pub trait ResolveOptions {
    /// Read the data model at an already-resolved path
    fn get_value(&self, path: &[Segment]) -> Result<Option<Value>>;

    /// Evaluate an embedded expression
    fn evaluate(&self, expression: &str) -> Result<Option<Value>>;

    /// Turn a resolved value into path text (string, number or boolean only)
    fn convert_to_path(&self, value: Option<Value>) -> Result<String>;
}

/// A data-model write produced by a query that found no matching element
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    /// Dot-joined form of `path`
    pub key: String,
    pub path: Vec<Segment>,
    pub value: Value,
}

/// Ordered update map, keyed by the dotted path; later writes to a key win
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Updates {
    entries: Vec<Update>,
}

impl Updates {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: Vec<Segment>, value: Value) {
        let key = join_segments(&path);
        match self.entries.iter_mut().find(|entry| entry.key == key) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Update { key, path, value }),
        }
    }

    pub fn merge(&mut self, other: Updates) {
        for update in other.entries {
            self.insert(update.path, update.value);
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries
            .iter()
            .find(|entry| entry.key == key)
            .map(|entry| &entry.value)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|entry| entry.key.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Update> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl IntoIterator for Updates {
    type Item = Update;
    type IntoIter = std::vec::IntoIter<Update>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// Output of resolving one path
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NormalizedResult {
    pub path: Vec<Segment>,
    pub updates: Updates,
}

/// In-progress state handed to `before_resolve_node` taps
pub struct ResolveContext<'a> {
    /// Segments resolved so far
    pub path: &'a [Segment],
    pub updates: &'a Updates,
    pub options: &'a dyn ResolveOptions,
}

/// Signature of the `before_resolve_node` waterfall
pub type BeforeResolveNode = dyn Fn(AnyNode, &ResolveContext<'_>) -> AnyNode + Send + Sync;

/// Resolve a parsed path into canonical segments
///
/// `hook` is applied to each top-level node of `ast`; nested references are
/// resolved without it.
pub fn resolve_binding_ast(
    ast: &PathNode,
    options: &dyn ResolveOptions,
    hook: Option<&WaterfallHook<BeforeResolveNode>>,
) -> Result<NormalizedResult> {
    let mut resolver = Resolver {
        options,
        path: Vec::with_capacity(ast.path.len()),
        updates: Updates::new(),
    };

    for node in &ast.path {
        let node = match hook.filter(|h| !h.is_empty()) {
            Some(hook) => {
                let ctx = ResolveContext {
                    path: &resolver.path,
                    updates: &resolver.updates,
                    options,
                };
                Cow::Owned(hook.call(node.clone(), |f, current| f(current, &ctx)))
            }
            None => Cow::Borrowed(node),
        };
        resolver.resolve_node(&node)?;
    }

    Ok(NormalizedResult {
        path: resolver.path,
        updates: resolver.updates,
    })
}

struct Resolver<'a> {
    options: &'a dyn ResolveOptions,
    path: Vec<Segment>,
    updates: Updates,
}

impl Resolver<'_> {
    fn resolve_node(&mut self, node: &AnyNode) -> Result<()> {
        match node {
            AnyNode::Value(value) => {
                append_segments(&mut self.path, &value.value, !value.quoted);
            }
            AnyNode::PathNode(_) | AnyNode::Expression(_) => {
                let resolved = self.value_for_node(node)?;
                append_segments(&mut self.path, &resolved, true);
            }
            AnyNode::Query(query) => self.resolve_query(query)?,
            AnyNode::Concatenated(concatenated) => {
                let mut joined = String::new();
                for part in &concatenated.value {
                    joined.push_str(&self.value_for_node(part)?);
                }
                self.path.push(Segment::key(joined));
            }
        }
        Ok(())
    }

    /// Text a node contributes as (part of) a segment
    fn value_for_node(&mut self, node: &AnyNode) -> Result<String> {
        match node {
            AnyNode::Value(value) => Ok(value.value.clone()),
            AnyNode::PathNode(nested) => {
                let resolved = resolve_binding_ast(nested, self.options, None)?;
                self.updates.merge(resolved.updates);

                let segment = join_segments(&resolved.path);
                trace!(nested = %segment, "resolving nested reference");

                self.options
                    .get_value(&resolved.path)
                    .and_then(|value| self.options.convert_to_path(value))
                    .map_err(|e| ViewbindError::wrap_segment(segment, e))
            }
            AnyNode::Expression(expression) => self
                .options
                .evaluate(&expression.value)
                .and_then(|value| self.options.convert_to_path(value))
                .map_err(|e| ViewbindError::wrap_segment(expression.value.clone(), e)),
            other => Err(ViewbindError::UnsupportedNode {
                node: other.name().to_string(),
            }),
        }
    }

    fn resolve_query(&mut self, query: &QueryNode) -> Result<()> {
        let target = self.options.get_value(&self.path)?;

        let key = self.value_for_node(&query.key)?;
        let value = match &query.value {
            Some(node) => Some(self.value_for_node(node)?),
            None => None,
        };

        let elements: &[Value] = match &target {
            Some(Value::Array(items)) => items,
            None | Some(Value::Null) => &[],
            Some(other) => {
                debug!(
                    path = %join_segments(&self.path),
                    found = value_type(other),
                    "query target is not an array, treating as empty"
                );
                &[]
            }
        };

        match find_in_array(elements, &key, value.as_deref()) {
            Some(index) => self.path.push(Segment::from(index)),
            None => {
                let index = Segment::from(elements.len());
                let mut update_path = self.path.clone();
                update_path.push(index.clone());
                append_segments(&mut update_path, &key, !is_quoted(&query.key));

                let written = value.map(Value::String).unwrap_or(Value::Null);
                debug!(
                    path = %join_segments(&update_path),
                    value = %written,
                    "query found no match, recording new element"
                );
                self.updates.insert(update_path, written);
                self.path.push(index);
            }
        }
        Ok(())
    }
}

fn is_quoted(node: &AnyNode) -> bool {
    matches!(node, AnyNode::Value(value) if value.quoted)
}

/// Dotted text contributes one segment per piece
fn append_segments(path: &mut Vec<Segment>, raw: &str, coerce: bool) {
    let convert = |piece: &str| {
        if coerce {
            maybe_convert_to_num(piece)
        } else {
            Segment::key(piece)
        }
    };

    if raw.contains('.') {
        path.extend(raw.split('.').map(convert));
    } else {
        path.push(convert(raw));
    }
}

/// Index of the first object element whose `key` loosely equals `value`
///
/// A missing `value` matches elements where `key` is absent or null.
pub fn find_in_array(elements: &[Value], key: &str, value: Option<&str>) -> Option<usize> {
    elements.iter().position(|element| {
        let Value::Object(fields) = element else {
            return false;
        };
        match (fields.get(key), value) {
            (field, None) => field.map_or(true, Value::is_null),
            (Some(field), Some(target)) => loose_eq(field, &Value::String(target.to_string())),
            (None, Some(_)) => false,
        }
    })
}

/// Type-coercive equality over JSON primitives (`"4"` equals `4`, `true` equals `"1"`)
///
/// Objects and arrays never compare equal.
pub fn loose_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Null, Value::Null) => true,
        (Value::String(x), Value::String(y)) => x == y,
        (Value::Number(_), Value::Number(_)) => as_number(a) == as_number(b),
        (Value::Bool(x), Value::Bool(y)) => x == y,
        (Value::Number(_), Value::String(s)) | (Value::String(s), Value::Number(_)) => {
            let n = if let Value::Number(_) = a { as_number(a) } else { as_number(b) };
            string_to_number(s).zip(n).is_some_and(|(x, y)| x == y)
        }
        (Value::Bool(flag), other) | (other, Value::Bool(flag)) => {
            if other.is_null() || other.is_object() || other.is_array() {
                return false;
            }
            loose_eq(&Value::from(u8::from(*flag)), other)
        }
        _ => false,
    }
}

fn as_number(value: &Value) -> Option<f64> {
    value.as_f64()
}

/// Numeric reading of a string; blank strings read as zero
fn string_to_number(s: &str) -> Option<f64> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Some(0.0);
    }
    trimmed.parse::<f64>().ok().filter(|n| !n.is_nan())
}

/// Path text for a scalar value; integral floats print without a fraction
pub fn scalar_to_string(value: &Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s.clone()),
        Value::Bool(b) => Ok(b.to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                return Ok(i.to_string());
            }
            if let Some(u) = n.as_u64() {
                return Ok(u.to_string());
            }
            match n.as_f64() {
                Some(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 1e15 => {
                    Ok(format!("{}", f as i64))
                }
                Some(f) => Ok(f.to_string()),
                None => Ok(n.to_string()),
            }
        }
        other => Err(ViewbindError::NotScalar {
            found: value_type(other).to_string(),
        }),
    }
}

pub(crate) fn value_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::ast::{to_nested, to_path, to_query, to_quoted_value, to_value};
    use serde_json::json;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::sync::Arc;

    /// Path-keyed fixture; converts values without re-normalizing
    #[derive(Default)]
    struct Fixture {
        values: HashMap<String, Value>,
        reads: RefCell<Vec<String>>,
    }

    impl Fixture {
        fn with(mut self, path: &str, value: Value) -> Self {
            self.values.insert(path.to_string(), value);
            self
        }
    }

    impl ResolveOptions for Fixture {
        fn get_value(&self, path: &[Segment]) -> Result<Option<Value>> {
            let key = join_segments(path);
            self.reads.borrow_mut().push(key.clone());
            Ok(self.values.get(&key).cloned())
        }

        fn evaluate(&self, expression: &str) -> Result<Option<Value>> {
            Ok(Some(Value::String(expression.replace("()", ""))))
        }

        fn convert_to_path(&self, value: Option<Value>) -> Result<String> {
            scalar_to_string(&value.ok_or(ViewbindError::Undefined)?)
        }
    }

    fn resolve(ast: &PathNode, fixture: &Fixture) -> Result<NormalizedResult> {
        resolve_binding_ast(ast, fixture, None)
    }

    #[test]
    fn values_coerce_unless_quoted() {
        let fixture = Fixture::default();
        let ast = to_path(vec![to_value("foo"), to_value("01"), to_quoted_value("02")]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(
            result.path,
            vec![Segment::key("foo"), Segment::Index(1), Segment::key("02")]
        );
        assert!(result.updates.is_empty());
    }

    #[test]
    fn nested_reference_reads_model() {
        let fixture = Fixture::default().with("bar", json!("baz.2"));
        let ast = to_path(vec![to_value("foo"), to_nested(vec![to_value("bar")])]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(join_segments(&result.path), "foo.baz.2");
        assert_eq!(result.path[2], Segment::Index(2));
    }

    #[test]
    fn nested_undefined_is_wrapped() {
        let fixture = Fixture::default();
        let ast = to_path(vec![to_nested(vec![to_value("missing")])]);
        let err = resolve(&ast, &fixture).unwrap_err();
        assert!(matches!(err, ViewbindError::SegmentResolution { ref segment, .. } if segment == "missing"));
        assert!(matches!(err.root_cause(), ViewbindError::Undefined));
    }

    #[test]
    fn expressions_are_evaluated() {
        let fixture = Fixture::default();
        let ast = to_path(vec![to_value("foo"), crate::binding::ast::to_expression("bar()")]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(join_segments(&result.path), "foo.bar");
    }

    #[test]
    fn query_hit_pushes_index() {
        let fixture = Fixture::default().with("foo", json!([{ "bar": "x" }, { "bar": "baz" }]));
        let ast = to_path(vec![
            to_value("foo"),
            to_query(to_value("bar"), Some(to_value("baz"))),
        ]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(join_segments(&result.path), "foo.1");
        assert!(result.updates.is_empty());
    }

    #[test]
    fn query_miss_records_update() {
        let fixture = Fixture::default().with("foo", json!([{ "bar": "blah" }]));
        let ast = to_path(vec![
            to_value("foo"),
            to_query(to_value("bar"), Some(to_value("baz"))),
            to_value("other"),
        ]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(join_segments(&result.path), "foo.1.other");
        assert_eq!(result.updates.len(), 1);
        assert_eq!(result.updates.get("foo.1.bar"), Some(&json!("baz")));
    }

    #[test]
    fn query_on_non_array_is_empty() {
        let fixture = Fixture::default().with("foo", json!({ "not": "array" }));
        let ast = to_path(vec![
            to_value("foo"),
            to_query(to_value("bar"), Some(to_value("baz"))),
        ]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(join_segments(&result.path), "foo.0");
        assert_eq!(result.updates.get("foo.0.bar"), Some(&json!("baz")));
    }

    #[test]
    fn query_without_value_matches_absent_key() {
        let items = json!([{ "bar": 1 }, { "other": true }]);
        let elements = items.as_array().unwrap();
        assert_eq!(find_in_array(elements, "bar", None), Some(1));

        let fixture = Fixture::default();
        let ast = to_path(vec![to_value("foo"), to_query(to_value("bar"), None)]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(result.updates.get("foo.0.bar"), Some(&Value::Null));
    }

    #[test]
    fn concatenated_joins_parts() {
        let fixture = Fixture::default().with("world", json!("there"));
        let ast = to_path(vec![crate::binding::ast::to_concatenated_node(vec![
            to_value("hello_"),
            to_nested(vec![to_value("world")]),
        ])]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(result.path, vec![Segment::key("hello_there")]);
    }

    #[test]
    fn concatenated_numbers_stay_a_string_key() {
        let fixture = Fixture::default().with("a", json!(1)).with("b", json!(2));
        let ast = to_path(vec![
            to_value("x"),
            crate::binding::ast::to_concatenated_node(vec![
                to_nested(vec![to_value("a")]),
                to_nested(vec![to_value("b")]),
            ]),
        ]);
        let result = resolve(&ast, &fixture).unwrap();
        assert_eq!(result.path, vec![Segment::key("x"), Segment::key("12")]);
    }

    #[test]
    fn query_inside_concatenation_is_unsupported() {
        let fixture = Fixture::default();
        let ast = to_path(vec![crate::binding::ast::to_concatenated_node(vec![
            to_value("a"),
            to_query(to_value("b"), None),
        ])]);
        let err = resolve(&ast, &fixture).unwrap_err();
        assert!(matches!(err, ViewbindError::UnsupportedNode { ref node } if node == "Query"));
    }

    #[test]
    fn hook_rewrites_top_level_nodes_only() {
        let fixture = Fixture::default().with("bar", json!("baz"));
        fn rename(node: AnyNode, _ctx: &ResolveContext<'_>) -> AnyNode {
            match node {
                AnyNode::Value(ref v) if v.value == "foo" => to_value("renamed"),
                other => other,
            }
        }

        let mut hook: WaterfallHook<BeforeResolveNode> = WaterfallHook::new();
        hook.tap("rename", Arc::new(rename));

        let ast = to_path(vec![to_value("foo"), to_nested(vec![to_value("bar")])]);
        let result = resolve_binding_ast(&ast, &fixture, Some(&hook)).unwrap();
        assert_eq!(join_segments(&result.path), "renamed.baz");
        assert_eq!(*fixture.reads.borrow(), vec!["bar".to_string()]);
    }

    #[test]
    fn loose_equality() {
        assert!(loose_eq(&json!(4), &json!("4")));
        assert!(loose_eq(&json!("4.0"), &json!(4)));
        assert!(loose_eq(&json!(true), &json!("1")));
        assert!(loose_eq(&json!(false), &json!(0)));
        assert!(loose_eq(&json!(0), &json!("")));
        assert!(loose_eq(&json!(null), &json!(null)));
        assert!(!loose_eq(&json!(null), &json!("null")));
        assert!(!loose_eq(&json!("a"), &json!("b")));
        assert!(!loose_eq(&json!(true), &json!("true")));
        assert!(!loose_eq(&json!({}), &json!("[object Object]")));
        assert!(!loose_eq(&json!([1]), &json!([1])));
    }

    #[test]
    fn scalar_conversion() {
        assert_eq!(scalar_to_string(&json!("a.b")).unwrap(), "a.b");
        assert_eq!(scalar_to_string(&json!(3)).unwrap(), "3");
        assert_eq!(scalar_to_string(&json!(3.0)).unwrap(), "3");
        assert_eq!(scalar_to_string(&json!(1.5)).unwrap(), "1.5");
        assert_eq!(scalar_to_string(&json!(false)).unwrap(), "false");
        assert!(matches!(
            scalar_to_string(&json!({ "a": 1 })),
            Err(ViewbindError::NotScalar { ref found }) if found == "object"
        ));
        assert!(matches!(
            scalar_to_string(&Value::Null),
            Err(ViewbindError::NotScalar { .. })
        ));
    }

    #[test]
    fn updates_dedupe_by_key() {
        let mut updates = Updates::new();
        updates.insert(vec![Segment::key("a"), Segment::Index(0)], json!(1));
        updates.insert(vec![Segment::key("b")], json!(2));

        let mut later = Updates::new();
        later.insert(vec![Segment::key("a"), Segment::Index(0)], json!(3));
        updates.merge(later);

        assert_eq!(updates.len(), 2);
        assert_eq!(updates.keys().collect::<Vec<_>>(), vec!["a.0", "b"]);
        assert_eq!(updates.get("a.0"), Some(&json!(3)));
    }
}
