//! View parser - raw content objects to a typed node tree
//!
//! Classification and construction are driven entirely by hooks:
//! - `determine_node_type` (bail): classify an object or a property key
//! - `parse_node` (bail): build a node for a classified object
//! - `on_parse_object` (waterfall): rewrite or veto (`None`) an object before its walk
//! - `on_create_ast_node` (waterfall): replace or drop (`None`) a freshly built node
//! - `on_view_parsed` (sync): observe the finished tree of `parse_view`
//!
//! Plain nested objects flatten into their parent's child paths; arrays become
//! `MultiNode`s; primitives are collected into the node's literal `value`.

use std::borrow::Cow;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};

use crate::binding::Segment;
use crate::error::{Result, ViewbindError};
use crate::hooks::{BailHook, SyncHook, WaterfallHook};

use super::node::{
    Child, ChildrenType, NodeArena, NodeId, NodeKind, NodeType, ParseObjectOptions, ViewAst,
};
use super::plugins::ViewPlugin;

pub type DetermineNodeType = dyn Fn(&Value) -> Option<NodeType> + Send + Sync;
pub type ParseNode = dyn Fn(
        &ViewParser,
        &mut NodeArena,
        &Value,
        ChildrenType,
        &ParseObjectOptions,
        Option<NodeType>,
    ) -> Option<NodeId>
    + Send
    + Sync;
pub type OnParseObject = dyn Fn(Value, ChildrenType) -> Option<Value> + Send + Sync;
pub type OnCreateAstNode =
    dyn Fn(&ViewParser, &mut NodeArena, Option<NodeId>, &Value) -> Option<NodeId> + Send + Sync;
pub type OnViewParsed = dyn Fn(&ViewAst) + Send + Sync;

#[derive(Debug, Default, Clone)]
pub struct ViewParserHooks {
    pub determine_node_type: BailHook<DetermineNodeType>,
    pub parse_node: BailHook<ParseNode>,
    pub on_parse_object: WaterfallHook<OnParseObject>,
    pub on_create_ast_node: WaterfallHook<OnCreateAstNode>,
    pub on_view_parsed: SyncHook<OnViewParsed>,
}

/// Literal payload and child nodes gathered while walking one object
#[derive(Debug, Default)]
struct NestedObj {
    value: Option<Value>,
    children: Vec<Child>,
}

#[derive(Debug, Default, Clone)]
pub struct ViewParser {
    pub hooks: ViewParserHooks,
}

impl ViewParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Let a plugin tap this parser's hooks
    pub fn with_plugin(mut self, plugin: &dyn ViewPlugin) -> Self {
        plugin.apply_parser(&mut self);
        self
    }

    pub fn tap_determine_node_type(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&Value) -> Option<NodeType> + Send + Sync + 'static,
    ) {
        self.hooks.determine_node_type.tap(name, Arc::new(handler));
    }

    pub fn tap_parse_node(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(
                &ViewParser,
                &mut NodeArena,
                &Value,
                ChildrenType,
                &ParseObjectOptions,
                Option<NodeType>,
            ) -> Option<NodeId>
            + Send
            + Sync
            + 'static,
    ) {
        self.hooks.parse_node.tap(name, Arc::new(handler));
    }

    pub fn tap_on_parse_object(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(Value, ChildrenType) -> Option<Value> + Send + Sync + 'static,
    ) {
        self.hooks.on_parse_object.tap(name, Arc::new(handler));
    }

    pub fn tap_on_create_ast_node(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&ViewParser, &mut NodeArena, Option<NodeId>, &Value) -> Option<NodeId>
            + Send
            + Sync
            + 'static,
    ) {
        self.hooks.on_create_ast_node.tap(name, Arc::new(handler));
    }

    pub fn tap_on_view_parsed(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&ViewAst) + Send + Sync + 'static,
    ) {
        self.hooks.on_view_parsed.tap(name, Arc::new(handler));
    }

    /// Parse a view; the root must come out as a `View` node
    pub fn parse_view(&self, value: &Value) -> Result<ViewAst> {
        self.parse_view_with(value, &ParseObjectOptions::default())
    }

    #[instrument(level = "debug", skip_all, fields(template_depth = options.template_depth))]
    pub fn parse_view_with(&self, value: &Value, options: &ParseObjectOptions) -> Result<ViewAst> {
        if !value.is_object() {
            return Err(ViewbindError::InvalidView {
                reason: "expected an object".to_string(),
            });
        }

        let mut arena = NodeArena::new();
        let root = self
            .parse_object_into(&mut arena, value, ChildrenType::View, options)
            .ok_or_else(|| ViewbindError::InvalidView {
                reason: "the object produced no node".to_string(),
            })?;

        let root_type = arena[root].node_type();
        if root_type != NodeType::View {
            return Err(ViewbindError::InvalidView {
                reason: format!("root parsed as {} instead of view", root_type.as_str()),
            });
        }

        let ast = ViewAst { arena, root };
        debug!(nodes = ast.reachable().len(), "view parsed");
        self.hooks.on_view_parsed.call(|observe| observe(&ast));

        Ok(ast)
    }

    /// Parse an object as a `Value` node at template depth 0
    pub fn parse_object(&self, obj: &Value) -> Option<ViewAst> {
        self.parse_object_with(obj, ChildrenType::Value, &ParseObjectOptions::default())
    }

    pub fn parse_object_with(
        &self,
        obj: &Value,
        ty: ChildrenType,
        options: &ParseObjectOptions,
    ) -> Option<ViewAst> {
        let mut arena = NodeArena::new();
        let root = self.parse_object_into(&mut arena, obj, ty, options)?;
        Some(ViewAst { arena, root })
    }

    /// Parse `obj` into an existing arena (entry point for plugins)
    pub fn parse_object_into(
        &self,
        arena: &mut NodeArena,
        obj: &Value,
        ty: ChildrenType,
        options: &ParseObjectOptions,
    ) -> Option<NodeId> {
        let node_type = self.determine_node_type(obj);
        if node_type.is_some() {
            if let Some(parsed) = self.parse_node(arena, obj, ty, options, node_type) {
                return pruned_if_empty(arena, parsed);
            }
        }

        let NestedObj { value, children } =
            self.parse_local_object(arena, ty, options, NestedObj::default(), obj, &[]);

        let base = if value.is_none() && children.is_empty() {
            None
        } else {
            let child_ids: Vec<NodeId> = children.iter().map(|child| child.value).collect();
            let id = arena.alloc(NodeKind::content(ty, value, children));
            for child in child_ids {
                arena.set_parent(child, id);
            }
            Some(id)
        };

        self.run_create_hook(arena, base, obj)
    }

    pub fn determine_node_type(&self, obj: &Value) -> Option<NodeType> {
        self.hooks.determine_node_type.call(|classify| classify(obj))
    }

    pub fn parse_node(
        &self,
        arena: &mut NodeArena,
        obj: &Value,
        ty: ChildrenType,
        options: &ParseObjectOptions,
        node_type: Option<NodeType>,
    ) -> Option<NodeId> {
        self.hooks
            .parse_node
            .call(|parse| parse(self, arena, obj, ty, options, node_type))
    }

    /// Allocate `kind` and pass it through `on_create_ast_node`
    pub fn create_ast_node(
        &self,
        arena: &mut NodeArena,
        kind: NodeKind,
        source: &Value,
    ) -> Option<NodeId> {
        let id = arena.alloc(kind);
        self.run_create_hook(arena, Some(id), source)
    }

    fn run_create_hook(
        &self,
        arena: &mut NodeArena,
        node: Option<NodeId>,
        source: &Value,
    ) -> Option<NodeId> {
        self.hooks
            .on_create_ast_node
            .call(node, |create, current| create(self, arena, current, source))
    }

    fn run_parse_object_hook<'v>(&self, obj: &'v Value, ty: ChildrenType) -> Option<Cow<'v, Value>> {
        if self.hooks.on_parse_object.is_empty() {
            return Some(Cow::Borrowed(obj));
        }
        self.hooks
            .on_parse_object
            .call(Some(obj.clone()), |hook, current| current.and_then(|v| hook(v, ty)))
            .map(Cow::Owned)
    }

    /// `obj` without its `async` key, wrapped in an `Async` node keyed by the parsed id
    fn parse_async(
        &self,
        arena: &mut NodeArena,
        obj: &Value,
        ty: ChildrenType,
        options: &ParseObjectOptions,
    ) -> Option<NodeId> {
        let Value::Object(fields) = obj else {
            return None;
        };
        let rest: Map<String, Value> = fields
            .iter()
            .filter(|(key, _)| key.as_str() != "async")
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let parsed = self.parse_object_into(arena, &Value::Object(rest), ty, options)?;
        let Some(id) = arena[parsed].node_id().map(str::to_string) else {
            debug!("async placeholder without an id, pruning");
            return None;
        };

        let async_node = self.create_ast_node(arena, NodeKind::Async { id, value: parsed }, obj)?;
        if let NodeKind::Async { value, .. } = arena[async_node].kind {
            arena.set_parent(value, async_node);
        }
        Some(async_node)
    }

    fn parse_local_object(
        &self,
        arena: &mut NodeArena,
        ty: ChildrenType,
        options: &ParseObjectOptions,
        mut acc: NestedObj,
        obj: &Value,
        path: &[Segment],
    ) -> NestedObj {
        if !obj.is_object() && !obj.is_array() {
            return NestedObj {
                value: Some(obj.clone()),
                children: Vec::new(),
            };
        }

        let Some(local) = self.run_parse_object_hook(obj, ty) else {
            return acc;
        };

        let entries: Vec<(Segment, &Value)> = match local.as_ref() {
            Value::Object(fields) => fields
                .iter()
                .map(|(key, value)| (Segment::key(key.as_str()), value))
                .collect(),
            Value::Array(items) => items
                .iter()
                .enumerate()
                .map(|(i, value)| (Segment::from(i), value))
                .collect(),
            _ => Vec::new(),
        };

        for (key, local_value) in entries {
            let mut child_path = path.to_vec();
            child_path.push(key.clone());

            if key.as_key() == Some("asset") && local_value.is_object() {
                if let Some(asset) =
                    self.parse_object_into(arena, local_value, ChildrenType::Asset, options)
                {
                    acc.children.push(Child::new(child_path, asset));
                }
                continue;
            }

            if let (Some(name), Value::Array(descriptors)) = (key.as_key(), local_value) {
                if self.determine_node_type(&Value::String(name.to_string()))
                    == Some(NodeType::Template)
                {
                    for descriptor in descriptors {
                        self.push_template(arena, options, &mut acc, path, descriptor);
                    }
                    continue;
                }
            }

            if is_truthy(local_value)
                && self.determine_node_type(local_value) == Some(NodeType::Switch)
            {
                if let Some(switch) = self
                    .parse_node(
                        arena,
                        local_value,
                        ChildrenType::Value,
                        options,
                        Some(NodeType::Switch),
                    )
                    .and_then(|switch| pruned_if_empty(arena, switch))
                {
                    acc.children.push(flatten_switch(arena, switch, child_path));
                }
                continue;
            }

            if local_value
                .as_object()
                .is_some_and(|fields| fields.contains_key("async"))
            {
                if let Some(placeholder) =
                    self.parse_async(arena, local_value, ChildrenType::Value, options)
                {
                    acc.children.push(Child::new(child_path, placeholder));
                }
                continue;
            }

            if let Value::Array(items) = local_value {
                let values: Vec<NodeId> = items
                    .iter()
                    .filter_map(|item| {
                        self.parse_object_into(arena, item, ChildrenType::Value, options)
                    })
                    .collect();

                if values.is_empty() {
                    continue;
                }

                let override_ = !has_template_output(&local, &key);
                if let Some(multi) =
                    self.create_ast_node(arena, NodeKind::MultiNode { override_, values }, local_value)
                {
                    adopt_multi_node_values(arena, multi);
                    acc.children.push(Child::new(child_path, multi));
                }
                continue;
            }

            if local_value.is_object() {
                if self.determine_node_type(local_value) == Some(NodeType::Applicability) {
                    if let Some(applicability) = self.parse_node(
                        arena,
                        local_value,
                        ChildrenType::Value,
                        options,
                        Some(NodeType::Applicability),
                    ) {
                        acc.children.push(Child::new(child_path, applicability));
                    }
                } else {
                    acc = self.parse_local_object(arena, ty, options, acc, local_value, &child_path);
                }
                continue;
            }

            set_in(&mut acc.value, &child_path, local_value.clone());
        }

        acc
    }

    /// Build one template descriptor (`{ data, output, value, dynamic }`)
    fn push_template(
        &self,
        arena: &mut NodeArena,
        options: &ParseObjectOptions,
        acc: &mut NestedObj,
        path: &[Segment],
        descriptor: &Value,
    ) {
        let Some(output) = descriptor.get("output").and_then(output_segment) else {
            warn!("template descriptor without an output key, skipping");
            return;
        };

        let kind = NodeKind::Template {
            data: descriptor
                .get("data")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            template: descriptor.get("value").cloned().unwrap_or(Value::Null),
            depth: options.template_depth,
            dynamic: descriptor
                .get("dynamic")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        };

        if let Some(template) = self.create_ast_node(arena, kind, descriptor) {
            adopt_multi_node_values(arena, template);

            let mut child_path = path.to_vec();
            child_path.push(output);
            acc.children.push(Child::new(child_path, template));
        }
    }
}

/// An `Empty` node stands for a deliberately pruned subtree
fn pruned_if_empty(arena: &NodeArena, id: NodeId) -> Option<NodeId> {
    (arena[id].node_type() != NodeType::Empty).then_some(id)
}

fn output_segment(output: &Value) -> Option<Segment> {
    match output {
        Value::String(key) => Some(Segment::key(key.as_str())),
        Value::Number(n) => n.as_i64().map(Segment::Index),
        _ => None,
    }
}

/// Point a MultiNode's members at the MultiNode itself
fn adopt_multi_node_values(arena: &mut NodeArena, id: NodeId) {
    if let NodeKind::MultiNode { values, .. } = &arena[id].kind {
        for value in values.clone() {
            arena.set_parent(value, id);
        }
    }
}

/// A switch that resolved to a bare value wrapper with one child contributes
/// that child directly
fn flatten_switch(arena: &NodeArena, switch: NodeId, mut path: Vec<Segment>) -> Child {
    if let NodeKind::Value {
        value: None,
        children,
    } = &arena[switch].kind
    {
        if let [only] = children.as_slice() {
            path.extend(only.path.iter().cloned());
            return Child {
                path,
                array: only.array,
                value: only.value,
            };
        }
    }
    Child::new(path, switch)
}

fn has_template_output(obj: &Value, key: &Segment) -> bool {
    let Some(name) = key.as_key() else {
        return false;
    };
    obj.get("template")
        .and_then(Value::as_array)
        .is_some_and(|templates| {
            templates
                .iter()
                .any(|t| t.get("output").and_then(Value::as_str) == Some(name))
        })
}

/// JavaScript truthiness of a JSON value
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Deep-set `value` at `path`, creating objects for keys and arrays for indices
fn set_in(target: &mut Option<Value>, path: &[Segment], value: Value) {
    let mut current = target.get_or_insert(Value::Null);
    for segment in path {
        current = slot(current, segment);
    }
    *current = value;
}

fn slot<'v>(current: &'v mut Value, segment: &Segment) -> &'v mut Value {
    let index = segment.as_index().and_then(|i| usize::try_from(i).ok());

    let fits = matches!(
        (index, &*current),
        (_, Value::Object(_)) | (Some(_), Value::Array(_))
    );
    if !fits {
        *current = match index {
            Some(_) => Value::Array(Vec::new()),
            None => Value::Object(Map::new()),
        };
    }

    match (current, index) {
        (Value::Object(fields), _) => fields.entry(segment.to_string()).or_insert(Value::Null),
        (Value::Array(items), Some(i)) => {
            if items.len() <= i {
                items.resize(i + 1, Value::Null);
            }
            &mut items[i]
        }
        (other, _) => other,
    }
}
