//! View AST nodes
//!
//! Nodes live in a `NodeArena` and refer to each other by `NodeId`. Parent
//! links are plain indices for upward lookup; ownership is the arena's.

use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::binding::Segment;

pub type NodeId = usize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeType {
    Asset,
    View,
    Applicability,
    Template,
    Value,
    MultiNode,
    Switch,
    Async,
    Unknown,
    Empty,
}

impl NodeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeType::Asset => "asset",
            NodeType::View => "view",
            NodeType::Applicability => "applicability",
            NodeType::Template => "template",
            NodeType::Value => "value",
            NodeType::MultiNode => "multi-node",
            NodeType::Switch => "switch",
            NodeType::Async => "async",
            NodeType::Unknown => "unknown",
            NodeType::Empty => "empty",
        }
    }
}

/// Node kinds a generic object walk can produce
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChildrenType {
    Asset,
    #[default]
    Value,
    View,
}

impl From<ChildrenType> for NodeType {
    fn from(ty: ChildrenType) -> Self {
        match ty {
            ChildrenType::Asset => NodeType::Asset,
            ChildrenType::Value => NodeType::Value,
            ChildrenType::View => NodeType::View,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ParseObjectOptions {
    /// How many templates enclose the object being parsed
    pub template_depth: usize,
}

/// A child node placed at `path` relative to its parent's value
#[derive(Debug, Clone, PartialEq)]
pub struct Child {
    pub path: Vec<Segment>,
    /// The path points at an array and the child's result is appended to it
    pub array: bool,
    pub value: NodeId,
}

impl Child {
    pub fn new(path: Vec<Segment>, value: NodeId) -> Self {
        Self {
            path,
            array: false,
            value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SwitchCase {
    /// Expression (or literal) deciding whether this case applies
    pub case: Value,
    pub value: NodeId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Asset {
        value: Option<Value>,
        children: Vec<Child>,
    },
    View {
        value: Option<Value>,
        children: Vec<Child>,
    },
    Value {
        value: Option<Value>,
        children: Vec<Child>,
    },
    Applicability {
        expression: Value,
        value: NodeId,
    },
    Template {
        /// Binding of the array in the data model
        data: String,
        template: Value,
        depth: usize,
        dynamic: bool,
    },
    MultiNode {
        /// Replace an overlapping target instead of amending it
        override_: bool,
        values: Vec<NodeId>,
    },
    Switch {
        dynamic: bool,
        cases: Vec<SwitchCase>,
    },
    Async {
        id: String,
        value: NodeId,
    },
    Unknown,
    Empty,
}

impl NodeKind {
    /// Literal-plus-children node of the given kind
    pub fn content(ty: ChildrenType, value: Option<Value>, children: Vec<Child>) -> Self {
        match ty {
            ChildrenType::Asset => NodeKind::Asset { value, children },
            ChildrenType::View => NodeKind::View { value, children },
            ChildrenType::Value => NodeKind::Value { value, children },
        }
    }

    pub fn node_type(&self) -> NodeType {
        match self {
            NodeKind::Asset { .. } => NodeType::Asset,
            NodeKind::View { .. } => NodeType::View,
            NodeKind::Value { .. } => NodeType::Value,
            NodeKind::Applicability { .. } => NodeType::Applicability,
            NodeKind::Template { .. } => NodeType::Template,
            NodeKind::MultiNode { .. } => NodeType::MultiNode,
            NodeKind::Switch { .. } => NodeType::Switch,
            NodeKind::Async { .. } => NodeType::Async,
            NodeKind::Unknown => NodeType::Unknown,
            NodeKind::Empty => NodeType::Empty,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AstNode {
    pub kind: NodeKind,
    /// `None` only for roots (and nodes orphaned by hooks)
    pub parent: Option<NodeId>,
}

impl AstNode {
    pub fn node_type(&self) -> NodeType {
        self.kind.node_type()
    }

    /// Literal payload of asset, view and value nodes
    pub fn value(&self) -> Option<&Value> {
        match &self.kind {
            NodeKind::Asset { value, .. }
            | NodeKind::View { value, .. }
            | NodeKind::Value { value, .. } => value.as_ref(),
            _ => None,
        }
    }

    pub fn children(&self) -> &[Child] {
        match &self.kind {
            NodeKind::Asset { children, .. }
            | NodeKind::View { children, .. }
            | NodeKind::Value { children, .. } => children,
            _ => &[],
        }
    }

    /// String `id` in the literal payload
    pub fn node_id(&self) -> Option<&str> {
        self.value()?.get("id")?.as_str()
    }

    /// Every node this one links to downward
    pub fn child_ids(&self) -> Vec<NodeId> {
        match &self.kind {
            NodeKind::Asset { children, .. }
            | NodeKind::View { children, .. }
            | NodeKind::Value { children, .. } => children.iter().map(|c| c.value).collect(),
            NodeKind::Applicability { value, .. } | NodeKind::Async { value, .. } => vec![*value],
            NodeKind::MultiNode { values, .. } => values.clone(),
            NodeKind::Switch { cases, .. } => cases.iter().map(|c| c.value).collect(),
            NodeKind::Template { .. } | NodeKind::Unknown | NodeKind::Empty => Vec::new(),
        }
    }
}

/// Owner of every node built during one parse
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeArena {
    nodes: Vec<AstNode>,
}

impl NodeArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, kind: NodeKind) -> NodeId {
        self.nodes.push(AstNode { kind, parent: None });
        self.nodes.len() - 1
    }

    pub fn get(&self, id: NodeId) -> Option<&AstNode> {
        self.nodes.get(id)
    }

    pub fn get_mut(&mut self, id: NodeId) -> Option<&mut AstNode> {
        self.nodes.get_mut(id)
    }

    pub fn node_type(&self, id: NodeId) -> Option<NodeType> {
        self.get(id).map(AstNode::node_type)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.get(id)?.parent
    }

    pub fn set_parent(&mut self, child: NodeId, parent: NodeId) {
        if let Some(node) = self.nodes.get_mut(child) {
            node.parent = Some(parent);
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &AstNode)> {
        self.nodes.iter().enumerate()
    }
}

impl Index<NodeId> for NodeArena {
    type Output = AstNode;

    fn index(&self, id: NodeId) -> &AstNode {
        &self.nodes[id]
    }
}

impl IndexMut<NodeId> for NodeArena {
    fn index_mut(&mut self, id: NodeId) -> &mut AstNode {
        &mut self.nodes[id]
    }
}

/// A parsed tree: the arena plus its root
///
/// The arena also keeps nodes that were pruned or replaced during parsing
/// (unchosen switch cases, async bodies without an id, expanded templates).
/// Only nodes reachable from `root` belong to the tree; walk it with
/// [`ViewAst::reachable`] rather than `arena.iter()`.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewAst {
    pub arena: NodeArena,
    pub root: NodeId,
}

impl ViewAst {
    pub fn root(&self) -> &AstNode {
        &self.arena[self.root]
    }

    pub fn node(&self, id: NodeId) -> Option<&AstNode> {
        self.arena.get(id)
    }

    /// Parent chain of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.arena.parent(id), move |current| {
            self.arena.parent(*current)
        })
    }

    /// Ids of the nodes in the tree, depth-first from the root
    pub fn reachable(&self) -> Vec<NodeId> {
        let mut order = Vec::new();
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let Some(node) = self.arena.get(current) else {
                continue;
            };
            order.push(current);
            stack.extend(node.child_ids().into_iter().rev());
        }
        order
    }

    /// First node (depth-first from the root) whose payload has this `id`
    pub fn find_by_id(&self, node_id: &str) -> Option<NodeId> {
        let mut stack = vec![self.root];
        while let Some(current) = stack.pop() {
            let node = self.arena.get(current)?;
            if node.node_id() == Some(node_id) {
                return Some(current);
            }
            stack.extend(node.child_ids().into_iter().rev());
        }
        None
    }

    /// Tree as JSON (parent links omitted)
    pub fn to_json(&self) -> Value {
        node_to_json(&self.arena, self.root)
    }
}

fn node_to_json(arena: &NodeArena, id: NodeId) -> Value {
    let Some(node) = arena.get(id) else {
        return Value::Null;
    };

    let mut out = Map::new();
    out.insert("type".into(), json!(node.node_type().as_str()));

    match &node.kind {
        NodeKind::Asset { value, children }
        | NodeKind::View { value, children }
        | NodeKind::Value { value, children } => {
            if let Some(value) = value {
                out.insert("value".into(), value.clone());
            }
            if !children.is_empty() {
                let children: Vec<Value> = children
                    .iter()
                    .map(|child| {
                        let mut entry = Map::new();
                        entry.insert("path".into(), json!(child.path));
                        if child.array {
                            entry.insert("array".into(), json!(true));
                        }
                        entry.insert("value".into(), node_to_json(arena, child.value));
                        Value::Object(entry)
                    })
                    .collect();
                out.insert("children".into(), Value::Array(children));
            }
        }
        NodeKind::Applicability { expression, value } => {
            out.insert("expression".into(), expression.clone());
            out.insert("value".into(), node_to_json(arena, *value));
        }
        NodeKind::Template {
            data,
            template,
            depth,
            dynamic,
        } => {
            out.insert("data".into(), json!(data));
            out.insert("template".into(), template.clone());
            out.insert("depth".into(), json!(depth));
            out.insert("dynamic".into(), json!(dynamic));
        }
        NodeKind::MultiNode { override_, values } => {
            out.insert("override".into(), json!(override_));
            out.insert(
                "values".into(),
                values.iter().map(|v| node_to_json(arena, *v)).collect(),
            );
        }
        NodeKind::Switch { dynamic, cases } => {
            out.insert("dynamic".into(), json!(dynamic));
            out.insert(
                "cases".into(),
                cases
                    .iter()
                    .map(|c| json!({ "case": c.case, "value": node_to_json(arena, c.value) }))
                    .collect(),
            );
        }
        NodeKind::Async { id, value } => {
            out.insert("id".into(), json!(id));
            out.insert("value".into(), node_to_json(arena, *value));
        }
        NodeKind::Unknown | NodeKind::Empty => {}
    }

    Value::Object(out)
}
