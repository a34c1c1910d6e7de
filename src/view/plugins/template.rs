//! Static template expansion
//!
//! A template descriptor `{ data, output, value }` maps every element of the
//! array at `data` through `value`. Each copy has `_index_` (or
//! `_index{depth}_` inside nested templates) replaced by the element's index
//! and is parsed one template level deeper. The copies become a
//! non-overriding `MultiNode`.

use std::sync::Arc;

use regex::Regex;
use serde_json::Value;
use tracing::{debug, warn};

use crate::binding::BindingParser;
use crate::data::DataModel;
use crate::hooks::WaterfallHook;
use crate::view::node::{ChildrenType, NodeArena, NodeId, NodeKind, NodeType, ParseObjectOptions};
use crate::view::parser::{is_truthy, ViewParser};

use super::ViewPlugin;

/// Find-and-replace applied to the serialized template body
#[derive(Debug, Clone)]
pub struct TemplateSubstitution {
    pub expression: Regex,
    pub value: String,
}

/// The element a template copy is being produced for
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateItemInfo {
    pub index: usize,
    pub data: Value,
    pub depth: usize,
}

pub type ResolveTemplateSubstitutions =
    dyn Fn(Vec<TemplateSubstitution>, &TemplateItemInfo) -> Vec<TemplateSubstitution> + Send + Sync;

#[derive(Debug, Default, Clone)]
pub struct TemplatePluginHooks {
    /// Extend or replace the per-element substitutions
    pub resolve_template_substitutions: WaterfallHook<ResolveTemplateSubstitutions>,
}

pub struct TemplatePlugin {
    bindings: Arc<BindingParser>,
    model: Arc<dyn DataModel>,
    pub hooks: TemplatePluginHooks,
}

impl TemplatePlugin {
    pub fn new(bindings: Arc<BindingParser>, model: Arc<dyn DataModel>) -> Self {
        Self {
            bindings,
            model,
            hooks: TemplatePluginHooks::default(),
        }
    }

    pub fn tap_resolve_template_substitutions(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(Vec<TemplateSubstitution>, &TemplateItemInfo) -> Vec<TemplateSubstitution>
            + Send
            + Sync
            + 'static,
    ) {
        self.hooks
            .resolve_template_substitutions
            .tap(name, Arc::new(handler));
    }
}

impl std::fmt::Debug for TemplatePlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TemplatePlugin")
            .field("hooks", &self.hooks)
            .finish_non_exhaustive()
    }
}

/// State captured by the parser hooks
#[derive(Clone)]
struct Expander {
    bindings: Arc<BindingParser>,
    model: Arc<dyn DataModel>,
    hooks: TemplatePluginHooks,
}

impl Expander {
    fn expand(&self, parser: &ViewParser, arena: &mut NodeArena, template: NodeId) -> Option<NodeId> {
        let NodeKind::Template {
            data,
            template: body,
            depth,
            ..
        } = arena[template].kind.clone()
        else {
            return Some(template);
        };

        let binding = match self.bindings.parse(data.as_str()) {
            Ok(binding) => binding,
            Err(e) => {
                warn!(data = %data, error = %e, "template data binding does not resolve");
                return None;
            }
        };

        let items = match self.model.get(&binding) {
            Some(Value::Array(items)) => items,
            Some(other) if is_truthy(&other) => {
                warn!(data = %data, "template data is not an array");
                return None;
            }
            _ => return None,
        };

        let source = match serde_json::to_string(&body) {
            Ok(source) => source,
            Err(e) => {
                warn!(error = %e, "template body cannot be serialized");
                return None;
            }
        };
        let options = ParseObjectOptions {
            template_depth: depth + 1,
        };

        let mut values = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            let info = TemplateItemInfo {
                index,
                data: item,
                depth,
            };
            let substitutions = self
                .hooks
                .resolve_template_substitutions
                .call(index_substitution(index, depth), |resolve, current| {
                    resolve(current, &info)
                });

            let mut expanded = source.clone();
            for TemplateSubstitution { expression, value } in &substitutions {
                expanded = expression
                    .replace_all(&expanded, regex::NoExpand(value.as_str()))
                    .into_owned();
            }

            let copy: Value = match serde_json::from_str(&expanded) {
                Ok(copy) => copy,
                Err(e) => {
                    warn!(index, error = %e, "substituted template is not valid JSON");
                    continue;
                }
            };

            if let Some(parsed) = parser.parse_object_into(arena, &copy, ChildrenType::Value, &options) {
                values.push(parsed);
            }
        }

        debug!(data = %data, copies = values.len(), "template expanded");
        Some(arena.alloc(NodeKind::MultiNode {
            override_: false,
            values,
        }))
    }
}

/// `_index_` at depth 0, `_index{depth}_` below
fn index_substitution(index: usize, depth: usize) -> Vec<TemplateSubstitution> {
    let marker = if depth == 0 {
        "_index_".to_string()
    } else {
        format!("_index{}_", depth)
    };

    match Regex::new(&regex::escape(&marker)) {
        Ok(expression) => vec![TemplateSubstitution {
            expression,
            value: index.to_string(),
        }],
        Err(_) => Vec::new(),
    }
}

impl ViewPlugin for TemplatePlugin {
    fn apply_parser(&self, parser: &mut ViewParser) {
        let expander = Expander {
            bindings: Arc::clone(&self.bindings),
            model: Arc::clone(&self.model),
            hooks: self.hooks.clone(),
        };

        parser.tap_on_create_ast_node("template", move |parser, arena, node, _| {
            let id = node?;
            if matches!(arena[id].kind, NodeKind::Template { dynamic: false, .. }) {
                expander.expand(parser, arena, id)
            } else {
                node
            }
        });

        parser.tap_determine_node_type("template", |obj| {
            (obj.as_str() == Some("template")).then_some(NodeType::Template)
        });

        parser.tap_parse_node("template", |parser, arena, obj, _ty, options, node_type| {
            if node_type != Some(NodeType::Template) {
                return None;
            }
            let kind = NodeKind::Template {
                data: obj.get("data").and_then(Value::as_str).unwrap_or_default().to_string(),
                template: obj.get("value").cloned().unwrap_or(Value::Null),
                depth: options.template_depth,
                dynamic: obj.get("dynamic").and_then(Value::as_bool).unwrap_or(false),
            };
            parser.create_ast_node(arena, kind, obj)
        });
    }
}
