use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::trace;

use crate::view::node::{ChildrenType, NodeKind, NodeType, SwitchCase};
use crate::view::parser::ViewParser;

use super::ViewPlugin;

const STATIC_SWITCH: &str = "staticSwitch";
const DYNAMIC_SWITCH: &str = "dynamicSwitch";

/// Decides whether a switch case expression applies
pub type SwitchEvaluator = dyn Fn(&Value) -> bool + Send + Sync;

/// Parses `staticSwitch` / `dynamicSwitch` objects
///
/// Static switches are decided while parsing: the first case whose
/// expression evaluates true replaces the switch, no match yields `Empty`
/// (which prunes the property). Dynamic switches stay in the tree.
#[derive(Clone)]
pub struct SwitchPlugin {
    evaluate: Arc<SwitchEvaluator>,
}

impl SwitchPlugin {
    pub fn new(evaluate: impl Fn(&Value) -> bool + Send + Sync + 'static) -> Self {
        Self {
            evaluate: Arc::new(evaluate),
        }
    }
}

impl std::fmt::Debug for SwitchPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SwitchPlugin").finish_non_exhaustive()
    }
}

impl ViewPlugin for SwitchPlugin {
    fn apply_parser(&self, parser: &mut ViewParser) {
        let evaluate = Arc::clone(&self.evaluate);
        parser.tap_on_create_ast_node("switch", move |_, arena, node, _| {
            let id = node?;
            let NodeKind::Switch {
                dynamic: false,
                cases,
            } = &arena[id].kind
            else {
                return node;
            };

            let chosen = cases
                .iter()
                .find(|case| evaluate(&case.case))
                .map(|case| case.value);
            trace!(matched = chosen.is_some(), "static switch resolved");

            Some(chosen.unwrap_or_else(|| arena.alloc(NodeKind::Empty)))
        });

        parser.tap_determine_node_type("switch", |obj| {
            obj.as_object()
                .is_some_and(|fields| {
                    fields.contains_key(STATIC_SWITCH) || fields.contains_key(DYNAMIC_SWITCH)
                })
                .then_some(NodeType::Switch)
        });

        parser.tap_parse_node("switch", |parser, arena, obj, _ty, options, node_type| {
            if node_type != Some(NodeType::Switch) {
                return None;
            }
            let fields = obj.as_object()?;
            let dynamic = fields.contains_key(DYNAMIC_SWITCH);
            let content = fields
                .get(if dynamic { DYNAMIC_SWITCH } else { STATIC_SWITCH })
                .and_then(Value::as_array)
                .map(Vec::as_slice)
                .unwrap_or_default();

            let mut cases = Vec::with_capacity(content.len());
            for switch_case in content {
                let Some(case_fields) = switch_case.as_object() else {
                    continue;
                };
                let case = case_fields.get("case").cloned().unwrap_or(Value::Null);
                let body: Map<String, Value> = case_fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != "case")
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();

                if let Some(value) =
                    parser.parse_object_into(arena, &Value::Object(body), ChildrenType::Value, options)
                {
                    cases.push(SwitchCase { case, value });
                }
            }

            let switch = parser.create_ast_node(arena, NodeKind::Switch { dynamic, cases }, obj)?;

            if let NodeKind::Switch { cases, .. } = &arena[switch].kind {
                let members: Vec<_> = cases.iter().map(|case| case.value).collect();
                for member in members {
                    arena.set_parent(member, switch);
                }
            }
            Some(switch)
        });
    }
}
