use serde_json::{Map, Value};

use crate::view::node::{NodeKind, NodeType};
use crate::view::parser::ViewParser;

use super::ViewPlugin;

const APPLICABILITY_KEY: &str = "applicability";

/// Wraps objects carrying an `applicability` expression
#[derive(Debug, Default, Clone, Copy)]
pub struct ApplicabilityPlugin;

impl ViewPlugin for ApplicabilityPlugin {
    fn apply_parser(&self, parser: &mut ViewParser) {
        parser.tap_determine_node_type("applicability", |obj| {
            obj.as_object()
                .is_some_and(|fields| fields.contains_key(APPLICABILITY_KEY))
                .then_some(NodeType::Applicability)
        });

        parser.tap_parse_node(
            "applicability",
            |parser, arena, obj, ty, options, node_type| {
                if node_type != Some(NodeType::Applicability) {
                    return None;
                }
                let fields = obj.as_object()?;
                let expression = fields.get(APPLICABILITY_KEY).cloned().unwrap_or(Value::Null);

                let rest: Map<String, Value> = fields
                    .iter()
                    .filter(|(key, _)| key.as_str() != APPLICABILITY_KEY)
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect();

                let value = parser.parse_object_into(arena, &Value::Object(rest), ty, options)?;
                let node = parser.create_ast_node(
                    arena,
                    NodeKind::Applicability { expression, value },
                    obj,
                )?;

                if arena[node].node_type() == NodeType::Applicability {
                    arena.set_parent(value, node);
                }
                Some(node)
            },
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::Segment;
    use serde_json::json;

    #[test]
    fn wraps_the_remaining_object() {
        let parser = ViewParser::new().with_plugin(&ApplicabilityPlugin);
        let ast = parser
            .parse_object(&json!({
                "asset": {
                    "values": [
                        { "applicability": "{{foo}}", "value": "foo" },
                        { "value": "bar" }
                    ]
                }
            }))
            .unwrap();

        let asset = ast.root().children()[0].value;
        let multi = ast.arena[asset].children()[0].value;
        assert_eq!(ast.arena[asset].children()[0].path, vec![Segment::key("values")]);

        let NodeKind::MultiNode { values, .. } = &ast.arena[multi].kind else {
            panic!("expected a multi-node");
        };
        let NodeKind::Applicability { expression, value } = &ast.arena[values[0]].kind else {
            panic!("expected applicability");
        };
        assert_eq!(expression, &json!("{{foo}}"));
        assert_eq!(ast.arena[*value].value(), Some(&json!({ "value": "foo" })));
        assert_eq!(ast.arena[*value].parent, Some(values[0]));
        assert_eq!(ast.arena[values[0]].parent, Some(multi));
        assert_eq!(ast.arena[values[1]].node_type(), NodeType::Value);
    }

    #[test]
    fn property_position_becomes_child() {
        let parser = ViewParser::new().with_plugin(&ApplicabilityPlugin);
        let ast = parser
            .parse_object(&json!({
                "id": "root",
                "title": { "applicability": false, "asset": { "id": "t" } }
            }))
            .unwrap();

        let children = ast.root().children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].path, vec![Segment::key("title")]);
        assert_eq!(ast.arena[children[0].value].node_type(), NodeType::Applicability);
    }
}
