//! View Module - declarative content to a typed node tree
//!
//! - `node`: node kinds, the node arena and parsed trees
//! - `parser`: the hook-driven object walk (`ViewParser`)
//! - `plugins`: applicability, switch and template handling
//!
//! ```text
//! { "id": "view", "title": { "asset": {..} }, "items": [..] }
//!          ↓  ViewParser::parse_view
//! View ─┬─ children[title.asset] → Asset
//!       └─ children[items]       → MultiNode → [Value, Value]
//! ```

pub mod node;
pub mod parser;
pub mod plugins;

pub use node::{
    AstNode, Child, ChildrenType, NodeArena, NodeId, NodeKind, NodeType, ParseObjectOptions,
    SwitchCase, ViewAst,
};
pub use parser::{is_truthy, ViewParser, ViewParserHooks};
pub use plugins::{
    ApplicabilityPlugin, SwitchPlugin, TemplateItemInfo, TemplatePlugin, TemplateSubstitution,
    ViewPlugin,
};
