//! # View Parser Plugins
//!
//! Plugins extend a [`ViewParser`] by tapping its hooks.
//!
//! | Plugin | Classifies | Produces |
//! |--------|------------|----------|
//! | [`ApplicabilityPlugin`] | objects with an `applicability` key | `Applicability` |
//! | [`SwitchPlugin`] | objects with `staticSwitch` / `dynamicSwitch` | `Switch` (static ones resolved while parsing) |
//! | [`TemplatePlugin`] | the `template` property key | `Template`, expanded to `MultiNode` when static |
//!
//! ## Applying plugins
//!
//! ```rust
//! use serde_json::json;
//! use viewbind::view::{ApplicabilityPlugin, NodeType, ViewParser};
//!
//! let parser = ViewParser::new().with_plugin(&ApplicabilityPlugin);
//! let ast = parser
//!     .parse_object(&json!({ "applicability": "{{show}}", "label": "hi" }))
//!     .unwrap();
//! assert_eq!(ast.root().node_type(), NodeType::Applicability);
//! ```

mod applicability;
mod switch;
mod template;

pub use applicability::ApplicabilityPlugin;
pub use switch::{SwitchEvaluator, SwitchPlugin};
pub use template::{
    ResolveTemplateSubstitutions, TemplateItemInfo, TemplatePlugin, TemplatePluginHooks,
    TemplateSubstitution,
};

use super::parser::ViewParser;

/// Something that taps a parser's hooks
pub trait ViewPlugin {
    fn apply_parser(&self, parser: &mut ViewParser);
}
