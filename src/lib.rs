//! Viewbind - binding path resolution and view AST building
//!
//! - `binding`: raw binding syntax → canonical, interned [`Binding`] paths
//! - `view`: declarative JSON content → typed node tree ([`ViewAst`])
//! - `data`: the [`DataModel`] seam bindings read from and write to
//! - `hooks`: tapable bail / waterfall / sync hooks both parsers expose

pub mod binding;
pub mod cache;
pub mod config;
pub mod data;
pub mod error;
pub mod hooks;
pub mod view;

pub use binding::{
    Binding, BindingLike, BindingParser, BindingParserHooks, BindingParserOptions, ParseOverrides,
    Segment,
};
pub use cache::CacheStrategy;
pub use config::ViewbindConfig;
pub use data::{DataModel, JsonModel};
pub use error::{ErrorKind, FixSuggestion, Result, ViewbindError};
pub use view::{
    ApplicabilityPlugin, NodeKind, NodeType, SwitchPlugin, TemplatePlugin, ViewAst, ViewParser,
    ViewPlugin,
};
