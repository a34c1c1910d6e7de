//! Binding Module - paths into the data model
//!
//! Turns raw binding syntax into canonical, cached `Binding`s:
//! - `segment`: integer / string path segments and numeric coercion
//! - `instance`: the immutable `Binding` value and its path relations
//! - `grammar`: raw syntax → AST (`foo[bar="baz"].{{nested}}.qux`)
//! - `resolve`: AST → canonical segments against host callbacks
//! - `parser`: caching, fast path, hooks and query write-back
//!
//! Data flow:
//! ```text
//! "foo[bar='x'].{{ref}}"
//!          ↓
//!   fast path? ── yes ──→ split on '.'
//!          ↓ no
//!   grammar::parse (cached)
//!          ↓
//!   resolve_binding_ast ──→ get / evaluate / set
//!          ↓
//!   canonical "foo.1.value" → interned Binding
//! ```

pub mod ast;
pub mod grammar;
mod instance;
mod parser;
mod resolve;
mod segment;

pub use ast::{AnyNode, PathNode};
pub use instance::{Binding, BindingLike};
pub use parser::{
    BindingParser, BindingParserHooks, BindingParserOptions, EvaluateFn, GetFn, ParseOverrides,
    SetFn, SkipOptimization,
};
pub use resolve::{
    find_in_array, loose_eq, resolve_binding_ast, scalar_to_string, BeforeResolveNode,
    NormalizedResult, ResolveContext, ResolveOptions, Update, Updates,
};
pub use segment::{join_segments, maybe_convert_to_num, split_coerced, Segment};
