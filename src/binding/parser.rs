//! Binding parser - raw binding syntax to canonical, cached `Binding`s
//!
//! Resolution pipeline:
//! - Simple dotted paths (`foo.bar-baz.0`) skip the grammar entirely
//! - Everything else is parsed once (AST cached per raw string) and resolved
//!   against the host's `get`/`evaluate` callbacks
//! - Queries that miss produce updates, written through `set` before the
//!   binding is returned (unless read-only)
//! - The canonical string is interned, so equal paths share one instance

use std::cell::RefCell;
use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::cache::{CacheStrategy, KeyedCache};
use crate::data::DataModel;
use crate::error::{Result, ViewbindError};
use crate::hooks::{BailHook, WaterfallHook};

use super::ast::{AnyNode, PathNode};
use super::grammar;
use super::instance::{Binding, BindingLike, BindingStore};
use super::resolve::{
    resolve_binding_ast, scalar_to_string, BeforeResolveNode, NormalizedResult, ResolveContext,
    ResolveOptions, Updates,
};
use super::segment::{join_segments, split_coerced, Segment};

/// Dotted word/dash/@ segments that need no grammar parsing
static SIMPLE_BINDING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-@]+(\.[A-Za-z0-9_\-@]+)*$").unwrap());

pub type GetFn = dyn Fn(&Binding) -> Result<Option<Value>> + Send + Sync;
pub type SetFn = dyn Fn(&[(Binding, Value)]) -> Result<()> + Send + Sync;
pub type EvaluateFn = dyn Fn(&str) -> Result<Option<Value>> + Send + Sync;

/// Signature of the `skip_optimization` bail hook
pub type SkipOptimization = dyn Fn(&str) -> Option<bool> + Send + Sync;

/// Host callbacks and flags used while resolving bindings
#[derive(Clone)]
pub struct BindingParserOptions {
    pub get: Arc<GetFn>,
    pub set: Arc<SetFn>,
    pub evaluate: Arc<EvaluateFn>,
    /// Never write query defaults back through `set`
    pub read_only: bool,
}

impl Default for BindingParserOptions {
    fn default() -> Self {
        Self {
            get: Arc::new(|_: &Binding| Err(ViewbindError::NotImplemented { operation: "get" })),
            set: Arc::new(|_: &[(Binding, Value)]| Err(ViewbindError::NotImplemented { operation: "set" })),
            evaluate: Arc::new(|_: &str| Err(ViewbindError::NotImplemented { operation: "evaluate" })),
            read_only: false,
        }
    }
}

impl BindingParserOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read and write through a data model
    pub fn with_model(model: Arc<dyn DataModel>) -> Self {
        let reader = Arc::clone(&model);
        Self::default()
            .get(move |binding| reader.get(binding))
            .set(move |transaction| model.set(transaction))
    }

    pub fn get(mut self, get: impl Fn(&Binding) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.get = Arc::new(move |binding: &Binding| Ok(get(binding)));
        self
    }

    pub fn set(mut self, set: impl Fn(&[(Binding, Value)]) + Send + Sync + 'static) -> Self {
        self.set = Arc::new(move |transaction: &[(Binding, Value)]| {
            set(transaction);
            Ok(())
        });
        self
    }

    pub fn evaluate(mut self, evaluate: impl Fn(&str) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.evaluate = Arc::new(move |expression: &str| Ok(evaluate(expression)));
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    fn merged(&self, overrides: &ParseOverrides) -> Self {
        Self {
            get: overrides.get.clone().unwrap_or_else(|| Arc::clone(&self.get)),
            set: overrides.set.clone().unwrap_or_else(|| Arc::clone(&self.set)),
            evaluate: overrides
                .evaluate
                .clone()
                .unwrap_or_else(|| Arc::clone(&self.evaluate)),
            read_only: overrides.read_only.unwrap_or(self.read_only),
        }
    }
}

impl fmt::Debug for BindingParserOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingParserOptions")
            .field("read_only", &self.read_only)
            .finish_non_exhaustive()
    }
}

/// Per-call replacements for the parser's options
#[derive(Clone, Default)]
pub struct ParseOverrides {
    pub get: Option<Arc<GetFn>>,
    pub set: Option<Arc<SetFn>>,
    pub evaluate: Option<Arc<EvaluateFn>>,
    pub read_only: Option<bool>,
}

impl ParseOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(mut self, get: impl Fn(&Binding) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.get = Some(Arc::new(move |binding: &Binding| Ok(get(binding))));
        self
    }

    pub fn set(mut self, set: impl Fn(&[(Binding, Value)]) + Send + Sync + 'static) -> Self {
        self.set = Some(Arc::new(move |transaction: &[(Binding, Value)]| {
            set(transaction);
            Ok(())
        }));
        self
    }

    pub fn evaluate(mut self, evaluate: impl Fn(&str) -> Option<Value> + Send + Sync + 'static) -> Self {
        self.evaluate = Some(Arc::new(move |expression: &str| Ok(evaluate(expression))));
        self
    }

    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }
}

/// Extension points of the binding parser
#[derive(Default)]
pub struct BindingParserHooks {
    /// Return `Some(true)` to force grammar parsing of a simple path
    pub skip_optimization: BailHook<SkipOptimization>,
    /// Rewrite each top-level node before it is resolved
    pub before_resolve_node: WaterfallHook<BeforeResolveNode>,
}

/// Parses raw binding syntax into canonical bindings
///
/// Owns its AST cache and binding cache; two parsers never share instances.
pub struct BindingParser {
    options: BindingParserOptions,
    parse_cache: KeyedCache<Arc<PathNode>>,
    store: Arc<BindingStore>,
    pub hooks: BindingParserHooks,
}

impl Default for BindingParser {
    fn default() -> Self {
        Self::new(BindingParserOptions::default())
    }
}

impl BindingParser {
    pub fn new(options: BindingParserOptions) -> Self {
        Self::with_cache(options, CacheStrategy::Unbounded)
    }

    pub fn with_cache(options: BindingParserOptions, strategy: CacheStrategy) -> Self {
        Self {
            options,
            parse_cache: KeyedCache::new(strategy),
            store: BindingStore::new(strategy),
            hooks: BindingParserHooks::default(),
        }
    }

    pub fn options(&self) -> &BindingParserOptions {
        &self.options
    }

    pub fn tap_skip_optimization(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(&str) -> Option<bool> + Send + Sync + 'static,
    ) {
        self.hooks.skip_optimization.tap(name, Arc::new(handler));
    }

    pub fn tap_before_resolve_node(
        &mut self,
        name: impl Into<String>,
        handler: impl Fn(AnyNode, &ResolveContext<'_>) -> AnyNode + Send + Sync + 'static,
    ) {
        self.hooks.before_resolve_node.tap(name, Arc::new(handler));
    }

    /// Parse with the parser's own options
    pub fn parse<'a>(&self, raw: impl Into<BindingLike<'a>>) -> Result<Binding> {
        self.parse_with(raw, &ParseOverrides::default())
    }

    /// Parse with some options replaced for this call only
    pub fn parse_with<'a>(
        &self,
        raw: impl Into<BindingLike<'a>>,
        overrides: &ParseOverrides,
    ) -> Result<Binding> {
        let raw = match raw.into() {
            BindingLike::Binding(binding) => return Ok(binding),
            other => other,
        };

        let options = self.options.merged(overrides);
        let joined = raw.joined();
        self.parse_raw(&joined, &options)
    }

    #[instrument(level = "debug", skip(self, options), fields(read_only = options.read_only))]
    fn parse_raw(&self, raw: &str, options: &BindingParserOptions) -> Result<Binding> {
        let session = ResolveSession {
            parser: self,
            options,
            updates: RefCell::new(Updates::new()),
        };

        let normalized = self.normalize_path(raw, &session)?;

        let mut updates = session.updates.into_inner();
        updates.merge(normalized.updates);

        if !options.read_only && !updates.is_empty() {
            let transaction: Vec<(Binding, Value)> = updates
                .into_iter()
                .map(|update| (self.store.intern(update.path), update.value))
                .collect();
            debug!(writes = transaction.len(), "materializing query defaults");
            (options.set)(&transaction)?;
        }

        Ok(self.store.intern(normalized.path))
    }

    /// Raw string to canonical segments plus pending updates
    fn normalize_path(&self, path: &str, options: &dyn ResolveOptions) -> Result<NormalizedResult> {
        if SIMPLE_BINDING.is_match(path)
            && self.hooks.skip_optimization.call(|skip| skip(path)) != Some(true)
        {
            return Ok(NormalizedResult {
                path: split_coerced(path),
                updates: Updates::new(),
            });
        }

        let ast = self.parse_ast(path)?;

        resolve_binding_ast(&ast, options, Some(&self.hooks.before_resolve_node))
            .map_err(|e| ViewbindError::wrap_resolution(path, e))
    }

    /// Grammar AST for a raw string, memoized per parser
    pub fn parse_ast(&self, path: &str) -> Result<Arc<PathNode>> {
        if let Some(cached) = self.parse_cache.get(path) {
            return Ok(cached);
        }

        let ast = Arc::new(grammar::parse(path)?);
        self.parse_cache.insert(path, Arc::clone(&ast));
        Ok(ast)
    }

    /// Number of canonical bindings currently cached
    pub fn cached_bindings(&self) -> usize {
        self.store.len()
    }

    /// Number of parsed ASTs currently cached
    pub fn cached_asts(&self) -> usize {
        self.parse_cache.len()
    }

    pub fn clear_caches(&self) {
        self.parse_cache.clear();
        self.store.clear();
    }
}

impl fmt::Debug for BindingParser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BindingParser")
            .field("options", &self.options)
            .field("cache", &self.parse_cache.strategy())
            .field("bindings", &self.store.len())
            .field("hooks.skip_optimization", &self.hooks.skip_optimization)
            .field("hooks.before_resolve_node", &self.hooks.before_resolve_node)
            .finish()
    }
}

/// One top-level `parse` call: its options plus updates collected from
/// nested path conversions
struct ResolveSession<'a> {
    parser: &'a BindingParser,
    options: &'a BindingParserOptions,
    updates: RefCell<Updates>,
}

impl ResolveOptions for ResolveSession<'_> {
    fn get_value(&self, path: &[Segment]) -> Result<Option<Value>> {
        let binding = self.parser.store.intern(path.to_vec());
        (self.options.get)(&binding)
    }

    fn evaluate(&self, expression: &str) -> Result<Option<Value>> {
        (self.options.evaluate)(expression)
    }

    fn convert_to_path(&self, value: Option<Value>) -> Result<String> {
        let value = value.ok_or(ViewbindError::Undefined)?;
        let text = scalar_to_string(&value)?;

        let normalized = self.parser.normalize_path(&text, self)?;
        self.updates.borrow_mut().merge(normalized.updates);

        let joined = join_segments(&normalized.path);
        if joined.is_empty() {
            return Err(ViewbindError::EmptyNestedPath);
        }
        Ok(joined)
    }
}
