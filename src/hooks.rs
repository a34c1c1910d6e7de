//! Hook registries - ordered, named callback slots
//!
//! Three invocation semantics:
//! - `BailHook`: taps run in order, the first `Some` result wins
//! - `WaterfallHook`: each tap transforms the previous tap's output, starting from a seed
//! - `SyncHook`: every tap runs for its side effects
//!
//! Hooks are generic over the trait-object type of their handlers
//! (e.g. `dyn Fn(&str) -> Option<bool> + Send + Sync`), so each registry
//! carries its own call signature. Owners expose typed `tap_*` helpers.

use std::fmt;
use std::sync::Arc;

/// A named handler registered on a hook
pub struct Tap<F: ?Sized> {
    pub name: String,
    pub handler: Arc<F>,
}

impl<F: ?Sized> Clone for Tap<F> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            handler: Arc::clone(&self.handler),
        }
    }
}

/// Shared storage for all three hook flavours
struct Taps<F: ?Sized> {
    taps: Vec<Tap<F>>,
}

impl<F: ?Sized> Taps<F> {
    fn new() -> Self {
        Self { taps: Vec::new() }
    }

    fn push(&mut self, name: impl Into<String>, handler: Arc<F>) {
        self.taps.push(Tap {
            name: name.into(),
            handler,
        });
    }

    fn remove(&mut self, name: &str) -> bool {
        let before = self.taps.len();
        self.taps.retain(|tap| tap.name != name);
        self.taps.len() != before
    }

    fn names(&self) -> Vec<&str> {
        self.taps.iter().map(|tap| tap.name.as_str()).collect()
    }
}

impl<F: ?Sized> Clone for Taps<F> {
    fn clone(&self) -> Self {
        Self {
            taps: self.taps.clone(),
        }
    }
}

macro_rules! hook_registry {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        pub struct $name<F: ?Sized> {
            inner: Taps<F>,
        }

        impl<F: ?Sized> $name<F> {
            pub fn new() -> Self {
                Self { inner: Taps::new() }
            }

            /// Register a handler; handlers run in registration order
            pub fn tap(&mut self, name: impl Into<String>, handler: Arc<F>) {
                self.inner.push(name, handler);
            }

            /// Remove every handler registered under `name`
            pub fn untap(&mut self, name: &str) -> bool {
                self.inner.remove(name)
            }

            pub fn is_empty(&self) -> bool {
                self.inner.taps.is_empty()
            }

            pub fn len(&self) -> usize {
                self.inner.taps.len()
            }

            pub fn names(&self) -> Vec<&str> {
                self.inner.names()
            }
        }

        impl<F: ?Sized> Default for $name<F> {
            fn default() -> Self {
                Self::new()
            }
        }

        impl<F: ?Sized> Clone for $name<F> {
            fn clone(&self) -> Self {
                Self {
                    inner: self.inner.clone(),
                }
            }
        }

        impl<F: ?Sized> fmt::Debug for $name<F> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("taps", &self.inner.names())
                    .finish()
            }
        }
    };
}

hook_registry!(
    /// First non-`None` result short-circuits
    BailHook
);
hook_registry!(
    /// Each handler receives the previous handler's output
    WaterfallHook
);
hook_registry!(
    /// All handlers invoked unconditionally
    SyncHook
);

impl<F: ?Sized> BailHook<F> {
    /// Run taps in order until one returns `Some`
    ///
    /// `invoke` adapts the stored handler to its concrete arguments.
    pub fn call<R>(&self, mut invoke: impl FnMut(&F) -> Option<R>) -> Option<R> {
        self.inner
            .taps
            .iter()
            .find_map(|tap| invoke(tap.handler.as_ref()))
    }
}

impl<F: ?Sized> WaterfallHook<F> {
    /// Thread `seed` through every tap
    pub fn call<T>(&self, seed: T, mut invoke: impl FnMut(&F, T) -> T) -> T {
        self.inner
            .taps
            .iter()
            .fold(seed, |current, tap| invoke(tap.handler.as_ref(), current))
    }
}

impl<F: ?Sized> SyncHook<F> {
    pub fn call(&self, mut invoke: impl FnMut(&F)) {
        for tap in &self.inner.taps {
            invoke(tap.handler.as_ref());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    type Classify = dyn Fn(&str) -> Option<u8> + Send + Sync;
    type Transform = dyn Fn(i64) -> i64 + Send + Sync;
    type Observe = dyn Fn(&str) + Send + Sync;

    #[test]
    fn bail_first_some_wins() {
        let mut hook: BailHook<Classify> = BailHook::new();
        hook.tap("never", Arc::new(|_: &str| -> Option<u8> { None }));
        hook.tap("short", Arc::new(|s: &str| (s.len() < 4).then_some(1u8)));
        hook.tap("any", Arc::new(|_: &str| Some(2u8)));

        assert_eq!(hook.call(|f| f("abc")), Some(1));
        assert_eq!(hook.call(|f| f("abcdef")), Some(2));
    }

    #[test]
    fn bail_empty_returns_none() {
        let hook: BailHook<Classify> = BailHook::default();
        assert!(hook.is_empty());
        assert_eq!(hook.call(|f| f("x")), None);
    }

    #[test]
    fn waterfall_threads_values_in_order() {
        let mut hook: WaterfallHook<Transform> = WaterfallHook::new();
        hook.tap("add", Arc::new(|v: i64| v + 1));
        hook.tap("double", Arc::new(|v: i64| v * 2));

        assert_eq!(hook.call(3, |f, v| f(v)), 8);
        assert_eq!(hook.names(), vec!["add", "double"]);
    }

    #[test]
    fn sync_runs_every_tap() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut hook: SyncHook<Observe> = SyncHook::new();
        for name in ["a", "b", "c"] {
            let counter = Arc::clone(&counter);
            hook.tap(
                name,
                Arc::new(move |_: &str| {
                    counter.fetch_add(1, Ordering::SeqCst);
                }),
            );
        }

        hook.call(|f| f("event"));
        assert_eq!(counter.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn untap_removes_by_name() {
        let mut hook: WaterfallHook<Transform> = WaterfallHook::new();
        hook.tap("add", Arc::new(|v: i64| v + 1));
        hook.tap("add", Arc::new(|v: i64| v + 10));
        hook.tap("keep", Arc::new(|v: i64| v));

        assert!(hook.untap("add"));
        assert!(!hook.untap("add"));
        assert_eq!(hook.len(), 1);
        assert_eq!(hook.call(5, |f, v| f(v)), 5);
    }
}
