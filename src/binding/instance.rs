//! Binding - an immutable, canonical path into the data model
//!
//! Segments are frozen at construction and the dot-joined form is computed
//! once. Bindings created by a `BindingParser` remember the store that made
//! them (weakly), so `parent()` and `descendent()` hand back cached instances.

use std::borrow::Cow;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Weak};

use serde::{Serialize, Serializer};

use crate::cache::{CacheStrategy, KeyedCache};

use super::segment::{join_segments, split_coerced, Segment};

struct BindingInner {
    segments: Vec<Segment>,
    joined: String,
    factory: Option<Weak<BindingStore>>,
}

/// A path in the data model
#[derive(Clone)]
pub struct Binding(Arc<BindingInner>);

impl Binding {
    /// Build a standalone binding from already-canonical segments
    pub fn from_array(segments: impl Into<Vec<Segment>>) -> Self {
        let segments = segments.into();
        let joined = join_segments(&segments);
        Self::build(segments, joined, None)
    }

    /// Build a standalone binding by splitting on `.` (no grammar parsing)
    pub fn from_dotted(raw: &str) -> Self {
        Self::from_array(split_coerced(raw))
    }

    fn build(segments: Vec<Segment>, joined: String, factory: Option<Weak<BindingStore>>) -> Self {
        Binding(Arc::new(BindingInner {
            segments,
            joined,
            factory,
        }))
    }

    pub fn as_array(&self) -> &[Segment] {
        &self.0.segments
    }

    pub fn as_str(&self) -> &str {
        &self.0.joined
    }

    pub fn len(&self) -> usize {
        self.0.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.segments.is_empty()
    }

    /// True if `other` is this path or lies underneath it
    ///
    /// Full-segment comparison: `foo` does not contain `fo`, and
    /// `foo.bar.baz` does not contain `foo.bar.bazzzz`.
    pub fn contains(&self, other: &Binding) -> bool {
        let mine = self.as_array();
        let theirs = other.as_array();

        theirs.len() >= mine.len() && mine.iter().zip(theirs).all(|(a, b)| a == b)
    }

    /// This path's segments after dropping `other`'s length-many leading segments
    pub fn relative(&self, other: &Binding) -> Vec<Segment> {
        self.as_array()
            .get(other.len()..)
            .map(<[Segment]>::to_vec)
            .unwrap_or_default()
    }

    pub fn parent(&self) -> Binding {
        let segments = self.as_array();
        let end = segments.len().saturating_sub(1);
        self.make(segments[..end].to_vec())
    }

    /// Last segment
    pub fn key(&self) -> Option<&Segment> {
        self.0.segments.last()
    }

    /// A binding underneath this one
    pub fn descendent<'a>(&self, relative: impl Into<BindingLike<'a>>) -> Binding {
        let mut segments = self.as_array().to_vec();
        segments.extend(relative.into().segments());
        self.make(segments)
    }

    /// Referential identity (same cached instance)
    pub fn ptr_eq(a: &Binding, b: &Binding) -> bool {
        Arc::ptr_eq(&a.0, &b.0)
    }

    /// Route through the store that produced this binding, if it is still alive
    fn make(&self, segments: Vec<Segment>) -> Binding {
        match self.0.factory.as_ref().and_then(Weak::upgrade) {
            Some(store) => store.intern(segments),
            None => Binding::from_array(segments),
        }
    }
}

impl PartialEq for Binding {
    fn eq(&self, other: &Self) -> bool {
        Binding::ptr_eq(self, other) || self.0.segments == other.0.segments
    }
}

impl Eq for Binding {}

impl Hash for Binding {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.segments.hash(state);
    }
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Binding").field(&self.0.joined).finish()
    }
}

impl fmt::Display for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.joined)
    }
}

impl Serialize for Binding {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Typed segments → Binding cache shared by a parser and its bindings
///
/// Keyed on segment types as well as text: `foo.1` (index) and `foo['1']`
/// (key) join to the same string but are different bindings.
pub(crate) struct BindingStore {
    cache: KeyedCache<Binding>,
}

impl BindingStore {
    pub(crate) fn new(strategy: CacheStrategy) -> Arc<Self> {
        Arc::new(Self {
            cache: KeyedCache::new(strategy),
        })
    }

    /// Return the cached binding for these segments, creating it on first use
    pub(crate) fn intern(self: &Arc<Self>, segments: Vec<Segment>) -> Binding {
        let key = typed_key(&segments);
        let factory = Arc::downgrade(self);
        self.cache.get_or_insert_with(&key, || {
            let joined = join_segments(&segments);
            Binding::build(segments, joined, Some(factory))
        })
    }

    pub(crate) fn len(&self) -> usize {
        self.cache.len()
    }

    pub(crate) fn clear(&self) {
        self.cache.clear();
    }
}

/// Length-prefixed, type-tagged encoding of a segment list
fn typed_key(segments: &[Segment]) -> String {
    let mut key = String::with_capacity(segments.len() * 10);
    for segment in segments {
        match segment {
            Segment::Index(i) => {
                key.push('#');
                key.push_str(&i.to_string());
                key.push(';');
            }
            Segment::Key(k) => {
                key.push('$');
                key.push_str(&k.len().to_string());
                key.push(':');
                key.push_str(k);
            }
        }
    }
    key
}

/// Anything that can be turned into a binding: raw syntax, segments, or a binding
#[derive(Debug, Clone)]
pub enum BindingLike<'a> {
    Raw(Cow<'a, str>),
    Segments(Cow<'a, [Segment]>),
    Binding(Binding),
}

impl BindingLike<'_> {
    /// Raw text handed to the path normalizer
    pub(crate) fn joined(&self) -> Cow<'_, str> {
        match self {
            BindingLike::Raw(raw) => Cow::Borrowed(raw.as_ref()),
            BindingLike::Segments(segments) => Cow::Owned(join_segments(segments)),
            BindingLike::Binding(binding) => Cow::Borrowed(binding.as_str()),
        }
    }

    /// Segments without grammar parsing (used for relative paths)
    pub fn segments(&self) -> Vec<Segment> {
        match self {
            BindingLike::Raw(raw) => split_coerced(raw),
            BindingLike::Segments(segments) => segments.to_vec(),
            BindingLike::Binding(binding) => binding.as_array().to_vec(),
        }
    }
}

impl<'a> From<&'a str> for BindingLike<'a> {
    fn from(raw: &'a str) -> Self {
        BindingLike::Raw(Cow::Borrowed(raw))
    }
}

impl<'a> From<&'a String> for BindingLike<'a> {
    fn from(raw: &'a String) -> Self {
        BindingLike::Raw(Cow::Borrowed(raw.as_str()))
    }
}

impl From<String> for BindingLike<'_> {
    fn from(raw: String) -> Self {
        BindingLike::Raw(Cow::Owned(raw))
    }
}

impl<'a> From<&'a [Segment]> for BindingLike<'a> {
    fn from(segments: &'a [Segment]) -> Self {
        BindingLike::Segments(Cow::Borrowed(segments))
    }
}

impl From<Vec<Segment>> for BindingLike<'_> {
    fn from(segments: Vec<Segment>) -> Self {
        BindingLike::Segments(Cow::Owned(segments))
    }
}

impl From<Binding> for BindingLike<'_> {
    fn from(binding: Binding) -> Self {
        BindingLike::Binding(binding)
    }
}

impl From<&Binding> for BindingLike<'_> {
    fn from(binding: &Binding) -> Self {
        BindingLike::Binding(binding.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn b(raw: &str) -> Binding {
        Binding::from_dotted(raw)
    }

    #[test]
    fn as_array_and_as_str() {
        let binding = b("foo.01.bar");
        assert_eq!(
            binding.as_array(),
            &[Segment::key("foo"), Segment::Index(1), Segment::key("bar")]
        );
        assert_eq!(binding.as_str(), "foo.1.bar");
        assert_eq!(binding.to_string(), "foo.1.bar");
    }

    #[test]
    fn contains_is_full_segment_prefix() {
        assert!(b("foo").contains(&b("foo")));
        assert!(b("foo").contains(&b("foo.bar")));
        assert!(!b("foo").contains(&b("fo")));
        assert!(!b("foo.bar").contains(&b("foo")));
        assert!(!b("foo.bar.baz").contains(&b("foo.bar.bazzzz")));
        assert!(b("").contains(&b("anything.at.all")));
    }

    #[test]
    fn contains_distinguishes_index_from_key() {
        let indexed = Binding::from_array(vec![Segment::key("foo"), Segment::Index(1)]);
        let keyed = Binding::from_array(vec![Segment::key("foo"), Segment::key("1")]);
        assert!(!indexed.contains(&keyed));
    }

    #[test]
    fn relative_drops_prefix() {
        assert_eq!(
            b("foo.bar.baz").relative(&b("foo")),
            vec![Segment::key("bar"), Segment::key("baz")]
        );
        assert!(b("foo").relative(&b("foo.bar.baz")).is_empty());
    }

    #[test]
    fn parent_and_key() {
        let binding = b("foo.bar.2");
        assert_eq!(binding.parent().as_str(), "foo.bar");
        assert_eq!(binding.key(), Some(&Segment::Index(2)));
        assert!(b("").parent().is_empty());
        assert_eq!(b("").key(), None);
    }

    #[test]
    fn descendent_accepts_all_shapes() {
        let base = b("foo");
        assert_eq!(base.descendent("bar.0").as_str(), "foo.bar.0");
        assert_eq!(base.descendent(vec![Segment::key("x")]).as_str(), "foo.x");
        assert_eq!(base.descendent(&b("a.b")).as_str(), "foo.a.b");
    }

    #[test]
    fn store_interns_and_wires_factory() {
        let store = BindingStore::new(CacheStrategy::Unbounded);
        let child = store.intern(vec![Segment::key("foo"), Segment::key("bar")]);
        let parent = store.intern(vec![Segment::key("foo")]);

        assert!(Binding::ptr_eq(&child.parent(), &parent));
        assert!(Binding::ptr_eq(&parent.descendent("bar"), &child));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn store_keeps_index_and_key_segments_apart() {
        let store = BindingStore::new(CacheStrategy::Unbounded);
        let keyed = store.intern(vec![Segment::key("foo"), Segment::key("1")]);
        let indexed = store.intern(vec![Segment::key("foo"), Segment::Index(1)]);

        assert!(!Binding::ptr_eq(&keyed, &indexed));
        assert_eq!(indexed.as_array()[1], Segment::Index(1));
        assert_eq!(keyed.as_array()[1], Segment::key("1"));
        assert_eq!(keyed.as_str(), indexed.as_str());
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn dropped_store_falls_back_to_standalone() {
        let store = BindingStore::new(CacheStrategy::Unbounded);
        let child = store.intern(vec![Segment::key("foo"), Segment::key("bar")]);
        drop(store);

        assert_eq!(child.parent().as_str(), "foo");
    }

    #[test]
    fn round_trip_through_from_array() {
        let original = Binding::from_array(vec![Segment::key("foo"), Segment::key("01")]);
        let copy = Binding::from_array(original.as_array().to_vec());
        assert_eq!(copy.as_str(), original.as_str());
        assert_eq!(copy, original);
    }
}
