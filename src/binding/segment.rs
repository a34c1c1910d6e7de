//! Binding path segments
//!
//! A segment is either an integer index or a string key. Unquoted numeric
//! text coerces to an integer (`"01"` → `1`); quoted text never does.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Segment {
    Index(i64),
    Key(String),
}

impl Segment {
    /// Coerce numeric text to an integer segment, keep everything else as a key
    pub fn coerce(raw: &str) -> Segment {
        maybe_convert_to_num(raw)
    }

    /// Keep the text as a string key regardless of its content
    pub fn key(raw: impl Into<String>) -> Segment {
        Segment::Key(raw.into())
    }

    pub fn as_index(&self) -> Option<i64> {
        match self {
            Segment::Index(i) => Some(*i),
            Segment::Key(_) => None,
        }
    }

    pub fn as_key(&self) -> Option<&str> {
        match self {
            Segment::Key(k) => Some(k),
            Segment::Index(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        match self {
            Segment::Index(i) => Value::from(*i),
            Segment::Key(k) => Value::String(k.clone()),
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Index(i) => write!(f, "{}", i),
            Segment::Key(k) => f.write_str(k),
        }
    }
}

impl From<i64> for Segment {
    fn from(i: i64) -> Self {
        Segment::Index(i)
    }
}

impl From<usize> for Segment {
    fn from(i: usize) -> Self {
        Segment::Index(i as i64)
    }
}

impl From<&str> for Segment {
    fn from(s: &str) -> Self {
        Segment::coerce(s)
    }
}

impl From<String> for Segment {
    fn from(s: String) -> Self {
        match parse_index(&s) {
            Some(i) => Segment::Index(i),
            None => Segment::Key(s),
        }
    }
}

/// Integer segments are an optional `-` followed by ASCII digits only
fn parse_index(raw: &str) -> Option<i64> {
    let digits = raw.strip_prefix('-').unwrap_or(raw);
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    raw.parse::<i64>().ok()
}

pub fn maybe_convert_to_num(raw: &str) -> Segment {
    match parse_index(raw) {
        Some(i) => Segment::Index(i),
        None => Segment::Key(raw.to_string()),
    }
}

/// Join segments with `.` into the canonical string form
pub fn join_segments(segments: &[Segment]) -> String {
    let mut joined = String::with_capacity(segments.len() * 8);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            joined.push('.');
        }
        match segment {
            Segment::Index(idx) => joined.push_str(&idx.to_string()),
            Segment::Key(key) => joined.push_str(key),
        }
    }
    joined
}

/// Split a dotted string, coercing each piece
pub fn split_coerced(raw: &str) -> Vec<Segment> {
    if raw.is_empty() {
        return Vec::new();
    }
    raw.split('.').map(maybe_convert_to_num).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coerces_plain_integers() {
        assert_eq!(Segment::coerce("0"), Segment::Index(0));
        assert_eq!(Segment::coerce("01"), Segment::Index(1));
        assert_eq!(Segment::coerce("-3"), Segment::Index(-3));
    }

    #[test]
    fn keeps_non_integers_as_keys() {
        assert_eq!(Segment::coerce("foo"), Segment::key("foo"));
        assert_eq!(Segment::coerce("+1"), Segment::key("+1"));
        assert_eq!(Segment::coerce("1a"), Segment::key("1a"));
        assert_eq!(Segment::coerce("-"), Segment::key("-"));
        assert_eq!(Segment::coerce(""), Segment::key(""));
        assert_eq!(Segment::coerce("true"), Segment::key("true"));
    }

    #[test]
    fn overflowing_digits_stay_keys() {
        let huge = "99999999999999999999999";
        assert_eq!(Segment::coerce(huge), Segment::key(huge));
    }

    #[test]
    fn join_and_split() {
        let segments = vec![Segment::key("foo"), Segment::Index(1), Segment::key("baz")];
        assert_eq!(join_segments(&segments), "foo.1.baz");
        assert_eq!(split_coerced("foo.01.baz"), segments);
        assert!(split_coerced("").is_empty());
    }

    #[test]
    fn serializes_untagged() {
        let segments = vec![Segment::key("a"), Segment::Index(2)];
        assert_eq!(serde_json::to_string(&segments).unwrap(), r#"["a",2]"#);
    }
}
