//! Data model backing binding resolution
//!
//! `DataModel` is the read/write seam the binding parser and template plugin
//! talk to. `JsonModel` keeps an in-memory `serde_json::Value` tree.

use std::path::Path;

use parking_lot::RwLock;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::binding::{Binding, Segment};
use crate::error::Result;

pub trait DataModel: Send + Sync {
    /// Value at `binding`, `None` when any segment is missing
    fn get(&self, binding: &Binding) -> Option<Value>;

    /// Apply every write of the transaction in order
    fn set(&self, transaction: &[(Binding, Value)]);
}

/// In-memory JSON document
#[derive(Debug, Default)]
pub struct JsonModel {
    root: RwLock<Value>,
}

impl JsonModel {
    pub fn new(root: Value) -> Self {
        Self {
            root: RwLock::new(root),
        }
    }

    pub fn from_json_str(source: &str) -> Result<Self> {
        Ok(Self::new(serde_json::from_str(source)?))
    }

    pub fn from_yaml_str(source: &str) -> Result<Self> {
        Ok(Self::new(serde_yaml::from_str(source)?))
    }

    /// Load a `.json`, `.yaml` or `.yml` file (anything else is read as JSON)
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml" | "yml") => Self::from_yaml_str(&source),
            _ => Self::from_json_str(&source),
        }
    }

    /// Copy of the whole document
    pub fn snapshot(&self) -> Value {
        self.root.read().clone()
    }

    pub fn get_path(&self, path: &[Segment]) -> Option<Value> {
        let root = self.root.read();
        let mut current = &*root;
        for segment in path {
            current = child(current, segment)?;
        }
        Some(current.clone())
    }
}

impl DataModel for JsonModel {
    fn get(&self, binding: &Binding) -> Option<Value> {
        self.get_path(binding.as_array())
    }

    fn set(&self, transaction: &[(Binding, Value)]) {
        let mut root = self.root.write();

        'writes: for (binding, value) in transaction {
            let mut current = &mut *root;
            for segment in binding.as_array() {
                let Some(next) = child_mut(current, segment) else {
                    warn!(binding = %binding, segment = %segment, "cannot write through non-container value");
                    continue 'writes;
                };
                current = next;
            }
            debug!(binding = %binding, "model write");
            *current = value.clone();
        }
    }
}

/// Array position named by `segment`: an index, or a key spelled like one (`"1"`)
fn array_index(segment: &Segment) -> Option<usize> {
    match segment {
        Segment::Index(i) => usize::try_from(*i).ok(),
        Segment::Key(k) => k.parse::<usize>().ok().filter(|i| i.to_string() == *k),
    }
}

fn child<'v>(current: &'v Value, segment: &Segment) -> Option<&'v Value> {
    match (current, segment) {
        (Value::Array(items), segment) => array_index(segment).and_then(|i| items.get(i)),
        (Value::Object(map), segment) => map.get(&segment.to_string()),
        _ => None,
    }
}

/// Step into `segment`, creating containers along the way
///
/// Integer segments create arrays (padded with `null`), keys create objects.
fn child_mut<'v>(current: &'v mut Value, segment: &Segment) -> Option<&'v mut Value> {
    if current.is_null() {
        *current = match segment {
            Segment::Index(_) => Value::Array(Vec::new()),
            Segment::Key(_) => Value::Object(Map::new()),
        };
    }

    match (current, segment) {
        (Value::Object(map), segment) => Some(map.entry(segment.to_string()).or_insert(Value::Null)),
        (Value::Array(items), segment) => {
            let index = array_index(segment)?;
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            items.get_mut(index)
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn b(raw: &str) -> Binding {
        Binding::from_dotted(raw)
    }

    #[test]
    fn reads_nested_values() {
        let model = JsonModel::new(json!({ "foo": { "bar": [10, { "baz": "x" }] } }));
        assert_eq!(model.get(&b("foo.bar.0")), Some(json!(10)));
        assert_eq!(model.get(&b("foo.bar.1.baz")), Some(json!("x")));
        assert_eq!(model.get(&b("foo.missing")), None);
        assert_eq!(model.get(&b("foo.bar.-1")), None);
        assert_eq!(model.get(&b("")), Some(model.snapshot()));
    }

    #[test]
    fn writes_create_containers() {
        let model = JsonModel::default();
        model.set(&[(b("foo.2.bar"), json!("baz")), (b("top"), json!(true))]);

        assert_eq!(
            model.snapshot(),
            json!({ "foo": [null, null, { "bar": "baz" }], "top": true })
        );
    }

    #[test]
    fn write_through_scalar_is_skipped() {
        let model = JsonModel::new(json!({ "foo": 1 }));
        model.set(&[(b("foo.bar"), json!(2)), (b("ok"), json!(3))]);
        assert_eq!(model.snapshot(), json!({ "foo": 1, "ok": 3 }));
    }

    #[test]
    fn numeric_keys_address_array_elements() {
        let model = JsonModel::new(json!({ "foo": ["a", "b"] }));
        let keyed = Binding::from_array(vec![Segment::key("foo"), Segment::key("1")]);
        assert_eq!(model.get(&keyed), Some(json!("b")));

        let padded = Binding::from_array(vec![Segment::key("foo"), Segment::key("01")]);
        assert_eq!(model.get(&padded), None);

        model.set(&[(Binding::from_array(vec![Segment::key("foo"), Segment::key("2")]), json!("c"))]);
        assert_eq!(model.snapshot(), json!({ "foo": ["a", "b", "c"] }));
    }

    #[test]
    fn loads_yaml() {
        let model = JsonModel::from_yaml_str("foo:\n  - bar: 1\n").unwrap();
        assert_eq!(model.get(&b("foo.0.bar")), Some(json!(1)));
    }
}
