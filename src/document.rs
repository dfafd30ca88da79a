// src/document.rs
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// One record: a field-to-value mapping with a unique string identifier.
///
/// The identifier is flattened into the serialized object as `_id`, so a
/// document serializes to the same shape it has inside a collection file.
/// Fields use `serde_json::Map` so the persisted layout is deterministic
/// across rewrites.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    #[serde(rename = "_id")]
    pub id: String,

    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Document {
    pub fn new(id: String, fields: Map<String, Value>) -> Self {
        Document { id, fields }
    }

    /// New document with a freshly generated identifier (UUID v4).
    /// Identifiers are opaque, unique within a collection and never reused.
    pub fn with_generated_id(fields: Map<String, Value>) -> Self {
        Document {
            id: Uuid::new_v4().to_string(),
            fields,
        }
    }

    /// Field lookup. `_id` is held separately and not reachable here.
    pub fn get(&self, field: &str) -> Option<&Value> {
        if field == "_id" {
            None
        } else {
            self.fields.get(field)
        }
    }

    pub fn set(&mut self, field: String, value: Value) {
        self.fields.insert(field, value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.fields.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains_key(field)
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        let mut map = Map::new();
        map.insert("_id".to_string(), Value::String(doc.id));

        for (k, v) in doc.fields {
            map.insert(k, v);
        }

        Value::Object(map)
    }
}
