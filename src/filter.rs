// src/filter.rs
use serde_json::{Map, Value};

use crate::document::Document;

/// Exact-equality filter: field name to expected value, implicit AND across
/// fields. A document matches only if every filter field is present and
/// deep-equal; a missing field never matches. The `_id` key compares
/// against the document identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter {
    conditions: Map<String, Value>,
}

impl Filter {
    pub fn new() -> Self {
        Filter {
            conditions: Map::new(),
        }
    }

    /// Filter from a JSON object; any non-object value yields the empty
    /// filter (which matches everything).
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Filter {
                conditions: map.clone(),
            },
            _ => Filter::new(),
        }
    }

    /// Add an equality condition, returning the extended filter.
    pub fn eq(mut self, field: impl Into<String>, value: Value) -> Self {
        self.conditions.insert(field.into(), value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    pub fn conditions(&self) -> &Map<String, Value> {
        &self.conditions
    }

    /// If this filter is exactly one `_id` equality on a string, return the
    /// identifier. Lets execution use the by-id lookup path.
    pub fn id_only(&self) -> Option<&str> {
        if self.conditions.len() != 1 {
            return None;
        }
        self.conditions.get("_id").and_then(Value::as_str)
    }

    pub fn matches(&self, doc: &Document) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            if field == "_id" {
                expected.as_str() == Some(doc.id.as_str())
            } else {
                doc.get(field) == Some(expected)
            }
        })
    }
}

impl From<Map<String, Value>> for Filter {
    fn from(conditions: Map<String, Value>) -> Self {
        Filter { conditions }
    }
}
