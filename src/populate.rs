// src/populate.rs
// Relation resolution: replace foreign-key field values with the
// referenced documents.

use std::collections::HashMap;

use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::Result;
use crate::store::CollectionStore;

/// A population directive: resolve the foreign identifier(s) held in
/// `field` against the target collection declared for that field,
/// optionally narrowing the replacement to a field selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Populate {
    pub field: String,
    pub select: Option<Vec<String>>,
}

impl Populate {
    pub fn new(field: impl Into<String>) -> Self {
        Populate {
            field: field.into(),
            select: None,
        }
    }

    pub fn with_select<I, S>(field: impl Into<String>, select: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Populate {
            field: field.into(),
            select: Some(select.into_iter().map(Into::into).collect()),
        }
    }
}

/// Relation schema for one model, declared at registration time:
/// field name to target collection. Population directives for fields with
/// no declared relation are no-ops.
#[derive(Debug, Clone, Default)]
pub struct ModelRelations {
    targets: HashMap<String, String>,
}

impl ModelRelations {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare that `field` holds identifier(s) referencing `target`.
    /// Covers both scalar and array-valued foreign keys; the value shape
    /// is inspected at resolution time.
    pub fn relate(mut self, field: impl Into<String>, target: impl Into<String>) -> Self {
        self.targets.insert(field.into(), target.into());
        self
    }

    pub fn target_of(&self, field: &str) -> Option<&str> {
        self.targets.get(field).map(String::as_str)
    }
}

/// Apply population directives to a result set. Stored documents are never
/// touched: the replacement happens on the copies in `docs`.
///
/// A scalar string value is treated as one foreign identifier; an array
/// resolves every string element. Lookup misses leave the identifier in
/// place, so callers must treat a still-scalar value as unresolved.
pub fn resolve_populates(
    store: &CollectionStore,
    relations: &ModelRelations,
    docs: &mut [Document],
    populates: &[Populate],
) -> Result<()> {
    for populate in populates {
        let Some(target) = relations.target_of(&populate.field) else {
            log::debug!(
                "populate skipped: no relation declared for field '{}'",
                populate.field
            );
            continue;
        };

        for doc in docs.iter_mut() {
            let Some(value) = doc.get(&populate.field).cloned() else {
                continue;
            };

            match value {
                Value::String(id) => {
                    if let Some(related) = store.find_by_id(target, &id)? {
                        let replacement = narrow_related(related, populate.select.as_deref());
                        doc.set(populate.field.clone(), replacement);
                    }
                }
                Value::Array(entries) => {
                    let mut resolved = Vec::with_capacity(entries.len());
                    for entry in entries {
                        match entry {
                            Value::String(id) => match store.find_by_id(target, &id)? {
                                Some(related) => resolved.push(narrow_related(
                                    related,
                                    populate.select.as_deref(),
                                )),
                                None => resolved.push(Value::String(id)),
                            },
                            other => resolved.push(other),
                        }
                    }
                    doc.set(populate.field.clone(), Value::Array(resolved));
                }
                // null or any non-identifier shape: nothing to resolve
                _ => {}
            }
        }
    }

    Ok(())
}

/// Reduce a resolved document to the selected fields. A `-` prefix means
/// exclude. Any plain entry switches to include mode (keep `_id` plus the
/// listed fields, unless `-_id` is also present); an all-exclusion list
/// keeps everything else.
fn narrow_related(related: Document, select: Option<&[String]>) -> Value {
    let full: Value = related.into();
    let Some(select) = select else {
        return full;
    };
    let Value::Object(obj) = full else {
        return full;
    };

    let has_inclusions = select.iter().any(|f| !f.starts_with('-'));
    let exclude_id = select.iter().any(|f| f == "-_id");

    let mut narrowed = Map::new();

    if has_inclusions {
        if !exclude_id {
            if let Some(id) = obj.get("_id") {
                narrowed.insert("_id".to_string(), id.clone());
            }
        }
        for field in select.iter().filter(|f| !f.starts_with('-')) {
            if let Some(value) = obj.get(field.as_str()) {
                narrowed.insert(field.clone(), value.clone());
            }
        }
    } else {
        for (key, value) in obj {
            let excluded = select.iter().any(|f| f.strip_prefix('-') == Some(key.as_str()));
            if !excluded {
                narrowed.insert(key, value);
            }
        }
    }

    Value::Object(narrowed)
}
