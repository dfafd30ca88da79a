// src/query.rs
// Deferred, chainable query description. Nothing touches storage until a
// terminal exec call.

use std::cmp::Ordering;

use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::Result;
use crate::filter::Filter;
use crate::model::HybridModel;
use crate::populate::{resolve_populates, Populate};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Whether the query yields many documents or at most one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Find,
    FindOne,
}

/// The full description of a read operation: filter, sort, limit,
/// projection and population directives. Handed as-is to the primary
/// driver, or interpreted locally against the collection store.
#[derive(Debug, Clone)]
pub struct QueryDescriptor {
    pub collection: String,
    pub filter: Filter,
    pub sort: Option<(String, SortOrder)>,
    pub limit: Option<usize>,
    pub projection: Option<Vec<String>>,
    pub populates: Vec<Populate>,
}

impl QueryDescriptor {
    pub fn new(collection: impl Into<String>, filter: Filter) -> Self {
        QueryDescriptor {
            collection: collection.into(),
            filter,
            sort: None,
            limit: None,
            projection: None,
            populates: Vec::new(),
        }
    }
}

/// Chainable query builder. Each configuration call consumes the builder
/// and returns it with one descriptor field changed; execution happens
/// only in `exec` / `exec_one`, which route to the primary backend or the
/// local store at that moment.
pub struct QueryBuilder<'a> {
    model: &'a HybridModel,
    kind: QueryKind,
    descriptor: QueryDescriptor,
}

impl<'a> QueryBuilder<'a> {
    pub(crate) fn new(model: &'a HybridModel, kind: QueryKind, filter: Filter) -> Self {
        QueryBuilder {
            model,
            kind,
            descriptor: QueryDescriptor::new(model.name(), filter),
        }
    }

    pub fn kind(&self) -> QueryKind {
        self.kind
    }

    pub fn descriptor(&self) -> &QueryDescriptor {
        &self.descriptor
    }

    pub fn sort(mut self, field: impl Into<String>, order: SortOrder) -> Self {
        self.descriptor.sort = Some((field.into(), order));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.descriptor.limit = Some(limit);
        self
    }

    /// Field projection for the result set. `-` prefixed entries exclude.
    /// The identifier is structural and always present in top-level
    /// results; `-_id` here is a no-op (population selects can still drop
    /// it from replacement values).
    pub fn select<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor.projection = Some(fields.into_iter().map(Into::into).collect());
        self
    }

    pub fn populate(mut self, field: impl Into<String>) -> Self {
        self.descriptor.populates.push(Populate::new(field));
        self
    }

    pub fn populate_select<I, S>(mut self, field: impl Into<String>, select: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.descriptor
            .populates
            .push(Populate::with_select(field, select));
        self
    }

    /// Execute, yielding every matching document. A `FindOne` query yields
    /// zero or one element.
    pub fn exec(self) -> Result<Vec<Document>> {
        if self.model.primary_available() {
            return match self.kind {
                QueryKind::Find => self.model.primary().find(&self.descriptor),
                QueryKind::FindOne => Ok(self.primary_find_one()?.into_iter().collect()),
            };
        }

        match self.kind {
            QueryKind::Find => self.exec_local_many(),
            QueryKind::FindOne => Ok(self.exec_local_one()?.into_iter().collect()),
        }
    }

    /// Execute, yielding the first matching document or `None`.
    pub fn exec_one(self) -> Result<Option<Document>> {
        if self.model.primary_available() {
            return match self.kind {
                QueryKind::FindOne => self.primary_find_one(),
                QueryKind::Find => Ok(self
                    .model
                    .primary()
                    .find(&self.descriptor)?
                    .into_iter()
                    .next()),
            };
        }

        match self.kind {
            QueryKind::FindOne => self.exec_local_one(),
            QueryKind::Find => Ok(self.exec_local_many()?.into_iter().next()),
        }
    }

    /// Single-document lookup against the primary. Bare by-id queries take
    /// the driver's dedicated by-id path, same as the local store does;
    /// anything decorated with populates or a projection ships the full
    /// descriptor.
    fn primary_find_one(&self) -> Result<Option<Document>> {
        if let Some(id) = self.descriptor.filter.id_only() {
            if self.descriptor.populates.is_empty() && self.descriptor.projection.is_none() {
                return self.model.primary().find_by_id(&self.descriptor.collection, id);
            }
        }
        self.model.primary().find_one(&self.descriptor)
    }

    fn exec_local_many(self) -> Result<Vec<Document>> {
        let store = self.model.store();
        let descriptor = self.descriptor;

        let mut docs = store.find(&descriptor.collection, &descriptor.filter)?;

        if let Some((field, order)) = &descriptor.sort {
            sort_documents(&mut docs, field, *order);
        }

        if let Some(limit) = descriptor.limit {
            docs.truncate(limit);
        }

        if !descriptor.populates.is_empty() {
            resolve_populates(
                store,
                self.model.relations(),
                &mut docs,
                &descriptor.populates,
            )?;
        }

        if let Some(projection) = &descriptor.projection {
            for doc in &mut docs {
                project_document(doc, projection);
            }
        }

        Ok(docs)
    }

    fn exec_local_one(self) -> Result<Option<Document>> {
        let store = self.model.store();
        let descriptor = self.descriptor;

        // plain by-id lookups take the direct path
        let found = match descriptor.filter.id_only() {
            Some(id) => store.find_by_id(&descriptor.collection, id)?,
            None => store.find_one(&descriptor.collection, &descriptor.filter)?,
        };

        let Some(doc) = found else {
            return Ok(None);
        };

        let mut docs = vec![doc];
        if !descriptor.populates.is_empty() {
            resolve_populates(
                store,
                self.model.relations(),
                &mut docs,
                &descriptor.populates,
            )?;
        }

        Ok(docs.pop())
    }
}

/// Stable sort by one field; ties keep store order. Missing values sort
/// first, mixed types order by a fixed type priority.
pub(crate) fn sort_documents(docs: &mut [Document], field: &str, order: SortOrder) {
    docs.sort_by(|a, b| {
        let cmp = if field == "_id" {
            a.id.cmp(&b.id)
        } else {
            compare_values(a.get(field), b.get(field))
        };
        match order {
            SortOrder::Ascending => cmp,
            SortOrder::Descending => cmp.reverse(),
        }
    });
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,

        (Some(Value::Number(n1)), Some(Value::Number(n2))) => {
            let f1 = n1.as_f64().unwrap_or(0.0);
            let f2 = n2.as_f64().unwrap_or(0.0);
            f1.partial_cmp(&f2).unwrap_or(Ordering::Equal)
        }

        (Some(Value::String(s1)), Some(Value::String(s2))) => s1.cmp(s2),

        (Some(Value::Bool(b1)), Some(Value::Bool(b2))) => b1.cmp(b2),

        (Some(a_val), Some(b_val)) => type_priority(a_val).cmp(&type_priority(b_val)),
    }
}

fn type_priority(val: &Value) -> u8 {
    match val {
        Value::Null => 0,
        Value::Number(_) => 1,
        Value::String(_) => 2,
        Value::Bool(_) => 3,
        Value::Object(_) => 4,
        Value::Array(_) => 5,
    }
}

/// Apply a field selection to a document. Plain entries switch to include
/// mode; `-` prefixed entries exclude. The identifier lives outside the
/// field map and is unaffected, so `-_id` is ignored here.
fn project_document(doc: &mut Document, selection: &[String]) {
    let has_inclusions = selection.iter().any(|f| !f.starts_with('-'));

    if has_inclusions {
        let mut kept = Map::new();
        for field in selection.iter().filter(|f| !f.starts_with('-')) {
            if let Some(value) = doc.fields.get(field.as_str()) {
                kept.insert(field.clone(), value.clone());
            }
        }
        doc.fields = kept;
    } else {
        for field in selection {
            if let Some(excluded) = field.strip_prefix('-') {
                doc.fields.remove(excluded);
            }
        }
    }
}
