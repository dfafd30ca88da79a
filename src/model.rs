// src/model.rs
// Hybrid model façade: the same nine operations for every registered
// model, routed per call to the primary driver or the local components.

use std::sync::Arc;

use serde_json::{Map, Value};

use crate::aggregation;
use crate::backend::{BackendSelector, PrimaryBackend};
use crate::document::Document;
use crate::error::Result;
use crate::filter::Filter;
use crate::populate::ModelRelations;
use crate::query::{QueryBuilder, QueryKind};
use crate::store::{CollectionStore, UpdateOptions};

/// Registry for hybrid models: owns the local collection store, the
/// primary driver handle and the injected connectivity capability.
///
/// Operational note: when the primary recovers after a period of local
/// writes, nothing is reconciled back into it. Callers needing stronger
/// guarantees must run their own sync.
pub struct HybridDb {
    store: Arc<CollectionStore>,
    primary: Arc<dyn PrimaryBackend>,
    selector: Arc<dyn BackendSelector>,
}

impl HybridDb {
    pub fn new<P: AsRef<std::path::Path>>(
        data_dir: P,
        primary: Arc<dyn PrimaryBackend>,
        selector: Arc<dyn BackendSelector>,
    ) -> Result<Self> {
        Ok(HybridDb {
            store: Arc::new(CollectionStore::open(data_dir)?),
            primary,
            selector,
        })
    }

    /// Register a model by name with its relation schema. The name is
    /// also the collection name and the on-disk file name.
    pub fn register_model(&self, name: impl Into<String>, relations: ModelRelations) -> HybridModel {
        HybridModel {
            name: name.into(),
            relations,
            store: Arc::clone(&self.store),
            primary: Arc::clone(&self.primary),
            selector: Arc::clone(&self.selector),
        }
    }

    /// The local fallback store, shared by every model.
    pub fn store(&self) -> &CollectionStore {
        &self.store
    }
}

/// One registered model. Every operation consults the selector at call
/// time (for reads: at execute time) and dispatches to the primary driver
/// or the local store, returning the same plain documents either way.
pub struct HybridModel {
    name: String,
    relations: ModelRelations,
    store: Arc<CollectionStore>,
    primary: Arc<dyn PrimaryBackend>,
    selector: Arc<dyn BackendSelector>,
}

impl HybridModel {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn primary_available(&self) -> bool {
        self.selector.is_primary_available()
    }

    pub(crate) fn primary(&self) -> &dyn PrimaryBackend {
        self.primary.as_ref()
    }

    pub(crate) fn store(&self) -> &CollectionStore {
        &self.store
    }

    pub(crate) fn relations(&self) -> &ModelRelations {
        &self.relations
    }

    /// Deferred many-document query.
    pub fn find(&self, filter: Filter) -> QueryBuilder<'_> {
        QueryBuilder::new(self, QueryKind::Find, filter)
    }

    /// Deferred at-most-one query.
    pub fn find_one(&self, filter: Filter) -> QueryBuilder<'_> {
        QueryBuilder::new(self, QueryKind::FindOne, filter)
    }

    /// Deferred by-id query: `find_one` on an identifier filter.
    pub fn find_by_id(&self, id: &str) -> QueryBuilder<'_> {
        self.find_one(Filter::new().eq("_id", Value::String(id.to_string())))
    }

    pub fn create(&self, attributes: Map<String, Value>) -> Result<Document> {
        if self.primary_available() {
            self.primary.create(&self.name, attributes)
        } else {
            self.store.create(&self.name, attributes)
        }
    }

    pub fn update_by_id(
        &self,
        id: &str,
        patch: Map<String, Value>,
        options: &UpdateOptions,
    ) -> Result<Option<Document>> {
        if self.primary_available() {
            self.primary.update_by_id(&self.name, id, patch, options)
        } else {
            self.store.update_by_id(&self.name, id, patch, options)
        }
    }

    pub fn delete_by_id(&self, id: &str) -> Result<bool> {
        if self.primary_available() {
            self.primary.delete_by_id(&self.name, id)
        } else {
            self.store.delete_by_id(&self.name, id)
        }
    }

    pub fn delete_many(&self, filter: &Filter) -> Result<u64> {
        if self.primary_available() {
            self.primary.delete_many(&self.name, filter)
        } else {
            self.store.delete_many(&self.name, filter)
        }
    }

    pub fn count(&self, filter: &Filter) -> Result<u64> {
        if self.primary_available() {
            self.primary.count(&self.name, filter)
        } else {
            self.store.count(&self.name, filter)
        }
    }

    pub fn aggregate(&self, pipeline: &Value) -> Result<Vec<Value>> {
        if self.primary_available() {
            self.primary.aggregate(&self.name, pipeline)
        } else {
            aggregation::aggregate(&self.store, &self.name, pipeline)
        }
    }
}
