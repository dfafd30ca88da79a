// src/backend.rs
// Backend selection and the opaque primary driver contract.

use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::Result;
use crate::filter::Filter;
use crate::query::QueryDescriptor;
use crate::store::UpdateOptions;

/// Connectivity capability injected into the façade: consulted on every
/// call, never cached, so a backend transition takes effect immediately.
pub trait BackendSelector: Send + Sync {
    fn is_primary_available(&self) -> bool;
}

/// Process-wide connectivity flag, the default `BackendSelector`. The
/// flag is shared mutable state read atomically by every call.
#[derive(Debug, Default)]
pub struct ConnectivityFlag {
    available: AtomicBool,
}

impl ConnectivityFlag {
    pub fn new(available: bool) -> Self {
        ConnectivityFlag {
            available: AtomicBool::new(available),
        }
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

impl BackendSelector for ConnectivityFlag {
    fn is_primary_available(&self) -> bool {
        self.available.load(Ordering::SeqCst)
    }
}

/// The networked database driver. Opaque to this crate: the façade only
/// routes calls here when the selector reports the primary available.
/// Read operations receive the full query descriptor (filter, sort,
/// limit, projection, population) and interpret it themselves.
pub trait PrimaryBackend: Send + Sync {
    fn find(&self, query: &QueryDescriptor) -> Result<Vec<Document>>;

    fn find_one(&self, query: &QueryDescriptor) -> Result<Option<Document>>;

    /// By-id lookup; drivers with a faster path may override.
    fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let filter = Filter::new().eq("_id", Value::String(id.to_string()));
        self.find_one(&QueryDescriptor::new(collection, filter))
    }

    fn create(&self, collection: &str, attributes: Map<String, Value>) -> Result<Document>;

    fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        patch: Map<String, Value>,
        options: &UpdateOptions,
    ) -> Result<Option<Document>>;

    fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool>;

    fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64>;

    fn count(&self, collection: &str, filter: &Filter) -> Result<u64>;

    fn aggregate(&self, collection: &str, pipeline: &Value) -> Result<Vec<Value>>;
}
