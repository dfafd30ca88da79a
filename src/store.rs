// src/store.rs
// Persisted collection store: one JSON array file per collection,
// whole-file rewrite on every mutation.

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde_json::{Map, Value};

use crate::document::Document;
use crate::error::{HybridDbError, Result};
use crate::filter::Filter;

/// Options for `update_by_id`.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Create the record under the given id when it does not exist.
    pub upsert: bool,
}

/// Durable per-collection record storage.
///
/// Each collection is one pretty-printed JSON array file named after the
/// model (`<data_dir>/<Collection>.json`), insertion order preserved. The
/// layout is a stable contract: seed and verification utilities outside
/// this crate read and write the same files.
///
/// Every mutation loads the full array, applies the change and atomically
/// replaces the file (write temp, then rename), so concurrent readers see
/// either the pre- or post-mutation snapshot, never a partial write.
/// Concurrent writers are last-writer-wins at collection granularity.
pub struct CollectionStore {
    data_dir: PathBuf,
    // Serializes the in-process load -> mutate -> rewrite cycle.
    write_lock: Mutex<()>,
}

impl CollectionStore {
    /// Open a store rooted at `data_dir`, creating the directory if needed.
    pub fn open<P: AsRef<Path>>(data_dir: P) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        fs::create_dir_all(&data_dir)?;

        Ok(CollectionStore {
            data_dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn collection_path(&self, collection: &str) -> PathBuf {
        self.data_dir.join(format!("{collection}.json"))
    }

    /// Load the full collection. An absent file is an empty collection;
    /// an unreadable or unparsable file also reads as empty, with a logged
    /// diagnostic (the next successful write rewrites it).
    fn load_collection(&self, collection: &str) -> Vec<Document> {
        let path = self.collection_path(collection);

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                log::warn!("collection file {} unreadable: {e}", path.display());
                return Vec::new();
            }
        };

        match serde_json::from_slice::<Vec<Document>>(&bytes) {
            Ok(docs) => docs,
            Err(e) => {
                log::warn!(
                    "collection file {} is not a document array: {e}",
                    path.display()
                );
                Vec::new()
            }
        }
    }

    /// Atomic whole-file rewrite: write a sibling temp file, fsync, rename
    /// over the live file.
    fn persist_collection(&self, collection: &str, docs: &[Document]) -> Result<()> {
        let path = self.collection_path(collection);
        let tmp_path = self.data_dir.join(format!("{collection}.json.tmp"));

        let bytes = serde_json::to_vec_pretty(docs)?;

        let mut file = File::create(&tmp_path)?;
        file.write_all(&bytes)?;
        file.sync_all()?;

        // the rename is the publish point: a failure here means the new
        // snapshot never became visible, so report it as a storage fault
        fs::rename(&tmp_path, &path).map_err(|e| {
            HybridDbError::Storage(format!("failed to publish {}: {e}", path.display()))
        })?;
        Ok(())
    }

    /// All documents matching the filter, in insertion order.
    pub fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let docs = self.load_collection(collection);
        Ok(docs.into_iter().filter(|d| filter.matches(d)).collect())
    }

    /// First document matching the filter, in insertion order.
    pub fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let docs = self.load_collection(collection);
        Ok(docs.into_iter().find(|d| filter.matches(d)))
    }

    pub fn find_by_id(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let docs = self.load_collection(collection);
        Ok(docs.into_iter().find(|d| d.id == id))
    }

    /// Assign an identifier, append and persist. A caller-supplied `_id`
    /// key in the attributes is ignored; identifiers are always assigned
    /// here and never mutated afterwards.
    pub fn create(&self, collection: &str, mut attributes: Map<String, Value>) -> Result<Document> {
        let _guard = self.write_lock.lock();

        attributes.remove("_id");
        let doc = Document::with_generated_id(attributes);

        let mut docs = self.load_collection(collection);
        docs.push(doc.clone());
        self.persist_collection(collection, &docs)?;

        Ok(doc)
    }

    /// Merge patch fields into the record with the given id. Returns the
    /// updated record, or `None` when the id is absent and `upsert` is off.
    /// The `_id` key in a patch is ignored; identifiers are immutable.
    pub fn update_by_id(
        &self,
        collection: &str,
        id: &str,
        mut patch: Map<String, Value>,
        options: &UpdateOptions,
    ) -> Result<Option<Document>> {
        let _guard = self.write_lock.lock();

        patch.remove("_id");
        let mut docs = self.load_collection(collection);

        if let Some(doc) = docs.iter_mut().find(|d| d.id == id) {
            for (field, value) in patch {
                doc.set(field, value);
            }
            let updated = doc.clone();
            self.persist_collection(collection, &docs)?;
            return Ok(Some(updated));
        }

        if options.upsert {
            let doc = Document::new(id.to_string(), patch);
            docs.push(doc.clone());
            self.persist_collection(collection, &docs)?;
            return Ok(Some(doc));
        }

        Ok(None)
    }

    /// Remove the record with the given id. Returns whether a record was
    /// removed; an absent id is not an error.
    pub fn delete_by_id(&self, collection: &str, id: &str) -> Result<bool> {
        let _guard = self.write_lock.lock();

        let mut docs = self.load_collection(collection);
        let before = docs.len();
        docs.retain(|d| d.id != id);

        if docs.len() == before {
            return Ok(false);
        }

        self.persist_collection(collection, &docs)?;
        Ok(true)
    }

    /// Remove every record matching the filter, returning the count removed.
    pub fn delete_many(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let _guard = self.write_lock.lock();

        let mut docs = self.load_collection(collection);
        let before = docs.len();
        docs.retain(|d| !filter.matches(d));
        let removed = (before - docs.len()) as u64;

        if removed > 0 {
            self.persist_collection(collection, &docs)?;
        }

        Ok(removed)
    }

    pub fn count(&self, collection: &str, filter: &Filter) -> Result<u64> {
        let docs = self.load_collection(collection);
        Ok(docs.iter().filter(|d| filter.matches(d)).count() as u64)
    }
}
