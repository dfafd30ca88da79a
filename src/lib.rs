// src/lib.rs
// Hybrid document-access layer: the same document-store operations served
// by a networked primary backend or, when it is unreachable, by a local
// persisted fallback store.

pub mod aggregation;
pub mod backend;
pub mod document;
pub mod error;
pub mod filter;
pub mod model;
pub mod populate;
pub mod query;
pub mod store;

// Public exports
pub use backend::{BackendSelector, ConnectivityFlag, PrimaryBackend};
pub use document::Document;
pub use error::{HybridDbError, Result};
pub use filter::Filter;
pub use model::{HybridDb, HybridModel};
pub use populate::{ModelRelations, Populate};
pub use query::{QueryBuilder, QueryDescriptor, QueryKind, SortOrder};
pub use store::{CollectionStore, UpdateOptions};
