// Property-based tests using proptest
use hybriddb_core::{CollectionStore, Filter, SortOrder};
use proptest::prelude::*;
use serde_json::{json, Map, Value};
use tempfile::TempDir;

fn attrs(entries: Vec<(&str, Value)>) -> Map<String, Value> {
    entries
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}

// ========== PROPERTY 1: Create/Fetch Roundtrip ==========

proptest! {
    #[test]
    fn prop_create_then_find_by_id_roundtrip(
        name in "[a-z]{1,20}",
        cases in 0i64..100000,
        active in any::<bool>(),
    ) {
        let temp_dir = TempDir::new().unwrap();
        let store = CollectionStore::open(temp_dir.path()).unwrap();

        let created = store.create("Report", attrs(vec![
            ("name", json!(name)),
            ("cases", json!(cases)),
            ("active", json!(active)),
        ])).unwrap();

        let fetched = store.find_by_id("Report", &created.id).unwrap().unwrap();

        // Invariant: fetched == created, field for field, plus the id
        assert_eq!(fetched, created);
        assert_eq!(fetched.get("name"), Some(&json!(name)));
        assert_eq!(fetched.get("cases"), Some(&json!(cases)));
        assert_eq!(fetched.get("active"), Some(&json!(active)));
    }
}

// ========== PROPERTY 2: Filter Correctness ==========

proptest! {
    #[test]
    fn prop_find_returns_exactly_the_matching_records(
        severities in prop::collection::vec("[ABC]", 1..12),
        wanted in "[ABC]",
    ) {
        let temp_dir = TempDir::new().unwrap();
        let store = CollectionStore::open(temp_dir.path()).unwrap();

        for severity in &severities {
            store.create("Report", attrs(vec![("severity", json!(severity))])).unwrap();
        }

        let filter = Filter::new().eq("severity", json!(wanted.clone()));
        let found = store.find("Report", &filter).unwrap();

        // Invariant: |find(F)| == number of records where the field equals
        let expected = severities.iter().filter(|s| **s == wanted).count();
        assert_eq!(found.len(), expected);
        let wanted_value = json!(wanted);
        assert!(found.iter().all(|d| d.get("severity") == Some(&wanted_value)));

        // and count agrees with find
        assert_eq!(store.count("Report", &filter).unwrap(), expected as u64);
    }
}

proptest! {
    #[test]
    fn prop_records_without_the_field_never_match(
        with_field in 0usize..6,
        without_field in 0usize..6,
    ) {
        let temp_dir = TempDir::new().unwrap();
        let store = CollectionStore::open(temp_dir.path()).unwrap();

        for _ in 0..with_field {
            store.create("Doc", attrs(vec![("tag", json!("x"))])).unwrap();
        }
        for _ in 0..without_field {
            store.create("Doc", attrs(vec![("other", json!("y"))])).unwrap();
        }

        let found = store.find("Doc", &Filter::new().eq("tag", json!("x"))).unwrap();
        assert_eq!(found.len(), with_field);
    }
}

// ========== PROPERTY 3: Sort + Limit Composition ==========

proptest! {
    #[test]
    fn prop_sort_limit_is_prefix_of_full_sorted_set(
        values in prop::collection::vec(0i64..50, 1..15),
        limit in 1usize..10,
    ) {
        use hybriddb_core::{BackendSelector, Document, HybridDb, ModelRelations,
                           PrimaryBackend, QueryDescriptor, Result, UpdateOptions};
        use std::sync::Arc;

        struct NoPrimary;
        impl PrimaryBackend for NoPrimary {
            fn find(&self, _q: &QueryDescriptor) -> Result<Vec<Document>> { Ok(Vec::new()) }
            fn find_one(&self, _q: &QueryDescriptor) -> Result<Option<Document>> { Ok(None) }
            fn create(&self, _c: &str, _a: Map<String, Value>) -> Result<Document> {
                Ok(Document::with_generated_id(Map::new()))
            }
            fn update_by_id(&self, _c: &str, _i: &str, _p: Map<String, Value>, _o: &UpdateOptions)
                -> Result<Option<Document>> { Ok(None) }
            fn delete_by_id(&self, _c: &str, _i: &str) -> Result<bool> { Ok(false) }
            fn delete_many(&self, _c: &str, _f: &Filter) -> Result<u64> { Ok(0) }
            fn count(&self, _c: &str, _f: &Filter) -> Result<u64> { Ok(0) }
            fn aggregate(&self, _c: &str, _p: &Value) -> Result<Vec<Value>> { Ok(Vec::new()) }
        }

        struct Offline;
        impl BackendSelector for Offline {
            fn is_primary_available(&self) -> bool { false }
        }

        let temp_dir = TempDir::new().unwrap();
        let db = HybridDb::new(temp_dir.path(), Arc::new(NoPrimary), Arc::new(Offline)).unwrap();
        let model = db.register_model("Doc", ModelRelations::new());

        for v in &values {
            model.create(attrs(vec![("v", json!(v))])).unwrap();
        }

        let full = model.find(Filter::new())
            .sort("v", SortOrder::Ascending)
            .exec()
            .unwrap();
        let limited = model.find(Filter::new())
            .sort("v", SortOrder::Ascending)
            .limit(limit)
            .exec()
            .unwrap();

        // Invariant: limited result is the prefix of the full sorted set
        assert_eq!(limited.len(), limit.min(values.len()));
        for (a, b) in limited.iter().zip(full.iter()) {
            assert_eq!(a, b);
        }

        // and the full set is ordered
        let sorted_values: Vec<i64> = full.iter()
            .map(|d| d.get("v").unwrap().as_i64().unwrap())
            .collect();
        let mut expected = values.clone();
        expected.sort();
        assert_eq!(sorted_values, expected);
    }
}

// ========== PROPERTY 4: Durability ==========

proptest! {
    #[test]
    fn prop_store_reload_reproduces_prior_state(
        names in prop::collection::vec("[a-z]{1,8}", 1..8),
    ) {
        let temp_dir = TempDir::new().unwrap();

        let created: Vec<_> = {
            let store = CollectionStore::open(temp_dir.path()).unwrap();
            names.iter()
                .map(|n| store.create("User", attrs(vec![("name", json!(n))])).unwrap())
                .collect()
        };

        // reopen against the same directory: field-for-field, order preserved
        let store = CollectionStore::open(temp_dir.path()).unwrap();
        let loaded = store.find("User", &Filter::new()).unwrap();
        assert_eq!(loaded, created);
    }
}
