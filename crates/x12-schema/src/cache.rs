//! Definition cache
//!
//! Flattening a transaction definition is pure, so the resulting
//! [`ConfigTable`] can be shared across parses and threads. The cache is an
//! explicit object owned by the application and injected where needed, not a
//! process-wide singleton; tests create their own instances.

use crate::config::ConfigTable;
use crate::definition::TransactionDefinition;
use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Read-through, lazily populated cache of loop configuration tables, keyed
/// by schema identity (transaction xid plus declared version — version alone
/// is not unique, 270 and 271 share one).
#[derive(Debug, Default)]
pub struct DefinitionCache {
    tables: DashMap<(String, String), Arc<ConfigTable>>,
}

impl DefinitionCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The configuration table for a definition, building and memoizing it on
    /// first access. Concurrent callers for the same schema share one table.
    pub fn config_for(&self, definition: &TransactionDefinition) -> Arc<ConfigTable> {
        let key = (
            definition.xid().to_string(),
            definition.version().to_string(),
        );
        if let Some(table) = self.tables.get(&key) {
            debug!(transaction = definition.xid(), "loop configuration cache hit");
            return Arc::clone(&table);
        }
        let entry = self.tables.entry(key).or_insert_with(|| {
            info!(
                transaction = definition.xid(),
                version = definition.version(),
                "building loop configuration"
            );
            Arc::new(ConfigTable::build(definition))
        });
        Arc::clone(&entry)
    }

    /// Number of cached schemas.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    /// Drop all cached tables.
    pub fn clear(&self) {
        self.tables.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{LoopDefinition, SegmentDefinition, Usage};

    fn definition(xid: &str, version: &str) -> TransactionDefinition {
        let root = LoopDefinition::new("ISA_LOOP", "Interchange", Usage::Required, "001", "1")
            .with_segment(SegmentDefinition::new(
                "ISA",
                "Header",
                Usage::Required,
                "010",
                "1",
            ));
        TransactionDefinition::new(xid, "Test", version, root)
    }

    #[test]
    fn test_repeated_access_shares_one_table() {
        let cache = DefinitionCache::new();
        let schema = definition("837", "005010X222A1");

        let first = cache.config_for(&schema);
        let second = cache.config_for(&schema);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_shared_version_distinct_xid_get_distinct_entries() {
        let cache = DefinitionCache::new();
        let eligibility_request = definition("270", "004010X092A1");
        let eligibility_response = definition("271", "004010X092A1");

        let a = cache.config_for(&eligibility_request);
        let b = cache.config_for(&eligibility_response);
        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 2);
    }

    #[test]
    fn test_concurrent_access_single_table() {
        let cache = Arc::new(DefinitionCache::new());
        let schema = Arc::new(definition("835", "005010X221A1"));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let cache = Arc::clone(&cache);
                let schema = Arc::clone(&schema);
                std::thread::spawn(move || cache.config_for(&schema))
            })
            .collect();

        let tables: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        assert_eq!(cache.len(), 1);
        for table in &tables[1..] {
            assert!(Arc::ptr_eq(&tables[0], table));
        }
    }

    #[test]
    fn test_clear() {
        let cache = DefinitionCache::new();
        cache.config_for(&definition("837", "005010X222A1"));
        assert!(!cache.is_empty());
        cache.clear();
        assert!(cache.is_empty());
    }
}
