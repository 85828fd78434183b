use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value as JsonValue;

use stockledger_core::ExpectedVersion;

use super::r#trait::{check_revision, KeyValueStore, StoreError, Versioned};

/// In-memory versioned store.
///
/// Intended for tests/dev. Not optimized for performance.
#[derive(Debug, Default)]
pub struct InMemoryKeyValueStore {
    entries: RwLock<HashMap<String, Versioned<JsonValue>>>,
}

impl InMemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryKeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError> {
        let entries = self
            .entries
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;
        Ok(entries.get(key).cloned())
    }

    fn put(
        &self,
        key: &str,
        value: JsonValue,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        let mut entries = self
            .entries
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let current = entries.get(key).map(|v| v.revision).unwrap_or(0);
        check_revision(key, expected, current)?;

        let revision = current + 1;
        entries.insert(key.to_string(), Versioned { revision, value });
        Ok(revision)
    }
}
