use std::sync::Arc;

use serde_json::Value as JsonValue;
use thiserror::Error;

use stockledger_core::ExpectedVersion;

/// A stored value together with the revision it was written at.
///
/// Revisions start at 1 for the first write of a key and increase by one per
/// successful `put`. A missing key behaves as revision 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Versioned<T> {
    pub revision: u64,
    pub value: T,
}

/// Storage operation error.
///
/// These are infrastructure errors, as opposed to domain errors (validation,
/// stock shortfalls).
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("optimistic concurrency check failed for '{key}' (expected: {expected:?}, actual: {actual})")]
    Conflict {
        key: String,
        expected: ExpectedVersion,
        actual: u64,
    },

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(String),

    #[error("stored data is corrupt: {0}")]
    Corrupt(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        StoreError::Serialization(value.to_string())
    }
}

/// Durable key/value store with per-key compare-and-swap.
///
/// `put` must be atomic per key: either the revision check passes and the new
/// value becomes visible as a whole, or nothing changes.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError>;

    /// Write `value` if the key's current revision satisfies `expected`.
    /// Returns the new revision.
    fn put(
        &self,
        key: &str,
        value: JsonValue,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError>;
}

impl<S> KeyValueStore for Arc<S>
where
    S: KeyValueStore + ?Sized,
{
    fn get(&self, key: &str) -> Result<Option<Versioned<JsonValue>>, StoreError> {
        (**self).get(key)
    }

    fn put(
        &self,
        key: &str,
        value: JsonValue,
        expected: ExpectedVersion,
    ) -> Result<u64, StoreError> {
        (**self).put(key, value, expected)
    }
}

pub(crate) fn check_revision(
    key: &str,
    expected: ExpectedVersion,
    actual: u64,
) -> Result<(), StoreError> {
    if expected.matches(actual) {
        Ok(())
    } else {
        Err(StoreError::Conflict {
            key: key.to_string(),
            expected,
            actual,
        })
    }
}
