//! Versioned key/value storage boundary.
//!
//! The ledger persists its whole snapshot under one key; writes carry an
//! [`ExpectedVersion`](stockledger_core::ExpectedVersion) so concurrent
//! writers cannot silently overwrite each other.

pub mod file;
pub mod in_memory;
pub mod r#trait;

pub use file::FileKeyValueStore;
pub use in_memory::InMemoryKeyValueStore;
pub use r#trait::{KeyValueStore, StoreError, Versioned};
