//! Infrastructure layer: storage backends, configuration, and the
//! ledger service that ties them to the inventory domain.

pub mod config;
pub mod ledger;
pub mod store;

mod integration_tests;

pub use config::LedgerConfig;
pub use ledger::{InventoryLedger, LedgerError, LedgerResult};
pub use store::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, StoreError, Versioned};
