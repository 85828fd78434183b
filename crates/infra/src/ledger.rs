//! Inventory reservation ledger (application-level orchestration).
//!
//! Every mutating call runs the same pipeline:
//!
//! ```text
//! take the ledger write lock
//!   ↓
//! 1. Load snapshot + store revision
//!   ↓
//! 2. Decide events for the product (pure, `StockRecord::handle`)
//!   ↓
//! 3. Apply events to the in-memory copy
//!   ↓
//! 4. Persist with ExpectedVersion::Exact(revision)
//!      └─ revision moved on? reload and go back to 1
//! ```
//!
//! Nothing is visible to other callers until step 4 succeeds, so a failed
//! write leaves the persisted ledger exactly as it was.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;

use stockledger_core::{Aggregate, AggregateRoot, DomainError, ExpectedVersion, ProductId};
use stockledger_inventory::{
    low_stock_items, seed_stock_levels, AdjustQuantity, CancelReservation, CatalogProduct,
    Confirm, InventoryReport, Reserve, SetQuantity, StockCommand, StockEvent, StockLevels,
    StockRecord,
};

use crate::config::LedgerConfig;
use crate::store::{FileKeyValueStore, InMemoryKeyValueStore, KeyValueStore, StoreError};

/// Ledger operation error.
#[derive(Debug, Error)]
pub enum LedgerError {
    /// The product has no stock record.
    #[error("product not found: {0}")]
    NotFound(ProductId),

    /// Not enough units to satisfy the request.
    #[error("cannot reserve requested quantity for {product_id} (requested: {requested}, available: {available})")]
    InsufficientStock {
        product_id: ProductId,
        requested: u64,
        available: u64,
    },

    /// Malformed request (e.g. a zero adjustment).
    #[error("validation failed: {0}")]
    Validation(String),

    /// A domain invariant check failed.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),

    /// Reading, writing, or decoding the persisted ledger failed.
    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    /// Another process kept moving the store revision for every attempt.
    #[error("commit conflict not resolved after {attempts} attempts")]
    Conflict { attempts: u32 },
}

impl LedgerError {
    fn from_domain(product_id: &ProductId, err: DomainError) -> Self {
        match err {
            DomainError::InsufficientStock {
                requested,
                available,
            } => LedgerError::InsufficientStock {
                product_id: product_id.clone(),
                requested,
                available,
            },
            DomainError::Validation(msg) | DomainError::InvalidId(msg) => {
                LedgerError::Validation(msg)
            }
            DomainError::InvariantViolation(msg) => LedgerError::InvariantViolation(msg),
        }
    }
}

pub type LedgerResult<T> = Result<T, LedgerError>;

/// Per-product stock ledger over a versioned key/value store.
///
/// ## Concurrency
///
/// - The whole ledger is one stored document, so every mutation in this
///   process holds one write lock across load, decide and persist. Callers
///   never race each other's revision, whatever products they touch.
/// - The snapshot write is still a compare-and-swap on the store revision.
///   Only writers outside this ledger (another process on the same data
///   directory) can move it; the loser reloads and re-decides, up to
///   `max_commit_attempts` times.
///
/// Two concurrent `reserve` calls therefore always observe each other: at
/// most as many succeed as there was stock for.
#[derive(Debug)]
pub struct InventoryLedger<S> {
    store: S,
    config: LedgerConfig,
    write_lock: Mutex<()>,
}

impl<S> InventoryLedger<S> {
    pub fn new(store: S, config: LedgerConfig) -> Self {
        Self {
            store,
            config,
            write_lock: Mutex::new(()),
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

impl InventoryLedger<Arc<dyn KeyValueStore>> {
    /// Build a ledger on the store the config selects: file-backed when
    /// `data_dir` is set, in-memory otherwise.
    pub fn from_config(config: LedgerConfig) -> anyhow::Result<Self> {
        let store: Arc<dyn KeyValueStore> = match &config.data_dir {
            Some(dir) => Arc::new(open_file_store(dir)?),
            None => Arc::new(InMemoryKeyValueStore::new()),
        };
        Ok(Self::new(store, config))
    }
}

fn open_file_store(dir: &Path) -> anyhow::Result<FileKeyValueStore> {
    FileKeyValueStore::open(dir)
        .with_context(|| format!("failed to open ledger data directory at {}", dir.display()))
}

impl<S> InventoryLedger<S>
where
    S: KeyValueStore,
{
    /// Seed the ledger from a catalog snapshot, unless one is already stored.
    ///
    /// Idempotent: an existing ledger is returned unchanged. If two callers
    /// race, one seeds and the other returns what the winner wrote.
    pub fn initialize(&self, products: &[CatalogProduct]) -> LedgerResult<StockLevels> {
        let _guard = self.write_lock.lock();
        if let Some((_, existing)) = self.load()? {
            tracing::debug!(records = existing.len(), "ledger already initialized");
            return Ok(existing);
        }

        let levels = seed_stock_levels(products, self.config.seed_defaults(), Utc::now());
        let payload = serde_json::to_value(&levels).map_err(StoreError::from)?;

        match self
            .store
            .put(&self.config.storage_key, payload, ExpectedVersion::Exact(0))
        {
            Ok(revision) => {
                tracing::info!(records = levels.len(), revision, "ledger initialized");
                Ok(levels)
            }
            Err(StoreError::Conflict { .. }) => {
                tracing::debug!("ledger seeded concurrently; using stored snapshot");
                Ok(self.load()?.map(|(_, l)| l).unwrap_or_default())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Full mapping of product id to record (empty before initialization).
    pub fn get_all(&self) -> LedgerResult<StockLevels> {
        Ok(self.load()?.map(|(_, l)| l).unwrap_or_default())
    }

    pub fn get_record(&self, product_id: &ProductId) -> LedgerResult<Option<StockRecord>> {
        Ok(self.get_all()?.remove(product_id))
    }

    /// Available-to-sell for one product.
    pub fn available(&self, product_id: &ProductId) -> LedgerResult<Option<u64>> {
        Ok(self.get_record(product_id)?.map(|r| r.available()))
    }

    pub fn is_in_stock(&self, product_id: &ProductId, quantity: u64) -> LedgerResult<bool> {
        Ok(self
            .get_record(product_id)?
            .is_some_and(|r| r.can_fulfil(quantity)))
    }

    /// Records whose available-to-sell is at or below `min_stock`.
    pub fn low_stock_items(&self) -> LedgerResult<Vec<StockRecord>> {
        Ok(low_stock_items(self.get_all()?.values()))
    }

    pub fn report(&self) -> LedgerResult<InventoryReport> {
        Ok(InventoryReport::from_records(self.get_all()?.values()))
    }

    /// Hold `quantity` units for an order.
    pub fn reserve(&self, product_id: &ProductId, quantity: u64) -> LedgerResult<StockRecord> {
        self.execute(product_id, |occurred_at| {
            StockCommand::Reserve(Reserve {
                product_id: product_id.clone(),
                quantity,
                occurred_at,
            })
        })?
        .ok_or_else(|| LedgerError::NotFound(product_id.clone()))
    }

    /// Ship `quantity` units, consuming the matching reservation.
    pub fn confirm(&self, product_id: &ProductId, quantity: u64) -> LedgerResult<StockRecord> {
        self.execute(product_id, |occurred_at| {
            StockCommand::Confirm(Confirm {
                product_id: product_id.clone(),
                quantity,
                occurred_at,
            })
        })?
        .ok_or_else(|| LedgerError::NotFound(product_id.clone()))
    }

    /// Release held units. Unknown products are a no-op and yield `None`.
    pub fn cancel_reservation(
        &self,
        product_id: &ProductId,
        quantity: u64,
    ) -> LedgerResult<Option<StockRecord>> {
        self.execute(product_id, |occurred_at| {
            StockCommand::CancelReservation(CancelReservation {
                product_id: product_id.clone(),
                quantity,
                occurred_at,
            })
        })
    }

    /// Overwrite on-hand quantity (restock or correction).
    ///
    /// Reservations the new quantity cannot cover are released.
    pub fn set_quantity(&self, product_id: &ProductId, quantity: u64) -> LedgerResult<StockRecord> {
        self.execute(product_id, |occurred_at| {
            StockCommand::SetQuantity(SetQuantity {
                product_id: product_id.clone(),
                quantity,
                occurred_at,
            })
        })?
        .ok_or_else(|| LedgerError::NotFound(product_id.clone()))
    }

    /// Relative restock (positive `delta`) or write-off (negative).
    pub fn adjust_quantity(&self, product_id: &ProductId, delta: i64) -> LedgerResult<StockRecord> {
        self.execute(product_id, |occurred_at| {
            StockCommand::AdjustQuantity(AdjustQuantity {
                product_id: product_id.clone(),
                delta,
                occurred_at,
            })
        })?
        .ok_or_else(|| LedgerError::NotFound(product_id.clone()))
    }

    fn load(&self) -> LedgerResult<Option<(u64, StockLevels)>> {
        let Some(stored) = self.store.get(&self.config.storage_key)? else {
            return Ok(None);
        };
        let levels: StockLevels = serde_json::from_value(stored.value).map_err(|e| {
            StoreError::Corrupt(format!("ledger '{}': {e}", self.config.storage_key))
        })?;
        Ok(Some((stored.revision, levels)))
    }

    /// Run one command against one product. `Ok(None)` means the product (or
    /// the whole ledger) does not exist.
    fn execute(
        &self,
        product_id: &ProductId,
        make_command: impl Fn(DateTime<Utc>) -> StockCommand,
    ) -> LedgerResult<Option<StockRecord>> {
        let _guard = self.write_lock.lock();
        let max_attempts = self.config.max_commit_attempts.max(1);

        for attempt in 1..=max_attempts {
            let Some((revision, mut levels)) = self.load()? else {
                return Ok(None);
            };
            let Some(record) = levels.get_mut(product_id) else {
                return Ok(None);
            };

            let command = make_command(Utc::now());
            let events = record
                .handle(&command)
                .map_err(|e| LedgerError::from_domain(product_id, e))?;
            if events.is_empty() {
                return Ok(Some(record.clone()));
            }

            for event in &events {
                record.apply(event);
            }
            let updated = record.clone();

            let payload = serde_json::to_value(&levels).map_err(StoreError::from)?;
            match self.store.put(
                &self.config.storage_key,
                payload,
                ExpectedVersion::Exact(revision),
            ) {
                Ok(new_revision) => {
                    log_committed(&updated, &events, new_revision);
                    return Ok(Some(updated));
                }
                Err(StoreError::Conflict { actual, .. }) => {
                    tracing::warn!(
                        product_id = %product_id,
                        attempt,
                        expected = revision,
                        actual,
                        "ledger revision moved; retrying"
                    );
                }
                Err(e) => return Err(e.into()),
            }
        }

        Err(LedgerError::Conflict {
            attempts: max_attempts,
        })
    }
}

fn log_committed(record: &StockRecord, events: &[StockEvent], revision: u64) {
    for event in events {
        if let StockEvent::QuantitySet(e) = event {
            if e.released > 0 {
                tracing::warn!(
                    product_id = %e.product_id,
                    released = e.released,
                    quantity = e.quantity,
                    "quantity set below reserved; reservations released"
                );
            }
        }
        tracing::debug!(
            product_id = %record.product_id(),
            event_type = event.event_type(),
            version = record.version(),
            revision,
            quantity = record.quantity(),
            reserved = record.reserved(),
            "stock event committed"
        );
    }
}
