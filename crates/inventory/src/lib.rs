//! Inventory domain module.
//!
//! This crate contains the stock-counting rules for the reservation ledger,
//! implemented purely as deterministic domain logic (no IO, no storage).

pub mod catalog;
pub mod report;
pub mod stock;

pub use catalog::{seed_stock_levels, CatalogProduct, SeedDefaults};
pub use report::{low_stock_items, InventoryReport};
pub use stock::{
    AdjustQuantity, CancelReservation, Confirm, QuantityAdjusted, QuantitySet, Reserve,
    ReservationCancelled, ReservationConfirmed, SetQuantity, StockCommand, StockEvent,
    StockLevels, StockRecord, StockReserved,
};
