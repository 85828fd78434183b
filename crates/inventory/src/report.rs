//! Read-only reporting over stock levels.

use serde::{Deserialize, Serialize};

use crate::stock::StockRecord;

/// Aggregate inventory counts.
///
/// `low_stock_count` compares raw on-hand quantity against `min_stock`,
/// unlike [`low_stock_items`], which uses available-to-sell.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryReport {
    pub total_products: usize,
    pub total_quantity: u64,
    pub total_reserved: u64,
    pub low_stock_count: usize,
    pub out_of_stock_count: usize,
}

impl InventoryReport {
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a StockRecord>) -> Self {
        records.into_iter().fold(Self::default(), |mut acc, r| {
            acc.total_products += 1;
            acc.total_quantity = acc.total_quantity.saturating_add(r.quantity());
            acc.total_reserved = acc.total_reserved.saturating_add(r.reserved());
            if r.is_at_or_below_minimum() {
                acc.low_stock_count += 1;
            }
            if r.is_out_of_stock() {
                acc.out_of_stock_count += 1;
            }
            acc
        })
    }
}

/// Records whose available-to-sell is at or below their minimum.
pub fn low_stock_items<'a>(
    records: impl IntoIterator<Item = &'a StockRecord>,
) -> Vec<StockRecord> {
    records
        .into_iter()
        .filter(|r| r.is_low_stock())
        .cloned()
        .collect()
}
