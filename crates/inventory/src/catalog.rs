//! Seeding stock records from a catalog snapshot.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use stockledger_core::{ProductId, Sku};

use crate::stock::{StockLevels, StockRecord};

/// One catalog entry as supplied by the product catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogProduct {
    pub id: ProductId,
    pub name: String,
    #[serde(default)]
    pub quantity: Option<u64>,
    #[serde(default)]
    pub min_stock: Option<u64>,
    #[serde(default)]
    pub sku: Option<Sku>,
}

impl CatalogProduct {
    pub fn new(id: ProductId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            quantity: None,
            min_stock: None,
            sku: None,
        }
    }

    pub fn with_quantity(mut self, quantity: u64) -> Self {
        self.quantity = Some(quantity);
        self
    }

    pub fn with_min_stock(mut self, min_stock: u64) -> Self {
        self.min_stock = Some(min_stock);
        self
    }

    pub fn with_sku(mut self, sku: Sku) -> Self {
        self.sku = Some(sku);
        self
    }
}

/// Values used when a catalog entry omits them.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct SeedDefaults {
    pub quantity: u64,
    pub min_stock: u64,
}

impl Default for SeedDefaults {
    fn default() -> Self {
        Self {
            quantity: 50,
            min_stock: 5,
        }
    }
}

/// Build one record per distinct product id. The first occurrence of a
/// duplicated id wins.
pub fn seed_stock_levels<'a>(
    products: impl IntoIterator<Item = &'a CatalogProduct>,
    defaults: SeedDefaults,
    now: DateTime<Utc>,
) -> StockLevels {
    let mut levels = StockLevels::new();
    for p in products {
        if levels.contains_key(&p.id) {
            continue;
        }
        let sku = p.sku.clone().unwrap_or_else(|| Sku::derive_from(&p.id));
        let record = StockRecord::new(
            p.id.clone(),
            p.name.clone(),
            p.quantity.unwrap_or(defaults.quantity),
            p.min_stock.unwrap_or(defaults.min_stock),
            sku,
            now,
        );
        levels.insert(p.id.clone(), record);
    }
    levels
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(s: &str) -> ProductId {
        ProductId::new(s).unwrap()
    }

    #[test]
    fn missing_fields_take_defaults() {
        let products = vec![CatalogProduct::new(pid("tee"), "Tee")];
        let levels = seed_stock_levels(&products, SeedDefaults::default(), Utc::now());

        let r = &levels[&pid("tee")];
        assert_eq!(r.quantity(), 50);
        assert_eq!(r.min_stock(), 5);
        assert_eq!(r.reserved(), 0);
        assert_eq!(r.sku().as_str(), "SKU-TEE");
        assert_eq!(r.product_name(), "Tee");
    }

    #[test]
    fn explicit_fields_are_kept() {
        let products = vec![CatalogProduct::new(pid("mug"), "Mug")
            .with_quantity(3)
            .with_min_stock(1)
            .with_sku(Sku::new("MUG-RED").unwrap())];
        let levels = seed_stock_levels(&products, SeedDefaults::default(), Utc::now());

        let r = &levels[&pid("mug")];
        assert_eq!(r.quantity(), 3);
        assert_eq!(r.min_stock(), 1);
        assert_eq!(r.sku().as_str(), "MUG-RED");
    }

    #[test]
    fn duplicate_ids_collapse_to_first() {
        let products = vec![
            CatalogProduct::new(pid("a"), "First").with_quantity(1),
            CatalogProduct::new(pid("a"), "Second").with_quantity(2),
        ];
        let levels = seed_stock_levels(&products, SeedDefaults::default(), Utc::now());
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[&pid("a")].product_name(), "First");
    }

    #[test]
    fn catalog_json_uses_camel_case() {
        let p: CatalogProduct = serde_json::from_str(
            r#"{"id":"cap","name":"Cap","quantity":7,"minStock":2}"#,
        )
        .unwrap();
        assert_eq!(p.quantity, Some(7));
        assert_eq!(p.min_stock, Some(2));
        assert_eq!(p.sku, None);
    }
}
