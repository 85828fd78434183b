//! Integration tests for the full ledger pipeline.
//!
//! Tests: catalog → InventoryLedger → KeyValueStore → queries
//!
//! Verifies:
//! - The reserve → confirm/cancel lifecycle end to end
//! - Concurrent reservations never oversell
//! - File-backed ledgers survive reopening

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Barrier};

    use uuid::Uuid;

    use stockledger_core::ProductId;
    use stockledger_inventory::CatalogProduct;

    use crate::config::LedgerConfig;
    use crate::ledger::{InventoryLedger, LedgerError};
    use crate::store::{FileKeyValueStore, InMemoryKeyValueStore};

    fn pid(s: &str) -> ProductId {
        ProductId::new(s).unwrap()
    }

    fn setup(products: &[CatalogProduct]) -> Arc<InventoryLedger<InMemoryKeyValueStore>> {
        stockledger_observability::init();
        let ledger = InventoryLedger::new(InMemoryKeyValueStore::new(), LedgerConfig::default());
        ledger.initialize(products).unwrap();
        Arc::new(ledger)
    }

    fn temp_dir() -> std::path::PathBuf {
        std::env::temp_dir().join(format!("stockledger-it-{}", Uuid::now_v7()))
    }

    #[test]
    fn reserve_then_confirm_scenario() {
        let ledger = setup(&[CatalogProduct::new(pid("A"), "Alpha").with_quantity(10)]);
        let a = pid("A");

        assert!(ledger.is_in_stock(&a, 5).unwrap());

        let r = ledger.reserve(&a, 5).unwrap();
        assert_eq!((r.quantity(), r.reserved()), (10, 5));

        assert!(!ledger.is_in_stock(&a, 6).unwrap());

        let r = ledger.confirm(&a, 5).unwrap();
        assert_eq!((r.quantity(), r.reserved()), (5, 0));
    }

    #[test]
    fn reserve_then_cancel_restores_reserved() {
        let ledger = setup(&[CatalogProduct::new(pid("A"), "Alpha").with_quantity(10)]);
        let a = pid("A");
        ledger.reserve(&a, 2).unwrap();

        let before = ledger.get_record(&a).unwrap().unwrap().reserved();
        ledger.reserve(&a, 3).unwrap();
        let after = ledger.cancel_reservation(&a, 3).unwrap().unwrap();
        assert_eq!(after.reserved(), before);
        assert_eq!(after.quantity(), 10);
    }

    #[test]
    fn reserve_then_confirm_reduces_both_counters() {
        let ledger = setup(&[CatalogProduct::new(pid("A"), "Alpha").with_quantity(10)]);
        let a = pid("A");
        ledger.reserve(&a, 1).unwrap();

        let before = ledger.get_record(&a).unwrap().unwrap();
        ledger.reserve(&a, 3).unwrap();
        let after = ledger.confirm(&a, 3).unwrap();
        assert_eq!(after.quantity(), before.quantity() - 3);
        assert_eq!(after.reserved(), before.reserved());
    }

    #[test]
    fn cancel_on_unknown_product_is_noop_success() {
        let ledger = setup(&[CatalogProduct::new(pid("A"), "Alpha")]);
        let before = ledger.get_all().unwrap();
        assert!(ledger.cancel_reservation(&pid("ghost"), 3).unwrap().is_none());
        assert_eq!(ledger.get_all().unwrap(), before);
    }

    #[test]
    fn initialize_twice_is_identical() {
        let products = vec![
            CatalogProduct::new(pid("A"), "Alpha").with_quantity(10),
            CatalogProduct::new(pid("B"), "Beta").with_min_stock(2),
        ];
        let ledger = setup(&products);
        let first = ledger.get_all().unwrap();
        let second = ledger.initialize(&products).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn low_stock_tracks_availability_and_restock() {
        let ledger = setup(&[CatalogProduct::new(pid("A"), "Alpha")
            .with_quantity(8)
            .with_min_stock(5)]);
        let a = pid("A");

        assert!(ledger.low_stock_items().unwrap().is_empty());

        ledger.reserve(&a, 3).unwrap();
        let low = ledger.low_stock_items().unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].product_id(), &a);
        // On-hand is still 8, so the report does not count it.
        assert_eq!(ledger.report().unwrap().low_stock_count, 0);

        ledger.set_quantity(&a, 20).unwrap();
        assert!(ledger.low_stock_items().unwrap().is_empty());
    }

    #[test]
    fn report_aggregates_all_records() {
        let ledger = setup(&[
            CatalogProduct::new(pid("A"), "Alpha").with_quantity(10),
            CatalogProduct::new(pid("B"), "Beta").with_quantity(0),
            CatalogProduct::new(pid("C"), "Gamma").with_quantity(4),
        ]);
        ledger.reserve(&pid("A"), 6).unwrap();

        let report = ledger.report().unwrap();
        assert_eq!(report.total_products, 3);
        assert_eq!(report.total_quantity, 14);
        assert_eq!(report.total_reserved, 6);
        assert_eq!(report.low_stock_count, 2);
        assert_eq!(report.out_of_stock_count, 1);
    }

    #[test]
    fn set_quantity_below_reserved_keeps_invariant() {
        let ledger = setup(&[CatalogProduct::new(pid("A"), "Alpha").with_quantity(10)]);
        let a = pid("A");
        ledger.reserve(&a, 7).unwrap();

        let r = ledger.set_quantity(&a, 4).unwrap();
        assert_eq!((r.quantity(), r.reserved()), (4, 4));
        assert_eq!(ledger.available(&a).unwrap(), Some(0));
    }

    #[test]
    fn concurrent_reserves_never_oversell() {
        const THREADS: usize = 32;
        const STOCK: u64 = 10;

        let ledger = setup(&[CatalogProduct::new(pid("hot"), "Hot item").with_quantity(STOCK)]);
        let barrier = Arc::new(Barrier::new(THREADS));

        let handles: Vec<_> = (0..THREADS)
            .map(|_| {
                let ledger = ledger.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    ledger.reserve(&pid("hot"), 1)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let successes = results.iter().filter(|r| r.is_ok()).count();
        let shortfalls = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::InsufficientStock { .. })))
            .count();

        assert_eq!(successes, STOCK as usize);
        assert_eq!(shortfalls, THREADS - STOCK as usize);

        let hot = ledger.get_record(&pid("hot")).unwrap().unwrap();
        assert_eq!(hot.reserved(), STOCK);
        assert_eq!(hot.available(), 0);
    }

    #[test]
    fn concurrent_writes_to_different_products_all_succeed() {
        const PRODUCTS: usize = 16;
        const PER_PRODUCT: usize = 4;

        let products: Vec<_> = (0..PRODUCTS)
            .map(|i| CatalogProduct::new(pid(&format!("p{i}")), format!("Product {i}")))
            .collect();
        let ledger = setup(&products);

        let barrier = Arc::new(Barrier::new(PRODUCTS * PER_PRODUCT));
        let handles: Vec<_> = (0..PRODUCTS * PER_PRODUCT)
            .map(|n| {
                let ledger = ledger.clone();
                let barrier = barrier.clone();
                std::thread::spawn(move || {
                    barrier.wait();
                    ledger.reserve(&pid(&format!("p{}", n % PRODUCTS)), 2)
                })
            })
            .collect();

        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        let conflicts = results
            .iter()
            .filter(|r| matches!(r, Err(LedgerError::Conflict { .. })))
            .count();
        assert_eq!(conflicts, 0);
        assert!(results.iter().all(|r| r.is_ok()));

        for i in 0..PRODUCTS {
            let r = ledger.get_record(&pid(&format!("p{i}"))).unwrap().unwrap();
            assert_eq!(r.reserved(), (PER_PRODUCT * 2) as u64);
        }
    }

    #[test]
    fn mixed_concurrent_operations_hold_the_invariant() {
        let ledger = setup(&[CatalogProduct::new(pid("mix"), "Mixed").with_quantity(30)]);
        let handles: Vec<_> = (0..8)
            .map(|t| {
                let ledger = ledger.clone();
                std::thread::spawn(move || {
                    let id = pid("mix");
                    for i in 0..25u64 {
                        let _ = match (t + i) % 4 {
                            0 => ledger.reserve(&id, 3).map(|_| ()),
                            1 => ledger.cancel_reservation(&id, 2).map(|_| ()),
                            2 => ledger.confirm(&id, 1).map(|_| ()),
                            _ => ledger.set_quantity(&id, 10 + i).map(|_| ()),
                        };
                        let r = ledger.get_record(&id).unwrap().unwrap();
                        assert!(r.reserved() <= r.quantity());
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
    }

    #[test]
    fn file_backed_ledger_survives_reopen() {
        let dir = temp_dir();
        {
            let store = FileKeyValueStore::open(&dir).unwrap();
            let ledger = InventoryLedger::new(store, LedgerConfig::default());
            ledger
                .initialize(&[CatalogProduct::new(pid("A"), "Alpha").with_quantity(10)])
                .unwrap();
            ledger.reserve(&pid("A"), 4).unwrap();
        }

        let config = LedgerConfig {
            data_dir: Some(dir.clone()),
            ..LedgerConfig::default()
        };
        let reopened = InventoryLedger::from_config(config).unwrap();
        let seeded_again = reopened
            .initialize(&[CatalogProduct::new(pid("other"), "Other")])
            .unwrap();
        assert_eq!(seeded_again.len(), 1);

        let a = reopened.get_record(&pid("A")).unwrap().unwrap();
        assert_eq!((a.quantity(), a.reserved()), (10, 4));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
