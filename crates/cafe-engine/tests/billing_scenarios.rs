//! End-to-end billing flows against a real SQLite store.

use std::collections::HashSet;
use std::sync::Arc;

use cafe_core::{
    CoreError, DiscountKind, InventoryItem, MenuItem, MovementSource, PaymentStatus, TableState,
};
use cafe_db::repository::menu::new_menu_item;
use cafe_db::{Database, DbConfig};
use cafe_engine::{telemetry, BillingEngine, EngineConfig, EngineError, ErrorCode};

struct Cafe {
    engine: BillingEngine,
    coffee: MenuItem,
    sandwich: MenuItem,
    beer: MenuItem,
    beer_stock: InventoryItem,
}

async fn cafe_on(db: Database) -> Cafe {
    telemetry::init_test_tracing();

    let menu = db.menu();
    let coffee = menu
        .insert(&new_menu_item("Coffee", "Beverages", 12_000, None))
        .await
        .unwrap();
    let sandwich = menu
        .insert(&new_menu_item("Sandwich", "Food", 15_000, None))
        .await
        .unwrap();

    let engine = BillingEngine::new(db.clone(), db.menu(), EngineConfig::default())
        .await
        .unwrap();

    let beer_stock = engine
        .ledger()
        .create_inventory_item("Beer", 5, 2)
        .await
        .unwrap();
    let beer = menu
        .insert(&new_menu_item("Beer", "Bar", 25_000, Some(beer_stock.id.clone())))
        .await
        .unwrap();

    Cafe {
        engine,
        coffee,
        sandwich,
        beer,
        beer_stock,
    }
}

async fn cafe() -> Cafe {
    cafe_on(Database::new(DbConfig::in_memory()).await.unwrap()).await
}

async fn status_of(engine: &BillingEngine, table_number: i64) -> TableState {
    engine
        .table_statuses()
        .await
        .unwrap()
        .into_iter()
        .find(|s| s.table_number == table_number)
        .unwrap()
        .status
}

/// Occupied exactly when the mirror has lines or a pending sale exists.
async fn assert_occupancy_invariant(engine: &BillingEngine) {
    let db = engine.database();
    let pending: HashSet<i64> = db
        .sales()
        .tables_with_pending()
        .await
        .unwrap()
        .into_iter()
        .collect();

    for status in engine.table_statuses().await.unwrap() {
        let number = status.table_number;
        let has_lines = db
            .tab_store()
            .load(number)
            .await
            .unwrap()
            .is_some_and(|t| !t.lines.is_empty());
        let expected = if has_lines || pending.contains(&number) {
            TableState::Occupied
        } else {
            TableState::Vacant
        };
        assert_eq!(status.status, expected, "table {number}");
    }
}

#[tokio::test]
async fn two_lines_with_ten_percent_discount() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(5, &cafe.coffee.id, 2).await.unwrap();
    let view = engine.add_line(5, &cafe.sandwich.id, 1).await.unwrap();
    assert_eq!(view.subtotal_paise, 39_000);
    assert_eq!(view.lines.len(), 2);

    let view = engine
        .set_discount(5, DiscountKind::Percentage, 1_000)
        .await
        .unwrap();
    assert_eq!(view.discount_paise, 3_900);
    assert_eq!(view.total_paise, 35_100);
    assert_eq!(EngineConfig::default().format_currency(view.total_paise), "₹351.00");

    assert_eq!(status_of(engine, 5).await, TableState::Occupied);
    assert_occupancy_invariant(engine).await;
}

#[tokio::test]
async fn removing_last_unit_deletes_line_and_empty_tab_cannot_finalize() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(2, &cafe.coffee.id, 1).await.unwrap();
    let view = engine.remove_line(2, &cafe.coffee.id).await.unwrap();
    assert!(view.lines.is_empty());
    assert_eq!(view.total_paise, 0);
    assert_eq!(status_of(engine, 2).await, TableState::Vacant);

    let err = engine.finalize_and_pay(2).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(CoreError::EmptyOrder { table_number: 2 })
    ));
    assert_eq!(err.code(), ErrorCode::ValidationError);
    assert_eq!(engine.database().sales().count().await.unwrap(), 0);

    let err = engine.remove_line(2, &cafe.coffee.id).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn amount_discount_is_clamped_to_subtotal() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(1, &cafe.coffee.id, 2).await.unwrap();
    engine.add_line(1, &cafe.sandwich.id, 1).await.unwrap();
    let view = engine
        .set_discount(1, DiscountKind::Amount, 50_000)
        .await
        .unwrap();
    assert_eq!(view.discount.value, 50_000);
    assert_eq!(view.discount_paise, 39_000);
    assert_eq!(view.total_paise, 0);

    let err = engine
        .set_discount(1, DiscountKind::Amount, -1)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(engine.open_tab(1).await.unwrap().total_paise, 0);
}

#[tokio::test]
async fn entered_discount_is_kept_while_the_tab_changes() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    let view = engine
        .set_discount(2, DiscountKind::Amount, 5_000)
        .await
        .unwrap();
    assert_eq!(view.discount.value, 5_000);
    assert_eq!(status_of(engine, 2).await, TableState::Vacant);
    let view = engine.add_line(2, &cafe.coffee.id, 1).await.unwrap();
    assert_eq!(view.total_paise, 7_000);

    engine.add_line(2, &cafe.coffee.id, 1).await.unwrap();
    engine
        .set_discount(2, DiscountKind::Amount, 20_000)
        .await
        .unwrap();
    let view = engine.remove_line(2, &cafe.coffee.id).await.unwrap();
    assert_eq!(view.discount_paise, 12_000);
    let view = engine.add_line(2, &cafe.coffee.id, 1).await.unwrap();
    assert_eq!(view.subtotal_paise, 24_000);
    assert_eq!(view.total_paise, 4_000);

    engine.remove_line(2, &cafe.coffee.id).await.unwrap();
    let sale_id = engine.finalize_and_pay(2).await.unwrap();
    let receipt = engine.sale_receipt(&sale_id).await.unwrap();
    assert_eq!(receipt.sale.discount_value, 12_000);
    assert_eq!(receipt.sale.discount_paise, 12_000);
    assert_eq!(receipt.sale.total_paise, 0);
}

#[tokio::test]
async fn finalize_and_pay_frees_the_table() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(3, &cafe.sandwich.id, 2).await.unwrap();
    let sale_id = engine.finalize_and_pay(3).await.unwrap();

    assert_eq!(status_of(engine, 3).await, TableState::Vacant);
    let receipt = engine.sale_receipt(&sale_id).await.unwrap();
    assert_eq!(receipt.sale.payment_status, PaymentStatus::Completed);
    assert!(receipt.sale.completed_at.is_some());
    assert_eq!(receipt.sale.total_paise, 30_000);
    assert_eq!(receipt.items.len(), 1);
    assert_eq!(receipt.items[0].quantity, 2);
    assert_eq!(receipt.items[0].unit_price_paise, 15_000);
    assert!(receipt.reconciles());

    assert!(engine.database().tab_store().load(3).await.unwrap().is_none());
    assert!(engine.open_tab(3).await.unwrap().is_empty());
    assert_occupancy_invariant(engine).await;
}

#[tokio::test]
async fn pending_sale_keeps_table_occupied_until_paid() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(8, &cafe.coffee.id, 1).await.unwrap();
    let sale_id = engine.finalize_as_pending(8).await.unwrap();
    assert_eq!(status_of(engine, 8).await, TableState::Occupied);
    assert_eq!(engine.pending_sales().await.unwrap().len(), 1);
    assert!(engine.open_tab(8).await.unwrap().is_empty());
    assert_occupancy_invariant(engine).await;

    engine.mark_paid(&sale_id).await.unwrap();
    assert_eq!(status_of(engine, 8).await, TableState::Vacant);
    assert!(engine.pending_sales().await.unwrap().is_empty());

    let receipt = engine.sale_receipt(&sale_id).await.unwrap();
    assert_eq!(receipt.sale.payment_status, PaymentStatus::Completed);

    let err = engine.mark_paid(&sale_id).await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::Conflict);

    let err = engine.mark_paid("no-such-sale").await.unwrap_err();
    assert_eq!(err.code(), ErrorCode::NotFound);
}

#[tokio::test]
async fn table_with_pending_sale_can_run_a_fresh_tab() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(4, &cafe.coffee.id, 1).await.unwrap();
    let first = engine.finalize_as_pending(4).await.unwrap();

    engine.add_line(4, &cafe.sandwich.id, 1).await.unwrap();
    engine.mark_paid(&first).await.unwrap();
    // The new tab still holds the table.
    assert_eq!(status_of(engine, 4).await, TableState::Occupied);

    let second = engine.finalize_as_pending(4).await.unwrap();
    engine.abandon(4).await.unwrap();
    // Abandoning an empty tab leaves the pending sale in charge.
    assert_eq!(status_of(engine, 4).await, TableState::Occupied);

    engine.mark_paid(&second).await.unwrap();
    assert_eq!(status_of(engine, 4).await, TableState::Vacant);
    assert_occupancy_invariant(engine).await;
}

#[tokio::test]
async fn abandon_discards_without_a_sale() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(6, &cafe.coffee.id, 3).await.unwrap();
    engine
        .set_discount(6, DiscountKind::Percentage, 500)
        .await
        .unwrap();
    engine.abandon(6).await.unwrap();

    assert_eq!(status_of(engine, 6).await, TableState::Vacant);
    assert_eq!(engine.database().sales().count().await.unwrap(), 0);
    assert!(engine.database().tab_store().load(6).await.unwrap().is_none());

    let view = engine.open_tab(6).await.unwrap();
    assert!(view.is_empty());
    assert!(view.discount.is_none());
}

#[tokio::test]
async fn opening_twice_attaches_to_the_same_tab() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.open_tab(9).await.unwrap();
    engine.add_line(9, &cafe.coffee.id, 1).await.unwrap();
    let again = engine.open_tab(9).await.unwrap();
    assert_eq!(again.lines.len(), 1);
    assert_eq!(again.subtotal_paise, 12_000);

    let err = engine.open_tab(99).await.unwrap_err();
    assert!(matches!(err, EngineError::NotFound { .. }));
}

#[tokio::test]
async fn bad_lines_are_rejected_and_tab_unchanged() {
    let cafe = cafe().await;
    let engine = &cafe.engine;
    let before = engine.add_line(10, &cafe.coffee.id, 1).await.unwrap();

    let err = engine.add_line(10, &cafe.coffee.id, 0).await.unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));

    let err = engine.add_line(10, "not-on-menu", 1).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(CoreError::MenuItemUnavailable(_))
    ));

    engine
        .database()
        .menu()
        .set_active(&cafe.sandwich.id, false)
        .await
        .unwrap();
    let err = engine.add_line(10, &cafe.sandwich.id, 1).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(CoreError::MenuItemUnavailable(_))
    ));

    let err = engine.add_line(10, &cafe.coffee.id, 999).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::Validation(CoreError::QuantityTooLarge { .. })
    ));

    assert_eq!(engine.open_tab(10).await.unwrap(), before);
}

#[tokio::test]
async fn price_is_frozen_when_the_line_is_added() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(11, &cafe.coffee.id, 1).await.unwrap();
    engine
        .database()
        .menu()
        .update_price(&cafe.coffee.id, 20_000)
        .await
        .unwrap();

    let view = engine.add_line(11, &cafe.coffee.id, 1).await.unwrap();
    assert_eq!(view.lines[0].unit_price_paise, 12_000);
    assert_eq!(view.subtotal_paise, 24_000);

    let sale_id = engine.finalize_and_pay(11).await.unwrap();
    let receipt = engine.sale_receipt(&sale_id).await.unwrap();
    assert_eq!(receipt.items[0].unit_price_paise, 12_000);
    assert_eq!(receipt.sale.subtotal_paise, 24_000);
}

#[tokio::test]
async fn finalize_deducts_linked_stock() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    engine.add_line(12, &cafe.beer.id, 3).await.unwrap();
    engine.add_line(12, &cafe.coffee.id, 1).await.unwrap();
    let sale_id = engine.finalize_and_pay(12).await.unwrap();

    let beer = engine.ledger().inventory_item(&cafe.beer_stock.id).await.unwrap();
    assert_eq!(beer.quantity, 2);

    let movements = engine.ledger().movements_for(&sale_id).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].delta, -3);
    assert_eq!(movements[0].source, MovementSource::Sale);

    let low = engine.low_stock_items().await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!((low[0].name.as_str(), low[0].quantity, low[0].threshold), ("Beer", 2, 2));
}

#[tokio::test]
async fn insufficient_stock_aborts_finalize() {
    let cafe = cafe().await;
    let engine = &cafe.engine;

    let before = engine.add_line(13, &cafe.beer.id, 6).await.unwrap();
    let err = engine.finalize_and_pay(13).await.unwrap_err();
    assert!(matches!(
        err,
        EngineError::InsufficientStock {
            available: 5,
            requested: 6,
            ..
        }
    ));

    assert_eq!(engine.database().sales().count().await.unwrap(), 0);
    let beer = engine.ledger().inventory_item(&cafe.beer_stock.id).await.unwrap();
    assert_eq!(beer.quantity, 5);
    assert_eq!(engine.open_tab(13).await.unwrap(), before);
    assert_eq!(status_of(engine, 13).await, TableState::Occupied);
    assert_occupancy_invariant(engine).await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn rapid_clicks_on_one_table_are_not_lost() {
    let cafe = cafe().await;
    let engine = Arc::new(cafe.engine);

    let mut handles = Vec::new();
    for table_number in [1, 1, 1, 1, 1, 1, 2, 2, 2, 2] {
        let engine = Arc::clone(&engine);
        let coffee = cafe.coffee.id.clone();
        handles.push(tokio::spawn(async move {
            engine.add_line(table_number, &coffee, 1).await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(engine.open_tab(1).await.unwrap().lines[0].quantity, 6);
    assert_eq!(engine.open_tab(2).await.unwrap().lines[0].quantity, 4);
    let mirror = engine.database().tab_store().load(1).await.unwrap().unwrap();
    assert_eq!(mirror.lines[0].quantity, 6);
}

#[tokio::test]
async fn occupancy_holds_across_a_busy_evening() {
    let cafe = cafe().await;
    let engine = &cafe.engine;
    let coffee = cafe.coffee.id.as_str();
    let sandwich = cafe.sandwich.id.as_str();

    engine.add_line(1, coffee, 2).await.unwrap();
    assert_occupancy_invariant(engine).await;
    engine.add_line(2, sandwich, 1).await.unwrap();
    let pending = engine.finalize_as_pending(1).await.unwrap();
    assert_occupancy_invariant(engine).await;
    engine.add_line(1, sandwich, 1).await.unwrap();
    engine.remove_line(2, sandwich).await.unwrap();
    assert_occupancy_invariant(engine).await;
    engine.abandon(1).await.unwrap();
    assert_occupancy_invariant(engine).await;
    engine.mark_paid(&pending).await.unwrap();
    engine.add_line(3, coffee, 1).await.unwrap();
    engine.finalize_and_pay(3).await.unwrap();
    assert_occupancy_invariant(engine).await;

    for status in engine.table_statuses().await.unwrap() {
        assert_eq!(status.status, TableState::Vacant);
    }
}

#[tokio::test]
async fn open_tabs_survive_a_restart() {
    let path = std::env::temp_dir().join(format!("cafe-restart-{}.db", uuid::Uuid::new_v4()));

    let expected = {
        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        let cafe = cafe_on(db).await;
        cafe.engine.add_line(7, &cafe.coffee.id, 2).await.unwrap();
        cafe.engine.add_line(7, &cafe.sandwich.id, 1).await.unwrap();
        let view = cafe
            .engine
            .set_discount(7, DiscountKind::Amount, 4_000)
            .await
            .unwrap();
        cafe.engine.database().close().await;
        view
    };

    let db = Database::new(DbConfig::new(&path)).await.unwrap();
    let engine = BillingEngine::new(db.clone(), db.menu(), EngineConfig::default())
        .await
        .unwrap();

    assert_eq!(engine.recovery().restored_tabs, vec![7]);
    assert!(engine.recovery().repaired_tables.is_empty());
    assert_eq!(engine.open_tab(7).await.unwrap(), expected);
    assert_eq!(expected.total_paise, 35_000);
    assert_eq!(status_of(&engine, 7).await, TableState::Occupied);

    db.close().await;
    for suffix in ["", "-wal", "-shm"] {
        let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
    }
}
