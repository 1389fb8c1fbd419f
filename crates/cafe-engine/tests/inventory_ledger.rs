//! Bar stock ledger: deducts, restocks and the audit trail.

use cafe_core::{ItemRef, MovementSource, NewExpense, RestockTarget, StockOperation};
use cafe_db::{Database, DbConfig};
use cafe_engine::{telemetry, EngineError, ErrorCode, ErrorResponse, InventoryLedger};

async fn ledger() -> InventoryLedger {
    telemetry::init_test_tracing();
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    InventoryLedger::new(db, 10)
}

fn expense(name: &str, quantity: i64, restock: Option<RestockTarget>) -> NewExpense {
    NewExpense {
        name: name.to_string(),
        title: format!("{name} delivery"),
        category: "Bar".to_string(),
        quantity,
        unit_price_paise: 18_000,
        restock,
    }
}

#[tokio::test]
async fn deduct_beyond_stock_changes_nothing() {
    let ledger = ledger().await;
    let beer = ledger.create_inventory_item("Beer", 5, 2).await.unwrap();
    let history_before = ledger.stock_history(&beer.id).await.unwrap();

    let err = ledger.deduct(&beer.id, 10).await.unwrap_err();
    assert!(matches!(
        &err,
        EngineError::InsufficientStock {
            item,
            available: 5,
            requested: 10,
        } if item == "Beer"
    ));
    assert_eq!(ErrorResponse::from(&err).code, ErrorCode::InsufficientStock);

    assert_eq!(ledger.inventory_item(&beer.id).await.unwrap().quantity, 5);
    assert_eq!(ledger.stock_history(&beer.id).await.unwrap(), history_before);
}

#[tokio::test]
async fn stock_never_goes_negative() {
    let ledger = ledger().await;
    let soda = ledger.create_inventory_item("Soda", 3, 1).await.unwrap();

    let mut succeeded = 0;
    for _ in 0..5 {
        if ledger.deduct(&soda.id, 1).await.is_ok() {
            succeeded += 1;
        }
    }
    assert_eq!(succeeded, 3);
    assert_eq!(ledger.inventory_item(&soda.id).await.unwrap().quantity, 0);

    let deltas: i64 = ledger
        .stock_history(&soda.id)
        .await
        .unwrap()
        .iter()
        .map(|m| m.delta)
        .sum();
    assert_eq!(deltas, 0);
}

#[tokio::test]
async fn restocking_expense_adds_to_existing_item() {
    let ledger = ledger().await;
    let wine = ledger.create_inventory_item("Wine", 2, 4).await.unwrap();
    assert_eq!(ledger.low_stock_items().await.unwrap().len(), 1);

    let target = RestockTarget {
        item_name: "wine".to_string(),
        reorder_threshold: None,
    };
    let recorded = ledger
        .record_expense(expense("Wine", 12, Some(target)))
        .await
        .unwrap();

    assert_eq!(recorded.total_paise, 216_000);
    assert_eq!(recorded.restocked_item_id.as_deref(), Some(wine.id.as_str()));
    assert_eq!(ledger.inventory_item(&wine.id).await.unwrap().quantity, 14);
    assert!(ledger.low_stock_items().await.unwrap().is_empty());

    let movements = ledger.movements_for(&recorded.id).await.unwrap();
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].delta, 12);
    assert_eq!(movements[0].operation, StockOperation::Add);
    assert_eq!(movements[0].source, MovementSource::Expense);
}

#[tokio::test]
async fn restocking_expense_creates_missing_item() {
    let ledger = ledger().await;

    let target = RestockTarget {
        item_name: "Cider".to_string(),
        reorder_threshold: Some(6),
    };
    let recorded = ledger
        .record_expense(expense("Cider", 24, Some(target)))
        .await
        .unwrap();

    let items = ledger.inventory_items().await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].name, "Cider");
    assert_eq!(items[0].quantity, 24);
    assert_eq!(items[0].reorder_threshold, 6);
    assert_eq!(recorded.restocked_item_id.as_deref(), Some(items[0].id.as_str()));
}

#[tokio::test]
async fn plain_expense_leaves_stock_alone() {
    let ledger = ledger().await;

    let recorded = ledger
        .record_expense(expense("Napkins", 3, None))
        .await
        .unwrap();
    assert!(recorded.restocked_item_id.is_none());
    assert!(ledger.inventory_items().await.unwrap().is_empty());

    let today = recorded.expense_date;
    let listed = ledger.expenses_between(today, today).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, recorded.id);

    let err = ledger
        .record_expense(expense("  ", 3, None))
        .await
        .unwrap_err();
    assert_eq!(err.code(), ErrorCode::ValidationError);
}

#[tokio::test]
async fn add_uses_default_threshold_for_new_items() {
    let ledger = ledger().await;

    let rum = ledger.add(ItemRef::Name("Rum".into()), 8).await.unwrap();
    assert_eq!(rum.reorder_threshold, 10);
    assert_eq!(ledger.low_stock_items().await.unwrap()[0].name, "Rum");

    let rum = ledger.add(ItemRef::Id(rum.id), 4).await.unwrap();
    assert_eq!(rum.quantity, 12);
    assert!(ledger.low_stock_items().await.unwrap().is_empty());
}
