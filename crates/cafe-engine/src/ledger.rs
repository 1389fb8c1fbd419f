//! # Inventory Ledger
//!
//! Bar stock counts and their audit trail.
//!
//! ## Mutation Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add / deduct                                                           │
//! │  ─────────────                                                          │
//! │   ┌───────── one WriteTx ─────────────────────────────────┐             │
//! │   │  UPDATE bar_stock SET quantity = quantity ± delta …   │             │
//! │   │  INSERT INTO stock_history (delta, operation, source) │             │
//! │   └───────────────────────────────────────────────────────┘             │
//! │                                                                         │
//! │  Both rows land or neither does. A deduct larger than the current       │
//! │  quantity changes nothing and writes no history row.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The `*_in` variants run inside a transaction the caller already holds,
//! which is how finalize and expense recording make stock changes part of
//! their own atomic unit.

use chrono::{DateTime, NaiveDate, Utc};
use tracing::{debug, info, warn};
use uuid::Uuid;

use cafe_core::validation::{
    validate_id, validate_name, validate_price_paise, validate_quantity, validate_stock_delta,
    validate_stock_quantity, validate_threshold,
};
use cafe_core::{
    Expense, InventoryItem, ItemRef, LowStockItem, MovementSource, NewExpense, StockMovement,
    StockOperation, ValidationError,
};
use cafe_db::repository::inventory::generate_stock_id;
use cafe_db::{Database, SqliteConnection};

use crate::error::{EngineError, EngineResult};

/// Stock mutations and reads.
#[derive(Debug, Clone)]
pub struct InventoryLedger {
    db: Database,
    default_reorder_threshold: i64,
}

impl InventoryLedger {
    pub fn new(db: Database, default_reorder_threshold: i64) -> Self {
        InventoryLedger {
            db,
            default_reorder_threshold,
        }
    }

    // =========================================================================
    // Public operations
    // =========================================================================

    /// Adds `delta` units to an item and records the movement.
    ///
    /// An [`ItemRef::Name`] that matches no item creates it with
    /// `quantity = delta` and the default reorder threshold.
    pub async fn add(&self, item: ItemRef, delta: i64) -> EngineResult<InventoryItem> {
        validate_stock_delta(delta)?;

        let mut tx = self.db.begin_write().await?;
        let item_id = self
            .add_in(&mut tx, &item, delta, None, MovementSource::Manual, None)
            .await?;
        let updated = self.require_in(&mut tx, &item_id).await?;
        tx.commit().await?;

        info!(item_id = %updated.id, name = %updated.name, delta, quantity = updated.quantity, "Stock added");
        Ok(updated)
    }

    /// Removes `delta` units from an item and records the movement.
    ///
    /// Fails with [`EngineError::InsufficientStock`] when `delta` exceeds
    /// the current quantity; nothing is written in that case.
    pub async fn deduct(&self, item_id: &str, delta: i64) -> EngineResult<InventoryItem> {
        validate_id("item_id", item_id)?;
        validate_stock_delta(delta)?;

        let mut tx = self.db.begin_write().await?;
        self.deduct_in(&mut tx, item_id, delta, MovementSource::Manual, None)
            .await?;
        let updated = self.require_in(&mut tx, item_id).await?;
        tx.commit().await?;

        info!(item_id, name = %updated.name, delta, quantity = updated.quantity, "Stock deducted");
        Ok(updated)
    }

    /// Creates a stock item. Names are unique, ignoring case.
    pub async fn create_inventory_item(
        &self,
        name: &str,
        quantity: i64,
        reorder_threshold: i64,
    ) -> EngineResult<InventoryItem> {
        let name = validate_name("item_name", name)?;
        validate_stock_quantity(quantity)?;
        validate_threshold(reorder_threshold)?;

        let mut tx = self.db.begin_write().await?;
        if self
            .db
            .inventory()
            .find_by_name(&mut tx, &name)
            .await?
            .is_some()
        {
            return Err(ValidationError::Duplicate {
                field: "item_name".to_string(),
                value: name,
            }
            .into());
        }

        let now = Utc::now();
        let item = InventoryItem {
            id: generate_stock_id(),
            name,
            quantity,
            reorder_threshold,
            created_at: now,
            last_updated: now,
        };
        self.db.inventory().insert(&mut tx, &item).await?;
        if quantity > 0 {
            self.record_in(
                &mut tx,
                &item.id,
                quantity,
                StockOperation::Add,
                MovementSource::Manual,
                None,
                now,
            )
            .await?;
        }
        tx.commit().await?;

        info!(item_id = %item.id, name = %item.name, quantity, "Stock item created");
        Ok(item)
    }

    pub async fn set_reorder_threshold(
        &self,
        item_id: &str,
        reorder_threshold: i64,
    ) -> EngineResult<InventoryItem> {
        validate_id("item_id", item_id)?;
        validate_threshold(reorder_threshold)?;

        let mut tx = self.db.begin_write().await?;
        if !self
            .db
            .inventory()
            .set_threshold(&mut tx, item_id, reorder_threshold)
            .await?
        {
            return Err(EngineError::not_found("Inventory item", item_id));
        }
        let updated = self.require_in(&mut tx, item_id).await?;
        tx.commit().await?;

        debug!(item_id, reorder_threshold, "Reorder threshold updated");
        Ok(updated)
    }

    /// Records an expense. A restocking expense adds `quantity` units to
    /// its target item in the same transaction.
    pub async fn record_expense(&self, expense: NewExpense) -> EngineResult<Expense> {
        let name = validate_name("name", &expense.name)?;
        let title = validate_name("title", &expense.title)?;
        let category = validate_name("category", &expense.category)?;
        validate_quantity(expense.quantity)?;
        validate_price_paise(expense.unit_price_paise)?;
        let total_paise = expense.unit_price_paise * expense.quantity;

        if let Some(threshold) = expense.restock.as_ref().and_then(|r| r.reorder_threshold) {
            validate_threshold(threshold)?;
        }

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let mut tx = self.db.begin_write().await?;
        let restocked_item_id = match &expense.restock {
            Some(target) => {
                let item = ItemRef::Name(target.item_name.clone());
                let item_id = self
                    .add_in(
                        &mut tx,
                        &item,
                        expense.quantity,
                        target.reorder_threshold,
                        MovementSource::Expense,
                        Some(&id),
                    )
                    .await?;
                Some(item_id)
            }
            None => None,
        };

        let record = Expense {
            id,
            name,
            title,
            category,
            quantity: expense.quantity,
            unit_price_paise: expense.unit_price_paise,
            total_paise,
            restocked_item_id,
            expense_date: now.date_naive(),
            created_at: now,
        };
        self.db.expenses().insert(&mut tx, &record).await?;
        tx.commit().await?;

        info!(
            expense_id = %record.id,
            name = %record.name,
            total_paise,
            restocked = record.restocked_item_id.is_some(),
            "Expense recorded"
        );
        Ok(record)
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Items at or below their reorder threshold, lowest stock first.
    pub async fn low_stock_items(&self) -> EngineResult<Vec<LowStockItem>> {
        let items = self.db.inventory().low_stock().await?;
        Ok(items.into_iter().map(LowStockItem::from).collect())
    }

    pub async fn inventory_items(&self) -> EngineResult<Vec<InventoryItem>> {
        Ok(self.db.inventory().list().await?)
    }

    pub async fn inventory_item(&self, item_id: &str) -> EngineResult<InventoryItem> {
        self.db
            .inventory()
            .get_by_id(item_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Inventory item", item_id))
    }

    /// Movement history of one item, oldest first.
    pub async fn stock_history(&self, item_id: &str) -> EngineResult<Vec<StockMovement>> {
        self.inventory_item(item_id).await?;
        Ok(self.db.inventory().history(item_id).await?)
    }

    /// Movements caused by one sale or expense.
    pub async fn movements_for(&self, reference_id: &str) -> EngineResult<Vec<StockMovement>> {
        Ok(self.db.inventory().movements_for_reference(reference_id).await?)
    }

    /// Expenses dated within `from..=to`, newest first.
    pub async fn expenses_between(
        &self,
        from: NaiveDate,
        to: NaiveDate,
    ) -> EngineResult<Vec<Expense>> {
        Ok(self.db.expenses().list_between(from, to).await?)
    }

    // =========================================================================
    // In-transaction building blocks
    // =========================================================================

    /// Adds stock inside the caller's transaction. Returns the item id.
    pub(crate) async fn add_in(
        &self,
        conn: &mut SqliteConnection,
        item: &ItemRef,
        delta: i64,
        threshold_if_created: Option<i64>,
        source: MovementSource,
        reference_id: Option<&str>,
    ) -> EngineResult<String> {
        validate_stock_delta(delta)?;
        let repo = self.db.inventory();
        let now = Utc::now();

        let item = match item {
            ItemRef::Id(id) => {
                validate_id("item_id", id)?;
                repo.find_by_id(conn, id)
                    .await?
                    .ok_or_else(|| EngineError::not_found("Inventory item", id))?
            }
            ItemRef::Name(name) => {
                let name = validate_name("item_name", name)?;
                match repo.find_by_name(conn, &name).await? {
                    Some(found) => found,
                    None => {
                        let threshold =
                            threshold_if_created.unwrap_or(self.default_reorder_threshold);
                        return self
                            .create_in(conn, name, delta, threshold, source, reference_id, now)
                            .await;
                    }
                }
            }
        };

        if !repo.add_quantity(conn, &item.id, delta, now).await? {
            return Err(EngineError::not_found("Inventory item", &item.id));
        }
        self.record_in(
            conn,
            &item.id,
            delta,
            StockOperation::Add,
            source,
            reference_id,
            now,
        )
        .await?;

        Ok(item.id)
    }

    #[allow(clippy::too_many_arguments)]
    async fn create_in(
        &self,
        conn: &mut SqliteConnection,
        name: String,
        quantity: i64,
        reorder_threshold: i64,
        source: MovementSource,
        reference_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<String> {
        let created = InventoryItem {
            id: generate_stock_id(),
            name,
            quantity,
            reorder_threshold,
            created_at: now,
            last_updated: now,
        };
        self.db.inventory().insert(conn, &created).await?;
        info!(item_id = %created.id, name = %created.name, quantity, "Stock item auto-created");

        self.record_in(
            conn,
            &created.id,
            quantity,
            StockOperation::Add,
            source,
            reference_id,
            now,
        )
        .await?;
        Ok(created.id)
    }

    /// Deducts stock inside the caller's transaction.
    pub(crate) async fn deduct_in(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        delta: i64,
        source: MovementSource,
        reference_id: Option<&str>,
    ) -> EngineResult<()> {
        validate_stock_delta(delta)?;
        let repo = self.db.inventory();
        let now = Utc::now();

        if !repo.try_deduct(conn, item_id, delta, now).await? {
            let item = repo
                .find_by_id(conn, item_id)
                .await?
                .ok_or_else(|| EngineError::not_found("Inventory item", item_id))?;
            warn!(
                item_id,
                name = %item.name,
                available = item.quantity,
                requested = delta,
                "Deduct rejected: insufficient stock"
            );
            return Err(EngineError::InsufficientStock {
                item: item.name,
                available: item.quantity,
                requested: delta,
            });
        }

        self.record_in(
            conn,
            item_id,
            -delta,
            StockOperation::Remove,
            source,
            reference_id,
            now,
        )
        .await
    }

    #[allow(clippy::too_many_arguments)]
    async fn record_in(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
        delta: i64,
        operation: StockOperation,
        source: MovementSource,
        reference_id: Option<&str>,
        now: DateTime<Utc>,
    ) -> EngineResult<()> {
        let movement = StockMovement {
            id: generate_stock_id(),
            item_id: item_id.to_string(),
            delta,
            operation,
            source,
            reference_id: reference_id.map(str::to_string),
            created_at: now,
        };
        self.db
            .inventory()
            .record_movement(conn, &movement)
            .await?;
        Ok(())
    }

    async fn require_in(
        &self,
        conn: &mut SqliteConnection,
        item_id: &str,
    ) -> EngineResult<InventoryItem> {
        self.db
            .inventory()
            .find_by_id(conn, item_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Inventory item", item_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_db::DbConfig;

    async fn ledger() -> InventoryLedger {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        InventoryLedger::new(db, 10)
    }

    #[tokio::test]
    async fn test_add_by_name_creates_missing_item() {
        let ledger = ledger().await;

        let item = ledger.add(ItemRef::Name("Beer".into()), 24).await.unwrap();
        assert_eq!(item.quantity, 24);
        assert_eq!(item.reorder_threshold, 10);

        let again = ledger.add(ItemRef::Name("beer".into()), 6).await.unwrap();
        assert_eq!(again.id, item.id);
        assert_eq!(again.quantity, 30);

        let history = ledger.stock_history(&item.id).await.unwrap();
        assert_eq!(history.iter().map(|m| m.delta).collect::<Vec<_>>(), vec![24, 6]);
        assert!(history.iter().all(|m| m.operation == StockOperation::Add));
    }

    #[tokio::test]
    async fn test_add_by_unknown_id_is_not_found() {
        let ledger = ledger().await;
        let err = ledger.add(ItemRef::Id("nope".into()), 1).await.unwrap_err();
        assert!(matches!(err, EngineError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_deduct_records_negative_delta() {
        let ledger = ledger().await;
        let beer = ledger.create_inventory_item("Beer", 12, 5).await.unwrap();

        let after = ledger.deduct(&beer.id, 4).await.unwrap();
        assert_eq!(after.quantity, 8);

        let history = ledger.stock_history(&beer.id).await.unwrap();
        let last = history.last().unwrap();
        assert_eq!(last.delta, -4);
        assert_eq!(last.operation, StockOperation::Remove);
        assert_eq!(last.source, MovementSource::Manual);
    }

    #[tokio::test]
    async fn test_non_positive_delta_is_rejected() {
        let ledger = ledger().await;
        let beer = ledger.create_inventory_item("Beer", 12, 5).await.unwrap();

        assert!(matches!(
            ledger.deduct(&beer.id, 0).await.unwrap_err(),
            EngineError::Validation(_)
        ));
        assert!(matches!(
            ledger.add(ItemRef::Id(beer.id.clone()), -3).await.unwrap_err(),
            EngineError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn test_duplicate_name_is_rejected() {
        let ledger = ledger().await;
        ledger.create_inventory_item("Wine", 6, 2).await.unwrap();
        let err = ledger.create_inventory_item("WINE", 1, 2).await.unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));
    }

    #[tokio::test]
    async fn test_set_reorder_threshold_changes_low_stock() {
        let ledger = ledger().await;
        let soda = ledger.create_inventory_item("Soda", 20, 5).await.unwrap();
        assert!(ledger.low_stock_items().await.unwrap().is_empty());

        ledger.set_reorder_threshold(&soda.id, 20).await.unwrap();
        let low = ledger.low_stock_items().await.unwrap();
        assert_eq!(low, vec![LowStockItem { name: "Soda".into(), quantity: 20, threshold: 20 }]);

        assert!(matches!(
            ledger.set_reorder_threshold("missing", 1).await.unwrap_err(),
            EngineError::NotFound { .. }
        ));
    }
}
