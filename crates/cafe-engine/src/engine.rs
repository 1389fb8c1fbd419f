//! # Billing Engine
//!
//! Open tabs, their durable mirror, sales and table occupancy.
//!
//! ## Operation Shape
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  add_line(5, "coffee", 2)                                               │
//! │                                                                         │
//! │  1. validate input, look the item up in the catalog (no locks held)    │
//! │  2. lock table 5                                                        │
//! │  3. clone the in-memory Tab, mutate the clone                           │
//! │  4. begin_write ─► mirror line + discount ─► sync occupancy ─► commit   │
//! │  5. swap the clone in, return its view                                  │
//! │                                                                         │
//! │  Any failure before 5 leaves memory, mirror and table status as they    │
//! │  were.                                                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Finalize
//! ```text
//! ┌───────────────────────────── one WriteTx ──────────────────────────────┐
//! │  INSERT sales (pending | completed)                                     │
//! │  INSERT sale_items (one per line, snapshot prices)                      │
//! │  deduct linked bar stock (source = sale, reference = sale id)           │
//! │  DELETE tab mirror rows                                                 │
//! │  UPDATE tables SET status = occupied | vacant                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Occupancy Rule
//! A table is `occupied` exactly when its mirror holds at least one line
//! or it has a pending sale. Every mutating operation recomputes the flag
//! from those two facts inside its own transaction, and startup repairs
//! any flag that disagrees.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};

use cafe_core::validation::{validate_discount, validate_id, validate_quantity};
use cafe_core::{
    CoreError, DiscountKind, Expense, LowStockItem, MenuItem, MovementSource, NewExpense,
    PaymentStatus, Sale, SaleItem, SaleReceipt, Tab, TabView, TableState, TableStatus,
    ValidationError,
};
use cafe_db::repository::sale::{generate_sale_id, generate_sale_item_id};
use cafe_db::{Database, MenuRepository, SqliteConnection};

use crate::catalog::Catalog;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::ledger::InventoryLedger;
use crate::locks::KeyedLocks;

/// Points where tests can force a failure mid-operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FaultPoint {
    /// After the sale row is written, before its items.
    AfterSaleInsert,
    /// After a tab mutation is mirrored, before it commits.
    BeforeMirrorCommit,
}

/// What startup recovery found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryReport {
    /// Tables whose open tab was reloaded from the mirror.
    pub restored_tabs: Vec<i64>,
    /// Tables whose stored occupancy flag was rewritten.
    pub repaired_tables: Vec<i64>,
}

/// The billing engine.
///
/// Share it behind an `Arc`; every method takes `&self`.
pub struct BillingEngine<C: Catalog = MenuRepository> {
    db: Database,
    catalog: C,
    ledger: InventoryLedger,
    config: EngineConfig,
    /// Open tabs by table number. Never held across an `.await`.
    tabs: Mutex<HashMap<i64, Tab>>,
    table_locks: KeyedLocks<i64>,
    recovery: RecoveryReport,
    #[cfg(test)]
    fault: Mutex<Option<FaultPoint>>,
}

impl BillingEngine<MenuRepository> {
    /// Opens the configured database and starts an engine backed by its
    /// menu table.
    pub async fn open(config: EngineConfig) -> EngineResult<Self> {
        let db = Database::new(config.db_config()).await?;
        let catalog = db.menu();
        BillingEngine::new(db, catalog, config).await
    }
}

impl<C: Catalog> BillingEngine<C> {
    /// Starts the engine.
    ///
    /// ## Startup
    /// 1. Registers tables `1..=table_count` (existing ones are kept)
    /// 2. Loads every mirrored tab into memory
    /// 3. Rewrites any table status that disagrees with the occupancy rule
    pub async fn new(db: Database, catalog: C, config: EngineConfig) -> EngineResult<Self> {
        if config.table_count < 1 {
            return Err(ValidationError::MustBePositive {
                field: "table_count".to_string(),
            }
            .into());
        }

        let mut tx = db.begin_write().await?;
        let created = db.tables().ensure_tables(&mut tx, config.table_count).await?;
        tx.commit().await?;
        debug!(table_count = config.table_count, created, "Tables registered");

        let ledger = InventoryLedger::new(db.clone(), config.default_reorder_threshold);
        let mut engine = BillingEngine {
            db,
            catalog,
            ledger,
            config,
            tabs: Mutex::new(HashMap::new()),
            table_locks: KeyedLocks::new(),
            recovery: RecoveryReport::default(),
            #[cfg(test)]
            fault: Mutex::new(None),
        };
        engine.recovery = engine.recover().await?;
        Ok(engine)
    }

    async fn recover(&self) -> EngineResult<RecoveryReport> {
        let stored = self.db.tab_store().load_all().await?;
        let pending: HashSet<i64> = self
            .db
            .sales()
            .tables_with_pending()
            .await?
            .into_iter()
            .collect();
        let statuses = self.db.tables().get_all().await?;

        // Discount-only tabs are restored but do not occupy their table.
        let restored: HashMap<i64, Tab> = stored
            .into_iter()
            .map(|tab| {
                let number = tab.table_number;
                (number, Tab::restore(number, tab.lines, tab.discount))
            })
            .collect();
        let has_lines = |number: i64| restored.get(&number).is_some_and(|tab| !tab.is_empty());

        let mut report = RecoveryReport::default();
        let mut tx = self.db.begin_write().await?;
        for status in &statuses {
            let number = status.table_number;
            let expected = if has_lines(number) || pending.contains(&number) {
                TableState::Occupied
            } else {
                TableState::Vacant
            };
            if status.status != expected {
                warn!(
                    table_number = number,
                    stored = ?status.status,
                    expected = ?expected,
                    "Repairing table status"
                );
                self.db.tables().set_status(&mut tx, number, expected).await?;
                report.repaired_tables.push(number);
            }
        }
        tx.commit().await?;

        report.restored_tabs = restored
            .iter()
            .filter(|(_, tab)| !tab.is_empty())
            .map(|(&number, _)| number)
            .collect();
        report.restored_tabs.sort_unstable();
        *self.tabs() = restored;

        info!(
            restored_tabs = report.restored_tabs.len(),
            repaired_tables = report.repaired_tables.len(),
            pending_tables = pending.len(),
            "Startup recovery complete"
        );
        Ok(report)
    }

    // =========================================================================
    // Tab operations
    // =========================================================================

    /// Returns the open tab for a table, restoring it from the mirror if
    /// needed. Opening twice attaches to the same tab.
    pub async fn open_tab(&self, table_number: i64) -> EngineResult<TabView> {
        self.require_table(table_number).await?;
        let _guard = self.table_locks.lock(&table_number).await;

        let tab = self.current_tab(table_number).await?;
        let view = tab.view();
        self.tabs().insert(table_number, tab);
        Ok(view)
    }

    /// Adds `quantity` units of a menu item to a table's tab.
    ///
    /// The price is read from the catalog now and frozen on the line.
    pub async fn add_line(
        &self,
        table_number: i64,
        menu_item_id: &str,
        quantity: i64,
    ) -> EngineResult<TabView> {
        validate_id("menu_item_id", menu_item_id)?;
        validate_quantity(quantity)?;
        self.require_table(table_number).await?;
        let item = self.menu_item(menu_item_id).await?;

        let _guard = self.table_locks.lock(&table_number).await;
        let mut tab = self.current_tab(table_number).await?;
        let line = tab.add_line(&item, quantity)?;

        let store = self.db.tab_store();
        let mut tx = self.db.begin_write().await?;
        store.upsert_line(&mut tx, table_number, &line).await?;
        store.save_discount(&mut tx, table_number, tab.discount()).await?;
        self.inject(FaultPoint::BeforeMirrorCommit)?;
        self.sync_occupancy(&mut tx, table_number).await?;
        tx.commit().await?;

        debug!(
            table_number,
            menu_item_id,
            quantity = line.quantity,
            subtotal_paise = tab.subtotal().paise(),
            "Line added"
        );
        Ok(self.swap_in(tab))
    }

    /// Takes one unit off a line; the last unit deletes the line.
    pub async fn remove_line(&self, table_number: i64, menu_item_id: &str) -> EngineResult<TabView> {
        validate_id("menu_item_id", menu_item_id)?;
        self.require_table(table_number).await?;

        let _guard = self.table_locks.lock(&table_number).await;
        let mut tab = self.current_tab(table_number).await?;
        let remaining = tab.remove_line(menu_item_id)?;

        let store = self.db.tab_store();
        let mut tx = self.db.begin_write().await?;
        match &remaining {
            Some(line) => store.upsert_line(&mut tx, table_number, line).await?,
            None => {
                store.delete_line(&mut tx, table_number, menu_item_id).await?;
            }
        }
        store.save_discount(&mut tx, table_number, tab.discount()).await?;
        self.inject(FaultPoint::BeforeMirrorCommit)?;
        self.sync_occupancy(&mut tx, table_number).await?;
        tx.commit().await?;

        debug!(
            table_number,
            menu_item_id,
            remaining = remaining.as_ref().map_or(0, |l| l.quantity),
            "Line reduced"
        );
        Ok(self.swap_in(tab))
    }

    /// Sets the tab's discount.
    ///
    /// Percentages are in basis points (`1000` = 10%). Values beyond the
    /// subtotal are clamped; negative values are rejected.
    pub async fn set_discount(
        &self,
        table_number: i64,
        kind: DiscountKind,
        value: i64,
    ) -> EngineResult<TabView> {
        validate_discount(value)?;
        self.require_table(table_number).await?;

        let _guard = self.table_locks.lock(&table_number).await;
        let mut tab = self.current_tab(table_number).await?;
        let stored = tab.set_discount(kind, value)?;

        let mut tx = self.db.begin_write().await?;
        self.db
            .tab_store()
            .save_discount(&mut tx, table_number, stored)
            .await?;
        self.inject(FaultPoint::BeforeMirrorCommit)?;
        tx.commit().await?;

        debug!(
            table_number,
            kind = kind.as_str(),
            requested = value,
            applied = tab.applied_discount().value,
            "Discount set"
        );
        Ok(self.swap_in(tab))
    }

    /// Saves the tab as a pending sale ("pay later"). The table stays
    /// occupied until [`mark_paid`](Self::mark_paid).
    pub async fn finalize_as_pending(&self, table_number: i64) -> EngineResult<String> {
        self.finalize(table_number, PaymentStatus::Pending).await
    }

    /// Bills and settles the tab in one step.
    pub async fn finalize_and_pay(&self, table_number: i64) -> EngineResult<String> {
        self.finalize(table_number, PaymentStatus::Completed).await
    }

    async fn finalize(&self, table_number: i64, status: PaymentStatus) -> EngineResult<String> {
        self.require_table(table_number).await?;

        let _guard = self.table_locks.lock(&table_number).await;
        let mut tab = self.current_tab(table_number).await?;
        if tab.is_empty() {
            return Err(CoreError::EmptyOrder { table_number }.into());
        }
        tab.recompute();

        let now = Utc::now();
        let discount = tab.applied_discount();
        let sale = Sale {
            id: generate_sale_id(),
            table_number,
            subtotal_paise: tab.subtotal().paise(),
            discount_kind: discount.kind,
            discount_value: discount.value,
            discount_paise: tab.effective_discount().paise(),
            total_paise: tab.total().paise(),
            payment_status: status,
            created_at: now,
            completed_at: (status == PaymentStatus::Completed).then_some(now),
        };

        let sales = self.db.sales();
        let mut tx = self.db.begin_write().await?;
        sales.insert_sale(&mut tx, &sale).await?;
        self.inject(FaultPoint::AfterSaleInsert)?;

        let mut deductions: BTreeMap<&str, i64> = BTreeMap::new();
        for line in tab.lines() {
            let item = SaleItem {
                id: generate_sale_item_id(),
                sale_id: sale.id.clone(),
                menu_item_id: line.menu_item_id.clone(),
                name_snapshot: line.name.clone(),
                quantity: line.quantity,
                unit_price_paise: line.unit_price_paise,
                line_total_paise: line.line_total().paise(),
                created_at: now,
            };
            sales.insert_item(&mut tx, &item).await?;

            if let Some(stock_id) = &line.linked_inventory_item_id {
                *deductions.entry(stock_id.as_str()).or_insert(0) += line.quantity;
            }
        }

        for (stock_id, quantity) in deductions {
            self.ledger
                .deduct_in(&mut tx, stock_id, quantity, MovementSource::Sale, Some(&sale.id))
                .await?;
        }

        self.db.tab_store().clear(&mut tx, table_number).await?;
        let table_state = self.sync_occupancy(&mut tx, table_number).await?;
        tx.commit().await?;

        self.tabs().remove(&table_number);

        info!(
            sale_id = %sale.id,
            table_number,
            status = status.as_str(),
            lines = tab.line_count(),
            total = %tab.total(),
            table_state = ?table_state,
            "Tab finalized"
        );
        Ok(sale.id)
    }

    /// Settles a pending sale.
    ///
    /// Fails with `NotFound` for an unknown sale and `Conflict` for one
    /// that is already completed.
    pub async fn mark_paid(&self, sale_id: &str) -> EngineResult<()> {
        validate_id("sale_id", sale_id)?;

        let sales = self.db.sales();
        let sale = sales
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;
        let table_number = sale.table_number;

        let _guard = self.table_locks.lock(&table_number).await;
        let mut tx = self.db.begin_write().await?;
        if !sales.mark_completed(&mut tx, sale_id, Utc::now()).await? {
            let err = match sales.status(&mut tx, sale_id).await? {
                None => EngineError::not_found("Sale", sale_id),
                Some(current) => CoreError::InvalidSaleStatus {
                    sale_id: sale_id.to_string(),
                    current_status: current.as_str().to_string(),
                }
                .into(),
            };
            return Err(err);
        }
        let table_state = self.sync_occupancy(&mut tx, table_number).await?;
        tx.commit().await?;

        info!(sale_id, table_number, table_state = ?table_state, "Sale paid");
        Ok(())
    }

    /// Discards a table's open tab without creating a sale.
    pub async fn abandon(&self, table_number: i64) -> EngineResult<()> {
        self.require_table(table_number).await?;

        let _guard = self.table_locks.lock(&table_number).await;
        let mut tx = self.db.begin_write().await?;
        let removed = self.db.tab_store().clear(&mut tx, table_number).await?;
        let table_state = self.sync_occupancy(&mut tx, table_number).await?;
        tx.commit().await?;

        self.tabs().remove(&table_number);

        info!(table_number, removed_lines = removed, table_state = ?table_state, "Tab abandoned");
        Ok(())
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub async fn table_statuses(&self) -> EngineResult<Vec<TableStatus>> {
        Ok(self.db.tables().get_all().await?)
    }

    pub async fn low_stock_items(&self) -> EngineResult<Vec<LowStockItem>> {
        self.ledger.low_stock_items().await
    }

    /// A sale with its items.
    pub async fn sale_receipt(&self, sale_id: &str) -> EngineResult<SaleReceipt> {
        validate_id("sale_id", sale_id)?;
        let sales = self.db.sales();
        let sale = sales
            .get_by_id(sale_id)
            .await?
            .ok_or_else(|| EngineError::not_found("Sale", sale_id))?;
        let items = sales.get_items(sale_id).await?;
        Ok(SaleReceipt { sale, items })
    }

    /// Saved bills awaiting payment, oldest first.
    pub async fn pending_sales(&self) -> EngineResult<Vec<Sale>> {
        Ok(self.db.sales().pending().await?)
    }

    /// Active menu items, optionally for one category.
    pub async fn menu(&self, category: Option<&str>) -> EngineResult<Vec<MenuItem>> {
        self.catalog.list_menu_items(category).await
    }

    pub async fn record_expense(&self, expense: NewExpense) -> EngineResult<Expense> {
        self.ledger.record_expense(expense).await
    }

    pub fn ledger(&self) -> &InventoryLedger {
        &self.ledger
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn database(&self) -> &Database {
        &self.db
    }

    /// What recovery did when this engine started.
    pub fn recovery(&self) -> &RecoveryReport {
        &self.recovery
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn tabs(&self) -> MutexGuard<'_, HashMap<i64, Tab>> {
        self.tabs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn swap_in(&self, tab: Tab) -> TabView {
        let view = tab.view();
        self.tabs().insert(tab.table_number(), tab);
        view
    }

    /// The table's tab as it stands. Caller holds the table lock.
    async fn current_tab(&self, table_number: i64) -> EngineResult<Tab> {
        let cached = self.tabs().get(&table_number).cloned();
        if let Some(tab) = cached {
            return Ok(tab);
        }

        let tab = match self.db.tab_store().load(table_number).await? {
            Some(stored) => Tab::restore(table_number, stored.lines, stored.discount),
            None => Tab::new(table_number),
        };
        Ok(tab)
    }

    async fn require_table(&self, table_number: i64) -> EngineResult<()> {
        if self.db.tables().get(table_number).await?.is_none() {
            return Err(EngineError::not_found("Table", table_number));
        }
        Ok(())
    }

    async fn menu_item(&self, menu_item_id: &str) -> EngineResult<MenuItem> {
        let item = self
            .catalog
            .get_menu_item(menu_item_id)
            .await?
            .ok_or_else(|| CoreError::MenuItemUnavailable(menu_item_id.to_string()))?;
        if !item.is_active {
            return Err(CoreError::MenuItemUnavailable(menu_item_id.to_string()).into());
        }
        Ok(item)
    }

    /// Recomputes and stores the table's occupancy from its mirror and its
    /// pending sales.
    async fn sync_occupancy(
        &self,
        conn: &mut SqliteConnection,
        table_number: i64,
    ) -> EngineResult<TableState> {
        let lines = self.db.tab_store().line_count(conn, table_number).await?;
        let pending = self.db.sales().pending_count(conn, table_number).await?;
        let state = if lines > 0 || pending > 0 {
            TableState::Occupied
        } else {
            TableState::Vacant
        };
        self.db.tables().set_status(conn, table_number, state).await?;
        Ok(state)
    }

    #[cfg(test)]
    fn inject(&self, point: FaultPoint) -> EngineResult<()> {
        let armed = *self.fault.lock().unwrap_or_else(PoisonError::into_inner);
        if armed == Some(point) {
            return Err(EngineError::Storage(cafe_db::DbError::Internal(format!(
                "injected fault at {point:?}"
            ))));
        }
        Ok(())
    }

    #[cfg(not(test))]
    #[inline]
    fn inject(&self, _point: FaultPoint) -> EngineResult<()> {
        Ok(())
    }

    #[cfg(test)]
    fn arm_fault(&self, point: Option<FaultPoint>) {
        *self.fault.lock().unwrap_or_else(PoisonError::into_inner) = point;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cafe_db::repository::menu::new_menu_item;
    use cafe_db::DbConfig;

    struct Fixture {
        engine: BillingEngine,
        coffee: MenuItem,
        sandwich: MenuItem,
    }

    async fn fixture() -> Fixture {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let menu = db.menu();
        let coffee = menu
            .insert(&new_menu_item("Coffee", "Beverages", 12_000, None))
            .await
            .unwrap();
        let sandwich = menu
            .insert(&new_menu_item("Sandwich", "Food", 15_000, None))
            .await
            .unwrap();
        let engine = BillingEngine::new(db, menu, EngineConfig::default())
            .await
            .unwrap();
        Fixture {
            engine,
            coffee,
            sandwich,
        }
    }

    #[tokio::test]
    async fn test_fault_after_sale_insert_rolls_everything_back() {
        let Fixture {
            engine,
            coffee,
            sandwich,
        } = fixture().await;
        engine.add_line(3, &coffee.id, 2).await.unwrap();
        let before = engine.add_line(3, &sandwich.id, 1).await.unwrap();

        engine.arm_fault(Some(FaultPoint::AfterSaleInsert));
        let err = engine.finalize_and_pay(3).await.unwrap_err();
        assert!(matches!(err, EngineError::Storage(_)));

        assert_eq!(engine.database().sales().count().await.unwrap(), 0);
        let mirror = engine.database().tab_store().load(3).await.unwrap().unwrap();
        assert_eq!(mirror.lines.len(), 2);
        assert_eq!(engine.open_tab(3).await.unwrap(), before);
        let status = engine.database().tables().get(3).await.unwrap().unwrap();
        assert_eq!(status.status, TableState::Occupied);

        engine.arm_fault(None);
        let sale_id = engine.finalize_and_pay(3).await.unwrap();
        let receipt = engine.sale_receipt(&sale_id).await.unwrap();
        assert_eq!(receipt.items.len(), 2);
        assert!(receipt.reconciles());
    }

    #[tokio::test]
    async fn test_mirror_failure_leaves_tab_unchanged() {
        let Fixture { engine, coffee, .. } = fixture().await;
        let before = engine.add_line(7, &coffee.id, 1).await.unwrap();

        engine.arm_fault(Some(FaultPoint::BeforeMirrorCommit));
        assert!(engine.add_line(7, &coffee.id, 1).await.is_err());
        assert!(engine.remove_line(7, &coffee.id).await.is_err());
        assert!(engine
            .set_discount(7, DiscountKind::Percentage, 1_000)
            .await
            .is_err());
        engine.arm_fault(None);

        assert_eq!(engine.open_tab(7).await.unwrap(), before);
        let mirror = engine.database().tab_store().load(7).await.unwrap().unwrap();
        assert_eq!(mirror.lines[0].quantity, 1);
        assert_eq!(mirror.discount, None);
    }

    #[tokio::test]
    async fn test_recovery_repairs_stale_status_and_keeps_discount() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let engine = BillingEngine::new(db.clone(), db.menu(), EngineConfig::default())
            .await
            .unwrap();
        assert_eq!(engine.recovery(), &RecoveryReport::default());
        drop(engine);

        let mut tx = db.begin_write().await.unwrap();
        db.tables()
            .set_status(&mut tx, 4, TableState::Occupied)
            .await
            .unwrap();
        db.tab_store()
            .save_discount(
                &mut tx,
                9,
                cafe_core::Discount {
                    kind: DiscountKind::Amount,
                    value: 500,
                },
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let engine = BillingEngine::new(db.clone(), db.menu(), EngineConfig::default())
            .await
            .unwrap();
        assert_eq!(engine.recovery().repaired_tables, vec![4]);
        assert!(engine.recovery().restored_tabs.is_empty());
        let status = db.tables().get(9).await.unwrap().unwrap();
        assert_eq!(status.status, TableState::Vacant);

        let coffee = db
            .menu()
            .insert(&new_menu_item("Coffee", "Beverages", 12_000, None))
            .await
            .unwrap();
        let view = engine.add_line(9, &coffee.id, 1).await.unwrap();
        assert_eq!(view.discount_paise, 500);
        assert_eq!(view.total_paise, 11_500);
    }
}
