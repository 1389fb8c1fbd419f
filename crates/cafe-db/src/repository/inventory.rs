//! # Inventory Repository
//!
//! Bar stock rows and their append-only movement history.
//!
//! ## Conditional Deduct
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UPDATE bar_stock SET quantity = quantity - 10                          │
//! │  WHERE id = 'beer' AND quantity >= 10                                   │
//! │                                                                         │
//! │  quantity = 5  ──► 0 rows affected ──► caller reports InsufficientStock │
//! │  quantity = 12 ──► 1 row affected  ──► caller records the movement      │
//! │                                                                         │
//! │  The check and the decrement are one statement, so concurrent           │
//! │  deducts can never drive stock below zero.                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use cafe_core::{InventoryItem, StockMovement};

const ITEM_COLUMNS: &str = "id, name, quantity, reorder_threshold, created_at, last_updated";

/// Repository for bar stock.
#[derive(Debug, Clone)]
pub struct InventoryRepository {
    pool: SqlitePool,
}

impl InventoryRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InventoryRepository { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bar_stock WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Looks up an item by name (case-insensitive).
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bar_stock WHERE name = ?1"
        ))
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Like [`get_by_id`](Self::get_by_id), inside a transaction.
    pub async fn find_by_id(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
    ) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bar_stock WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(item)
    }

    /// Like [`get_by_name`](Self::get_by_name), inside a transaction.
    pub async fn find_by_name(
        &self,
        conn: &mut SqliteConnection,
        name: &str,
    ) -> DbResult<Option<InventoryItem>> {
        let item = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bar_stock WHERE name = ?1"
        ))
        .bind(name)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(item)
    }

    /// All items by name.
    pub async fn list(&self) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM bar_stock ORDER BY name"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Items at or below their reorder threshold, lowest stock first.
    pub async fn low_stock(&self) -> DbResult<Vec<InventoryItem>> {
        let items = sqlx::query_as::<_, InventoryItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM bar_stock
            WHERE quantity <= reorder_threshold
            ORDER BY quantity, name
            "#
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, item: &InventoryItem) -> DbResult<()> {
        debug!(item_id = %item.id, name = %item.name, quantity = item.quantity, "Creating stock item");

        sqlx::query(
            r#"
            INSERT INTO bar_stock (id, name, quantity, reorder_threshold, created_at, last_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(item.quantity)
        .bind(item.reorder_threshold)
        .bind(item.created_at)
        .bind(item.last_updated)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Decrements stock only if enough is available.
    ///
    /// Returns `false` (and changes nothing) when `quantity < delta` or the
    /// item does not exist.
    pub async fn try_deduct(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bar_stock
            SET quantity = quantity - ?2, last_updated = ?3
            WHERE id = ?1 AND quantity >= ?2
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        debug!(item_id = id, delta, deducted = result.rows_affected() == 1, "Deducting stock");
        Ok(result.rows_affected() == 1)
    }

    /// Increments stock. Returns `false` when the item does not exist.
    pub async fn add_quantity(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        delta: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bar_stock
            SET quantity = quantity + ?2, last_updated = ?3
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(delta)
        .bind(now)
        .execute(&mut *conn)
        .await?;

        debug!(item_id = id, delta, "Adding stock");
        Ok(result.rows_affected() == 1)
    }

    pub async fn set_threshold(
        &self,
        conn: &mut SqliteConnection,
        id: &str,
        threshold: i64,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            "UPDATE bar_stock SET reorder_threshold = ?2, last_updated = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(threshold)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Appends one audit row.
    pub async fn record_movement(
        &self,
        conn: &mut SqliteConnection,
        movement: &StockMovement,
    ) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO stock_history (id, item_id, delta, operation, source, reference_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&movement.id)
        .bind(&movement.item_id)
        .bind(movement.delta)
        .bind(movement.operation)
        .bind(movement.source)
        .bind(&movement.reference_id)
        .bind(movement.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Movement history for one item, oldest first.
    pub async fn history(&self, item_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, item_id, delta, operation, source, reference_id, created_at
            FROM stock_history
            WHERE item_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(item_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }

    /// Movements caused by one sale or expense.
    pub async fn movements_for_reference(&self, reference_id: &str) -> DbResult<Vec<StockMovement>> {
        let movements = sqlx::query_as::<_, StockMovement>(
            r#"
            SELECT id, item_id, delta, operation, source, reference_id, created_at
            FROM stock_history
            WHERE reference_id = ?1
            ORDER BY created_at, rowid
            "#,
        )
        .bind(reference_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(movements)
    }
}

/// Generates a new stock item or movement ID.
pub fn generate_stock_id() -> String {
    Uuid::new_v4().to_string()
}
