//! # Sale Repository
//!
//! Database operations for sales and sale items.
//!
//! ## Sale Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Sale Lifecycle                                    │
//! │                                                                         │
//! │  finalize_as_pending ──► insert_sale { Pending }  ─┐                   │
//! │                          insert_item × N           │  one WriteTx      │
//! │                                                    │                   │
//! │  finalize_and_pay ─────► insert_sale { Completed } │                   │
//! │                          insert_item × N          ─┘                   │
//! │                                                                         │
//! │  mark_paid ────────────► mark_completed (Pending → Completed only)     │
//! │                                                                         │
//! │  Sales are never deleted here.                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use cafe_core::{PaymentStatus, Sale, SaleItem};

const SALE_COLUMNS: &str = r#"
    id, table_number, subtotal_paise, discount_kind, discount_value,
    discount_paise, total_paise, payment_status, created_at, completed_at
"#;

/// Repository for sale database operations.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Sale>> {
        let sale = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(sale)
    }

    /// Inserts a sale row.
    pub async fn insert_sale(&self, conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
        debug!(
            sale_id = %sale.id,
            table_number = sale.table_number,
            total_paise = sale.total_paise,
            status = sale.payment_status.as_str(),
            "Inserting sale"
        );

        sqlx::query(
            r#"
            INSERT INTO sales (
                id, table_number, subtotal_paise, discount_kind, discount_value,
                discount_paise, total_paise, payment_status, created_at, completed_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&sale.id)
        .bind(sale.table_number)
        .bind(sale.subtotal_paise)
        .bind(sale.discount_kind)
        .bind(sale.discount_value)
        .bind(sale.discount_paise)
        .bind(sale.total_paise)
        .bind(sale.payment_status)
        .bind(sale.created_at)
        .bind(sale.completed_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Inserts one item of a sale.
    ///
    /// ## Snapshot Pattern
    /// Name and unit price come from the tab line, not the catalog, so the
    /// sale keeps its history even if the menu changes later.
    pub async fn insert_item(&self, conn: &mut SqliteConnection, item: &SaleItem) -> DbResult<()> {
        debug!(sale_id = %item.sale_id, menu_item_id = %item.menu_item_id, "Adding sale item");

        sqlx::query(
            r#"
            INSERT INTO sale_items (
                id, sale_id, menu_item_id, name_snapshot, quantity,
                unit_price_paise, line_total_paise, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.sale_id)
        .bind(&item.menu_item_id)
        .bind(&item.name_snapshot)
        .bind(item.quantity)
        .bind(item.unit_price_paise)
        .bind(item.line_total_paise)
        .bind(item.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Gets all items for a sale.
    pub async fn get_items(&self, sale_id: &str) -> DbResult<Vec<SaleItem>> {
        let items = sqlx::query_as::<_, SaleItem>(
            r#"
            SELECT id, sale_id, menu_item_id, name_snapshot, quantity,
                   unit_price_paise, line_total_paise, created_at
            FROM sale_items
            WHERE sale_id = ?1
            ORDER BY created_at, name_snapshot
            "#,
        )
        .bind(sale_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    /// Moves a pending sale to completed.
    ///
    /// Returns `false` when no pending sale with that id exists; the caller
    /// tells "missing" from "already paid" with [`status`](Self::status).
    pub async fn mark_completed(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
        completed_at: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE sales
            SET payment_status = ?2, completed_at = ?3
            WHERE id = ?1 AND payment_status = ?4
            "#,
        )
        .bind(sale_id)
        .bind(PaymentStatus::Completed)
        .bind(completed_at)
        .bind(PaymentStatus::Pending)
        .execute(&mut *conn)
        .await?;

        debug!(sale_id, updated = result.rows_affected(), "Marking sale paid");
        Ok(result.rows_affected() == 1)
    }

    /// Payment status of a sale, read inside a transaction.
    pub async fn status(
        &self,
        conn: &mut SqliteConnection,
        sale_id: &str,
    ) -> DbResult<Option<PaymentStatus>> {
        let status = sqlx::query_scalar::<_, PaymentStatus>(
            "SELECT payment_status FROM sales WHERE id = ?1",
        )
        .bind(sale_id)
        .fetch_optional(&mut *conn)
        .await?;

        Ok(status)
    }

    /// Number of pending sales for a table, read inside a transaction.
    pub async fn pending_count(
        &self,
        conn: &mut SqliteConnection,
        table_number: i64,
    ) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sales WHERE table_number = ?1 AND payment_status = ?2",
        )
        .bind(table_number)
        .bind(PaymentStatus::Pending)
        .fetch_one(&mut *conn)
        .await?;

        Ok(count)
    }

    /// All pending sales, oldest first.
    pub async fn pending(&self) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales WHERE payment_status = ?1 ORDER BY created_at"
        ))
        .bind(PaymentStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Table numbers that have at least one pending sale.
    pub async fn tables_with_pending(&self) -> DbResult<Vec<i64>> {
        let tables = sqlx::query_scalar::<_, i64>(
            "SELECT DISTINCT table_number FROM sales WHERE payment_status = ?1 ORDER BY table_number",
        )
        .bind(PaymentStatus::Pending)
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    /// Most recent sales first.
    pub async fn list_recent(&self, limit: u32) -> DbResult<Vec<Sale>> {
        let sales = sqlx::query_as::<_, Sale>(&format!(
            "SELECT {SALE_COLUMNS} FROM sales ORDER BY created_at DESC LIMIT ?1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(sales)
    }

    /// Counts sales (for diagnostics and tests).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Generates a new sale ID.
pub fn generate_sale_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generates a new sale item ID.
pub fn generate_sale_item_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::test_db;
    use cafe_core::DiscountKind;

    fn sale(table_number: i64, status: PaymentStatus) -> Sale {
        let now = Utc::now();
        Sale {
            id: generate_sale_id(),
            table_number,
            subtotal_paise: 39_000,
            discount_kind: DiscountKind::Percentage,
            discount_value: 1_000,
            discount_paise: 3_900,
            total_paise: 35_100,
            payment_status: status,
            created_at: now,
            completed_at: (status == PaymentStatus::Completed).then_some(now),
        }
    }

    fn item(sale_id: &str, menu_item_id: &str, qty: i64, price: i64) -> SaleItem {
        SaleItem {
            id: generate_sale_item_id(),
            sale_id: sale_id.to_string(),
            menu_item_id: menu_item_id.to_string(),
            name_snapshot: menu_item_id.to_string(),
            quantity: qty,
            unit_price_paise: price,
            line_total_paise: qty * price,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_insert_and_read_back() {
        let db = test_db().await;
        let repo = db.sales();
        let sale = sale(5, PaymentStatus::Completed);

        let mut tx = db.begin_write().await.unwrap();
        db.tables().ensure_tables(&mut tx, 5).await.unwrap();
        repo.insert_sale(&mut tx, &sale).await.unwrap();
        repo.insert_item(&mut tx, &item(&sale.id, "coffee", 2, 12_000)).await.unwrap();
        repo.insert_item(&mut tx, &item(&sale.id, "sandwich", 1, 15_000)).await.unwrap();
        tx.commit().await.unwrap();

        let stored = repo.get_by_id(&sale.id).await.unwrap().unwrap();
        assert_eq!(stored.total_paise, 35_100);
        assert_eq!(stored.discount_kind, DiscountKind::Percentage);
        assert_eq!(stored.payment_status, PaymentStatus::Completed);

        let items = repo.get_items(&sale.id).await.unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items.iter().map(|i| i.line_total_paise).sum::<i64>(), 39_000);
    }

    #[tokio::test]
    async fn test_mark_completed_only_from_pending() {
        let db = test_db().await;
        let repo = db.sales();
        let pending = sale(2, PaymentStatus::Pending);

        let mut tx = db.begin_write().await.unwrap();
        db.tables().ensure_tables(&mut tx, 2).await.unwrap();
        repo.insert_sale(&mut tx, &pending).await.unwrap();
        assert_eq!(repo.pending_count(&mut tx, 2).await.unwrap(), 1);

        assert!(repo.mark_completed(&mut tx, &pending.id, Utc::now()).await.unwrap());
        assert!(!repo.mark_completed(&mut tx, &pending.id, Utc::now()).await.unwrap());
        assert!(!repo.mark_completed(&mut tx, "missing", Utc::now()).await.unwrap());

        assert_eq!(
            repo.status(&mut tx, &pending.id).await.unwrap(),
            Some(PaymentStatus::Completed)
        );
        assert_eq!(repo.status(&mut tx, "missing").await.unwrap(), None);
        assert_eq!(repo.pending_count(&mut tx, 2).await.unwrap(), 0);
        tx.commit().await.unwrap();

        let stored = repo.get_by_id(&pending.id).await.unwrap().unwrap();
        assert!(stored.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_pending_listing() {
        let db = test_db().await;
        let repo = db.sales();

        let mut tx = db.begin_write().await.unwrap();
        db.tables().ensure_tables(&mut tx, 4).await.unwrap();
        repo.insert_sale(&mut tx, &sale(1, PaymentStatus::Pending)).await.unwrap();
        repo.insert_sale(&mut tx, &sale(4, PaymentStatus::Pending)).await.unwrap();
        repo.insert_sale(&mut tx, &sale(3, PaymentStatus::Completed)).await.unwrap();
        tx.commit().await.unwrap();

        assert_eq!(repo.pending().await.unwrap().len(), 2);
        assert_eq!(repo.tables_with_pending().await.unwrap(), vec![1, 4]);
        assert_eq!(repo.count().await.unwrap(), 3);
        assert_eq!(repo.list_recent(2).await.unwrap().len(), 2);
    }
}
