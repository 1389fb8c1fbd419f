//! # Tab Store Repository
//!
//! Durable mirror of every open tab, keyed by `(table_number, menu_item_id)`.
//!
//! ## Recovery Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  temporary_bills               temporary_bill_discounts                 │
//! │  ┌───────┬──────────┬─────┐    ┌───────┬────────────┬───────┐          │
//! │  │ table │ item     │ qty │    │ table │ kind       │ value │          │
//! │  ├───────┼──────────┼─────┤    ├───────┼────────────┼───────┤          │
//! │  │   5   │ coffee   │  2  │    │   5   │ percentage │ 1000  │          │
//! │  │   5   │ sandwich │  1  │    └───────┴────────────┴───────┘          │
//! │  └───────┴──────────┴─────┘                                            │
//! │                                                                         │
//! │  On startup: every table with rows here is an open tab and is          │
//! │  restored as Tab::restore(5, lines, discount).                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::BTreeMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use cafe_core::{Discount, TabLine};

/// The mirrored state of one table's tab.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredTab {
    pub table_number: i64,
    pub lines: Vec<TabLine>,
    pub discount: Option<Discount>,
}

#[derive(sqlx::FromRow)]
struct StoredLine {
    table_number: i64,
    #[sqlx(flatten)]
    line: TabLine,
}

#[derive(sqlx::FromRow)]
struct StoredDiscount {
    table_number: i64,
    #[sqlx(flatten)]
    discount: Discount,
}

/// Repository for the open-tab mirror.
#[derive(Debug, Clone)]
pub struct TabStoreRepository {
    pool: SqlitePool,
}

impl TabStoreRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TabStoreRepository { pool }
    }

    /// Loads the mirror for one table. `None` when nothing is stored.
    pub async fn load(&self, table_number: i64) -> DbResult<Option<StoredTab>> {
        let lines = sqlx::query_as::<_, TabLine>(
            r#"
            SELECT menu_item_id, name, unit_price_paise, quantity, linked_inventory_item_id
            FROM temporary_bills
            WHERE table_number = ?1
            ORDER BY menu_item_id
            "#,
        )
        .bind(table_number)
        .fetch_all(&self.pool)
        .await?;

        let discount = sqlx::query_as::<_, Discount>(
            r#"
            SELECT kind, value
            FROM temporary_bill_discounts
            WHERE table_number = ?1
            "#,
        )
        .bind(table_number)
        .fetch_optional(&self.pool)
        .await?;

        if lines.is_empty() && discount.is_none() {
            return Ok(None);
        }

        Ok(Some(StoredTab {
            table_number,
            lines,
            discount,
        }))
    }

    /// Loads every mirrored tab, in table order.
    pub async fn load_all(&self) -> DbResult<Vec<StoredTab>> {
        let lines = sqlx::query_as::<_, StoredLine>(
            r#"
            SELECT table_number, menu_item_id, name, unit_price_paise, quantity,
                   linked_inventory_item_id
            FROM temporary_bills
            ORDER BY table_number, menu_item_id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let discounts = sqlx::query_as::<_, StoredDiscount>(
            r#"
            SELECT table_number, kind, value
            FROM temporary_bill_discounts
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        let mut tabs: BTreeMap<i64, StoredTab> = BTreeMap::new();
        for stored in lines {
            tabs.entry(stored.table_number)
                .or_insert_with(|| StoredTab {
                    table_number: stored.table_number,
                    lines: Vec::new(),
                    discount: None,
                })
                .lines
                .push(stored.line);
        }
        for stored in discounts {
            tabs.entry(stored.table_number)
                .or_insert_with(|| StoredTab {
                    table_number: stored.table_number,
                    lines: Vec::new(),
                    discount: None,
                })
                .discount = Some(stored.discount);
        }

        Ok(tabs.into_values().collect())
    }

    /// Inserts or replaces one line.
    pub async fn upsert_line(
        &self,
        conn: &mut SqliteConnection,
        table_number: i64,
        line: &TabLine,
    ) -> DbResult<()> {
        debug!(
            table_number,
            menu_item_id = %line.menu_item_id,
            quantity = line.quantity,
            "Mirroring tab line"
        );

        sqlx::query(
            r#"
            INSERT INTO temporary_bills (
                table_number, menu_item_id, name, unit_price_paise,
                quantity, linked_inventory_item_id, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT (table_number, menu_item_id) DO UPDATE SET
                quantity = excluded.quantity,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(table_number)
        .bind(&line.menu_item_id)
        .bind(&line.name)
        .bind(line.unit_price_paise)
        .bind(line.quantity)
        .bind(&line.linked_inventory_item_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Deletes one line. Returns whether a row existed.
    pub async fn delete_line(
        &self,
        conn: &mut SqliteConnection,
        table_number: i64,
        menu_item_id: &str,
    ) -> DbResult<bool> {
        debug!(table_number, menu_item_id, "Removing mirrored tab line");

        let result = sqlx::query(
            "DELETE FROM temporary_bills WHERE table_number = ?1 AND menu_item_id = ?2",
        )
        .bind(table_number)
        .bind(menu_item_id)
        .execute(&mut *conn)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Mirrors the discount. A zero discount removes the row.
    pub async fn save_discount(
        &self,
        conn: &mut SqliteConnection,
        table_number: i64,
        discount: Discount,
    ) -> DbResult<()> {
        if discount.is_none() {
            sqlx::query("DELETE FROM temporary_bill_discounts WHERE table_number = ?1")
                .bind(table_number)
                .execute(&mut *conn)
                .await?;
            return Ok(());
        }

        debug!(table_number, kind = discount.kind.as_str(), value = discount.value, "Mirroring discount");

        sqlx::query(
            r#"
            INSERT INTO temporary_bill_discounts (table_number, kind, value, updated_at)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT (table_number) DO UPDATE SET
                kind = excluded.kind,
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(table_number)
        .bind(discount.kind)
        .bind(discount.value)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    /// Removes every mirrored line and the discount for a table.
    ///
    /// Returns the number of line rows removed.
    pub async fn clear(&self, conn: &mut SqliteConnection, table_number: i64) -> DbResult<u64> {
        let result = sqlx::query("DELETE FROM temporary_bills WHERE table_number = ?1")
            .bind(table_number)
            .execute(&mut *conn)
            .await?;

        sqlx::query("DELETE FROM temporary_bill_discounts WHERE table_number = ?1")
            .bind(table_number)
            .execute(&mut *conn)
            .await?;

        debug!(table_number, lines = result.rows_affected(), "Cleared tab mirror");
        Ok(result.rows_affected())
    }

    /// Number of mirrored lines for a table, read inside a transaction.
    pub async fn line_count(&self, conn: &mut SqliteConnection, table_number: i64) -> DbResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM temporary_bills WHERE table_number = ?1")
                .bind(table_number)
                .fetch_one(&mut *conn)
                .await?;
        Ok(count)
    }
}
