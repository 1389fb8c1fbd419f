//! # Table Repository
//!
//! Persists each table's `vacant` / `occupied` flag. It records what the
//! engine tells it and never decides occupancy on its own.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use cafe_core::{TableState, TableStatus};

/// Repository for the table registry.
#[derive(Debug, Clone)]
pub struct TableRepository {
    pool: SqlitePool,
}

impl TableRepository {
    pub fn new(pool: SqlitePool) -> Self {
        TableRepository { pool }
    }

    /// Registers tables `1..=count` as vacant if they are missing.
    ///
    /// Existing rows keep their status. Returns how many were created.
    pub async fn ensure_tables(&self, conn: &mut SqliteConnection, count: i64) -> DbResult<u64> {
        let now = Utc::now();
        let mut created = 0;

        for table_number in 1..=count {
            let result = sqlx::query(
                r#"
                INSERT OR IGNORE INTO tables (table_number, status, last_updated)
                VALUES (?1, ?2, ?3)
                "#,
            )
            .bind(table_number)
            .bind(TableState::Vacant)
            .bind(now)
            .execute(&mut *conn)
            .await?;
            created += result.rows_affected();
        }

        if created > 0 {
            debug!(created, count, "Registered tables");
        }
        Ok(created)
    }

    /// All tables in number order.
    pub async fn get_all(&self) -> DbResult<Vec<TableStatus>> {
        let tables = sqlx::query_as::<_, TableStatus>(
            r#"
            SELECT table_number, status, last_updated
            FROM tables
            ORDER BY table_number
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(tables)
    }

    pub async fn get(&self, table_number: i64) -> DbResult<Option<TableStatus>> {
        let table = sqlx::query_as::<_, TableStatus>(
            r#"
            SELECT table_number, status, last_updated
            FROM tables
            WHERE table_number = ?1
            "#,
        )
        .bind(table_number)
        .fetch_optional(&self.pool)
        .await?;

        Ok(table)
    }

    /// Sets a table's status.
    ///
    /// Idempotent: setting the same status again leaves it unchanged but
    /// still refreshes `last_updated`.
    pub async fn set_status(
        &self,
        conn: &mut SqliteConnection,
        table_number: i64,
        status: TableState,
    ) -> DbResult<()> {
        debug!(table_number, status = ?status, "Setting table status");

        let result = sqlx::query(
            r#"
            UPDATE tables
            SET status = ?2, last_updated = ?3
            WHERE table_number = ?1
            "#,
        )
        .bind(table_number)
        .bind(status)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Table", table_number.to_string()));
        }

        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tables")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}
