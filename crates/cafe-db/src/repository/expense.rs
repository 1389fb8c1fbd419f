//! # Expense Repository
//!
//! Recorded café expenses. Restocking expenses carry the id of the stock
//! item they replenished; the stock change itself is written by the
//! ledger in the same transaction.

use chrono::NaiveDate;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use cafe_core::Expense;

const EXPENSE_COLUMNS: &str = r#"
    id, name, title, category, quantity, unit_price_paise, total_paise,
    restocked_item_id, expense_date, created_at
"#;

/// Repository for expenses.
#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    pub async fn insert(&self, conn: &mut SqliteConnection, expense: &Expense) -> DbResult<()> {
        debug!(
            expense_id = %expense.id,
            name = %expense.name,
            total_paise = expense.total_paise,
            "Recording expense"
        );

        sqlx::query(
            r#"
            INSERT INTO expenses (
                id, name, title, category, quantity, unit_price_paise, total_paise,
                restocked_item_id, expense_date, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&expense.id)
        .bind(&expense.name)
        .bind(&expense.title)
        .bind(&expense.category)
        .bind(expense.quantity)
        .bind(expense.unit_price_paise)
        .bind(expense.total_paise)
        .bind(&expense.restocked_item_id)
        .bind(expense.expense_date)
        .bind(expense.created_at)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Expense>> {
        let expense = sqlx::query_as::<_, Expense>(&format!(
            "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(expense)
    }

    /// Expenses dated within `[from, to]`, newest first.
    pub async fn list_between(&self, from: NaiveDate, to: NaiveDate) -> DbResult<Vec<Expense>> {
        let expenses = sqlx::query_as::<_, Expense>(&format!(
            r#"
            SELECT {EXPENSE_COLUMNS}
            FROM expenses
            WHERE expense_date BETWEEN ?1 AND ?2
            ORDER BY expense_date DESC, created_at DESC
            "#
        ))
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(expenses)
    }
}
