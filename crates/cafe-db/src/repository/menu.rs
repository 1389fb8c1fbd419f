//! # Menu Repository
//!
//! The café menu: what the engine's catalog lookup reads from.
//!
//! ## Catalog Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Menu management (external collaborator)     Billing engine            │
//! │  ──────────────────────────────────────      ──────────────            │
//! │  insert / update_price / set_active   ──►    get_by_id(id)             │
//! │  link_inventory                              list(category?)           │
//! │                                                                         │
//! │  Items are deactivated, never deleted, so old sales keep resolving.    │
//! │  Price edits never touch lines already on a tab.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use cafe_core::MenuItem;

const MENU_COLUMNS: &str = r#"
    id, name, category, unit_price_paise, linked_inventory_item_id,
    is_active, created_at, updated_at
"#;

/// Repository for menu items.
#[derive(Debug, Clone)]
pub struct MenuRepository {
    pool: SqlitePool,
}

impl MenuRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MenuRepository { pool }
    }

    /// Gets a menu item by ID, active or not.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<MenuItem>> {
        let item = sqlx::query_as::<_, MenuItem>(&format!(
            "SELECT {MENU_COLUMNS} FROM menu_items WHERE id = ?1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(item)
    }

    /// Active items, optionally limited to one category, ordered for display.
    pub async fn list(&self, category: Option<&str>) -> DbResult<Vec<MenuItem>> {
        let items = sqlx::query_as::<_, MenuItem>(&format!(
            r#"
            SELECT {MENU_COLUMNS}
            FROM menu_items
            WHERE is_active = 1 AND (?1 IS NULL OR category = ?1)
            ORDER BY category, name
            "#
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(items)
    }

    /// Distinct categories of active items.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        let categories = sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM menu_items WHERE is_active = 1 ORDER BY category",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(categories)
    }

    /// Inserts a menu item.
    pub async fn insert(&self, item: &MenuItem) -> DbResult<MenuItem> {
        debug!(id = %item.id, name = %item.name, category = %item.category, "Inserting menu item");

        sqlx::query(
            r#"
            INSERT INTO menu_items (
                id, name, category, unit_price_paise, linked_inventory_item_id,
                is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
        )
        .bind(&item.id)
        .bind(&item.name)
        .bind(&item.category)
        .bind(item.unit_price_paise)
        .bind(&item.linked_inventory_item_id)
        .bind(item.is_active)
        .bind(item.created_at)
        .bind(item.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(item.clone())
    }

    /// Changes the price of future lines.
    pub async fn update_price(&self, id: &str, unit_price_paise: i64) -> DbResult<()> {
        debug!(id, unit_price_paise, "Updating menu price");

        let result = sqlx::query(
            "UPDATE menu_items SET unit_price_paise = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(unit_price_paise)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }
        Ok(())
    }

    /// Activates or deactivates an item.
    pub async fn set_active(&self, id: &str, active: bool) -> DbResult<()> {
        debug!(id, active, "Setting menu item availability");

        let result =
            sqlx::query("UPDATE menu_items SET is_active = ?2, updated_at = ?3 WHERE id = ?1")
                .bind(id)
                .bind(active)
                .bind(Utc::now())
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }
        Ok(())
    }

    /// Links (or unlinks) the stock item a sale of this menu item deducts.
    pub async fn link_inventory(&self, id: &str, inventory_item_id: Option<&str>) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE menu_items SET linked_inventory_item_id = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(inventory_item_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("MenuItem", id));
        }
        Ok(())
    }

    /// Counts active menu items.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM menu_items WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

/// Builds a new active menu item with a fresh ID.
pub fn new_menu_item(
    name: &str,
    category: &str,
    unit_price_paise: i64,
    linked_inventory_item_id: Option<String>,
) -> MenuItem {
    let now = Utc::now();
    MenuItem {
        id: Uuid::new_v4().to_string(),
        name: name.to_string(),
        category: category.to_string(),
        unit_price_paise,
        linked_inventory_item_id,
        is_active: true,
        created_at: now,
        updated_at: now,
    }
}
