//! # Catalog
//!
//! Menu lookup as seen by the billing engine.
//!
//! The menu is managed elsewhere; the engine only ever asks two
//! questions of it. [`MenuRepository`] answers them from the local
//! database, and tests or alternative hosts can plug in their own.
//!
//! ```text
//! BillingEngine::add_line(table, "coffee", 2)
//!      │
//!      ▼
//! catalog.get_menu_item("coffee") ──► None            ──► Validation (unavailable)
//!                                 ──► inactive item   ──► Validation (unavailable)
//!                                 ──► active item     ──► price snapshot on the tab
//! ```

use std::future::Future;

use cafe_core::MenuItem;
use cafe_db::MenuRepository;

use crate::error::EngineResult;

/// Read-only menu source.
pub trait Catalog: Send + Sync {
    /// The item with this id, active or not.
    fn get_menu_item(
        &self,
        menu_item_id: &str,
    ) -> impl Future<Output = EngineResult<Option<MenuItem>>> + Send;

    /// Active items, optionally restricted to one category.
    fn list_menu_items(
        &self,
        category: Option<&str>,
    ) -> impl Future<Output = EngineResult<Vec<MenuItem>>> + Send;
}

impl Catalog for MenuRepository {
    async fn get_menu_item(&self, menu_item_id: &str) -> EngineResult<Option<MenuItem>> {
        Ok(self.get_by_id(menu_item_id).await?)
    }

    async fn list_menu_items(&self, category: Option<&str>) -> EngineResult<Vec<MenuItem>> {
        Ok(self.list(category).await?)
    }
}
