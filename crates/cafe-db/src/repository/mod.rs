//! # Repository Module
//!
//! Database repository implementations for Cafe POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  BillingEngine / InventoryLedger                                       │
//! │       │                                                                 │
//! │       │  reads:   db.tables().get_all()            (pool)              │
//! │       │  writes:  db.sales().insert_sale(&mut tx, …) (WriteTx)         │
//! │       ▼                                                                 │
//! │  ┌──────────────┬──────────────┬──────────────┬──────────────┐        │
//! │  │ MenuRepo     │ TableRepo    │ TabStoreRepo │ SaleRepo     │        │
//! │  │ InventoryRepo│ ExpenseRepo  │              │              │        │
//! │  └──────────────┴──────────────┴──────────────┴──────────────┘        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Writes never open their own transaction. Whoever calls them decides
//! what else belongs in the same atomic unit.

pub mod expense;
pub mod inventory;
pub mod menu;
pub mod sale;
pub mod tab_store;
pub mod table;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Database, DbConfig};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }
}
