//! # cafe-db: Database Layer for Cafe POS
//!
//! SQLite persistence for tables, open tabs, sales and bar stock, using
//! sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cafe POS Data Flow                               │
//! │                                                                         │
//! │  BillingEngine::finalize_and_pay(3)                                    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     cafe-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │               │    │  (embedded)  │  │   │
//! │  │   │               │    │ TabStoreRepo  │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ SaleRepo      │    │ 001_initial_ │  │   │
//! │  │   │ WriteTx       │    │ TableRepo     │    │  schema.sql  │  │   │
//! │  │   │ (one writer)  │    │ InventoryRepo │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database                             │   │
//! │  │   <platform data dir>/cafe.db                                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Reads and Writes
//!
//! Repository reads go straight to the pool. Repository writes take a
//! `&mut SqliteConnection`, normally the one inside a [`WriteTx`], so a
//! caller can group several writes into one atomic unit.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use cafe_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("cafe.db")).await?;
//!
//! let mut tx = db.begin_write().await?;
//! db.tables().set_status(&mut tx, 5, TableState::Occupied).await?;
//! tx.commit().await?;
//!
//! let statuses = db.tables().get_all().await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig, WriteTx};

// Repository re-exports for convenience
pub use repository::expense::ExpenseRepository;
pub use repository::inventory::InventoryRepository;
pub use repository::menu::MenuRepository;
pub use repository::sale::SaleRepository;
pub use repository::tab_store::{StoredTab, TabStoreRepository};
pub use repository::table::TableRepository;

/// Re-exported so callers can name the connection type repository writes take.
pub use sqlx::SqliteConnection;
