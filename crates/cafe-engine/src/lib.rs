//! # cafe-engine
//!
//! Table billing and bar inventory services for a single café.
//!
//! ## Components
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          cafe-engine                                    │
//! │                                                                         │
//! │  UI collaborators                                                       │
//! │       │  open_tab / add_line / finalize_and_pay / table_statuses …     │
//! │       ▼                                                                 │
//! │  ┌──────────────────┐   get_menu_item   ┌──────────────────┐            │
//! │  │  BillingEngine   │ ────────────────► │  Catalog (trait) │            │
//! │  │  per-table locks │                   │  MenuRepository  │            │
//! │  │  Tab cache       │                   └──────────────────┘            │
//! │  └────────┬─────────┘                                                   │
//! │           │ deduct_in (same WriteTx)                                    │
//! │           ▼                                                             │
//! │  ┌──────────────────┐                                                   │
//! │  │ InventoryLedger  │  add / deduct / low_stock_items / record_expense  │
//! │  └────────┬─────────┘                                                   │
//! │           ▼                                                             │
//! │       cafe-db (SQLite, single-writer transactions)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! use cafe_engine::{telemetry, BillingEngine, EngineConfig};
//! use cafe_core::DiscountKind;
//!
//! telemetry::init_tracing();
//! let engine = BillingEngine::open(EngineConfig::from_env()).await?;
//!
//! engine.add_line(5, &coffee_id, 2).await?;
//! engine.set_discount(5, DiscountKind::Percentage, 1_000).await?;
//! let sale_id = engine.finalize_and_pay(5).await?;
//! ```

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod locks;
pub mod telemetry;

pub use catalog::Catalog;
pub use config::EngineConfig;
pub use engine::{BillingEngine, RecoveryReport};
pub use error::{EngineError, EngineResult, ErrorCode, ErrorResponse};
pub use ledger::InventoryLedger;
pub use locks::KeyedLocks;
