//! # cafe-core: Pure Business Logic for Cafe POS
//!
//! Everything the billing engine decides without touching storage:
//! money arithmetic, the in-progress [`Tab`](tab::Tab) for a table,
//! domain records and input validation.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Cafe POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              UI collaborator (tables grid, bill window)         │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              cafe-engine (BillingEngine, InventoryLedger)       │   │
//! │  └──────────────┬──────────────────────────────┬───────────────────┘   │
//! │                 │                              │                        │
//! │  ┌──────────────▼──────────────┐  ┌────────────▼────────────────────┐  │
//! │  │   ★ cafe-core (THIS) ★      │  │   cafe-db (SQLite repositories) │  │
//! │  │   money • tab • types       │  │   tab store • sales • stock     │  │
//! │  │   validation • error        │  │                                 │  │
//! │  └─────────────────────────────┘  └─────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Money type with integer arithmetic (paise, no floats)
//! - [`tab`] - The open order for one table and its totals
//! - [`types`] - Persisted domain records (Sale, InventoryItem, ...)
//! - [`validation`] - Business rule validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use cafe_core::money::Money;
//!
//! let coffee = Money::from_paise(12_000); // ₹120.00
//! let subtotal = coffee * 2 + Money::from_paise(15_000);
//! assert_eq!(subtotal.to_string(), "₹390.00");
//!
//! // 10% off, expressed in basis points
//! assert_eq!(subtotal.percentage(1_000).paise(), 3_900);
//! ```

pub mod error;
pub mod money;
pub mod tab;
pub mod types;
pub mod validation;

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tab::{Discount, DiscountKind, Tab, TabLine, TabView, TabViewLine};
pub use types::*;

/// Maximum distinct lines on a single tab.
pub const MAX_TAB_LINES: usize = 100;

/// Maximum quantity of a single menu item on a tab line.
///
/// Catches typing 1000 instead of 10.
pub const MAX_LINE_QUANTITY: i64 = 999;

/// Highest accepted unit price: ₹1,00,00,000.
///
/// Keeps a full tab (lines × quantity × price) well inside `i64` paise.
pub const MAX_PRICE_PAISE: i64 = 1_000_000_000;

/// 100% expressed in basis points.
pub const FULL_PERCENTAGE_BPS: i64 = 10_000;

/// Number of tables a fresh installation starts with.
pub const DEFAULT_TABLE_COUNT: i64 = 15;

/// Reorder threshold given to stock items created implicitly by a restock.
pub const DEFAULT_REORDER_THRESHOLD: i64 = 10;
