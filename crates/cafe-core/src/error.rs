//! # Error Types
//!
//! Domain-specific error types for cafe-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  cafe-core errors (this file)                                          │
//! │  ├── CoreError        - Tab / stock / sale rule violations             │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  cafe-db errors                                                        │
//! │  └── DbError          - Database operation failures                    │
//! │                                                                         │
//! │  cafe-engine errors                                                    │
//! │  └── EngineError      - What callers see (5-way taxonomy)              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError ← DbError             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Business rule violations raised while mutating a tab or the ledger.
///
/// None of these leave state changed: the operation that raised one is
/// rejected as a whole.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// The menu item is unknown to the catalog or has been deactivated.
    #[error("Menu item unavailable: {0}")]
    MenuItemUnavailable(String),

    /// The tab has no lines, so there is nothing to bill.
    #[error("Empty order for table {table_number}")]
    EmptyOrder { table_number: i64 },

    /// A remove was issued for an item that is not on the tab.
    #[error("Menu item {menu_item_id} is not on the tab for table {table_number}")]
    LineNotFound {
        table_number: i64,
        menu_item_id: String,
    },

    /// Deducting would drive stock below zero.
    ///
    /// ## User Workflow
    /// ```text
    /// Finalize bill with 10 × Beer
    ///      │
    ///      ▼
    /// Check stock: available=5
    ///      │
    ///      ▼
    /// InsufficientStock { item: "Beer", available: 5, requested: 10 }
    ///      │
    ///      ▼
    /// UI shows: "Only 5 Beer in stock", bill stays open
    /// ```
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    /// Sale is not in a state that allows the requested operation.
    #[error("Sale {sale_id} is {current_status}, cannot perform operation")]
    InvalidSaleStatus {
        sale_id: String,
        current_status: String,
    },

    /// Tab has reached the maximum number of distinct lines.
    #[error("Tab cannot have more than {max} lines")]
    TabTooLarge { max: usize },

    /// Line quantity would exceed the maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any business logic runs; the caller corrects the input
/// and retries.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Another record already uses this value.
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;
