//! # Engine Error Type
//!
//! The error every engine and ledger operation returns.
//!
//! ## Error Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  ValidationError ──► CoreError ──┐                                      │
//! │                                  ├──► EngineError ──► ErrorResponse     │
//! │  sqlx::Error ─────► DbError ─────┘        │              (code, msg)    │
//! │                                           │                             │
//! │        Validation          bad input, empty order, unavailable item     │
//! │        InsufficientStock   deduct would go below zero                   │
//! │        NotFound            unknown table, line, sale or stock item      │
//! │        Conflict            already paid, or the store is busy           │
//! │        Storage             anything else from SQLite (logged)           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every failing operation has rolled back before the error reaches the
//! caller: no partial state survives any of these.

use serde::Serialize;
use thiserror::Error;

use cafe_core::{CoreError, ValidationError};
use cafe_db::DbError;

/// Errors returned by [`BillingEngine`](crate::BillingEngine) and
/// [`InventoryLedger`](crate::InventoryLedger).
#[derive(Debug, Error)]
pub enum EngineError {
    /// The request breaks a business or input rule.
    #[error("{0}")]
    Validation(CoreError),

    /// A stock deduction would drive the quantity below zero.
    #[error("Insufficient stock for {item}: available {available}, requested {requested}")]
    InsufficientStock {
        item: String,
        available: i64,
        requested: i64,
    },

    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The target is not in a state that allows the operation, or a
    /// concurrent writer holds the store. Retrying may succeed.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Storage failure; the operation was rolled back.
    #[error("Storage error: {0}")]
    Storage(DbError),
}

impl EngineError {
    pub fn not_found(entity: impl Into<String>, id: impl ToString) -> Self {
        EngineError::NotFound {
            entity: entity.into(),
            id: id.to_string(),
        }
    }

    /// Machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Validation(_) => ErrorCode::ValidationError,
            EngineError::InsufficientStock { .. } => ErrorCode::InsufficientStock,
            EngineError::NotFound { .. } => ErrorCode::NotFound,
            EngineError::Conflict(_) => ErrorCode::Conflict,
            EngineError::Storage(_) => ErrorCode::StorageError,
        }
    }
}

/// Converts core errors to engine errors.
impl From<CoreError> for EngineError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::LineNotFound {
                table_number,
                menu_item_id,
            } => EngineError::not_found(
                "Tab line",
                format!("table {table_number}, item {menu_item_id}"),
            ),
            CoreError::InsufficientStock {
                item,
                available,
                requested,
            } => EngineError::InsufficientStock {
                item,
                available,
                requested,
            },
            CoreError::InvalidSaleStatus {
                sale_id,
                current_status,
            } => EngineError::Conflict(format!("Sale {sale_id} is already {current_status}")),
            other => EngineError::Validation(other),
        }
    }
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Validation(CoreError::Validation(err))
    }
}

/// Converts database errors to engine errors.
///
/// Unexpected storage failures are logged here, once, with the full
/// message.
impl From<DbError> for EngineError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => EngineError::NotFound { entity, id },
            DbError::UniqueViolation { field, value } => {
                EngineError::from(ValidationError::Duplicate { field, value })
            }
            busy @ (DbError::Busy(_) | DbError::PoolExhausted) => {
                tracing::warn!(error = %busy, "Store busy");
                EngineError::Conflict(busy.to_string())
            }
            other => {
                tracing::error!(error = %other, "Storage operation failed");
                EngineError::Storage(other)
            }
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

// =============================================================================
// Error Response
// =============================================================================

/// Error codes handed to UI collaborators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    ValidationError,
    InsufficientStock,
    NotFound,
    Conflict,
    StorageError,
}

/// Serializable form of an [`EngineError`].
///
/// ```json
/// { "code": "INSUFFICIENT_STOCK", "message": "Insufficient stock for Beer: available 5, requested 10" }
/// ```
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub code: ErrorCode,
    pub message: String,
}

impl From<&EngineError> for ErrorResponse {
    fn from(err: &EngineError) -> Self {
        let message = match err {
            // Raw SQLite text stays in the log.
            EngineError::Storage(_) => "Database operation failed".to_string(),
            other => other.to_string(),
        };
        ErrorResponse {
            code: err.code(),
            message,
        }
    }
}

impl std::fmt::Display for ErrorResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{:?}] {}", self.code, self.message)
    }
}
