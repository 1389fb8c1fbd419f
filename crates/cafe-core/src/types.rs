//! # Domain Types
//!
//! Records the billing engine reads and persists.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    MenuItem     │   │      Sale       │   │    SaleItem     │       │
//! │  │  (catalog)      │   │  payment_status │   │  price snapshot │       │
//! │  │  linked stock?  │   │  pending/done   │   │  line_total     │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  TableStatus    │   │  InventoryItem  │   │  StockMovement  │       │
//! │  │  vacant /       │   │  quantity >= 0  │   │  append-only    │       │
//! │  │  occupied       │   │  threshold      │   │  add / remove   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money columns are stored as `*_paise` integers; accessors wrap them in
//! [`Money`].

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::tab::DiscountKind;

// =============================================================================
// Menu Item
// =============================================================================

/// A sellable menu entry, owned by the catalog collaborator.
///
/// `linked_inventory_item_id` is the explicit capability tag that makes a
/// sale of this item deduct bar stock; items without it never touch the
/// ledger, whatever their category is called.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MenuItem {
    pub id: String,
    pub name: String,
    pub category: String,
    pub unit_price_paise: i64,
    pub linked_inventory_item_id: Option<String>,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MenuItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// Whether a persisted sale has been paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Bill saved, customer pays later. Keeps the table occupied.
    Pending,
    /// Paid. Terminal state.
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Completed => "completed",
        }
    }
}

// =============================================================================
// Table Status
// =============================================================================

/// Occupancy of a physical table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TableState {
    Vacant,
    Occupied,
}

impl Default for TableState {
    fn default() -> Self {
        TableState::Vacant
    }
}

/// Persisted occupancy flag for one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TableStatus {
    pub table_number: i64,
    pub status: TableState,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

// =============================================================================
// Sale
// =============================================================================

/// The permanent record of a finalized tab.
///
/// Immutable once written except for `payment_status` (and the matching
/// `completed_at`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Sale {
    pub id: String,
    pub table_number: i64,
    pub subtotal_paise: i64,
    pub discount_kind: DiscountKind,
    /// Basis points for percentage discounts, paise for amount discounts.
    pub discount_value: i64,
    /// The discount actually taken off, in paise.
    pub discount_paise: i64,
    pub total_paise: i64,
    pub payment_status: PaymentStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Sale {
    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_paise(self.subtotal_paise)
    }

    #[inline]
    pub fn total(&self) -> Money {
        Money::from_paise(self.total_paise)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.payment_status == PaymentStatus::Pending
    }
}

// =============================================================================
// Sale Item
// =============================================================================

/// A line of a sale. Price and name are frozen at the time the line was
/// added to the tab, never re-read from the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct SaleItem {
    pub id: String,
    pub sale_id: String,
    pub menu_item_id: String,
    pub name_snapshot: String,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub line_total_paise: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl SaleItem {
    #[inline]
    pub fn line_total(&self) -> Money {
        Money::from_paise(self.line_total_paise)
    }
}

/// A sale together with its items: the final itemized bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaleReceipt {
    pub sale: Sale,
    pub items: Vec<SaleItem>,
}

impl SaleReceipt {
    /// Checks that the items add up to the recorded subtotal and that the
    /// total is subtotal minus discount.
    pub fn reconciles(&self) -> bool {
        let items: Money = self.items.iter().map(SaleItem::line_total).sum();
        items == self.sale.subtotal()
            && self.sale.subtotal_paise - self.sale.discount_paise == self.sale.total_paise
    }
}

// =============================================================================
// Inventory
// =============================================================================

/// A countable stock item behind the bar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryItem {
    pub id: String,
    pub name: String,
    /// Never negative; the schema enforces it as well.
    pub quantity: i64,
    pub reorder_threshold: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub last_updated: DateTime<Utc>,
}

impl InventoryItem {
    /// Low stock means at or below the reorder threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.quantity <= self.reorder_threshold
    }
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockOperation {
    Add,
    Remove,
}

/// What caused a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum MovementSource {
    /// Deducted by a finalized sale.
    Sale,
    /// Added by an expense that restocked the bar.
    Expense,
    /// Adjusted by hand from the stock screen.
    Manual,
}

/// One row of the append-only stock audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct StockMovement {
    pub id: String,
    pub item_id: String,
    /// Signed: positive for `Add`, negative for `Remove`.
    pub delta: i64,
    pub operation: StockOperation,
    pub source: MovementSource,
    /// Sale or expense id that caused the movement, if any.
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// What the low-stock notifier shows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LowStockItem {
    pub name: String,
    pub quantity: i64,
    pub threshold: i64,
}

impl From<InventoryItem> for LowStockItem {
    fn from(item: InventoryItem) -> Self {
        LowStockItem {
            name: item.name,
            quantity: item.quantity,
            threshold: item.reorder_threshold,
        }
    }
}

/// Identifies a stock item either by id or by its unique name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemRef {
    Id(String),
    Name(String),
}

// =============================================================================
// Expenses
// =============================================================================

/// A recorded expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub name: String,
    pub title: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price_paise: i64,
    pub total_paise: i64,
    /// Stock item restocked by this expense, if any.
    pub restocked_item_id: Option<String>,
    #[ts(as = "String")]
    pub expense_date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Input for recording an expense.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewExpense {
    pub name: String,
    pub title: String,
    pub category: String,
    pub quantity: i64,
    pub unit_price_paise: i64,
    /// When set, `quantity` units are added to this stock item.
    pub restock: Option<RestockTarget>,
}

/// Stock item an expense replenishes, by name. Created if missing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RestockTarget {
    pub item_name: String,
    /// Threshold used only when the item has to be created.
    pub reorder_threshold: Option<i64>,
}
