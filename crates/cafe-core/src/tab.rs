//! # Tab
//!
//! The in-progress order for one table.
//!
//! ## Tab Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Tab Lifecycle                                   │
//! │                                                                         │
//! │  open_tab(5) ──► Tab::new(5)  or  Tab::restore(5, rows, discount)      │
//! │                     │                                                   │
//! │                     ▼                                                   │
//! │   add_line / remove_line / set_discount ──► recompute()                │
//! │                     │         (subtotal, effective discount, total)    │
//! │                     ▼                                                   │
//! │   finalize ──► Sale + SaleItems      abandon ──► discarded             │
//! │                                                                         │
//! │  Invariants after every mutation:                                      │
//! │    subtotal = Σ unit_price × quantity                                  │
//! │    0 ≤ effective discount ≤ subtotal                                   │
//! │    total = subtotal − effective discount                               │
//! │    every line has 1 ≤ quantity ≤ MAX_LINE_QUANTITY                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A `Tab` knows nothing about storage. The engine mutates a clone, mirrors
//! the result into the tab store and swaps the clone in once the write
//! commits.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::MenuItem;
use crate::validation::{validate_discount, validate_price_paise, validate_quantity};
use crate::{FULL_PERCENTAGE_BPS, MAX_LINE_QUANTITY, MAX_TAB_LINES};

// =============================================================================
// Discount
// =============================================================================

/// How a discount value is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    /// Value is in basis points (1000 = 10%).
    Percentage,
    /// Value is in paise.
    Amount,
}

impl DiscountKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountKind::Percentage => "percentage",
            DiscountKind::Amount => "amount",
        }
    }
}

/// A discount as entered on a tab.
///
/// The value is kept as the user typed it. Clamping against the subtotal
/// happens only when the money off is computed, so a shrinking tab never
/// eats into the stored value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Discount {
    pub kind: DiscountKind,
    pub value: i64,
}

impl Discount {
    /// No discount.
    pub const NONE: Discount = Discount {
        kind: DiscountKind::Percentage,
        value: 0,
    };

    /// The discount as it applies to `subtotal`: percentages capped at
    /// 100%, amounts capped at the subtotal.
    pub fn clamped(self, subtotal: Money) -> Discount {
        let ceiling = match self.kind {
            DiscountKind::Percentage => FULL_PERCENTAGE_BPS,
            DiscountKind::Amount => subtotal.paise().max(0),
        };
        Discount {
            kind: self.kind,
            value: self.value.clamp(0, ceiling),
        }
    }

    /// The money taken off `subtotal` by this discount.
    pub fn amount_off(&self, subtotal: Money) -> Money {
        let clamped = self.clamped(subtotal);
        let off = match clamped.kind {
            DiscountKind::Percentage => subtotal.percentage(clamped.value),
            DiscountKind::Amount => Money::from_paise(clamped.value),
        };
        off.min(subtotal).max(Money::zero())
    }

    #[inline]
    pub fn is_none(&self) -> bool {
        self.value == 0
    }
}

impl Default for Discount {
    fn default() -> Self {
        Discount::NONE
    }
}

// =============================================================================
// Tab Line
// =============================================================================

/// One menu item on a tab. Name, price and stock link are frozen when the
/// line is first created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TabLine {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price_paise: i64,
    pub quantity: i64,
    pub linked_inventory_item_id: Option<String>,
}

impl TabLine {
    fn from_menu_item(item: &MenuItem, quantity: i64) -> Self {
        TabLine {
            menu_item_id: item.id.clone(),
            name: item.name.clone(),
            unit_price_paise: item.unit_price_paise,
            quantity,
            linked_inventory_item_id: item.linked_inventory_item_id.clone(),
        }
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_paise(self.unit_price_paise)
    }

    #[inline]
    pub fn line_total(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }
}

// =============================================================================
// Tab
// =============================================================================

/// The open order for a single table.
///
/// Lines are keyed by menu item id, so adding the same item twice
/// accumulates quantity on one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tab {
    table_number: i64,
    lines: BTreeMap<String, TabLine>,
    discount: Discount,
    subtotal: Money,
    total: Money,
}

impl Tab {
    /// Creates an empty tab.
    pub fn new(table_number: i64) -> Self {
        Tab {
            table_number,
            lines: BTreeMap::new(),
            discount: Discount::NONE,
            subtotal: Money::zero(),
            total: Money::zero(),
        }
    }

    /// Rebuilds a tab from mirrored rows.
    ///
    /// Rows with a non-positive quantity are dropped; duplicates for the
    /// same menu item are merged.
    pub fn restore(
        table_number: i64,
        lines: impl IntoIterator<Item = TabLine>,
        discount: Option<Discount>,
    ) -> Self {
        let mut tab = Tab::new(table_number);
        for line in lines.into_iter().filter(|l| l.quantity > 0) {
            match tab.lines.get_mut(&line.menu_item_id) {
                Some(existing) => existing.quantity += line.quantity,
                None => {
                    tab.lines.insert(line.menu_item_id.clone(), line);
                }
            }
        }
        tab.discount = discount.unwrap_or_default();
        tab.recompute();
        tab
    }

    #[inline]
    pub fn table_number(&self) -> i64 {
        self.table_number
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        self.subtotal
    }

    #[inline]
    pub fn total(&self) -> Money {
        self.total
    }

    #[inline]
    pub fn discount(&self) -> Discount {
        self.discount
    }

    /// The money actually taken off the subtotal.
    #[inline]
    pub fn effective_discount(&self) -> Money {
        self.subtotal - self.total
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    #[inline]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    pub fn line(&self, menu_item_id: &str) -> Option<&TabLine> {
        self.lines.get(menu_item_id)
    }

    pub fn lines(&self) -> impl Iterator<Item = &TabLine> {
        self.lines.values()
    }

    /// Adds `quantity` units of `item`.
    ///
    /// ## Behavior
    /// - Item already on the tab: quantity accumulates, the original price
    ///   snapshot is kept
    /// - New item: a line is created with the item's current price
    ///
    /// Returns the line as it now stands. On error the tab is unchanged.
    pub fn add_line(&mut self, item: &MenuItem, quantity: i64) -> CoreResult<TabLine> {
        validate_quantity(quantity)?;
        validate_price_paise(item.unit_price_paise)?;

        if !item.is_active {
            return Err(CoreError::MenuItemUnavailable(item.id.clone()));
        }

        let line = match self.lines.get_mut(&item.id) {
            Some(line) => {
                let new_qty = line.quantity + quantity;
                if new_qty > MAX_LINE_QUANTITY {
                    return Err(CoreError::QuantityTooLarge {
                        requested: new_qty,
                        max: MAX_LINE_QUANTITY,
                    });
                }
                line.quantity = new_qty;
                line.clone()
            }
            None => {
                if self.lines.len() >= MAX_TAB_LINES {
                    return Err(CoreError::TabTooLarge { max: MAX_TAB_LINES });
                }
                let line = TabLine::from_menu_item(item, quantity);
                self.lines.insert(item.id.clone(), line.clone());
                line
            }
        };

        self.recompute();
        Ok(line)
    }

    /// Takes one unit off the line for `menu_item_id`.
    ///
    /// Returns the remaining line, or `None` when the last unit was removed
    /// and the line deleted.
    pub fn remove_line(&mut self, menu_item_id: &str) -> CoreResult<Option<TabLine>> {
        let remaining = match self.lines.get_mut(menu_item_id) {
            None => {
                return Err(CoreError::LineNotFound {
                    table_number: self.table_number,
                    menu_item_id: menu_item_id.to_string(),
                })
            }
            Some(line) if line.quantity > 1 => {
                line.quantity -= 1;
                Some(line.clone())
            }
            Some(_) => None,
        };

        if remaining.is_none() {
            self.lines.remove(menu_item_id);
        }

        self.recompute();
        Ok(remaining)
    }

    /// Sets the discount. The value is stored as given.
    ///
    /// ## Clamping (applied to the total, not the stored value)
    /// ```text
    /// percentage 12000 bps on ₹390 ──► 10000 bps (100%) ──► total ₹0.00
    /// amount ₹500 on ₹390          ──► ₹390 off          ──► total ₹0.00
    /// amount ₹500 on empty tab     ──► ₹0 off now, ₹500 once lines exist
    /// ```
    ///
    /// Negative values are rejected rather than zeroed so the caller can
    /// tell the user.
    pub fn set_discount(&mut self, kind: DiscountKind, value: i64) -> CoreResult<Discount> {
        validate_discount(value)?;
        self.discount = Discount { kind, value };
        self.recompute();
        Ok(self.discount)
    }

    /// Recalculates subtotal and total from the lines and the discount.
    pub fn recompute(&mut self) {
        self.subtotal = self.lines.values().map(TabLine::line_total).sum();
        self.total = self.subtotal - self.discount.amount_off(self.subtotal);
    }

    /// The discount clamped against the current subtotal, as a sale
    /// records it.
    pub fn applied_discount(&self) -> Discount {
        self.discount.clamped(self.subtotal)
    }

    /// Snapshot for UI collaborators.
    pub fn view(&self) -> TabView {
        TabView {
            table_number: self.table_number,
            lines: self
                .lines
                .values()
                .map(|line| TabViewLine {
                    menu_item_id: line.menu_item_id.clone(),
                    name: line.name.clone(),
                    unit_price_paise: line.unit_price_paise,
                    quantity: line.quantity,
                    line_total_paise: line.line_total().paise(),
                })
                .collect(),
            discount: self.discount,
            subtotal_paise: self.subtotal.paise(),
            discount_paise: self.effective_discount().paise(),
            total_paise: self.total.paise(),
        }
    }
}

// =============================================================================
// Views
// =============================================================================

/// What the bill window renders for an open tab.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TabView {
    pub table_number: i64,
    pub lines: Vec<TabViewLine>,
    pub discount: Discount,
    pub subtotal_paise: i64,
    pub discount_paise: i64,
    pub total_paise: i64,
}

impl TabView {
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TabViewLine {
    pub menu_item_id: String,
    pub name: String,
    pub unit_price_paise: i64,
    pub quantity: i64,
    pub line_total_paise: i64,
}
