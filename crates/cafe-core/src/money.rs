//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  With floats:  ₹0.1 + ₹0.2 = ₹0.30000000000000004                       │
//! │                                                                         │
//! │  OUR SOLUTION: Integer paise                                            │
//! │    ₹390.00 = 39000 paise, 10% off = 3900 paise, total = 35100 paise    │
//! │    Every sale reconciles to the paisa.                                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use cafe_core::money::Money;
//!
//! let price = Money::from_paise(12_000); // ₹120.00
//! let line = price.multiply_quantity(2);  // ₹240.00
//! assert_eq!(line.paise(), 24_000);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

/// A monetary value in paise (1/100 of a rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences such as `subtotal - discount` stay in
///   the same type; totals are kept non-negative by the tab invariants
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money Flows
/// ```text
/// MenuItem.unit_price ──► TabLine.unit_price (snapshot) ──► line total
///                                                              │
/// Tab.subtotal = Σ line totals ──► − discount ──► Tab.total ──► Sale
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ```rust
    /// use cafe_core::money::Money;
    ///
    /// let price = Money::from_paise(15_050); // ₹150.50
    /// assert_eq!(price.paise(), 15_050);
    /// ```
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part carries the sign:
    /// `from_rupees(-5, 50)` is -₹5.50.
    ///
    /// ```rust
    /// use cafe_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(120, 0).paise(), 12_000);
    /// assert_eq!(Money::from_rupees(-5, 50).paise(), -550);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64, paise: i64) -> Self {
        if rupees < 0 {
            Money(rupees * 100 - paise)
        } else {
            Money(rupees * 100 + paise)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn paise(&self) -> i64 {
        self.0
    }

    /// Returns the whole-rupee portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the paise portion (always 0-99).
    #[inline]
    pub const fn paise_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Multiplies money by a quantity.
    ///
    /// ```rust
    /// use cafe_core::money::Money;
    ///
    /// let coffee = Money::from_paise(12_000);
    /// assert_eq!(coffee.multiply_quantity(2).paise(), 24_000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Returns `bps` basis points of this amount, rounded half-up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`. i128 keeps large
    /// subtotals from overflowing the intermediate product.
    ///
    /// ```rust
    /// use cafe_core::money::Money;
    ///
    /// let subtotal = Money::from_paise(39_000); // ₹390.00
    /// assert_eq!(subtotal.percentage(1_000).paise(), 3_900); // 10%
    /// assert_eq!(Money::from_paise(999).percentage(1_250).paise(), 125); // 12.5%
    /// ```
    pub fn percentage(&self, bps: i64) -> Money {
        let amount = (self.0 as i128 * bps as i128 + 5_000) / 10_000;
        Money(amount as i64)
    }
}

/// Renders `₹390.00`. UI collaborators with other locales format paise themselves.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.paise_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}
