//! # Money Module
//!
//! Provides the `Money` type for cash and ledger amounts.
//!
//! ## Why Integer Paise?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  SHIFT CASH CHECK                                                       │
//! │                                                                         │
//! │  expected = cash_collected - expenses - cash_deposit                    │
//! │  balanced = expected == cash_in_hand                                    │
//! │                                                                         │
//! │  With floats, 10000.10 - 2000.05 - 3000.05 is not exactly 5000.00,     │
//! │  and a balanced shift shows up as "short by ₹0.00".                    │
//! │                                                                         │
//! │  With paise (i64), 1000010 - 200005 - 300005 == 500000. Always.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fuelbook_core::money::Money;
//!
//! let collected = Money::from_rupees(10_000);
//! let expenses = Money::from_major_minor(1_999, 50); // ₹1,999.50
//! let left = collected - expenses;
//! assert_eq!(left.paise(), 800_050);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in paise (1/100 rupee).
///
/// ## Design Decisions
/// - **i64 (signed)**: differences and refunds can be negative
/// - **Single field tuple struct**: zero-cost over i64
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise.
    #[inline]
    pub const fn from_paise(paise: i64) -> Self {
        Money(paise)
    }

    /// Creates a Money value from whole rupees.
    ///
    /// ## Example
    /// ```rust
    /// use fuelbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_rupees(5_000).paise(), 500_000);
    /// ```
    #[inline]
    pub const fn from_rupees(rupees: i64) -> Self {
        Money(rupees * 100)
    }

    /// Creates a Money value from rupees and paise.
    ///
    /// For negative amounts only the rupee part carries the sign:
    /// `from_major_minor(-5, 50)` is -₹5.50.
    #[inline]
    pub const fn from_major_minor(rupees: i64, paise: i64) -> Self {
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

    /// Returns the whole-rupee portion (truncated toward zero).
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

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Subtraction clamped at the `i64` paise range.
    pub const fn saturating_sub(self, other: Self) -> Self {
        Money(self.0.saturating_sub(other.0))
    }

    pub const fn saturating_abs(self) -> Self {
        Money(self.0.saturating_abs())
    }

    /// Prices a fuel quantity at this per-liter rate.
    ///
    /// The result is rounded half away from zero to the nearest paisa.
    ///
    /// ## Example
    /// ```rust
    /// use fuelbook_core::money::Money;
    ///
    /// let rate = Money::from_major_minor(94, 72); // ₹94.72 / L
    /// let amount = rate.for_liters(12_000.0);
    /// assert_eq!(amount, Money::from_rupees(1_136_640));
    /// ```
    pub fn for_liters(&self, liters: f64) -> Money {
        Money((self.0 as f64 * liters).round() as i64)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

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

/// Parses "1234", "1234.5" or "1234.50" (rupees) into paise.
///
/// More than two decimal places is rejected rather than rounded.
impl FromStr for Money {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "amount".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("expected rupees such as 1250 or 1250.50"));
        }
        if frac.len() > 2 || !frac.chars().all(|c| c.is_ascii_digit()) {
            return Err(invalid("at most two decimal places"));
        }

        let rupees: i64 = whole.parse().map_err(|_| invalid("amount too large"))?;
        let paise: i64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<i64>().map_err(|_| invalid("bad paise"))? * 10,
            _ => frac.parse().map_err(|_| invalid("bad paise"))?,
        };

        let value = rupees
            .checked_mul(100)
            .and_then(|v| v.checked_add(paise))
            .ok_or_else(|| invalid("amount too large"))?;
        Ok(Money(if negative { -value } else { value }))
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constructors() {
        assert_eq!(Money::from_rupees(10).paise(), 1000);
        assert_eq!(Money::from_major_minor(10, 99).paise(), 1099);
        assert_eq!(Money::from_major_minor(-5, 50).paise(), -550);
        assert_eq!(Money::from_paise(1099).rupees(), 10);
        assert_eq!(Money::from_paise(1099).paise_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_paise(1099).to_string(), "₹10.99");
        assert_eq!(Money::from_rupees(5000).to_string(), "₹5000.00");
        assert_eq!(Money::from_paise(-550).to_string(), "-₹5.50");
        assert_eq!(Money::zero().to_string(), "₹0.00");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_rupees(10);
        let b = Money::from_rupees(4);
        assert_eq!((a - b).paise(), 600);
        assert_eq!((b - a).abs().paise(), 600);
        assert_eq!((-a).paise(), -1000);

        let mut c = a;
        c += b;
        c -= Money::from_paise(1);
        assert_eq!(c.paise(), 1399);
    }

    #[test]
    fn test_parse() {
        assert_eq!("1250".parse::<Money>().unwrap(), Money::from_rupees(1250));
        assert_eq!("1250.5".parse::<Money>().unwrap(), Money::from_paise(125_050));
        assert_eq!("1250.05".parse::<Money>().unwrap(), Money::from_paise(125_005));
        assert_eq!("-20.10".parse::<Money>().unwrap(), Money::from_paise(-2010));

        assert!("".parse::<Money>().is_err());
        assert!("12.345".parse::<Money>().is_err());
        assert!("abc".parse::<Money>().is_err());
        assert!(".50".parse::<Money>().is_err());
    }

    #[test]
    fn test_parse_rejects_amounts_beyond_paise_range() {
        // Fits in i64 as rupees but not once scaled to paise.
        let err = "100000000000000000".parse::<Money>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidFormat { ref reason, .. } if reason == "amount too large"));
        assert!("-100000000000000000".parse::<Money>().is_err());
        assert!("92233720368547758.07".parse::<Money>().is_ok());
        assert!("92233720368547758.08".parse::<Money>().is_err());
    }

    #[test]
    fn test_saturating_ops() {
        let max = Money::from_paise(i64::MAX);
        assert_eq!(Money::from_paise(i64::MIN).saturating_abs(), max);
        assert_eq!(Money::zero().saturating_sub(max).saturating_sub(max), Money::from_paise(i64::MIN));
        assert_eq!(Money::from_rupees(5).saturating_sub(Money::from_rupees(2)), Money::from_rupees(3));
    }

    #[test]
    fn test_for_liters_rounds_to_paisa() {
        let rate = Money::from_major_minor(89, 62);
        // 8962 paise × 1.5 L = 13443 paise
        assert_eq!(rate.for_liters(1.5).paise(), 13_443);
        // 8962 × 0.333 = 2984.346 → 2984
        assert_eq!(rate.for_liters(0.333).paise(), 2_984);
    }

    /// Decimal rupee amounts that drift as floats stay exact in paise.
    #[test]
    fn test_no_float_drift() {
        let collected = "10000.10".parse::<Money>().unwrap();
        let expenses = "2000.05".parse::<Money>().unwrap();
        let deposit = "3000.05".parse::<Money>().unwrap();
        assert_eq!(collected - expenses - deposit, Money::from_rupees(5000));
    }
}
