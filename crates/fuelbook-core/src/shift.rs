//! # Shift Module
//!
//! Cash reconciliation for a completed shift.
//!
//! ## User Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Close Shift                                                            │
//! │                                                                         │
//! │  cash collected   ₹10,000.00                                            │
//! │  − expenses        ₹2,000.00                                            │
//! │  − cash deposit    ₹3,000.00                                            │
//! │  ──────────────────────────                                             │
//! │  expected          ₹5,000.00                                            │
//! │  cash in hand      ₹4,800.00   ← counted by the manager                │
//! │                                                                         │
//! │  balanced: NO, short by ₹200.00                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Amounts are integer paise, so "balanced" is exact equality by default.
//! A tolerance exists for stations that accept coin rounding.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::CoreResult;
use crate::money::Money;
use crate::types::Shift;
use crate::validation::validate_cash_amount;

/// Result of checking a shift's cash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftCashReconciliation {
    /// `cash_collected - expenses - cash_deposit`.
    pub expected: Money,
    /// `cash_in_hand` as reported.
    pub actual: Money,
    pub balanced: bool,
    /// `actual - expected`; negative means cash is short.
    pub difference: Money,
    pub difference_abs: Money,
}

impl ShiftCashReconciliation {
    /// True if the drawer holds less than expected.
    pub fn is_short(&self) -> bool {
        self.difference.is_negative()
    }
}

/// Checks a shift's cash with exact equality.
///
/// ## Example
/// ```rust
/// use chrono::NaiveDate;
/// use fuelbook_core::{reconcile_shift_cash, Money, Shift};
///
/// let mut shift = Shift::open("Ravi", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
/// shift.cash_collected = Money::from_rupees(10_000);
/// shift.expenses = Money::from_rupees(2_000);
/// shift.cash_deposit = Money::from_rupees(3_000);
/// shift.cash_in_hand = Money::from_rupees(5_000);
///
/// let rec = reconcile_shift_cash(&shift);
/// assert!(rec.balanced);
/// assert_eq!(rec.expected, Money::from_rupees(5_000));
/// ```
pub fn reconcile_shift_cash(shift: &Shift) -> ShiftCashReconciliation {
    reconcile_shift_cash_with(shift, Money::zero())
}

/// Checks a shift's cash, accepting differences up to `tolerance`.
pub fn reconcile_shift_cash_with(shift: &Shift, tolerance: Money) -> ShiftCashReconciliation {
    // Saturating: unvalidated figures must not panic, and validated ones
    // are bounded far below the clamp.
    let expected = shift
        .cash_collected
        .saturating_sub(shift.expenses)
        .saturating_sub(shift.cash_deposit);
    let actual = shift.cash_in_hand;
    let difference = actual.saturating_sub(expected);
    let difference_abs = difference.saturating_abs();

    ShiftCashReconciliation {
        expected,
        actual,
        balanced: difference_abs <= tolerance.saturating_abs(),
        difference,
        difference_abs,
    }
}

/// Validates the cash figures entered when closing a shift.
pub fn validate_shift_cash(shift: &Shift) -> CoreResult<()> {
    validate_cash_amount("cash_collected", shift.cash_collected)?;
    validate_cash_amount("expenses", shift.expenses)?;
    validate_cash_amount("cash_deposit", shift.cash_deposit)?;
    validate_cash_amount("cash_in_hand", shift.cash_in_hand)?;
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::MAX_CASH_AMOUNT;
    use chrono::NaiveDate;

    fn shift(collected: i64, expenses: i64, deposit: i64, in_hand: i64) -> Shift {
        let mut shift = Shift::open("Ravi", NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        shift.cash_collected = Money::from_rupees(collected);
        shift.expenses = Money::from_rupees(expenses);
        shift.cash_deposit = Money::from_rupees(deposit);
        shift.cash_in_hand = Money::from_rupees(in_hand);
        shift
    }

    #[test]
    fn test_balanced_shift() {
        let rec = reconcile_shift_cash(&shift(10_000, 2_000, 3_000, 5_000));
        assert_eq!(rec.expected, Money::from_rupees(5_000));
        assert_eq!(rec.actual, Money::from_rupees(5_000));
        assert!(rec.balanced);
        assert!(rec.difference_abs.is_zero());
    }

    #[test]
    fn test_short_shift() {
        let rec = reconcile_shift_cash(&shift(10_000, 2_000, 3_000, 4_800));
        assert!(!rec.balanced);
        assert_eq!(rec.difference_abs, Money::from_rupees(200));
        assert_eq!(rec.difference, Money::from_rupees(-200));
        assert!(rec.is_short());
    }

    #[test]
    fn test_one_paisa_off_is_not_balanced() {
        let mut s = shift(10_000, 2_000, 3_000, 5_000);
        s.cash_in_hand = Money::from_paise(500_001);
        assert!(!reconcile_shift_cash(&s).balanced);
        assert!(reconcile_shift_cash_with(&s, Money::from_paise(1)).balanced);
    }

    #[test]
    fn test_validate_shift_cash() {
        assert!(validate_shift_cash(&shift(10_000, 2_000, 3_000, 5_000)).is_ok());
        let mut s = shift(10_000, 2_000, 3_000, 5_000);
        s.expenses = Money::from_rupees(-1);
        assert!(validate_shift_cash(&s).unwrap_err().is_validation());

        let mut s = shift(10_000, 2_000, 3_000, 5_000);
        s.cash_deposit = MAX_CASH_AMOUNT + Money::from_paise(1);
        assert!(validate_shift_cash(&s).unwrap_err().is_validation());
    }

    #[test]
    fn test_extreme_figures_do_not_overflow() {
        let mut s = shift(0, 0, 0, 0);
        s.expenses = Money::from_paise(i64::MAX);
        s.cash_deposit = Money::from_paise(i64::MAX);
        s.cash_in_hand = Money::from_paise(i64::MAX);

        let rec = reconcile_shift_cash(&s);
        assert_eq!(rec.expected, Money::from_paise(i64::MIN));
        assert_eq!(rec.difference, Money::from_paise(i64::MAX));
        assert!(!rec.balanced);
        assert!(validate_shift_cash(&s).is_err());
    }

    #[test]
    fn test_largest_valid_shift_is_exact() {
        let mut s = shift(0, 0, 0, 0);
        s.cash_collected = MAX_CASH_AMOUNT;
        s.cash_in_hand = MAX_CASH_AMOUNT;
        assert!(validate_shift_cash(&s).is_ok());
        assert!(reconcile_shift_cash(&s).balanced);
    }
}
