//! # Stock Module
//!
//! Ledger arithmetic and discrepancy detection.
//!
//! ## Daily Audit Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  opening stock ──┐                                                      │
//! │  purchases     ──┼──► summarize_ledger ──► expected closing ─┐          │
//! │  sales         ──┤                                           │          │
//! │  adjustments   ──┘                                           ▼          │
//! │                                                     detect_discrepancy  │
//! │  dip reading ──► volume::calculate_volume ──► actual ────────▲          │
//! │                                                              │          │
//! │                                      None | Discrepancy { severity }    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Runs once per tank per audit cycle. Each tank is independent.

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::{StockTransaction, TransactionType};
use crate::validation::{validate_finite, validate_stock_liters, validate_transaction_quantity};
use crate::{DEFAULT_TOLERANCE_LITERS, HIGH_SEVERITY_CAPACITY_FRACTION, HIGH_SEVERITY_LITERS};

/// Float slack when checking `new = previous + quantity` on stored rows.
const LEDGER_EPSILON: f64 = 1e-6;

// =============================================================================
// Ledger Arithmetic
// =============================================================================

/// Computes the stock level after one ledger entry.
///
/// ## Example
/// ```rust
/// use fuelbook_core::stock::apply_transaction;
/// use fuelbook_core::TransactionType;
///
/// assert_eq!(apply_transaction(8_000.0, TransactionType::Sale, 1_500.0).unwrap(), 6_500.0);
/// assert_eq!(apply_transaction(6_500.0, TransactionType::Adjustment, -20.0).unwrap(), 6_480.0);
/// ```
pub fn apply_transaction(
    previous_stock: f64,
    transaction_type: TransactionType,
    quantity_liters: f64,
) -> CoreResult<f64> {
    validate_stock_liters("previous_stock", previous_stock)?;
    validate_transaction_quantity(transaction_type, quantity_liters)?;

    // Book stock never goes below zero; an oversold tank needs an adjustment first.
    let new_stock = previous_stock + transaction_type.signed(quantity_liters);
    validate_stock_liters("new_stock", new_stock)?;
    Ok(new_stock)
}

/// Checks the `new_stock = previous_stock + signed_quantity` invariant.
pub fn verify_transaction(txn: &StockTransaction) -> CoreResult<()> {
    let expected = txn.previous_stock + txn.signed_quantity();
    if (expected - txn.new_stock).abs() > LEDGER_EPSILON {
        return Err(CoreError::LedgerMismatch {
            transaction_id: txn.id.clone(),
            expected,
            found: txn.new_stock,
        });
    }
    Ok(())
}

/// Checks every entry and that each one starts where the previous ended.
///
/// `transactions` must be in ledger order.
pub fn verify_ledger_chain(opening_stock: f64, transactions: &[StockTransaction]) -> CoreResult<()> {
    let mut running = opening_stock;
    for txn in transactions {
        if (txn.previous_stock - running).abs() > LEDGER_EPSILON {
            return Err(CoreError::LedgerMismatch {
                transaction_id: txn.id.clone(),
                expected: running,
                found: txn.previous_stock,
            });
        }
        verify_transaction(txn)?;
        running = txn.new_stock;
    }
    Ok(())
}

/// Expected closing stock: opening plus every signed quantity.
pub fn expected_closing_stock(opening_stock: f64, transactions: &[StockTransaction]) -> f64 {
    opening_stock
        + transactions
            .iter()
            .map(StockTransaction::signed_quantity)
            .sum::<f64>()
}

/// Ledger totals for one tank over one audit window.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockSummary {
    pub opening_stock: f64,
    /// Purchases and deliveries.
    pub purchases: f64,
    pub sales: f64,
    /// Net of all adjustments (signed).
    pub adjustments: f64,
    pub expected_closing: f64,
}

/// Totals a window of ledger entries.
pub fn summarize_ledger(opening_stock: f64, transactions: &[StockTransaction]) -> StockSummary {
    let mut summary = StockSummary {
        opening_stock,
        ..Default::default()
    };

    for txn in transactions {
        match txn.transaction_type {
            TransactionType::Purchase | TransactionType::Delivery => {
                summary.purchases += txn.quantity_liters.abs()
            }
            TransactionType::Sale => summary.sales += txn.quantity_liters.abs(),
            TransactionType::Adjustment => summary.adjustments += txn.quantity_liters,
        }
    }

    summary.expected_closing =
        opening_stock + summary.purchases - summary.sales + summary.adjustments;
    summary
}

// =============================================================================
// Discrepancy Detection
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Medium,
    High,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Medium => write!(f, "medium"),
            Severity::High => write!(f, "high"),
        }
    }
}

/// Whether the tank holds less or more than the ledger says.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Shortage,
    Excess,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Shortage => write!(f, "shortage"),
            Direction::Excess => write!(f, "excess"),
        }
    }
}

/// Thresholds for flagging and grading a variance.
///
/// ## Classification
/// ```text
///   |diff| <= tolerance_liters                              → no discrepancy
///   |diff| >  high_absolute_liters
///       OR |diff| / capacity > high_capacity_fraction       → High
///   otherwise                                               → Medium
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscrepancyPolicy {
    pub tolerance_liters: f64,
    pub high_absolute_liters: f64,
    pub high_capacity_fraction: f64,
}

impl Default for DiscrepancyPolicy {
    fn default() -> Self {
        DiscrepancyPolicy {
            tolerance_liters: DEFAULT_TOLERANCE_LITERS,
            high_absolute_liters: HIGH_SEVERITY_LITERS,
            high_capacity_fraction: HIGH_SEVERITY_CAPACITY_FRACTION,
        }
    }
}

/// A flagged mismatch between ledger and dip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Discrepancy {
    pub expected_closing: f64,
    pub actual_closing: f64,
    /// `actual - expected`; negative means fuel is missing.
    pub difference: f64,
    pub severity: Severity,
    pub direction: Direction,
    /// Ledger figures behind `expected_closing`, for the audit screen.
    pub summary: Option<StockSummary>,
}

impl Discrepancy {
    pub fn with_summary(mut self, summary: StockSummary) -> Self {
        self.summary = Some(summary);
        self
    }
}

impl DiscrepancyPolicy {
    /// Compares expected and measured closing stock.
    ///
    /// Deterministic: the same triple always gives the same answer.
    pub fn detect(
        &self,
        expected_closing: f64,
        actual_closing: f64,
        capacity_liters: f64,
    ) -> CoreResult<Option<Discrepancy>> {
        validate_finite("expected_closing", expected_closing)?;
        validate_stock_liters("actual_closing", actual_closing)?;
        validate_stock_liters("capacity_liters", capacity_liters)?;

        let difference = actual_closing - expected_closing;
        let magnitude = difference.abs();

        if magnitude <= self.tolerance_liters {
            return Ok(None);
        }

        let over_fraction =
            capacity_liters > 0.0 && magnitude / capacity_liters > self.high_capacity_fraction;
        let severity = if magnitude > self.high_absolute_liters || over_fraction {
            Severity::High
        } else {
            Severity::Medium
        };

        let direction = if difference < 0.0 {
            Direction::Shortage
        } else {
            Direction::Excess
        };

        Ok(Some(Discrepancy {
            expected_closing,
            actual_closing,
            difference,
            severity,
            direction,
            summary: None,
        }))
    }
}

/// [`DiscrepancyPolicy::detect`] with the default thresholds.
pub fn detect_discrepancy(
    expected_closing: f64,
    actual_closing: f64,
    capacity_liters: f64,
) -> CoreResult<Option<Discrepancy>> {
    DiscrepancyPolicy::default().detect(expected_closing, actual_closing, capacity_liters)
}

/// Outcome of reconciling one tank for one window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TankReconciliation {
    pub tank_id: String,
    pub summary: StockSummary,
    pub actual_closing: f64,
    pub discrepancy: Option<Discrepancy>,
}

/// Summarizes the ledger window, then compares it against the measurement.
pub fn reconcile_tank(
    tank_id: &str,
    opening_stock: f64,
    transactions: &[StockTransaction],
    actual_closing: f64,
    capacity_liters: f64,
    policy: &DiscrepancyPolicy,
) -> CoreResult<TankReconciliation> {
    let summary = summarize_ledger(opening_stock, transactions);
    let discrepancy = policy
        .detect(summary.expected_closing, actual_closing, capacity_liters)?
        .map(|d| d.with_summary(summary));

    Ok(TankReconciliation {
        tank_id: tank_id.to_string(),
        summary,
        actual_closing,
        discrepancy,
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, Utc};

    fn txn(kind: TransactionType, qty: f64, previous: f64) -> StockTransaction {
        StockTransaction {
            id: format!("{kind}-{qty}"),
            tank_id: "tank-1".to_string(),
            transaction_type: kind,
            quantity_liters: qty,
            previous_stock: previous,
            new_stock: previous + kind.signed(qty),
            rate: None,
            amount: None,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            notes: None,
            created_at: Utc::now(),
        }
    }

    fn day_ledger() -> Vec<StockTransaction> {
        vec![
            txn(TransactionType::Sale, 1_200.0, 8_000.0),
            txn(TransactionType::Delivery, 4_000.0, 6_800.0),
            txn(TransactionType::Sale, 2_300.0, 10_800.0),
            txn(TransactionType::Adjustment, -15.0, 8_500.0),
        ]
    }

    #[test]
    fn test_apply_transaction() {
        assert_eq!(apply_transaction(100.0, TransactionType::Purchase, 50.0).unwrap(), 150.0);
        assert_eq!(apply_transaction(100.0, TransactionType::Sale, 30.0).unwrap(), 70.0);
        assert!(apply_transaction(100.0, TransactionType::Sale, -30.0).is_err());
        assert!(apply_transaction(-1.0, TransactionType::Purchase, 30.0).is_err());
        assert!(apply_transaction(20.0, TransactionType::Sale, 30.0).is_err());
    }

    #[test]
    fn test_summary_and_expected_closing() {
        let ledger = day_ledger();
        let summary = summarize_ledger(8_000.0, &ledger);

        assert_eq!(summary.purchases, 4_000.0);
        assert_eq!(summary.sales, 3_500.0);
        assert_eq!(summary.adjustments, -15.0);
        assert_eq!(summary.expected_closing, 8_485.0);
        assert_eq!(expected_closing_stock(8_000.0, &ledger), 8_485.0);
    }

    #[test]
    fn test_verify_chain() {
        let ledger = day_ledger();
        assert!(verify_ledger_chain(8_000.0, &ledger).is_ok());

        // Opening doesn't match first previous_stock
        assert!(matches!(
            verify_ledger_chain(7_900.0, &ledger),
            Err(CoreError::LedgerMismatch { .. })
        ));

        let mut tampered = ledger.clone();
        tampered[2].new_stock += 100.0;
        assert!(verify_transaction(&tampered[2]).is_err());
        assert!(verify_ledger_chain(8_000.0, &tampered).is_err());
    }

    #[test]
    fn test_no_discrepancy_when_equal_or_within_tolerance() {
        assert!(detect_discrepancy(8_485.0, 8_485.0, 20_000.0).unwrap().is_none());
        assert!(detect_discrepancy(8_485.0, 8_490.0, 20_000.0).unwrap().is_none());
        assert!(detect_discrepancy(8_485.0, 8_480.0, 20_000.0).unwrap().is_none());
    }

    #[test]
    fn test_severity_classification() {
        // 50 L on a 20 000 L tank: under both thresholds
        let d = detect_discrepancy(8_485.0, 8_435.0, 20_000.0).unwrap().unwrap();
        assert_eq!(d.severity, Severity::Medium);
        assert_eq!(d.direction, Direction::Shortage);
        assert_eq!(d.difference, -50.0);

        // 150 L: over the absolute threshold
        let d = detect_discrepancy(8_485.0, 8_635.0, 20_000.0).unwrap().unwrap();
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.direction, Direction::Excess);

        // 60 L on a 5 000 L tank: 1.2% of capacity
        let d = detect_discrepancy(2_000.0, 1_940.0, 5_000.0).unwrap().unwrap();
        assert_eq!(d.severity, Severity::High);
    }

    #[test]
    fn test_custom_policy() {
        let strict = DiscrepancyPolicy {
            tolerance_liters: 0.0,
            high_absolute_liters: 10.0,
            high_capacity_fraction: 1.0,
        };
        let d = strict.detect(100.0, 101.0, 20_000.0).unwrap().unwrap();
        assert_eq!(d.severity, Severity::Medium);
        let d = strict.detect(100.0, 120.0, 20_000.0).unwrap().unwrap();
        assert_eq!(d.severity, Severity::High);
    }

    #[test]
    fn test_detect_rejects_bad_input() {
        assert!(detect_discrepancy(f64::NAN, 10.0, 100.0).is_err());
        assert!(detect_discrepancy(10.0, -5.0, 100.0).is_err());
    }

    #[test]
    fn test_reconcile_tank_attaches_summary() {
        let ledger = day_ledger();
        let rec = reconcile_tank(
            "tank-1",
            8_000.0,
            &ledger,
            8_300.0,
            20_000.0,
            &DiscrepancyPolicy::default(),
        )
        .unwrap();

        let d = rec.discrepancy.unwrap();
        assert_eq!(d.difference, -185.0);
        assert_eq!(d.severity, Severity::High);
        assert_eq!(d.summary.unwrap().opening_stock, 8_000.0);
        assert_eq!(d.summary.unwrap().sales, 3_500.0);

        let clean = reconcile_tank(
            "tank-1",
            8_000.0,
            &ledger,
            8_485.0,
            20_000.0,
            &DiscrepancyPolicy::default(),
        )
        .unwrap();
        assert!(clean.discrepancy.is_none());
    }
}
