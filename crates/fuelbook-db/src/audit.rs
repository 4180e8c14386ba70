//! # Stock Auditor
//!
//! Ties the pure calculators in `fuelbook-core` to stored tanks, ledgers and
//! shifts.
//!
//! ## Daily Audit
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  run_daily_audit(date, readings)                                        │
//! │                                                                         │
//! │  for each reading (sequential, tanks are independent):                 │
//! │       │                                                                 │
//! │       ├── tanks().get_by_id + active check                             │
//! │       ├── calculate_volume(tank, dip)         → actual closing         │
//! │       ├── dip_readings().insert(...)          → dip log                │
//! │       ├── ledger().opening_stock(date)                                 │
//! │       ├── ledger().list_for_tank(date, date)                           │
//! │       ├── verify_ledger_chain + reconcile_tank                         │
//! │       └── discrepancies().upsert / clear                               │
//! │                                                                         │
//! │  Active tanks without a reading are listed, not guessed.               │
//! │  One tank failing does not stop the others.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::error::{DbError, DbResult};
use crate::pool::Database;
use crate::repository::dip::DipLogEntry;
use crate::repository::shift::ShiftCash;
use fuelbook_core::shift::reconcile_shift_cash_with;
use fuelbook_core::stock::{reconcile_tank, verify_ledger_chain};
use fuelbook_core::volume::{calculate_for_reading, calculate_volume_with, resolve_tank};
use fuelbook_core::{
    CalculationResult, CoreError, DipReading, DiscrepancyPolicy, Money, Shift,
    ShiftCashReconciliation, TankConfig, TankReconciliation, VolumeLimits,
};

/// Outcome of auditing one tank within a daily run.
#[derive(Debug, Clone, Serialize)]
pub struct TankAuditOutcome {
    pub tank_id: String,
    pub tank_name: String,
    pub calculation: CalculationResult,
    pub reconciliation: TankReconciliation,
}

/// A tank the daily run could not audit.
#[derive(Debug, Clone, Serialize)]
pub struct AuditFailure {
    pub tank_id: String,
    pub error: String,
}

/// Everything a daily audit produced.
#[derive(Debug, Clone, Serialize)]
pub struct DailyAuditReport {
    pub date: NaiveDate,
    pub audited: Vec<TankAuditOutcome>,
    pub failures: Vec<AuditFailure>,
    /// Active tanks that had no reading.
    pub missing_readings: Vec<String>,
}

impl DailyAuditReport {
    pub fn discrepancy_count(&self) -> usize {
        self.audited
            .iter()
            .filter(|o| o.reconciliation.discrepancy.is_some())
            .count()
    }

    /// True if every active tank was audited and none is off.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.missing_readings.is_empty() && self.discrepancy_count() == 0
    }
}

/// Stock and cash audit service over a [`Database`].
///
/// ## Usage
/// ```rust,ignore
/// let auditor = StockAuditor::new(db.clone()).with_policy(policy);
/// let result = auditor.calculate_dip(&tank_id, 138.6).await?;
/// let report = auditor.run_daily_audit(today, &readings).await?;
/// ```
#[derive(Debug, Clone)]
pub struct StockAuditor {
    db: Database,
    policy: DiscrepancyPolicy,
    limits: VolumeLimits,
    cash_tolerance: Money,
}

impl StockAuditor {
    /// Creates an auditor with default thresholds and exact cash matching.
    pub fn new(db: Database) -> Self {
        StockAuditor {
            db,
            policy: DiscrepancyPolicy::default(),
            limits: VolumeLimits::default(),
            cash_tolerance: Money::zero(),
        }
    }

    pub fn with_policy(mut self, policy: DiscrepancyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_limits(mut self, limits: VolumeLimits) -> Self {
        self.limits = limits;
        self
    }

    pub fn with_cash_tolerance(mut self, tolerance: Money) -> Self {
        self.cash_tolerance = tolerance;
        self
    }

    pub fn policy(&self) -> &DiscrepancyPolicy {
        &self.policy
    }

    // =========================================================================
    // Dip Readings
    // =========================================================================

    /// Converts a dip for a stored, active tank. Nothing is written.
    pub async fn calculate_dip(&self, tank_id: &str, dip_cm: f64) -> DbResult<CalculationResult> {
        let tank = self.active_tank(tank_id).await?;
        Ok(calculate_volume_with(&tank, dip_cm, &self.limits)?)
    }

    /// Converts a dip and writes it to the dip log.
    pub async fn record_dip(&self, reading: &DipReading) -> DbResult<(CalculationResult, DipLogEntry)> {
        let result = self.convert_reading(reading).await?;
        let entry = self.log_dip(&result, reading).await?;
        Ok((result, entry))
    }

    async fn convert_reading(&self, reading: &DipReading) -> DbResult<CalculationResult> {
        let tank = self.active_tank(&reading.tank_id).await?;
        Ok(calculate_for_reading(std::slice::from_ref(&tank), reading, &self.limits)?)
    }

    async fn log_dip(&self, result: &CalculationResult, reading: &DipReading) -> DbResult<DipLogEntry> {
        let entry = self.db.dip_readings().insert(result, reading.taken_at).await?;

        info!(
            tank = %result.tank_name,
            dip_cm = result.dip_cm,
            volume = result.volume_liters,
            percent = result.remaining_percentage,
            "Dip recorded"
        );
        Ok(entry)
    }

    // =========================================================================
    // Stock Audits
    // =========================================================================

    /// Compares the ledger for `from..=to` against a measured closing stock
    /// and stores the finding under `to`.
    ///
    /// A clean result clears any finding stored earlier for that date.
    #[instrument(skip(self))]
    pub async fn audit_tank(
        &self,
        tank_id: &str,
        from: NaiveDate,
        to: NaiveDate,
        actual_closing: f64,
    ) -> DbResult<TankReconciliation> {
        if to < from {
            return Err(DbError::InvalidState(format!(
                "audit window ends ({to}) before it starts ({from})"
            )));
        }

        let tank = self.active_tank(tank_id).await?;
        let ledger = self.db.ledger();

        let opening = ledger.opening_stock(tank_id, from).await?;
        let transactions = ledger.list_for_tank(tank_id, from, to).await?;
        verify_ledger_chain(opening, &transactions)?;

        let reconciliation = reconcile_tank(
            tank_id,
            opening,
            &transactions,
            actual_closing,
            tank.capacity_liters,
            &self.policy,
        )?;

        match &reconciliation.discrepancy {
            Some(discrepancy) => {
                self.db.discrepancies().upsert(tank_id, to, discrepancy).await?;
            }
            None => {
                self.db.discrepancies().clear(tank_id, to).await?;
                info!(
                    tank = %tank.name,
                    expected = reconciliation.summary.expected_closing,
                    actual = actual_closing,
                    "Stock matches ledger"
                );
            }
        }

        Ok(reconciliation)
    }

    /// Audits every tank with a reading for `date` and reports the rest.
    pub async fn run_daily_audit(
        &self,
        date: NaiveDate,
        readings: &[DipReading],
    ) -> DbResult<DailyAuditReport> {
        info!(%date, readings = readings.len(), "Starting daily audit");

        let mut report = DailyAuditReport {
            date,
            audited: Vec::new(),
            failures: Vec::new(),
            missing_readings: Vec::new(),
        };

        for reading in readings {
            match self.audit_reading(date, reading).await {
                Ok(outcome) => report.audited.push(outcome),
                Err(e) => {
                    warn!(tank_id = %reading.tank_id, error = %e, "Tank audit failed");
                    report.failures.push(AuditFailure {
                        tank_id: reading.tank_id.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        for tank in self.db.tanks().list_active().await? {
            if !readings.iter().any(|r| r.tank_id == tank.id) {
                report.missing_readings.push(tank.id);
            }
        }

        info!(
            %date,
            audited = report.audited.len(),
            discrepancies = report.discrepancy_count(),
            failures = report.failures.len(),
            missing = report.missing_readings.len(),
            "Daily audit finished"
        );
        Ok(report)
    }

    async fn audit_reading(&self, date: NaiveDate, reading: &DipReading) -> DbResult<TankAuditOutcome> {
        // Logged only once the audit succeeds, so a failed tank leaves no dip behind.
        let calculation = self.convert_reading(reading).await?;
        let reconciliation = self
            .audit_tank(&reading.tank_id, date, date, calculation.volume_liters)
            .await?;
        self.log_dip(&calculation, reading).await?;

        Ok(TankAuditOutcome {
            tank_id: reading.tank_id.clone(),
            tank_name: calculation.tank_name.clone(),
            calculation,
            reconciliation,
        })
    }

    // =========================================================================
    // Shifts
    // =========================================================================

    /// Checks a stored shift's cash.
    pub async fn reconcile_shift(&self, shift_id: &str) -> DbResult<ShiftCashReconciliation> {
        let shift = self.shift(shift_id).await?;
        Ok(reconcile_shift_cash_with(&shift, self.cash_tolerance))
    }

    /// Closes a shift with its final cash figures and reconciles it.
    pub async fn close_shift(
        &self,
        shift_id: &str,
        cash: &ShiftCash,
        notes: Option<&str>,
    ) -> DbResult<(Shift, ShiftCashReconciliation)> {
        self.shift(shift_id).await?;
        let shift = self.db.shifts().close(shift_id, cash, notes).await?;
        let reconciliation = reconcile_shift_cash_with(&shift, self.cash_tolerance);

        if reconciliation.balanced {
            info!(shift_id, expected = %reconciliation.expected, "Shift cash balanced");
        } else {
            warn!(
                shift_id,
                expected = %reconciliation.expected,
                actual = %reconciliation.actual,
                difference = %reconciliation.difference,
                "Shift cash does not balance"
            );
        }
        Ok((shift, reconciliation))
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    async fn active_tank(&self, tank_id: &str) -> DbResult<TankConfig> {
        let tank = self
            .db
            .tanks()
            .get_by_id(tank_id)
            .await?
            .ok_or_else(|| CoreError::TankNotFound(tank_id.to_string()))?;
        resolve_tank(std::slice::from_ref(&tank), tank_id)?;
        Ok(tank)
    }

    async fn shift(&self, shift_id: &str) -> DbResult<Shift> {
        Ok(self
            .db
            .shifts()
            .get_by_id(shift_id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotFound(shift_id.to_string()))?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::stock::NewStockTransaction;
    use crate::DbConfig;
    use chrono::{TimeZone, Utc};
    use fuelbook_core::{
        FuelProduct, Severity, TankDimensions, TankShape, TransactionType,
    };

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn reading(tank_id: &str, dip_cm: f64, d: u32) -> DipReading {
        DipReading {
            tank_id: tank_id.to_string(),
            dip_cm,
            taken_at: Utc.with_ymd_and_hms(2024, 3, d, 22, 0, 0).unwrap(),
        }
    }

    async fn setup() -> (Database, TankConfig, TankConfig) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let hsd = TankConfig::new(
            "HSD Tank 1",
            FuelProduct::Diesel,
            20_000.0,
            TankShape::HorizontalCylinder,
            TankDimensions::cylinder(2.0, 6.718),
        )
        .with_formula_constant(671.8);
        let ms = TankConfig::new(
            "MS Tank 1",
            FuelProduct::Petrol,
            15_000.0,
            TankShape::HorizontalCylinder,
            TankDimensions::cylinder(2.0, 4.968),
        );
        db.tanks().insert(&hsd).await.unwrap();
        db.tanks().insert(&ms).await.unwrap();
        (db, hsd, ms)
    }

    #[tokio::test]
    async fn test_calculate_dip_reference_value() {
        let (db, hsd, _) = setup().await;
        let auditor = StockAuditor::new(db);

        let result = auditor.calculate_dip(&hsd.id, 138.6).await.unwrap();
        assert!((result.volume_liters - 15_607.0).abs() <= 1.0);

        let err = auditor.calculate_dip("missing", 100.0).await.unwrap_err();
        assert!(err.is_not_found());

        let err = auditor.calculate_dip(&hsd.id, 1386.0).await.unwrap_err();
        assert!(err.is_domain());
    }

    #[tokio::test]
    async fn test_retired_tank_is_not_found() {
        let (db, hsd, _) = setup().await;
        db.tanks().deactivate(&hsd.id).await.unwrap();

        let err = StockAuditor::new(db)
            .calculate_dip(&hsd.id, 100.0)
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::TankNotFound(_))));
    }

    #[tokio::test]
    async fn test_audit_tank_flags_and_clears() {
        let (db, _, ms) = setup().await;
        let ledger = db.ledger();
        ledger
            .record(&NewStockTransaction::new(&ms.id, TransactionType::Delivery, 9_000.0, day(1)))
            .await
            .unwrap();
        ledger
            .record(&NewStockTransaction::new(&ms.id, TransactionType::Sale, 1_000.0, day(2)))
            .await
            .unwrap();

        let auditor = StockAuditor::new(db.clone());

        // Opening on day 2 is 9 000; expected closing 8 000
        let rec = auditor.audit_tank(&ms.id, day(2), day(2), 7_850.0).await.unwrap();
        assert_eq!(rec.summary.opening_stock, 9_000.0);
        assert_eq!(rec.summary.expected_closing, 8_000.0);
        let d = rec.discrepancy.unwrap();
        assert_eq!(d.severity, Severity::High);
        assert_eq!(db.discrepancies().list(day(2), day(2), false).await.unwrap().len(), 1);

        // Recount within tolerance clears the stored finding
        let rec = auditor.audit_tank(&ms.id, day(2), day(2), 8_003.0).await.unwrap();
        assert!(rec.discrepancy.is_none());
        assert!(db.discrepancies().list(day(2), day(2), false).await.unwrap().is_empty());

        assert!(auditor.audit_tank(&ms.id, day(3), day(2), 1.0).await.is_err());
    }

    #[tokio::test]
    async fn test_run_daily_audit() {
        let (db, hsd, ms) = setup().await;
        db.ledger()
            .record(&NewStockTransaction::new(&hsd.id, TransactionType::Delivery, 15_607.0, day(1)))
            .await
            .unwrap();

        let auditor = StockAuditor::new(db.clone());
        let report = auditor
            .run_daily_audit(day(1), &[reading(&hsd.id, 138.6, 1), reading("ghost", 50.0, 1)])
            .await
            .unwrap();

        assert_eq!(report.audited.len(), 1);
        assert!(report.audited[0].reconciliation.discrepancy.is_none());
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].tank_id, "ghost");
        assert_eq!(report.missing_readings, vec![ms.id.clone()]);
        assert!(!report.is_clean());

        // The dip was logged as part of the audit
        assert_eq!(db.dip_readings().list_for_tank(&hsd.id, 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failed_audit_leaves_no_dip_logged() {
        let (db, hsd, _) = setup().await;
        db.ledger()
            .record(&NewStockTransaction::new(&hsd.id, TransactionType::Delivery, 15_607.0, day(1)))
            .await
            .unwrap();
        // Break the ledger chain so the audit itself fails after the dip converts.
        sqlx::query("UPDATE stock_transactions SET new_stock = 15000 WHERE tank_id = ?1")
            .bind(&hsd.id)
            .execute(db.pool())
            .await
            .unwrap();

        let report = StockAuditor::new(db.clone())
            .run_daily_audit(day(1), &[reading(&hsd.id, 138.6, 1)])
            .await
            .unwrap();

        assert!(report.audited.is_empty());
        assert_eq!(report.failures.len(), 1);
        assert!(db.dip_readings().list_for_tank(&hsd.id, 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_shift_reconciliation() {
        let (db, _, _) = setup().await;
        let shift = db.shifts().open("Ravi", day(1)).await.unwrap();
        let auditor = StockAuditor::new(db.clone());

        let cash = ShiftCash {
            cash_collected: Money::from_rupees(10_000),
            expenses: Money::from_rupees(2_000),
            cash_deposit: Money::from_rupees(3_000),
            cash_in_hand: Money::from_rupees(4_800),
        };
        let (closed, rec) = auditor.close_shift(&shift.id, &cash, None).await.unwrap();
        assert!(closed.closed_at.is_some());
        assert!(!rec.balanced);
        assert_eq!(rec.difference_abs, Money::from_rupees(200));

        let again = auditor.reconcile_shift(&shift.id).await.unwrap();
        assert_eq!(again, rec);

        let lenient = StockAuditor::new(db).with_cash_tolerance(Money::from_rupees(500));
        assert!(lenient.reconcile_shift(&shift.id).await.unwrap().balanced);

        let err = auditor.reconcile_shift("missing").await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::ShiftNotFound(_))));
    }
}
