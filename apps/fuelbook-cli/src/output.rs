//! Output formatting module
//!
//! Every command result is either printed as pretty JSON or handed to one
//! of the table printers below.

use serde::Serialize;

use crate::cli::OutputFormat;
use fuelbook_core::{
    CalculationResult, Discrepancy, Shift, ShiftCashReconciliation, StockTransaction, TankConfig,
    TankReconciliation,
};
use fuelbook_db::{DailyAuditReport, DipLogEntry, DiscrepancyRecord};

/// Prints `value` as JSON, or through `table` for the table format.
pub fn render<T: Serialize + ?Sized>(
    format: OutputFormat,
    value: &T,
    table: impl FnOnce(&T),
) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(value)?),
        OutputFormat::Table => table(value),
    }
    Ok(())
}

// =============================================================================
// Tanks
// =============================================================================

/// A tank with its current book stock.
#[derive(Debug, Serialize)]
pub struct TankStock {
    #[serde(flatten)]
    pub tank: TankConfig,
    pub book_stock_liters: f64,
}

#[derive(Debug, Serialize)]
pub struct TankDetail {
    #[serde(flatten)]
    pub stock: TankStock,
    pub recent_dips: Vec<DipLogEntry>,
}

pub fn print_tank_list(tanks: &[TankStock]) {
    if tanks.is_empty() {
        println!("No tanks registered. Add one with `fuelbook tank add`.");
        return;
    }

    println!(
        "{:<20} {:<5} {:<20} {:>10} {:>10} {:<6} {}",
        "NAME", "PROD", "SHAPE", "CAPACITY", "BOOK", "CHART", "ID"
    );
    for row in tanks {
        let tank = &row.tank;
        let name = if tank.is_active {
            tank.name.clone()
        } else {
            format!("{} (retired)", tank.name)
        };
        println!(
            "{:<20} {:<5} {:<20} {:>10.0} {:>10.0} {:<6} {}",
            name,
            tank.product.code(),
            tank.shape.to_string(),
            tank.capacity_liters,
            row.book_stock_liters,
            if tank.has_calibration_table() { "yes" } else { "-" },
            tank.id
        );
    }
}

pub fn print_tank_detail(detail: &TankDetail) {
    let tank = &detail.stock.tank;
    let dims = &tank.dimensions;

    println!("\n{} ({})", tank.name, tank.product.code());
    println!("{}", "=".repeat(tank.name.len() + tank.product.code().len() + 3));
    println!("ID:          {}", tank.id);
    println!("Status:      {}", if tank.is_active { "active" } else { "retired" });
    println!("Shape:       {}", tank.shape);
    println!("Capacity:    {:.0} L", tank.capacity_liters);
    if let Some(d) = dims.diameter_m {
        println!("Diameter:    {:.3} m", d);
    }
    if let Some(l) = dims.length_m {
        println!("Length:      {:.3} m", l);
    }
    if let Some(w) = dims.width_m {
        println!("Width:       {:.3} m", w);
    }
    if let Some(h) = dims.height_m {
        println!("Height:      {:.3} m", h);
    }
    match tank.formula_constant {
        Some(k) => println!("Constant:    {:.1} (pinned)", k),
        None => println!("Constant:    derived"),
    }
    println!("Book stock:  {:.0} L", detail.stock.book_stock_liters);

    if tank.has_calibration_table() {
        println!("\n--- Dip Chart ({} points) ---", tank.calibration_table.len());
        for point in &tank.calibration_table {
            println!("{:>8.0} mm  {:>10.0} L", point.dip_mm, point.volume_liters);
        }
    }

    if !detail.recent_dips.is_empty() {
        println!("\n--- Recent Dips ---");
        for dip in &detail.recent_dips {
            println!(
                "{}  {:>6.1} cm  {:>8.0} L  {:>3}%  {}",
                dip.taken_at.format("%Y-%m-%d %H:%M"),
                dip.dip_cm,
                dip.volume_liters,
                dip.remaining_percentage,
                dip.formula_used
            );
        }
    }
}

// =============================================================================
// Dips
// =============================================================================

#[derive(Debug, Serialize)]
pub struct DipOutput {
    #[serde(flatten)]
    pub result: CalculationResult,
    /// Present when the reading was written to the dip log.
    pub logged: Option<DipLogEntry>,
}

pub fn print_dip(output: &DipOutput) {
    let result = &output.result;
    println!("\nDip Conversion");
    println!("==============");
    println!("Tank:       {} ({})", result.tank_name, result.product.code());
    println!("Dip:        {:.1} cm", result.dip_cm);
    println!("Volume:     {:.0} L", result.volume_liters);
    println!(
        "Remaining:  {}% of {:.0} L",
        result.remaining_percentage, result.capacity_liters
    );
    println!("Method:     {}", result.formula_used);
    if let Some(entry) = &output.logged {
        println!("Logged:     {}", entry.id);
    }
}

// =============================================================================
// Ledger
// =============================================================================

pub fn print_transaction(txn: &StockTransaction) {
    println!(
        "Recorded {} of {:.0} L: {:.0} L → {:.0} L{}",
        txn.transaction_type,
        txn.quantity_liters,
        txn.previous_stock,
        txn.new_stock,
        txn.amount.map(|a| format!(" ({})", a)).unwrap_or_default()
    );
}

pub fn print_ledger(entries: &[StockTransaction]) {
    if entries.is_empty() {
        println!("No ledger entries.");
        return;
    }

    println!(
        "{:<10} {:<10} {:>9} {:>9} {:>9} {:>14}  {}",
        "DATE", "TYPE", "QTY", "BEFORE", "AFTER", "AMOUNT", "NOTES"
    );
    for txn in entries {
        println!(
            "{:<10} {:<10} {:>9.0} {:>9.0} {:>9.0} {:>14}  {}",
            txn.date.to_string(),
            txn.transaction_type.to_string(),
            txn.quantity_liters,
            txn.previous_stock,
            txn.new_stock,
            txn.amount.map(|a| a.to_string()).unwrap_or_else(|| "-".into()),
            txn.notes.as_deref().unwrap_or("")
        );
    }
}

// =============================================================================
// Audits
// =============================================================================

fn print_discrepancy_line(discrepancy: &Discrepancy) {
    println!(
        "  ⚠ {} {} of {:.0} L (expected {:.0} L, measured {:.0} L)",
        discrepancy.severity.to_string().to_uppercase(),
        discrepancy.direction,
        discrepancy.difference.abs(),
        discrepancy.expected_closing,
        discrepancy.actual_closing
    );
}

pub fn print_reconciliation(tank_name: &str, rec: &TankReconciliation) {
    let s = &rec.summary;
    println!("\nStock Audit: {}", tank_name);
    println!("Opening:      {:>10.0} L", s.opening_stock);
    println!("+ Receipts:   {:>10.0} L", s.purchases);
    println!("- Sales:      {:>10.0} L", s.sales);
    println!("± Adjust:     {:>10.0} L", s.adjustments);
    println!("= Expected:   {:>10.0} L", s.expected_closing);
    println!("  Measured:   {:>10.0} L", rec.actual_closing);

    match &rec.discrepancy {
        Some(d) => print_discrepancy_line(d),
        None => println!("  ✓ Within tolerance"),
    }
}

pub fn print_daily_report(report: &DailyAuditReport) {
    println!("\nDaily Audit {}", report.date);
    println!("=====================");

    for outcome in &report.audited {
        println!(
            "{}: dip {:.1} cm → {:.0} L",
            outcome.tank_name, outcome.calculation.dip_cm, outcome.calculation.volume_liters
        );
        match &outcome.reconciliation.discrepancy {
            Some(d) => print_discrepancy_line(d),
            None => println!(
                "  ✓ matches book stock {:.0} L",
                outcome.reconciliation.summary.expected_closing
            ),
        }
    }

    for failure in &report.failures {
        println!("✗ {}: {}", failure.tank_id, failure.error);
    }
    for tank_id in &report.missing_readings {
        println!("? {}: no closing dip", tank_id);
    }

    println!();
    if report.is_clean() {
        println!("All tanks reconcile.");
    } else {
        println!(
            "{} discrepancies, {} failures, {} tanks without a reading",
            report.discrepancy_count(),
            report.failures.len(),
            report.missing_readings.len()
        );
    }
}

pub fn print_findings(records: &[DiscrepancyRecord]) {
    if records.is_empty() {
        println!("No stock discrepancies recorded.");
        return;
    }

    println!(
        "{:<10} {:<36} {:>10} {:>10} {:>9} {:<7} {}",
        "DATE", "TANK", "EXPECTED", "MEASURED", "DIFF", "LEVEL", "DIRECTION"
    );
    for r in records {
        println!(
            "{:<10} {:<36} {:>10.0} {:>10.0} {:>+9.0} {:<7} {}",
            r.audit_date.to_string(),
            r.tank_id,
            r.expected_closing,
            r.actual_closing,
            r.difference,
            r.severity.to_string(),
            r.direction
        );
    }
}

// =============================================================================
// Shifts
// =============================================================================

#[derive(Debug, Serialize)]
pub struct ShiftOutput {
    pub shift: Shift,
    pub reconciliation: ShiftCashReconciliation,
}

pub fn print_shift(shift: &Shift) {
    println!(
        "Shift {} for {} on {} is {}",
        shift.id, shift.operator_name, shift.shift_date, shift.status
    );
}

pub fn print_shifts(shifts: &[Shift]) {
    if shifts.is_empty() {
        println!("No shifts.");
        return;
    }

    println!(
        "{:<10} {:<16} {:<7} {:>14} {:>14}  {}",
        "DATE", "OPERATOR", "STATUS", "COLLECTED", "IN HAND", "ID"
    );
    for shift in shifts {
        println!(
            "{:<10} {:<16} {:<7} {:>14} {:>14}  {}",
            shift.shift_date.to_string(),
            shift.operator_name,
            shift.status.to_string(),
            shift.cash_collected.to_string(),
            shift.cash_in_hand.to_string(),
            shift.id
        );
    }
}

pub fn print_shift_reconciliation(output: &ShiftOutput) {
    let shift = &output.shift;
    let rec = &output.reconciliation;

    println!("\nShift Cash: {} ({})", shift.operator_name, shift.shift_date);
    println!("Collected:   {:>14}", shift.cash_collected.to_string());
    println!("- Expenses:  {:>14}", shift.expenses.to_string());
    println!("- Deposit:   {:>14}", shift.cash_deposit.to_string());
    println!("= Expected:  {:>14}", rec.expected.to_string());
    println!("  In hand:   {:>14}", rec.actual.to_string());

    if rec.balanced {
        println!("  ✓ Balanced");
    } else if rec.is_short() {
        println!("  ⚠ Short by {}", rec.difference_abs);
    } else {
        println!("  ⚠ Over by {}", rec.difference_abs);
    }
}
