//! # Seed Data Generator
//!
//! Populates a database with the station's reference tanks and a week of
//! ledger entries for development.
//!
//! ## Usage
//! ```bash
//! # Seed ./fuelbook_dev.db with 7 days of entries (default)
//! cargo run -p fuelbook-db --bin seed
//!
//! # Custom number of days
//! cargo run -p fuelbook-db --bin seed -- --days 30
//!
//! # Specify database path
//! cargo run -p fuelbook-db --bin seed -- --db ./data/fuelbook.db
//! ```
//!
//! ## Generated Data
//! - HSD Tank 1: 2.0 m × 6.718 m cylinder, 20 000 L, constant 671.8
//! - MS Tank 1:  2.0 m × 4.968 m cylinder, 15 000 L, constant 496.8
//! - Per day: one tanker delivery every third day, daily dispenser sales,
//!   a small evaporation adjustment
//! - One closed shift per day

use chrono::{Duration, Local, NaiveDate};
use std::env;

use fuelbook_core::{
    FuelProduct, Money, TankConfig, TankDimensions, TankShape, TransactionType,
};
use fuelbook_db::{Database, DbConfig, NewStockTransaction, ShiftCash};

/// (name, product, capacity, length_m, daily sale liters, rate paise/L)
const TANKS: &[(&str, FuelProduct, f64, f64, f64, i64)] = &[
    ("HSD Tank 1", FuelProduct::Diesel, 20_000.0, 6.718, 2_350.0, 8_762),
    ("MS Tank 1", FuelProduct::Petrol, 15_000.0, 4.968, 1_820.0, 9_472),
];

const OPERATORS: &[&str] = &["Ravi", "Suresh", "Anil"];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut days: i64 = 7;
    let mut db_path = String::from("./fuelbook_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--days" | "-n" => {
                if i + 1 < args.len() {
                    days = args[i + 1].parse().unwrap_or(7);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Fuelbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --days <N>     Days of ledger history (default: 7)");
                println!("  -d, --db <PATH>    Database file path (default: ./fuelbook_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Fuelbook Seed Data Generator");
    println!("===============================");
    println!("Database: {}", db_path);
    println!("Days:     {}", days);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.tanks().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} tanks", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start_date = Local::now().date_naive() - Duration::days(days.max(1) - 1);

    for &(name, product, capacity, length_m, daily_sale, rate_paise) in TANKS {
        let constant = product.reference_constant().unwrap_or(100.0 * length_m);
        let tank = TankConfig::new(
            name,
            product,
            capacity,
            TankShape::HorizontalCylinder,
            TankDimensions::cylinder(2.0, length_m),
        )
        .with_formula_constant(constant);
        db.tanks().insert(&tank).await?;
        println!("✓ Tank {} ({}, {:.0} L, k={})", name, product.code(), capacity, constant);

        let rate = Money::from_paise(rate_paise);
        let entries = seed_ledger(&db, &tank, start_date, days, daily_sale, rate).await?;
        println!("  {} ledger entries", entries);
    }

    for offset in 0..days.max(1) {
        let date = start_date + Duration::days(offset);
        let operator = OPERATORS[offset as usize % OPERATORS.len()];
        let shift = db.shifts().open(operator, date).await?;

        let collected = Money::from_rupees(380_000 + offset * 1_250);
        let expenses = Money::from_rupees(1_500);
        let deposit = Money::from_rupees(300_000);
        // Every fourth shift comes up ₹200 short
        let shortfall = if offset % 4 == 3 {
            Money::from_rupees(200)
        } else {
            Money::zero()
        };

        let cash = ShiftCash {
            cash_collected: collected,
            expenses,
            cash_deposit: deposit,
            cash_in_hand: collected - expenses - deposit - shortfall,
        };
        db.shifts().close(&shift.id, &cash, None).await?;
    }
    println!("✓ {} closed shifts", days.max(1));

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Writes `days` of deliveries, sales and adjustments for one tank.
async fn seed_ledger(
    db: &Database,
    tank: &TankConfig,
    start_date: NaiveDate,
    days: i64,
    daily_sale: f64,
    rate: Money,
) -> Result<usize, Box<dyn std::error::Error>> {
    let ledger = db.ledger();
    let mut entries = 0;

    for offset in 0..days.max(1) {
        let date = start_date + Duration::days(offset);

        if offset % 3 == 0 {
            let stock = ledger.current_stock(&tank.id).await?;
            let delivery = (tank.capacity_liters * 0.85 - stock).max(0.0).floor();
            if delivery > 0.0 {
                ledger
                    .record(
                        &NewStockTransaction::new(&tank.id, TransactionType::Delivery, delivery, date)
                            .with_rate(rate)
                            .with_notes("Tanker decanted"),
                    )
                    .await?;
                entries += 1;
            }
        }

        let stock = ledger.current_stock(&tank.id).await?;
        let sale = daily_sale.min(stock);
        if sale > 0.0 {
            ledger
                .record(
                    &NewStockTransaction::new(&tank.id, TransactionType::Sale, sale, date)
                        .with_rate(rate),
                )
                .await?;
            entries += 1;
        }

        if ledger.current_stock(&tank.id).await? >= 8.0 {
            ledger
                .record(
                    &NewStockTransaction::new(&tank.id, TransactionType::Adjustment, -8.0, date)
                        .with_notes("Evaporation"),
                )
                .await?;
            entries += 1;
        }
    }

    Ok(entries)
}
