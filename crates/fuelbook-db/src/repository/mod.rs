//! # Repository Module
//!
//! Database repository implementations for Fuelbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  StockAuditor / CLI command                                            │
//! │       │                                                                 │
//! │       │  db.ledger().list_for_tank(id, from, to)                       │
//! │       ▼                                                                 │
//! │  StockLedgerRepository                                                 │
//! │  ├── record(&self, new)                                                │
//! │  ├── list_for_tank(&self, tank_id, from, to)                           │
//! │  ├── opening_stock(&self, tank_id, date)                               │
//! │  └── current_stock(&self, tank_id)                                     │
//! │       │                                                                 │
//! │       │  SQL (row structs → core types)                                │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Rows are read into `#[derive(FromRow)]` structs and converted into
//! `fuelbook-core` types. Enum columns decode through the core crate's
//! `sqlx` feature; money columns are integer paise.
//!
//! ## Available Repositories
//!
//! - [`TankRepository`](tank::TankRepository) - Tanks and dip charts
//! - [`StockLedgerRepository`](stock::StockLedgerRepository) - Append-only stock ledger
//! - [`ShiftRepository`](shift::ShiftRepository) - Shifts and cash figures
//! - [`DipReadingRepository`](dip::DipReadingRepository) - Dip conversion log
//! - [`DiscrepancyRepository`](discrepancy::DiscrepancyRepository) - Audit findings

pub mod dip;
pub mod discrepancy;
pub mod shift;
pub mod stock;
pub mod tank;
