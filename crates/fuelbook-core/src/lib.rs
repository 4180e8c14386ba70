//! # fuelbook-core: Pure Stock Logic for Fuelbook
//!
//! This crate holds the arithmetic a petrol pump's back office depends on:
//! turning a dip-stick reading into liters, checking the stock ledger against
//! what is physically in the tank, and checking a shift's cash.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fuelbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Operator CLI / Dashboard (out of tree)             │   │
//! │  │      dip entry ──► audit run ──► shift close ──► reports        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │            fuelbook-db (stores + StockAuditor service)          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fuelbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐  ┌──────────┐  ┌──────────┐  ┌──────────┐       │   │
//! │  │   │  volume  │  │  stock   │  │  shift   │  │validation│       │   │
//! │  │   │ dip → L  │  │ ledger + │  │  cash    │  │  rules   │       │   │
//! │  │   │          │  │ variance │  │  check   │  │          │       │   │
//! │  │   └──────────┘  └──────────┘  └──────────┘  └──────────┘       │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (TankConfig, StockTransaction, Shift, ...)
//! - [`money`] - Money type in integer paise
//! - [`error`] - Domain error types
//! - [`validation`] - Input and configuration checks
//! - [`volume`] - Dip-to-volume calculator
//! - [`stock`] - Ledger arithmetic and discrepancy detection
//! - [`shift`] - Shift cash reconciliation
//!
//! ## Example Usage
//!
//! ```rust
//! use fuelbook_core::types::{FuelProduct, TankConfig, TankDimensions, TankShape};
//! use fuelbook_core::volume::calculate_volume;
//!
//! let tank = TankConfig::new(
//!     "HSD Tank 1",
//!     FuelProduct::Diesel,
//!     20_000.0,
//!     TankShape::HorizontalCylinder,
//!     TankDimensions::cylinder(2.0, 6.718),
//! );
//!
//! let result = calculate_volume(&tank, 138.60).unwrap();
//! assert!((result.volume_liters - 15_607.0).abs() <= 1.0);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod shift;
pub mod stock;
pub mod types;
pub mod validation;
pub mod volume;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{ConfigurationError, CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use shift::{reconcile_shift_cash, reconcile_shift_cash_with, ShiftCashReconciliation};
pub use stock::{
    detect_discrepancy, reconcile_tank, Direction, Discrepancy, DiscrepancyPolicy, Severity,
    StockSummary, TankReconciliation,
};
pub use types::*;
pub use volume::{calculate_volume, CalculationResult, FormulaUsed, VolumeLimits};

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Upper bound for a dip reading in centimeters.
///
/// ## Business Reason
/// Station dipsticks are 2 m long. A reading above that is almost always a
/// unit slip (millimeters typed into a centimeter field).
pub const MAX_DIP_CM: f64 = 200.0;

/// Variance (liters) absorbed as dipstick noise before a discrepancy is raised.
pub const DEFAULT_TOLERANCE_LITERS: f64 = 5.0;

/// Absolute variance (liters) above which a discrepancy is `High`.
pub const HIGH_SEVERITY_LITERS: f64 = 100.0;

/// Fraction of tank capacity above which a discrepancy is `High`.
pub const HIGH_SEVERITY_CAPACITY_FRACTION: f64 = 0.01;
