//! # fuelbook-db: Database Layer for Fuelbook
//!
//! SQLite storage and the audit service for the Fuelbook station books.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fuelbook Data Flow                               │
//! │                                                                         │
//! │  CLI command (fuelbook dip / audit / shift close)                      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   fuelbook-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────────┐   ┌───────────────┐   ┌──────────────────┐  │   │
//! │  │   │ StockAuditor │──►│ Repositories  │──►│    Database      │  │   │
//! │  │   │  (audit.rs)  │   │ tank, stock,  │   │    (pool.rs)     │  │   │
//! │  │   │              │   │ shift, dip,   │   │ SqlitePool +     │  │   │
//! │  │   │ uses core    │   │ discrepancy   │   │ migrations       │  │   │
//! │  │   └──────────────┘   └───────────────┘   └──────────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite file (platform data dir)/fuelbook.db                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations
//! - [`audit`] - Dip, stock and shift audit service
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fuelbook_db::{Database, DbConfig, StockAuditor};
//!
//! let db = Database::new(DbConfig::new("fuelbook.db")).await?;
//! let auditor = StockAuditor::new(db.clone());
//!
//! let result = auditor.calculate_dip(&tank_id, 138.6).await?;
//! println!("{} L ({}%)", result.volume_liters, result.remaining_percentage);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod audit;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use audit::{AuditFailure, DailyAuditReport, StockAuditor, TankAuditOutcome};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::dip::{DipLogEntry, DipReadingRepository};
pub use repository::discrepancy::{DiscrepancyRecord, DiscrepancyRepository};
pub use repository::shift::{ShiftCash, ShiftRepository};
pub use repository::stock::{NewStockTransaction, StockLedgerRepository};
pub use repository::tank::TankRepository;
