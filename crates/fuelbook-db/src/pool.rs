//! # Database Pool Management
//!
//! Opens the station's SQLite file and hands out repositories.
//!
//! ## Open Sequence
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Opening the Station Books                          │
//! │                                                                         │
//! │  DbConfig::new("fuelbook.db")          DbConfig::in_memory()           │
//! │       │                                     │                           │
//! │       ▼                                     ▼                           │
//! │  file options                          sqlite::memory:                 │
//! │  (create, WAL, NORMAL sync,            (single connection,             │
//! │   busy timeout)                         lives as long as the pool)     │
//! │       │                                     │                           │
//! │       └──────────────┬──────────────────────┘                           │
//! │                      ▼                                                  │
//! │            foreign_keys = ON                                            │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │            SqlitePool ──► migrations (unless disabled)                  │
//! │                      │                                                  │
//! │                      ▼                                                  │
//! │  db.tanks()  db.ledger()  db.shifts()  db.dip_readings()               │
//! │  db.discrepancies()            (each holds a pool clone)               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The operator CLI and the seed binary may hit the same file at once;
//! WAL keeps readers unblocked and the busy timeout makes a second writer
//! wait instead of failing with `SQLITE_BUSY`.

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::dip::DipReadingRepository;
use crate::repository::discrepancy::DiscrepancyRepository;
use crate::repository::shift::ShiftRepository;
use crate::repository::stock::StockLedgerRepository;
use crate::repository::tank::TankRepository;

const MEMORY_PATH: &str = ":memory:";

// =============================================================================
// Configuration
// =============================================================================

/// Where the books live and how the pool behaves.
///
/// ```rust,ignore
/// let config = DbConfig::new("/srv/pump/fuelbook.db").max_connections(3);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    pub max_connections: u32,
    pub min_connections: u32,

    /// How long to wait for a free pooled connection.
    pub connect_timeout: Duration,

    /// How long a writer waits on another process's lock.
    pub busy_timeout: Duration,

    pub run_migrations: bool,
}

impl DbConfig {
    /// File-backed configuration. The file is created on first open.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            busy_timeout: Duration::from_secs(5),
            run_migrations: true,
        }
    }

    /// Private in-memory database for tests and dry runs.
    ///
    /// Every SQLite connection to `:memory:` is a separate database, so the
    /// pool is pinned to one connection.
    pub fn in_memory() -> Self {
        DbConfig {
            max_connections: 1,
            connect_timeout: Duration::from_secs(5),
            ..DbConfig::new(MEMORY_PATH)
        }
    }

    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = timeout;
        self
    }

    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    pub fn is_in_memory(&self) -> bool {
        self.database_path == Path::new(MEMORY_PATH)
    }

    fn connect_options(&self) -> DbResult<SqliteConnectOptions> {
        let options = if self.is_in_memory() {
            SqliteConnectOptions::from_str("sqlite::memory:")
                .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
        } else {
            SqliteConnectOptions::new()
                .filename(&self.database_path)
                .create_if_missing(true)
                .journal_mode(SqliteJournalMode::Wal)
                .synchronous(SqliteSynchronous::Normal)
                .busy_timeout(self.busy_timeout)
        };

        // SQLite ships with foreign keys off
        Ok(options.foreign_keys(true))
    }
}

// =============================================================================
// Database
// =============================================================================

/// Handle to the station books. Cloning shares the pool.
#[derive(Debug, Clone)]
pub struct Database {
    pool: SqlitePool,
}

impl Database {
    /// Opens the pool and, unless disabled, brings the schema up to date.
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            in_memory = config.is_in_memory(),
            "Opening station database"
        );

        let options = config.connect_options()?;
        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(config.connect_timeout)
            // An idle in-memory connection must never be reaped: its data goes with it.
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        debug!(max_connections = config.max_connections, "Pool ready");

        let db = Database { pool };
        if config.run_migrations {
            db.run_migrations().await?;
        }
        Ok(db)
    }

    /// Applies pending migrations. Safe to call repeatedly.
    pub async fn run_migrations(&self) -> DbResult<()> {
        migrations::run_migrations(&self.pool).await
    }

    /// Raw pool, for queries no repository covers.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Tank configurations and their dip charts.
    pub fn tanks(&self) -> TankRepository {
        TankRepository::new(self.pool.clone())
    }

    /// The stock ledger.
    pub fn ledger(&self) -> StockLedgerRepository {
        StockLedgerRepository::new(self.pool.clone())
    }

    pub fn shifts(&self) -> ShiftRepository {
        ShiftRepository::new(self.pool.clone())
    }

    /// Logged dip conversions.
    pub fn dip_readings(&self) -> DipReadingRepository {
        DipReadingRepository::new(self.pool.clone())
    }

    /// Stored audit findings.
    pub fn discrepancies(&self) -> DiscrepancyRepository {
        DiscrepancyRepository::new(self.pool.clone())
    }

    /// Waits for in-flight queries and closes every connection.
    pub async fn close(&self) {
        debug!("Closing station database");
        self.pool.close().await;
    }

    /// True if the pool answers and foreign keys are enforced.
    pub async fn health_check(&self) -> bool {
        matches!(
            sqlx::query_scalar::<_, i64>("PRAGMA foreign_keys")
                .fetch_one(&self.pool)
                .await,
            Ok(1)
        )
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_in_memory_database_is_migrated() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        assert!(db.health_check().await);

        let (total, applied) = migrations::migration_status(db.pool()).await.unwrap();
        assert!(total > 0);
        assert_eq!(total, applied);
        assert_eq!(db.tanks().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_file_database_survives_reopen() {
        let dir = std::env::temp_dir().join(format!("fuelbook-pool-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("books.db");

        let db = Database::new(DbConfig::new(&path)).await.unwrap();
        db.shifts()
            .open("Ravi", chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap())
            .await
            .unwrap();
        db.close().await;

        let reopened = Database::new(DbConfig::new(&path)).await.unwrap();
        assert_eq!(reopened.shifts().list_open().await.unwrap().len(), 1);
        reopened.close().await;

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_config_builder() {
        let config = DbConfig::new("/srv/pump/fuelbook.db")
            .max_connections(3)
            .busy_timeout(Duration::from_secs(1))
            .run_migrations(false);

        assert_eq!(config.max_connections, 3);
        assert_eq!(config.busy_timeout, Duration::from_secs(1));
        assert!(!config.run_migrations);
        assert!(!config.is_in_memory());
        assert!(DbConfig::in_memory().is_in_memory());
    }
}
