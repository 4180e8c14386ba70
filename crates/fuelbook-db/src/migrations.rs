//! # Schema Migrations
//!
//! SQL files under `migrations/sqlite/` are compiled into the binary, so a
//! station install needs nothing beside the executable.
//!
//! ```text
//!   001_initial_schema.sql   tanks, charts, ledger, shifts, dip log, findings
//!   002_...                  add new files; applied ones are never edited
//! ```
//!
//! sqlx records applied versions (with checksums) in `_sqlx_migrations`;
//! an edited migration fails the checksum on the next open.

use sqlx::SqlitePool;
use tracing::info;

use crate::error::DbResult;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("../../migrations/sqlite");

/// Applies every migration not yet recorded. Each runs in its own transaction.
pub async fn run_migrations(pool: &SqlitePool) -> DbResult<()> {
    MIGRATOR.run(pool).await?;
    info!(known = MIGRATOR.migrations.len(), "Schema up to date");
    Ok(())
}

/// `(known, applied)` migration counts.
pub async fn migration_status(pool: &SqlitePool) -> DbResult<(usize, usize)> {
    let has_table: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = '_sqlx_migrations')",
    )
    .fetch_one(pool)
    .await?;

    let applied: i64 = if has_table {
        sqlx::query_scalar("SELECT COUNT(*) FROM _sqlx_migrations WHERE success = 1")
            .fetch_one(pool)
            .await?
    } else {
        0
    };

    Ok((MIGRATOR.migrations.len(), applied as usize))
}
