//! # Storage Errors
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   sqlx::Error ───────┐                                                  │
//! │   MigrateError ──────┤                                                  │
//! │   CoreError ─────────┼──►  DbError  ──►  anyhow (CLI prints it)         │
//! │   ValidationError ───┘                                                  │
//! │                                                                         │
//! │   Constraint failures are classified by sqlx's ErrorKind, so the        │
//! │   schema's UNIQUE / FOREIGN KEY / CHECK clauses surface as distinct     │
//! │   variants instead of a raw SQLite message.                             │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use fuelbook_core::{CoreError, ValidationError};
use sqlx::error::ErrorKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DbError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// A second tank with an existing name, for instance.
    #[error("Duplicate {field}: '{value}' already exists")]
    UniqueViolation { field: String, value: String },

    /// Row references a tank or shift that does not exist.
    #[error("Foreign key violation: {0}")]
    ForeignKeyViolation(String),

    /// A schema CHECK rejected the row. Validation normally catches these first.
    #[error("Constraint violation: {0}")]
    CheckViolation(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Closing a closed shift, backdating a ledger entry.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error(transparent)]
    Domain(#[from] CoreError),

    #[error("Connection pool exhausted")]
    PoolExhausted,
}

impl DbError {
    pub fn not_found(entity: impl Into<String>, id: impl Into<String>) -> Self {
        DbError::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn duplicate(field: impl Into<String>, value: impl Into<String>) -> Self {
        DbError::UniqueViolation {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Missing rows and domain lookups that found nothing.
    pub fn is_not_found(&self) -> bool {
        match self {
            DbError::NotFound { .. } => true,
            DbError::Domain(e) => e.is_not_found(),
            _ => false,
        }
    }

    /// A business rule rejected the call.
    pub fn is_domain(&self) -> bool {
        matches!(self, DbError::Domain(_))
    }
}

impl From<sqlx::Error> for DbError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => DbError::not_found("Record", "unknown"),
            sqlx::Error::PoolTimedOut => DbError::PoolExhausted,
            sqlx::Error::PoolClosed => DbError::ConnectionFailed("pool is closed".into()),
            sqlx::Error::Database(db_err) => {
                let message = db_err.message().to_string();
                match db_err.kind() {
                    // "UNIQUE constraint failed: tanks.name"
                    ErrorKind::UniqueViolation => {
                        let field = message
                            .rsplit_once(": ")
                            .map(|(_, column)| column.to_string())
                            .unwrap_or_else(|| message.clone());
                        DbError::duplicate(field, "unknown")
                    }
                    ErrorKind::ForeignKeyViolation => DbError::ForeignKeyViolation(message),
                    ErrorKind::CheckViolation | ErrorKind::NotNullViolation => {
                        DbError::CheckViolation(message)
                    }
                    _ => DbError::QueryFailed(message),
                }
            }
            other => DbError::QueryFailed(other.to_string()),
        }
    }
}

impl From<sqlx::migrate::MigrateError> for DbError {
    fn from(err: sqlx::migrate::MigrateError) -> Self {
        DbError::MigrationFailed(err.to_string())
    }
}

impl From<ValidationError> for DbError {
    fn from(err: ValidationError) -> Self {
        DbError::Domain(err.into())
    }
}

pub type DbResult<T> = Result<T, DbError>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    #[test]
    fn test_not_found_covers_domain_lookups() {
        assert!(DbError::not_found("Tank", "t-1").is_not_found());
        assert!(DbError::from(CoreError::TankNotFound("t-1".into())).is_not_found());
        assert!(!DbError::PoolExhausted.is_not_found());
    }

    #[test]
    fn test_domain_message_passes_through() {
        let err = DbError::from(CoreError::ShiftNotFound("s-9".into()));
        assert!(err.is_domain());
        assert_eq!(err.to_string(), CoreError::ShiftNotFound("s-9".into()).to_string());
    }

    #[tokio::test]
    async fn test_schema_constraints_are_classified() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let orphan = sqlx::query(
            "INSERT INTO tank_calibration_points (tank_id, dip_mm, volume_liters) VALUES ('ghost', 0, 0)",
        )
        .execute(db.pool())
        .await
        .unwrap_err();
        assert!(matches!(DbError::from(orphan), DbError::ForeignKeyViolation(_)));

        let bad_product = sqlx::query(
            "INSERT INTO tanks (id, name, product, capacity_liters, shape, created_at, updated_at) \
             VALUES ('t', 'T', 'kerosene', 100, 'custom', '2024-03-01T00:00:00Z', '2024-03-01T00:00:00Z')",
        )
        .execute(db.pool())
        .await
        .unwrap_err();
        assert!(matches!(DbError::from(bad_product), DbError::CheckViolation(_)));
    }
}
