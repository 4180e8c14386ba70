//! # Shift Repository
//!
//! Operator shifts and their cash figures.
//!
//! ## Shift Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── open() → Shift { status: Open, all cash zero }                 │
//! │                                                                         │
//! │  2. (OPTIONAL) RUNNING TOTALS                                          │
//! │     └── update_cash() → figures entered during the shift               │
//! │                                                                         │
//! │  3. CLOSE                                                              │
//! │     └── close() → Shift { status: Closed, closed_at }                  │
//! │                                                                         │
//! │  Closed shifts are read-only.                                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use fuelbook_core::shift::validate_shift_cash;
use fuelbook_core::validation::validate_name;
use fuelbook_core::{Money, Shift, ShiftStatus};

/// The four cash figures entered for a shift.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShiftCash {
    pub cash_collected: Money,
    pub expenses: Money,
    pub cash_deposit: Money,
    pub cash_in_hand: Money,
}

impl ShiftCash {
    fn apply_to(&self, shift: &mut Shift) {
        shift.cash_collected = self.cash_collected;
        shift.expenses = self.expenses;
        shift.cash_deposit = self.cash_deposit;
        shift.cash_in_hand = self.cash_in_hand;
    }
}

#[derive(Debug, FromRow)]
struct ShiftRow {
    id: String,
    operator_name: String,
    shift_date: NaiveDate,
    status: ShiftStatus,
    cash_collected_paise: i64,
    expenses_paise: i64,
    cash_deposit_paise: i64,
    cash_in_hand_paise: i64,
    opened_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

impl From<ShiftRow> for Shift {
    fn from(row: ShiftRow) -> Self {
        Shift {
            id: row.id,
            operator_name: row.operator_name,
            shift_date: row.shift_date,
            status: row.status,
            cash_collected: Money::from_paise(row.cash_collected_paise),
            expenses: Money::from_paise(row.expenses_paise),
            cash_deposit: Money::from_paise(row.cash_deposit_paise),
            cash_in_hand: Money::from_paise(row.cash_in_hand_paise),
            opened_at: row.opened_at,
            closed_at: row.closed_at,
            notes: row.notes,
        }
    }
}

/// Repository for shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Opens a shift for an operator.
    pub async fn open(&self, operator_name: &str, shift_date: NaiveDate) -> DbResult<Shift> {
        validate_name("operator_name", operator_name)?;
        let shift = Shift::open(operator_name.trim(), shift_date);

        debug!(id = %shift.id, operator = %shift.operator_name, "Opening shift");

        sqlx::query(
            r#"
            INSERT INTO shifts (
                id, operator_name, shift_date, status,
                cash_collected_paise, expenses_paise, cash_deposit_paise, cash_in_hand_paise,
                opened_at, closed_at, notes
            ) VALUES (?1, ?2, ?3, ?4, 0, 0, 0, 0, ?5, NULL, NULL)
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.operator_name)
        .bind(shift.shift_date)
        .bind(shift.status)
        .bind(shift.opened_at)
        .execute(&self.pool)
        .await?;

        info!(id = %shift.id, operator = %shift.operator_name, date = %shift.shift_date, "Shift opened");
        Ok(shift)
    }

    /// Gets a shift by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Shift>> {
        let row: Option<ShiftRow> = sqlx::query_as("SELECT * FROM shifts WHERE id = ?1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Shift::from))
    }

    /// Gets a shift by ID or fails with `NotFound`.
    pub async fn require(&self, id: &str) -> DbResult<Shift> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Shift", id))
    }

    /// Shifts on a date, in opening order.
    pub async fn list_by_date(&self, date: NaiveDate) -> DbResult<Vec<Shift>> {
        let rows: Vec<ShiftRow> =
            sqlx::query_as("SELECT * FROM shifts WHERE shift_date = ?1 ORDER BY opened_at")
                .bind(date)
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Shift::from).collect())
    }

    /// Shifts not yet closed.
    pub async fn list_open(&self) -> DbResult<Vec<Shift>> {
        let rows: Vec<ShiftRow> =
            sqlx::query_as("SELECT * FROM shifts WHERE status = 'open' ORDER BY opened_at")
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(Shift::from).collect())
    }

    /// Overwrites the cash figures of an open shift.
    pub async fn update_cash(&self, id: &str, cash: &ShiftCash) -> DbResult<Shift> {
        let mut shift = self.require_open(id).await?;
        cash.apply_to(&mut shift);
        validate_shift_cash(&shift)?;

        self.write_cash(&shift, None).await?;
        Ok(shift)
    }

    /// Records final cash figures and closes the shift.
    pub async fn close(&self, id: &str, cash: &ShiftCash, notes: Option<&str>) -> DbResult<Shift> {
        let mut shift = self.require_open(id).await?;
        cash.apply_to(&mut shift);
        validate_shift_cash(&shift)?;

        shift.status = ShiftStatus::Closed;
        shift.closed_at = Some(Utc::now());
        if let Some(notes) = notes {
            shift.notes = Some(notes.to_string());
        }

        self.write_cash(&shift, shift.closed_at).await?;

        info!(id = %shift.id, operator = %shift.operator_name, "Shift closed");
        Ok(shift)
    }

    async fn require_open(&self, id: &str) -> DbResult<Shift> {
        let shift = self.require(id).await?;
        if shift.status != ShiftStatus::Open {
            return Err(DbError::InvalidState(format!("shift {id} is already closed")));
        }
        Ok(shift)
    }

    async fn write_cash(&self, shift: &Shift, closed_at: Option<DateTime<Utc>>) -> DbResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE shifts SET
                status = ?2,
                cash_collected_paise = ?3,
                expenses_paise = ?4,
                cash_deposit_paise = ?5,
                cash_in_hand_paise = ?6,
                closed_at = ?7,
                notes = ?8
            WHERE id = ?1 AND status = 'open'
            "#,
        )
        .bind(&shift.id)
        .bind(shift.status)
        .bind(shift.cash_collected.paise())
        .bind(shift.expenses.paise())
        .bind(shift.cash_deposit.paise())
        .bind(shift.cash_in_hand.paise())
        .bind(closed_at)
        .bind(&shift.notes)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Shift (open)", &shift.id));
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    fn cash(collected: i64, expenses: i64, deposit: i64, in_hand: i64) -> ShiftCash {
        ShiftCash {
            cash_collected: Money::from_rupees(collected),
            expenses: Money::from_rupees(expenses),
            cash_deposit: Money::from_rupees(deposit),
            cash_in_hand: Money::from_rupees(in_hand),
        }
    }

    #[tokio::test]
    async fn test_open_update_close() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        let shift = db.shifts().open("Ravi", date).await.unwrap();
        assert_eq!(shift.status, ShiftStatus::Open);
        assert_eq!(db.shifts().list_open().await.unwrap().len(), 1);

        let updated = db
            .shifts()
            .update_cash(&shift.id, &cash(4_000, 500, 0, 3_500))
            .await
            .unwrap();
        assert_eq!(updated.cash_collected, Money::from_rupees(4_000));

        let closed = db
            .shifts()
            .close(&shift.id, &cash(10_000, 2_000, 3_000, 5_000), Some("night shift"))
            .await
            .unwrap();
        assert_eq!(closed.status, ShiftStatus::Closed);
        assert!(closed.closed_at.is_some());

        let stored = db.shifts().require(&shift.id).await.unwrap();
        assert_eq!(stored.status, ShiftStatus::Closed);
        assert_eq!(stored.cash_in_hand, Money::from_rupees(5_000));
        assert_eq!(stored.notes.as_deref(), Some("night shift"));
        assert!(db.shifts().list_open().await.unwrap().is_empty());
        assert_eq!(db.shifts().list_by_date(date).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_closed_shift_is_read_only() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let shift = db.shifts().open("Ravi", date).await.unwrap();
        db.shifts()
            .close(&shift.id, &ShiftCash::default(), None)
            .await
            .unwrap();

        let err = db
            .shifts()
            .update_cash(&shift.id, &cash(1, 0, 0, 1))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_rejects_negative_cash_and_blank_operator() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

        assert!(db.shifts().open("  ", date).await.unwrap_err().is_domain());

        let shift = db.shifts().open("Ravi", date).await.unwrap();
        let err = db
            .shifts()
            .close(&shift.id, &cash(100, -5, 0, 105), None)
            .await
            .unwrap_err();
        assert!(err.is_domain());
        assert!(db.shifts().require("missing").await.unwrap_err().is_not_found());
    }
}
