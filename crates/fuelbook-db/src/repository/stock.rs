//! # Stock Ledger Repository
//!
//! Append-only stock ledger per tank.
//!
//! ## Ledger Chain
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  record(sale 1 200 L)                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  current_stock(tank) = new_stock of latest entry (0 for a new tank)    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  apply_transaction(previous, Sale, 1 200) ← fuelbook-core              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT { previous_stock: 8 000, new_stock: 6 800 }                    │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Entries are never updated or deleted. Entries dated before the latest one
//! are refused so the chain stays in date order.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use fuelbook_core::stock::apply_transaction;
use fuelbook_core::{Money, StockTransaction, TransactionType};

/// A ledger entry as entered by the operator, before stock is computed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewStockTransaction {
    pub tank_id: String,
    pub transaction_type: TransactionType,
    pub quantity_liters: f64,
    /// Per-liter rate; the amount is derived from it.
    pub rate: Option<Money>,
    pub date: NaiveDate,
    pub notes: Option<String>,
}

impl NewStockTransaction {
    pub fn new(
        tank_id: impl Into<String>,
        transaction_type: TransactionType,
        quantity_liters: f64,
        date: NaiveDate,
    ) -> Self {
        NewStockTransaction {
            tank_id: tank_id.into(),
            transaction_type,
            quantity_liters,
            rate: None,
            date,
            notes: None,
        }
    }

    pub fn with_rate(mut self, rate: Money) -> Self {
        self.rate = Some(rate);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }
}

#[derive(Debug, FromRow)]
struct TransactionRow {
    id: String,
    tank_id: String,
    transaction_type: TransactionType,
    quantity_liters: f64,
    previous_stock: f64,
    new_stock: f64,
    rate_paise: Option<i64>,
    amount_paise: Option<i64>,
    date: NaiveDate,
    notes: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<TransactionRow> for StockTransaction {
    fn from(row: TransactionRow) -> Self {
        StockTransaction {
            id: row.id,
            tank_id: row.tank_id,
            transaction_type: row.transaction_type,
            quantity_liters: row.quantity_liters,
            previous_stock: row.previous_stock,
            new_stock: row.new_stock,
            rate: row.rate_paise.map(Money::from_paise),
            amount: row.amount_paise.map(Money::from_paise),
            date: row.date,
            notes: row.notes,
            created_at: row.created_at,
        }
    }
}

/// Latest entry first; `rowid` breaks ties between entries in the same instant.
const LATEST_FIRST: &str = "ORDER BY date DESC, created_at DESC, rowid DESC";

/// Repository for the stock ledger.
#[derive(Debug, Clone)]
pub struct StockLedgerRepository {
    pool: SqlitePool,
}

impl StockLedgerRepository {
    /// Creates a new StockLedgerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        StockLedgerRepository { pool }
    }

    /// Appends an entry to the tank's ledger.
    ///
    /// ## What This Does
    /// 1. Confirms the tank exists and is active
    /// 2. Reads the current book stock
    /// 3. Computes the new stock (sign rules, non-negative result)
    /// 4. Inserts the entry with both stock figures
    ///
    /// All in one transaction.
    pub async fn record(&self, new: &NewStockTransaction) -> DbResult<StockTransaction> {
        let mut tx = self.pool.begin().await?;

        let active: Option<bool> = sqlx::query_scalar("SELECT is_active FROM tanks WHERE id = ?1")
            .bind(&new.tank_id)
            .fetch_optional(&mut *tx)
            .await?;
        match active {
            None => return Err(DbError::not_found("Tank", &new.tank_id)),
            Some(false) => {
                return Err(DbError::InvalidState(format!(
                    "tank {} is deactivated",
                    new.tank_id
                )))
            }
            Some(true) => {}
        }

        let latest: Option<(f64, NaiveDate)> = sqlx::query_as(&format!(
            "SELECT new_stock, date FROM stock_transactions WHERE tank_id = ?1 {LATEST_FIRST} LIMIT 1"
        ))
        .bind(&new.tank_id)
        .fetch_optional(&mut *tx)
        .await?;

        let previous_stock = match latest {
            Some((_, last_date)) if new.date < last_date => {
                return Err(DbError::InvalidState(format!(
                    "ledger for tank {} already has entries dated {}; cannot record {}",
                    new.tank_id, last_date, new.date
                )));
            }
            Some((stock, _)) => stock,
            None => 0.0,
        };

        let new_stock = apply_transaction(previous_stock, new.transaction_type, new.quantity_liters)?;

        let txn = StockTransaction {
            id: Uuid::new_v4().to_string(),
            tank_id: new.tank_id.clone(),
            transaction_type: new.transaction_type,
            quantity_liters: new.quantity_liters,
            previous_stock,
            new_stock,
            rate: new.rate,
            amount: new
                .rate
                .map(|rate| rate.for_liters(new.quantity_liters.abs())),
            date: new.date,
            notes: new.notes.clone(),
            created_at: Utc::now(),
        };

        debug!(
            tank_id = %txn.tank_id,
            kind = %txn.transaction_type,
            quantity = txn.quantity_liters,
            previous_stock,
            new_stock,
            "Recording stock transaction"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_transactions (
                id, tank_id, transaction_type, quantity_liters,
                previous_stock, new_stock, rate_paise, amount_paise,
                date, notes, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4,
                ?5, ?6, ?7, ?8,
                ?9, ?10, ?11
            )
            "#,
        )
        .bind(&txn.id)
        .bind(&txn.tank_id)
        .bind(txn.transaction_type)
        .bind(txn.quantity_liters)
        .bind(txn.previous_stock)
        .bind(txn.new_stock)
        .bind(txn.rate.map(|m| m.paise()))
        .bind(txn.amount.map(|m| m.paise()))
        .bind(txn.date)
        .bind(&txn.notes)
        .bind(txn.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        info!(id = %txn.id, tank_id = %txn.tank_id, new_stock, "Stock transaction recorded");
        Ok(txn)
    }

    /// Gets one entry by ID.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<StockTransaction>> {
        let row: Option<TransactionRow> =
            sqlx::query_as("SELECT * FROM stock_transactions WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(StockTransaction::from))
    }

    /// Entries for a tank dated within `from..=to`, in ledger order.
    pub async fn list_for_tank(
        &self,
        tank_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> DbResult<Vec<StockTransaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(
            r#"
            SELECT * FROM stock_transactions
            WHERE tank_id = ?1 AND date >= ?2 AND date <= ?3
            ORDER BY date, created_at, rowid
            "#,
        )
        .bind(tank_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;

        debug!(tank_id, %from, %to, count = rows.len(), "Loaded ledger window");
        Ok(rows.into_iter().map(StockTransaction::from).collect())
    }

    /// Most recent entries for a tank, newest first.
    pub async fn list_recent(&self, tank_id: &str, limit: u32) -> DbResult<Vec<StockTransaction>> {
        let rows: Vec<TransactionRow> = sqlx::query_as(&format!(
            "SELECT * FROM stock_transactions WHERE tank_id = ?1 {LATEST_FIRST} LIMIT ?2"
        ))
        .bind(tank_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(StockTransaction::from).collect())
    }

    /// Book stock at the start of `date`: the closing figure of the last
    /// entry dated before it, or zero if there is none.
    pub async fn opening_stock(&self, tank_id: &str, date: NaiveDate) -> DbResult<f64> {
        let stock: Option<f64> = sqlx::query_scalar(&format!(
            "SELECT new_stock FROM stock_transactions WHERE tank_id = ?1 AND date < ?2 {LATEST_FIRST} LIMIT 1"
        ))
        .bind(tank_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stock.unwrap_or(0.0))
    }

    /// Book stock after the latest entry.
    pub async fn current_stock(&self, tank_id: &str) -> DbResult<f64> {
        let stock: Option<f64> = sqlx::query_scalar(&format!(
            "SELECT new_stock FROM stock_transactions WHERE tank_id = ?1 {LATEST_FIRST} LIMIT 1"
        ))
        .bind(tank_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(stock.unwrap_or(0.0))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use fuelbook_core::stock::verify_ledger_chain;
    use fuelbook_core::{FuelProduct, TankConfig, TankDimensions, TankShape};

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    async fn setup() -> (Database, TankConfig) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tank = TankConfig::new(
            "MS Tank 1",
            FuelProduct::Petrol,
            15_000.0,
            TankShape::HorizontalCylinder,
            TankDimensions::cylinder(2.0, 4.968),
        );
        db.tanks().insert(&tank).await.unwrap();
        (db, tank)
    }

    #[tokio::test]
    async fn test_record_chains_stock() {
        let (db, tank) = setup().await;
        let ledger = db.ledger();

        let t1 = ledger
            .record(
                &NewStockTransaction::new(&tank.id, TransactionType::Delivery, 9_000.0, day(1))
                    .with_rate(Money::from_major_minor(94, 72)),
            )
            .await
            .unwrap();
        assert_eq!(t1.previous_stock, 0.0);
        assert_eq!(t1.new_stock, 9_000.0);
        assert_eq!(t1.amount, Some(Money::from_rupees(852_480)));

        let t2 = ledger
            .record(&NewStockTransaction::new(&tank.id, TransactionType::Sale, 2_500.0, day(1)))
            .await
            .unwrap();
        assert_eq!(t2.previous_stock, 9_000.0);
        assert_eq!(t2.new_stock, 6_500.0);

        let t3 = ledger
            .record(&NewStockTransaction::new(&tank.id, TransactionType::Adjustment, -20.0, day(2)))
            .await
            .unwrap();
        assert_eq!(t3.new_stock, 6_480.0);

        assert_eq!(ledger.current_stock(&tank.id).await.unwrap(), 6_480.0);
        assert_eq!(ledger.opening_stock(&tank.id, day(1)).await.unwrap(), 0.0);
        assert_eq!(ledger.opening_stock(&tank.id, day(2)).await.unwrap(), 6_500.0);

        let all = ledger.list_for_tank(&tank.id, day(1), day(2)).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(verify_ledger_chain(0.0, &all).is_ok());

        let recent = ledger.list_recent(&tank.id, 1).await.unwrap();
        assert_eq!(recent[0].id, t3.id);

        let stored = ledger.get_by_id(&t1.id).await.unwrap().unwrap();
        assert_eq!(stored.rate, Some(Money::from_major_minor(94, 72)));
    }

    #[tokio::test]
    async fn test_record_rejects_oversell_and_backdating() {
        let (db, tank) = setup().await;
        let ledger = db.ledger();

        ledger
            .record(&NewStockTransaction::new(&tank.id, TransactionType::Purchase, 1_000.0, day(5)))
            .await
            .unwrap();

        let oversell = ledger
            .record(&NewStockTransaction::new(&tank.id, TransactionType::Sale, 1_500.0, day(5)))
            .await
            .unwrap_err();
        assert!(oversell.is_domain());

        let backdated = ledger
            .record(&NewStockTransaction::new(&tank.id, TransactionType::Sale, 10.0, day(4)))
            .await
            .unwrap_err();
        assert!(matches!(backdated, DbError::InvalidState(_)));

        assert_eq!(ledger.current_stock(&tank.id).await.unwrap(), 1_000.0);
    }

    #[tokio::test]
    async fn test_record_unknown_or_retired_tank() {
        let (db, tank) = setup().await;

        let err = db
            .ledger()
            .record(&NewStockTransaction::new("nope", TransactionType::Sale, 1.0, day(1)))
            .await
            .unwrap_err();
        assert!(err.is_not_found());

        db.tanks().deactivate(&tank.id).await.unwrap();
        let err = db
            .ledger()
            .record(&NewStockTransaction::new(&tank.id, TransactionType::Purchase, 1.0, day(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::InvalidState(_)));
    }

    #[tokio::test]
    async fn test_window_excludes_other_dates() {
        let (db, tank) = setup().await;
        let ledger = db.ledger();

        for d in 1..=3 {
            ledger
                .record(&NewStockTransaction::new(&tank.id, TransactionType::Purchase, 100.0, day(d)))
                .await
                .unwrap();
        }

        let window = ledger.list_for_tank(&tank.id, day(2), day(2)).await.unwrap();
        assert_eq!(window.len(), 1);
        assert_eq!(window[0].previous_stock, 100.0);
    }
}
