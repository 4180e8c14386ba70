//! # Discrepancy Repository
//!
//! Audit findings, one per tank per audit date. Re-running an audit for the
//! same date replaces the earlier finding; an audit that comes out clean
//! removes it.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::DbResult;
use fuelbook_core::{Direction, Discrepancy, Severity, StockSummary};

/// A persisted audit finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DiscrepancyRecord {
    pub id: String,
    pub tank_id: String,
    pub audit_date: NaiveDate,
    pub opening_stock: f64,
    pub purchases: f64,
    pub sales: f64,
    pub adjustments: f64,
    pub expected_closing: f64,
    pub actual_closing: f64,
    pub difference: f64,
    pub severity: Severity,
    pub direction: Direction,
    pub created_at: DateTime<Utc>,
}

/// Repository for audit findings.
#[derive(Debug, Clone)]
pub struct DiscrepancyRepository {
    pool: SqlitePool,
}

impl DiscrepancyRepository {
    /// Creates a new DiscrepancyRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DiscrepancyRepository { pool }
    }

    /// Stores the finding for `tank_id` on `audit_date`, replacing any
    /// earlier one.
    pub async fn upsert(
        &self,
        tank_id: &str,
        audit_date: NaiveDate,
        discrepancy: &Discrepancy,
    ) -> DbResult<DiscrepancyRecord> {
        let summary = discrepancy.summary.unwrap_or(StockSummary {
            expected_closing: discrepancy.expected_closing,
            ..Default::default()
        });

        let record = DiscrepancyRecord {
            id: Uuid::new_v4().to_string(),
            tank_id: tank_id.to_string(),
            audit_date,
            opening_stock: summary.opening_stock,
            purchases: summary.purchases,
            sales: summary.sales,
            adjustments: summary.adjustments,
            expected_closing: discrepancy.expected_closing,
            actual_closing: discrepancy.actual_closing,
            difference: discrepancy.difference,
            severity: discrepancy.severity,
            direction: discrepancy.direction,
            created_at: Utc::now(),
        };

        warn!(
            tank_id,
            %audit_date,
            difference = record.difference,
            severity = %record.severity,
            "Stock discrepancy recorded"
        );

        sqlx::query(
            r#"
            INSERT INTO stock_discrepancies (
                id, tank_id, audit_date,
                opening_stock, purchases, sales, adjustments,
                expected_closing, actual_closing, difference,
                severity, direction, created_at
            ) VALUES (
                ?1, ?2, ?3,
                ?4, ?5, ?6, ?7,
                ?8, ?9, ?10,
                ?11, ?12, ?13
            )
            ON CONFLICT (tank_id, audit_date) DO UPDATE SET
                id = excluded.id,
                opening_stock = excluded.opening_stock,
                purchases = excluded.purchases,
                sales = excluded.sales,
                adjustments = excluded.adjustments,
                expected_closing = excluded.expected_closing,
                actual_closing = excluded.actual_closing,
                difference = excluded.difference,
                severity = excluded.severity,
                direction = excluded.direction,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.id)
        .bind(&record.tank_id)
        .bind(record.audit_date)
        .bind(record.opening_stock)
        .bind(record.purchases)
        .bind(record.sales)
        .bind(record.adjustments)
        .bind(record.expected_closing)
        .bind(record.actual_closing)
        .bind(record.difference)
        .bind(record.severity)
        .bind(record.direction)
        .bind(record.created_at)
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    /// Removes the finding for a tank and date. Returns true if one existed.
    pub async fn clear(&self, tank_id: &str, audit_date: NaiveDate) -> DbResult<bool> {
        let result =
            sqlx::query("DELETE FROM stock_discrepancies WHERE tank_id = ?1 AND audit_date = ?2")
                .bind(tank_id)
                .bind(audit_date)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() > 0 {
            debug!(tank_id, %audit_date, "Cleared earlier discrepancy");
        }
        Ok(result.rows_affected() > 0)
    }

    /// Findings dated within `from..=to`, optionally only `High` ones.
    pub async fn list(
        &self,
        from: NaiveDate,
        to: NaiveDate,
        high_only: bool,
    ) -> DbResult<Vec<DiscrepancyRecord>> {
        let rows: Vec<DiscrepancyRecord> = sqlx::query_as(
            r#"
            SELECT * FROM stock_discrepancies
            WHERE audit_date >= ?1 AND audit_date <= ?2
              AND (?3 = 0 OR severity = 'high')
            ORDER BY audit_date, tank_id
            "#,
        )
        .bind(from)
        .bind(to)
        .bind(high_only)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Findings for one tank, newest first.
    pub async fn list_for_tank(&self, tank_id: &str, limit: u32) -> DbResult<Vec<DiscrepancyRecord>> {
        let rows: Vec<DiscrepancyRecord> = sqlx::query_as(
            "SELECT * FROM stock_discrepancies WHERE tank_id = ?1 ORDER BY audit_date DESC LIMIT ?2",
        )
        .bind(tank_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }
}
