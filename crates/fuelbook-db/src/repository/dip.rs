//! # Dip Reading Repository
//!
//! Log of dip conversions. Each row keeps the figures shown to the operator
//! and the label of the strategy that produced them, so a later chart change
//! doesn't rewrite history.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use fuelbook_core::CalculationResult;

/// A stored dip conversion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct DipLogEntry {
    pub id: String,
    pub tank_id: String,
    pub dip_cm: f64,
    pub volume_liters: f64,
    pub remaining_percentage: u8,
    /// `FormulaUsed` label, e.g. `cylinder_segment(k=671.8)`.
    pub formula_used: String,
    pub taken_at: DateTime<Utc>,
}

/// Repository for the dip log.
#[derive(Debug, Clone)]
pub struct DipReadingRepository {
    pool: SqlitePool,
}

impl DipReadingRepository {
    /// Creates a new DipReadingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        DipReadingRepository { pool }
    }

    /// Stores a calculation taken at `taken_at`.
    pub async fn insert(
        &self,
        result: &CalculationResult,
        taken_at: DateTime<Utc>,
    ) -> DbResult<DipLogEntry> {
        let entry = DipLogEntry {
            id: Uuid::new_v4().to_string(),
            tank_id: result.tank_id.clone(),
            dip_cm: result.dip_cm,
            volume_liters: result.volume_liters,
            remaining_percentage: result.remaining_percentage,
            formula_used: result.formula_used.label(),
            taken_at,
        };

        debug!(
            tank_id = %entry.tank_id,
            dip_cm = entry.dip_cm,
            volume = entry.volume_liters,
            "Logging dip reading"
        );

        sqlx::query(
            r#"
            INSERT INTO dip_readings (
                id, tank_id, dip_cm, volume_liters,
                remaining_percentage, formula_used, taken_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.tank_id)
        .bind(entry.dip_cm)
        .bind(entry.volume_liters)
        .bind(entry.remaining_percentage)
        .bind(&entry.formula_used)
        .bind(entry.taken_at)
        .execute(&self.pool)
        .await?;

        Ok(entry)
    }

    /// Most recent readings for a tank, newest first.
    pub async fn list_for_tank(&self, tank_id: &str, limit: u32) -> DbResult<Vec<DipLogEntry>> {
        let rows: Vec<DipLogEntry> = sqlx::query_as(
            r#"
            SELECT id, tank_id, dip_cm, volume_liters, remaining_percentage, formula_used, taken_at
            FROM dip_readings
            WHERE tank_id = ?1
            ORDER BY taken_at DESC
            LIMIT ?2
            "#,
        )
        .bind(tank_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    /// Last reading taken on `date` (UTC), if any.
    pub async fn last_on(&self, tank_id: &str, date: NaiveDate) -> DbResult<Option<DipLogEntry>> {
        let row: Option<DipLogEntry> = sqlx::query_as(
            r#"
            SELECT id, tank_id, dip_cm, volume_liters, remaining_percentage, formula_used, taken_at
            FROM dip_readings
            WHERE tank_id = ?1 AND date(taken_at) = ?2
            ORDER BY taken_at DESC
            LIMIT 1
            "#,
        )
        .bind(tank_id)
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use chrono::TimeZone;
    use fuelbook_core::{calculate_volume, FuelProduct, TankConfig, TankDimensions, TankShape};

    #[tokio::test]
    async fn test_log_and_read_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let tank = TankConfig::new(
            "HSD Tank 1",
            FuelProduct::Diesel,
            20_000.0,
            TankShape::HorizontalCylinder,
            TankDimensions::cylinder(2.0, 6.718),
        );
        db.tanks().insert(&tank).await.unwrap();

        let morning = Utc.with_ymd_and_hms(2024, 3, 1, 6, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2024, 3, 1, 21, 0, 0).unwrap();

        let first = calculate_volume(&tank, 138.6).unwrap();
        let second = calculate_volume(&tank, 99.6).unwrap();
        db.dip_readings().insert(&first, morning).await.unwrap();
        let logged = db.dip_readings().insert(&second, evening).await.unwrap();
        assert!(logged.formula_used.starts_with("cylinder_segment"));

        let recent = db.dip_readings().list_for_tank(&tank.id, 10).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].dip_cm, 99.6);

        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let last = db.dip_readings().last_on(&tank.id, date).await.unwrap().unwrap();
        assert_eq!(last.id, logged.id);
        assert_eq!(last.volume_liters, second.volume_liters);

        let other_day = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert!(db.dip_readings().last_on(&tank.id, other_day).await.unwrap().is_none());
    }
}
