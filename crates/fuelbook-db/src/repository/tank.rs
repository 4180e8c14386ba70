//! # Tank Repository
//!
//! Tank configurations and their certified dip charts.
//!
//! ## Storage Layout
//! ```text
//! tanks                          tank_calibration_points
//! ┌──────────────────────┐       ┌──────────────────────────┐
//! │ id (PK)              │◄──────│ tank_id (FK)             │
//! │ name (UNIQUE)        │   1:N │ dip_mm                   │
//! │ product, shape       │       │ volume_liters            │
//! │ capacity_liters      │       └──────────────────────────┘
//! │ diameter/length/...  │
//! │ formula_constant     │
//! │ is_active            │
//! └──────────────────────┘
//! ```
//!
//! A tank and its chart are always written together in one transaction, and
//! every write goes through `validate_tank_config` first.

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use fuelbook_core::validation::{validate_calibration_table, validate_tank_config};
use fuelbook_core::{CalibrationPoint, FuelProduct, TankConfig, TankDimensions, TankShape};

#[derive(Debug, FromRow)]
struct TankRow {
    id: String,
    name: String,
    product: FuelProduct,
    capacity_liters: f64,
    shape: TankShape,
    diameter_m: Option<f64>,
    length_m: Option<f64>,
    width_m: Option<f64>,
    height_m: Option<f64>,
    formula_constant: Option<f64>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TankRow {
    fn into_config(self, calibration_table: Vec<CalibrationPoint>) -> TankConfig {
        TankConfig {
            id: self.id,
            name: self.name,
            product: self.product,
            capacity_liters: self.capacity_liters,
            shape: self.shape,
            dimensions: TankDimensions {
                diameter_m: self.diameter_m,
                length_m: self.length_m,
                width_m: self.width_m,
                height_m: self.height_m,
            },
            calibration_table,
            formula_constant: self.formula_constant,
            is_active: self.is_active,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CalibrationRow {
    dip_mm: f64,
    volume_liters: f64,
}

const TANK_COLUMNS: &str = r#"
    id, name, product, capacity_liters, shape,
    diameter_m, length_m, width_m, height_m,
    formula_constant, is_active, created_at, updated_at
"#;

/// Repository for tank configuration.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.tanks();
/// repo.insert(&tank).await?;
/// let active = repo.list_active().await?;
/// ```
#[derive(Debug, Clone)]
pub struct TankRepository {
    pool: SqlitePool,
}

impl TankRepository {
    /// Creates a new TankRepository.
    pub fn new(pool: SqlitePool) -> Self {
        TankRepository { pool }
    }

    /// Gets a tank (active or retired) by ID, with its dip chart.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<TankConfig>> {
        let sql = format!("SELECT {TANK_COLUMNS} FROM tanks WHERE id = ?1");
        let row: Option<TankRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let table = self.calibration_table(&row.id).await?;
                Ok(Some(row.into_config(table)))
            }
            None => Ok(None),
        }
    }

    /// Gets a tank by ID or fails with `NotFound`.
    pub async fn require(&self, id: &str) -> DbResult<TankConfig> {
        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Tank", id))
    }

    /// Gets a tank by its display name.
    pub async fn get_by_name(&self, name: &str) -> DbResult<Option<TankConfig>> {
        let sql = format!("SELECT {TANK_COLUMNS} FROM tanks WHERE name = ?1");
        let row: Option<TankRow> = sqlx::query_as(&sql)
            .bind(name.trim())
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => {
                let table = self.calibration_table(&row.id).await?;
                Ok(Some(row.into_config(table)))
            }
            None => Ok(None),
        }
    }

    /// Lists tanks in service, by name.
    pub async fn list_active(&self) -> DbResult<Vec<TankConfig>> {
        self.list(true).await
    }

    /// Lists every tank including retired ones, by name.
    pub async fn list_all(&self) -> DbResult<Vec<TankConfig>> {
        self.list(false).await
    }

    async fn list(&self, active_only: bool) -> DbResult<Vec<TankConfig>> {
        let filter = if active_only { "WHERE is_active = 1" } else { "" };
        let sql = format!("SELECT {TANK_COLUMNS} FROM tanks {filter} ORDER BY name");
        let rows: Vec<TankRow> = sqlx::query_as(&sql).fetch_all(&self.pool).await?;

        debug!(count = rows.len(), active_only, "Loaded tanks");

        let mut tanks = Vec::with_capacity(rows.len());
        for row in rows {
            let table = self.calibration_table(&row.id).await?;
            tanks.push(row.into_config(table));
        }
        Ok(tanks)
    }

    /// The tank's dip chart, ascending by dip.
    pub async fn calibration_table(&self, tank_id: &str) -> DbResult<Vec<CalibrationPoint>> {
        let rows: Vec<CalibrationRow> = sqlx::query_as(
            r#"
            SELECT dip_mm, volume_liters
            FROM tank_calibration_points
            WHERE tank_id = ?1
            ORDER BY dip_mm
            "#,
        )
        .bind(tank_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| CalibrationPoint::new(r.dip_mm, r.volume_liters))
            .collect())
    }

    /// Inserts a tank and its dip chart.
    ///
    /// ## Returns
    /// * `Err(DbError::Domain)` - configuration rejected by validation
    /// * `Err(DbError::UniqueViolation)` - name already taken
    pub async fn insert(&self, tank: &TankConfig) -> DbResult<TankConfig> {
        validate_tank_config(tank)?;

        debug!(id = %tank.id, name = %tank.name, "Inserting tank");

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO tanks (
                id, name, product, capacity_liters, shape,
                diameter_m, length_m, width_m, height_m,
                formula_constant, is_active, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13
            )
            "#,
        )
        .bind(&tank.id)
        .bind(tank.name.trim())
        .bind(tank.product)
        .bind(tank.capacity_liters)
        .bind(tank.shape)
        .bind(tank.dimensions.diameter_m)
        .bind(tank.dimensions.length_m)
        .bind(tank.dimensions.width_m)
        .bind(tank.dimensions.height_m)
        .bind(tank.formula_constant)
        .bind(tank.is_active)
        .bind(tank.created_at)
        .bind(tank.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, tank.name.trim()),
            other => other,
        })?;

        for point in &tank.calibration_table {
            sqlx::query(
                "INSERT INTO tank_calibration_points (tank_id, dip_mm, volume_liters) VALUES (?1, ?2, ?3)",
            )
            .bind(&tank.id)
            .bind(point.dip_mm)
            .bind(point.volume_liters)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        info!(id = %tank.id, name = %tank.name, product = %tank.product, "Tank created");
        Ok(tank.clone())
    }

    /// Replaces a tank's dip chart. An empty table reverts the tank to its
    /// closed-form formula.
    pub async fn replace_calibration_table(
        &self,
        tank_id: &str,
        table: &[CalibrationPoint],
    ) -> DbResult<TankConfig> {
        let tank = self.require(tank_id).await?;
        validate_calibration_table(&tank.name, table)?;

        debug!(tank_id, points = table.len(), "Replacing calibration table");

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM tank_calibration_points WHERE tank_id = ?1")
            .bind(tank_id)
            .execute(&mut *tx)
            .await?;

        for point in table {
            sqlx::query(
                "INSERT INTO tank_calibration_points (tank_id, dip_mm, volume_liters) VALUES (?1, ?2, ?3)",
            )
            .bind(tank_id)
            .bind(point.dip_mm)
            .bind(point.volume_liters)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("UPDATE tanks SET updated_at = ?2 WHERE id = ?1")
            .bind(tank_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        info!(tank_id, points = table.len(), "Calibration table replaced");
        self.require(tank_id).await
    }

    /// Pins (or clears) the tank's segment-formula constant.
    pub async fn set_formula_constant(&self, tank_id: &str, constant: Option<f64>) -> DbResult<()> {
        let mut tank = self.require(tank_id).await?;
        tank.formula_constant = constant;
        validate_tank_config(&tank)?;

        sqlx::query("UPDATE tanks SET formula_constant = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(tank_id)
            .bind(constant)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Retires a tank. Its ledger and dip history stay intact.
    pub async fn deactivate(&self, tank_id: &str) -> DbResult<()> {
        let result = sqlx::query(
            "UPDATE tanks SET is_active = 0, updated_at = ?2 WHERE id = ?1 AND is_active = 1",
        )
        .bind(tank_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Tank (active)", tank_id));
        }

        info!(tank_id, "Tank deactivated");
        Ok(())
    }

    /// Number of tanks, active or not.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tanks")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};

    async fn setup() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn hsd_tank() -> TankConfig {
        TankConfig::new(
            "HSD Tank 1",
            FuelProduct::Diesel,
            20_000.0,
            TankShape::HorizontalCylinder,
            TankDimensions::cylinder(2.0, 6.718),
        )
    }

    #[tokio::test]
    async fn test_insert_and_get() {
        let db = setup().await;
        let tank = hsd_tank().with_formula_constant(671.8);
        db.tanks().insert(&tank).await.unwrap();

        let loaded = db.tanks().require(&tank.id).await.unwrap();
        assert_eq!(loaded.name, "HSD Tank 1");
        assert_eq!(loaded.product, FuelProduct::Diesel);
        assert_eq!(loaded.shape, TankShape::HorizontalCylinder);
        assert_eq!(loaded.dimensions.length_m, Some(6.718));
        assert_eq!(loaded.formula_constant, Some(671.8));
        assert!(loaded.is_active);
        assert!(loaded.calibration_table.is_empty());

        assert!(db.tanks().get_by_name("HSD Tank 1").await.unwrap().is_some());
        assert!(db.tanks().get_by_id("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_insert_rejects_invalid_config() {
        let db = setup().await;
        let mut tank = hsd_tank();
        tank.capacity_liters = 0.0;

        let err = db.tanks().insert(&tank).await.unwrap_err();
        assert!(err.is_domain());
        assert_eq!(db.tanks().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_insert_rejects_non_positive_dimension() {
        let db = setup().await;
        let mut tank = hsd_tank();
        tank.dimensions.length_m = Some(-6.718);

        let err = db.tanks().insert(&tank).await.unwrap_err();
        assert!(err.to_string().contains("length_m"));
        assert!(err.is_domain());
        assert_eq!(db.tanks().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_name() {
        let db = setup().await;
        db.tanks().insert(&hsd_tank()).await.unwrap();

        let err = db.tanks().insert(&hsd_tank()).await.unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_replace_calibration_table() {
        let db = setup().await;
        let tank = hsd_tank().with_calibration_table(vec![
            CalibrationPoint::new(0.0, 0.0),
            CalibrationPoint::new(1000.0, 9_000.0),
        ]);
        db.tanks().insert(&tank).await.unwrap();
        assert_eq!(db.tanks().calibration_table(&tank.id).await.unwrap().len(), 2);

        let chart = vec![
            CalibrationPoint::new(0.0, 0.0),
            CalibrationPoint::new(500.0, 3_400.0),
            CalibrationPoint::new(1000.0, 9_100.0),
        ];
        let updated = db
            .tanks()
            .replace_calibration_table(&tank.id, &chart)
            .await
            .unwrap();
        assert_eq!(updated.calibration_table, chart);

        // Out-of-order chart leaves the stored one untouched
        let bad = vec![
            CalibrationPoint::new(500.0, 3_400.0),
            CalibrationPoint::new(100.0, 3_500.0),
        ];
        assert!(db
            .tanks()
            .replace_calibration_table(&tank.id, &bad)
            .await
            .unwrap_err()
            .is_domain());
        assert_eq!(db.tanks().calibration_table(&tank.id).await.unwrap(), chart);
    }

    #[tokio::test]
    async fn test_deactivate() {
        let db = setup().await;
        let tank = hsd_tank();
        db.tanks().insert(&tank).await.unwrap();

        db.tanks().deactivate(&tank.id).await.unwrap();
        assert!(db.tanks().list_active().await.unwrap().is_empty());
        assert_eq!(db.tanks().list_all().await.unwrap().len(), 1);

        // Second deactivation finds no active tank
        assert!(db.tanks().deactivate(&tank.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_set_formula_constant() {
        let db = setup().await;
        let tank = hsd_tank();
        db.tanks().insert(&tank).await.unwrap();

        db.tanks().set_formula_constant(&tank.id, Some(671.8)).await.unwrap();
        assert_eq!(db.tanks().require(&tank.id).await.unwrap().formula_constant, Some(671.8));

        assert!(db.tanks().set_formula_constant(&tank.id, Some(-1.0)).await.is_err());
    }
}
