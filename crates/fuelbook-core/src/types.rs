//! # Domain Types
//!
//! Core domain types used throughout Fuelbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   TankConfig    │   │StockTransaction │   │      Shift      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  tank_id (FK)   │   │  id (UUID)      │       │
//! │  │  product        │   │  type           │   │  cash_collected │       │
//! │  │  capacity       │   │  quantity       │   │  expenses       │       │
//! │  │  shape + dims   │   │  previous/new   │   │  cash_deposit   │       │
//! │  │  calibration    │   │  date           │   │  cash_in_hand   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  FuelProduct    │   │   TankShape     │   │TransactionType  │       │
//! │  │  Petrol (MS)    │   │  horiz. cyl.    │   │  purchase       │       │
//! │  │  Diesel (HSD)   │   │  rectangular    │   │  sale           │       │
//! │  │  Cng            │   │  capsule/custom │   │  adjustment ... │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;
use uuid::Uuid;

use crate::error::ValidationError;
use crate::money::Money;

// =============================================================================
// Fuel Product
// =============================================================================

/// Product stored in a tank.
///
/// The pump's dip charts and old formula calculator use the trade codes
/// MS (Motor Spirit) and HSD (High-Speed Diesel); both spellings parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum FuelProduct {
    Petrol,
    Diesel,
    Cng,
}

impl FuelProduct {
    /// Trade code printed on dip charts.
    pub fn code(&self) -> &'static str {
        match self {
            FuelProduct::Petrol => "MS",
            FuelProduct::Diesel => "HSD",
            FuelProduct::Cng => "CNG",
        }
    }

    /// Segment-formula constant of the station's reference tank for this
    /// product.
    ///
    /// Both values belong to 2 m diameter tanks (6.718 m and 4.968 m long).
    /// They are only valid for tanks of that size; use them to fill
    /// `TankConfig::formula_constant` for such tanks, not as a default.
    pub fn reference_constant(&self) -> Option<f64> {
        match self {
            FuelProduct::Diesel => Some(671.8),
            FuelProduct::Petrol => Some(496.8),
            FuelProduct::Cng => None,
        }
    }
}

impl fmt::Display for FuelProduct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FuelProduct::Petrol => write!(f, "petrol"),
            FuelProduct::Diesel => write!(f, "diesel"),
            FuelProduct::Cng => write!(f, "cng"),
        }
    }
}

impl FromStr for FuelProduct {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "petrol" | "ms" => Ok(FuelProduct::Petrol),
            "diesel" | "hsd" => Ok(FuelProduct::Diesel),
            "cng" => Ok(FuelProduct::Cng),
            _ => Err(ValidationError::NotAllowed {
                field: "product".to_string(),
                allowed: vec![
                    "petrol (MS)".to_string(),
                    "diesel (HSD)".to_string(),
                    "cng".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Tank Shape & Dimensions
// =============================================================================

/// Physical shape of a storage tank.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum TankShape {
    /// Underground horizontal cylinder with flat ends.
    HorizontalCylinder,
    /// Box tank.
    Rectangular,
    /// Horizontal cylinder with hemispherical ends.
    Capsule,
    /// Anything else; only usable with a calibration table.
    Custom,
}

impl TankShape {
    /// Dimensions the closed-form formula for this shape needs.
    pub fn required_dimensions(&self) -> &'static [&'static str] {
        match self {
            TankShape::HorizontalCylinder | TankShape::Capsule => &["diameter_m", "length_m"],
            TankShape::Rectangular => &["length_m", "width_m", "height_m"],
            TankShape::Custom => &[],
        }
    }

    /// True if dips can be converted without a calibration table.
    pub fn has_formula(&self) -> bool {
        !matches!(self, TankShape::Custom)
    }
}

impl fmt::Display for TankShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TankShape::HorizontalCylinder => write!(f, "horizontal_cylinder"),
            TankShape::Rectangular => write!(f, "rectangular"),
            TankShape::Capsule => write!(f, "capsule"),
            TankShape::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for TankShape {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "horizontal_cylinder" | "cylinder" => Ok(TankShape::HorizontalCylinder),
            "rectangular" | "box" => Ok(TankShape::Rectangular),
            "capsule" => Ok(TankShape::Capsule),
            "custom" => Ok(TankShape::Custom),
            _ => Err(ValidationError::NotAllowed {
                field: "shape".to_string(),
                allowed: vec![
                    "horizontal_cylinder".to_string(),
                    "rectangular".to_string(),
                    "capsule".to_string(),
                    "custom".to_string(),
                ],
            }),
        }
    }
}

/// Shape-dependent measurements in meters.
///
/// For capsules, `length_m` is the straight cylindrical section only; the
/// hemispherical ends add `diameter_m` to the overall length.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TankDimensions {
    pub diameter_m: Option<f64>,
    pub length_m: Option<f64>,
    pub width_m: Option<f64>,
    pub height_m: Option<f64>,
}

impl TankDimensions {
    /// Dimensions of a horizontal cylinder or capsule.
    pub fn cylinder(diameter_m: f64, length_m: f64) -> Self {
        TankDimensions {
            diameter_m: Some(diameter_m),
            length_m: Some(length_m),
            ..Default::default()
        }
    }

    /// Dimensions of a box tank.
    pub fn rectangular(length_m: f64, width_m: f64, height_m: f64) -> Self {
        TankDimensions {
            length_m: Some(length_m),
            width_m: Some(width_m),
            height_m: Some(height_m),
            ..Default::default()
        }
    }

    fn get(&self, name: &str) -> Option<f64> {
        match name {
            "diameter_m" => self.diameter_m,
            "length_m" => self.length_m,
            "width_m" => self.width_m,
            "height_m" => self.height_m,
            _ => None,
        }
    }

    /// Names of shape-required dimensions that are absent or not positive.
    pub fn missing_for(&self, shape: TankShape) -> Vec<String> {
        shape
            .required_dimensions()
            .iter()
            .filter(|name| !matches!(self.get(name), Some(v) if v.is_finite() && v > 0.0))
            .map(|name| name.to_string())
            .collect()
    }
}

/// One row of a certified dip chart.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalibrationPoint {
    pub dip_mm: f64,
    pub volume_liters: f64,
}

impl CalibrationPoint {
    pub fn new(dip_mm: f64, volume_liters: f64) -> Self {
        CalibrationPoint {
            dip_mm,
            volume_liters,
        }
    }
}

// =============================================================================
// Tank Configuration
// =============================================================================

/// A physical storage tank.
///
/// Tanks are never deleted: historical ledgers still reference them, so a
/// retired tank is flagged `is_active = false`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TankConfig {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Display name ("HSD Tank 1").
    pub name: String,

    pub product: FuelProduct,

    /// Nominal liters at full.
    pub capacity_liters: f64,

    pub shape: TankShape,

    pub dimensions: TankDimensions,

    /// Certified dip chart, ascending by `dip_mm`. Preferred over any formula.
    #[serde(default)]
    pub calibration_table: Vec<CalibrationPoint>,

    /// Segment-formula constant for this tank. When absent it is derived
    /// from diameter and length.
    #[serde(default)]
    pub formula_constant: Option<f64>,

    /// Whether the tank is in service.
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl TankConfig {
    /// Creates an active tank with a fresh ID and no calibration table.
    pub fn new(
        name: impl Into<String>,
        product: FuelProduct,
        capacity_liters: f64,
        shape: TankShape,
        dimensions: TankDimensions,
    ) -> Self {
        let now = Utc::now();
        TankConfig {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            product,
            capacity_liters,
            shape,
            dimensions,
            calibration_table: Vec::new(),
            formula_constant: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Attaches a certified calibration table.
    pub fn with_calibration_table(mut self, table: Vec<CalibrationPoint>) -> Self {
        self.calibration_table = table;
        self
    }

    /// Pins the segment-formula constant.
    pub fn with_formula_constant(mut self, constant: f64) -> Self {
        self.formula_constant = Some(constant);
        self
    }

    /// True if a certified dip chart is attached.
    pub fn has_calibration_table(&self) -> bool {
        !self.calibration_table.is_empty()
    }
}

// =============================================================================
// Dip Reading
// =============================================================================

/// A dipstick measurement submitted for conversion.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DipReading {
    pub tank_id: String,
    /// Fuel depth in centimeters.
    pub dip_cm: f64,
    #[ts(as = "String")]
    pub taken_at: DateTime<Utc>,
}

// =============================================================================
// Stock Transactions
// =============================================================================

/// Kind of ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Fuel bought from the oil company (invoice-level).
    Purchase,
    /// Fuel sold through the dispensers.
    Sale,
    /// Manual correction; the quantity's sign decides the direction.
    Adjustment,
    /// Tanker decanted into the tank.
    Delivery,
}

impl TransactionType {
    /// Applies the type's sign rule to a recorded quantity.
    pub fn signed(&self, quantity_liters: f64) -> f64 {
        match self {
            TransactionType::Purchase | TransactionType::Delivery => quantity_liters.abs(),
            TransactionType::Sale => -quantity_liters.abs(),
            TransactionType::Adjustment => quantity_liters,
        }
    }

    /// True for types that bring fuel into the tank.
    pub fn is_receipt(&self) -> bool {
        matches!(self, TransactionType::Purchase | TransactionType::Delivery)
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionType::Purchase => write!(f, "purchase"),
            TransactionType::Sale => write!(f, "sale"),
            TransactionType::Adjustment => write!(f, "adjustment"),
            TransactionType::Delivery => write!(f, "delivery"),
        }
    }
}

impl FromStr for TransactionType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "purchase" => Ok(TransactionType::Purchase),
            "sale" => Ok(TransactionType::Sale),
            "adjustment" => Ok(TransactionType::Adjustment),
            "delivery" => Ok(TransactionType::Delivery),
            _ => Err(ValidationError::NotAllowed {
                field: "transaction_type".to_string(),
                allowed: vec![
                    "purchase".to_string(),
                    "sale".to_string(),
                    "adjustment".to_string(),
                    "delivery".to_string(),
                ],
            }),
        }
    }
}

/// An append-only stock ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockTransaction {
    pub id: String,
    pub tank_id: String,
    pub transaction_type: TransactionType,
    /// As entered: positive for purchase/delivery/sale, signed for adjustment.
    pub quantity_liters: f64,
    pub previous_stock: f64,
    pub new_stock: f64,
    /// Per-liter rate, if the entry was priced.
    pub rate: Option<Money>,
    pub amount: Option<Money>,
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub notes: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl StockTransaction {
    /// Quantity with the type's sign applied.
    pub fn signed_quantity(&self) -> f64 {
        self.transaction_type.signed(self.quantity_liters)
    }
}

// =============================================================================
// Shift
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum ShiftStatus {
    #[default]
    Open,
    Closed,
}

impl fmt::Display for ShiftStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftStatus::Open => write!(f, "open"),
            ShiftStatus::Closed => write!(f, "closed"),
        }
    }
}

/// An operator's shift with its cash figures (all in paise).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Shift {
    pub id: String,
    pub operator_name: String,
    #[ts(as = "String")]
    pub shift_date: NaiveDate,
    pub status: ShiftStatus,
    /// Cash taken at the nozzles.
    pub cash_collected: Money,
    /// Cash paid out during the shift.
    pub expenses: Money,
    /// Cash handed to the bank or the office safe.
    pub cash_deposit: Money,
    /// Cash the operator actually hands over at close.
    pub cash_in_hand: Money,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub closed_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
}

impl Shift {
    /// Opens a new shift with zeroed cash figures.
    pub fn open(operator_name: impl Into<String>, shift_date: NaiveDate) -> Self {
        Shift {
            id: Uuid::new_v4().to_string(),
            operator_name: operator_name.into(),
            shift_date,
            status: ShiftStatus::Open,
            cash_collected: Money::zero(),
            expenses: Money::zero(),
            cash_deposit: Money::zero(),
            cash_in_hand: Money::zero(),
            opened_at: Utc::now(),
            closed_at: None,
            notes: None,
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
