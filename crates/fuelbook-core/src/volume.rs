//! # Volume Module
//!
//! Converts a dip-stick reading into liters.
//!
//! ## Strategy Selection
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  calculate_volume(tank, dip_cm)                                         │
//! │       │                                                                 │
//! │       ├── dip invalid? ───────────────► ValidationError                 │
//! │       ├── capacity <= 0? ─────────────► ConfigurationError              │
//! │       │                                                                 │
//! │       ├── calibration table present ──► linear interpolation (mm)       │
//! │       │                                                                 │
//! │       └── no table, by shape:                                           │
//! │           ├── horizontal_cylinder ────► circular-segment formula        │
//! │           ├── capsule ────────────────► segment + hemispherical caps    │
//! │           ├── rectangular ────────────► prism                           │
//! │           └── custom ─────────────────► ConfigurationError              │
//! │                                                                         │
//! │  volume clamped to [0, capacity], rounded to whole liters              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Segment Formula
//! With `r` the tank radius and `h = dip / r` (so `h` runs 0..2):
//! ```text
//! area   = acos(1 - h) - (1 - h) * sqrt(1 - (1 - h)^2)
//! volume = constant * 10000 * area / 1000
//! ```
//! `constant` is `100 * length_m * r_m^2` for a flat-ended cylinder. For the
//! station's 2 m reference tanks this gives 671.8 (HSD) and 496.8 (MS).

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use ts_rs::TS;

use crate::error::{ConfigurationError, CoreError, CoreResult};
use crate::types::{CalibrationPoint, DipReading, FuelProduct, TankConfig, TankShape};
use crate::validation::{validate_calibration_table, validate_dip_reading};
use crate::MAX_DIP_CM;

// =============================================================================
// Limits
// =============================================================================

/// Sanity bounds applied to incoming dip readings.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct VolumeLimits {
    /// Largest dip accepted, in centimeters.
    pub max_dip_cm: f64,
}

impl Default for VolumeLimits {
    fn default() -> Self {
        VolumeLimits {
            max_dip_cm: MAX_DIP_CM,
        }
    }
}

// =============================================================================
// Result Types
// =============================================================================

/// Where a segment-formula constant came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ConstantSource {
    /// Pinned on the tank record.
    Configured,
    /// Computed from diameter and length.
    Derived,
}

/// Which strategy produced a volume.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum FormulaUsed {
    CalibrationTable {
        points: usize,
    },
    CylinderSegment {
        constant: f64,
        source: ConstantSource,
    },
    CapsuleSegment {
        constant: f64,
        source: ConstantSource,
    },
    RectangularPrism {
        base_area_m2: f64,
    },
}

impl FormulaUsed {
    /// Short label shown next to the result and stored with dip logs.
    pub fn label(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for FormulaUsed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FormulaUsed::CalibrationTable { points } => {
                write!(f, "calibration_table({} points)", points)
            }
            FormulaUsed::CylinderSegment { constant, .. } => {
                write!(f, "cylinder_segment(k={:.1})", constant)
            }
            FormulaUsed::CapsuleSegment { constant, .. } => {
                write!(f, "capsule_segment(k={:.1})", constant)
            }
            FormulaUsed::RectangularPrism { base_area_m2 } => {
                write!(f, "rectangular_prism(base={:.3}m2)", base_area_m2)
            }
        }
    }
}

/// Output of a dip conversion. Derived, never stored as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CalculationResult {
    pub tank_id: String,
    pub tank_name: String,
    pub product: FuelProduct,
    /// The dip exactly as submitted.
    pub dip_cm: f64,
    /// Whole liters, within `[0, capacity_liters]`.
    pub volume_liters: f64,
    /// `round(volume / capacity * 100)`, within `[0, 100]`.
    pub remaining_percentage: u8,
    pub capacity_liters: f64,
    pub formula_used: FormulaUsed,
}

// =============================================================================
// Entry Points
// =============================================================================

/// Converts a dip reading with the default limits.
pub fn calculate_volume(tank: &TankConfig, dip_cm: f64) -> CoreResult<CalculationResult> {
    calculate_volume_with(tank, dip_cm, &VolumeLimits::default())
}

/// Converts a dip reading into liters for `tank`.
///
/// Pure: no persistence, no clock. Errors leave no partial result.
pub fn calculate_volume_with(
    tank: &TankConfig,
    dip_cm: f64,
    limits: &VolumeLimits,
) -> CoreResult<CalculationResult> {
    validate_dip_reading(dip_cm, limits.max_dip_cm)?;

    let capacity = tank.capacity_liters;
    if !capacity.is_finite() || capacity <= 0.0 {
        return Err(ConfigurationError::NonPositiveCapacity {
            tank: tank.name.clone(),
            capacity,
        }
        .into());
    }

    let (raw_volume, formula_used) = if tank.has_calibration_table() {
        validate_calibration_table(&tank.name, &tank.calibration_table)?;
        let volume = interpolate(&tank.calibration_table, dip_cm * 10.0, capacity);
        (
            volume,
            FormulaUsed::CalibrationTable {
                points: tank.calibration_table.len(),
            },
        )
    } else {
        formula_volume(tank, dip_cm)?
    };

    let volume_liters = raw_volume.clamp(0.0, capacity).round();

    Ok(CalculationResult {
        tank_id: tank.id.clone(),
        tank_name: tank.name.clone(),
        product: tank.product,
        dip_cm,
        volume_liters,
        remaining_percentage: remaining_percentage(volume_liters, capacity),
        capacity_liters: capacity,
        formula_used,
    })
}

/// Finds `reading.tank_id` among `tanks` and converts the reading.
///
/// Retired tanks are treated as unknown.
pub fn calculate_for_reading(
    tanks: &[TankConfig],
    reading: &DipReading,
    limits: &VolumeLimits,
) -> CoreResult<CalculationResult> {
    let tank = resolve_tank(tanks, &reading.tank_id)?;
    calculate_volume_with(tank, reading.dip_cm, limits)
}

/// Looks up an active tank by ID.
pub fn resolve_tank<'a>(tanks: &'a [TankConfig], tank_id: &str) -> CoreResult<&'a TankConfig> {
    tanks
        .iter()
        .find(|t| t.id == tank_id && t.is_active)
        .ok_or_else(|| CoreError::TankNotFound(tank_id.to_string()))
}

/// `round(volume / capacity * 100)`, clamped to 0..=100.
pub fn remaining_percentage(volume_liters: f64, capacity_liters: f64) -> u8 {
    if capacity_liters <= 0.0 {
        return 0;
    }
    (volume_liters / capacity_liters * 100.0).round().clamp(0.0, 100.0) as u8
}

// =============================================================================
// Calibration Table
// =============================================================================

/// Linear interpolation over a validated, ascending dip chart.
///
/// - Exact entry → that entry's volume
/// - Below the first entry → the first entry's volume
/// - Above the last entry → `capacity_liters`
pub fn interpolate(table: &[CalibrationPoint], dip_mm: f64, capacity_liters: f64) -> f64 {
    let (first, last) = match (table.first(), table.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };

    if dip_mm <= first.dip_mm {
        return first.volume_liters;
    }
    if dip_mm > last.dip_mm {
        return capacity_liters;
    }

    // First index whose dip is >= the reading; always in 1..len here.
    let upper = table.partition_point(|p| p.dip_mm < dip_mm);
    let hi = &table[upper];
    if hi.dip_mm == dip_mm {
        return hi.volume_liters;
    }
    let lo = &table[upper - 1];

    let fraction = (dip_mm - lo.dip_mm) / (hi.dip_mm - lo.dip_mm);
    lo.volume_liters + fraction * (hi.volume_liters - lo.volume_liters)
}

// =============================================================================
// Closed-Form Formulas
// =============================================================================

/// Unit-radius circular-segment area for `h` in 0..=2.
pub fn segment_area_factor(h: f64) -> f64 {
    let h = h.clamp(0.0, 2.0);
    let c = 1.0 - h;
    c.acos() - c * (1.0 - c * c).max(0.0).sqrt()
}

/// Segment-formula volume in liters for a normalized depth.
pub fn segment_volume(constant: f64, h: f64) -> f64 {
    constant * 10_000.0 * segment_area_factor(h) / 1000.0
}

fn formula_volume(tank: &TankConfig, dip_cm: f64) -> CoreResult<(f64, FormulaUsed)> {
    let shape = tank.shape;
    let mut missing = tank.dimensions.missing_for(shape);
    let cylindrical = matches!(shape, TankShape::HorizontalCylinder | TankShape::Capsule);
    if cylindrical && tank.formula_constant.is_some() {
        // A pinned constant already encodes the length.
        missing.retain(|name| name != "length_m");
    }
    if !missing.is_empty() {
        return Err(ConfigurationError::MissingDimensions {
            tank: tank.name.clone(),
            shape: shape.to_string(),
            missing,
        }
        .into());
    }

    let dims = &tank.dimensions;
    match shape {
        TankShape::HorizontalCylinder | TankShape::Capsule => {
            // Both unwraps are guarded by `missing_for` above.
            let radius_m = dims.diameter_m.unwrap_or_default() / 2.0;
            let (constant, source) = resolve_constant(tank, radius_m)?;

            let h = (dip_cm / (radius_m * 100.0)).min(2.0);
            let mut volume = segment_volume(constant, h);

            if shape == TankShape::Capsule {
                // Two hemispherical ends fill like one sphere of the same radius.
                let depth_m = (dip_cm / 100.0).min(2.0 * radius_m);
                volume += PI * depth_m * depth_m * (3.0 * radius_m - depth_m) / 3.0 * 1000.0;
                Ok((volume, FormulaUsed::CapsuleSegment { constant, source }))
            } else {
                Ok((volume, FormulaUsed::CylinderSegment { constant, source }))
            }
        }
        TankShape::Rectangular => {
            let length = dims.length_m.unwrap_or_default();
            let width = dims.width_m.unwrap_or_default();
            let height = dims.height_m.unwrap_or_default();

            let depth_m = (dip_cm / 100.0).min(height);
            let base_area_m2 = length * width;
            Ok((
                base_area_m2 * depth_m * 1000.0,
                FormulaUsed::RectangularPrism { base_area_m2 },
            ))
        }
        TankShape::Custom => Err(ConfigurationError::CalibrationRequired {
            tank: tank.name.clone(),
            shape: shape.to_string(),
        }
        .into()),
    }
}

fn resolve_constant(tank: &TankConfig, radius_m: f64) -> CoreResult<(f64, ConstantSource)> {
    match tank.formula_constant {
        Some(constant) if constant.is_finite() && constant > 0.0 => {
            Ok((constant, ConstantSource::Configured))
        }
        Some(constant) => Err(ConfigurationError::InvalidFormulaConstant {
            tank: tank.name.clone(),
            constant,
        }
        .into()),
        None => {
            let length_m = tank.dimensions.length_m.unwrap_or_default();
            Ok((100.0 * length_m * radius_m * radius_m, ConstantSource::Derived))
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
