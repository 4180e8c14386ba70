//! # Validation Module
//!
//! The strict boundary between loosely-typed input (forms, CSV charts, API
//! payloads) and the calculator.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Deserialization (serde)                                      │
//! │  └── Unknown product/shape strings rejected, types enforced            │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── Dip readings: finite, non-negative, within the dipstick range     │
//! │  ├── Tank config: capacity, dimensions, calibration ordering           │
//! │  └── Ledger entries: quantity sign rules                               │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  └── NOT NULL, CHECK and foreign key constraints                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Nothing downstream of this module falls back to defaults for malformed
//! data: a tank either passes here or is rejected.

use crate::error::{ConfigurationError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{CalibrationPoint, TankConfig, TransactionType};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a tank or operator name.
///
/// ## Rules
/// - Must not be empty after trimming
/// - At most 100 characters
pub fn validate_name(field: &str, name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > 100 {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: 100,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
///
/// ## Example
/// ```rust
/// use fuelbook_core::validation::validate_uuid;
///
/// assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(validate_uuid("not-a-uuid").is_err());
/// ```
pub fn validate_uuid(id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "id".to_string(),
        });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field: "id".to_string(),
        reason: "must be a valid UUID".to_string(),
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Rejects NaN and infinities.
pub fn validate_finite(field: &str, value: f64) -> ValidationResult<()> {
    if !value.is_finite() {
        return Err(ValidationError::NotFinite {
            field: field.to_string(),
        });
    }
    Ok(())
}

/// Validates a dip reading in centimeters.
///
/// ## Rules
/// - Must be a finite number
/// - Must be `>= 0`
/// - Must be `<= max_dip_cm` (a larger value is treated as a unit-entry
///   error, never silently computed)
///
/// ## User Workflow
/// ```text
/// Operator enters 1386 (meant 138.6 cm)
///      │
///      ▼
/// validate_dip_reading(1386.0, 200.0) ← THIS FUNCTION
///      │
///      ▼
/// OutOfRange { field: "dip_cm", min: 0, max: 200, value: 1386 }
/// ```
pub fn validate_dip_reading(dip_cm: f64, max_dip_cm: f64) -> ValidationResult<()> {
    validate_finite("dip_cm", dip_cm)?;

    if dip_cm < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: "dip_cm".to_string(),
        });
    }

    if dip_cm > max_dip_cm {
        return Err(ValidationError::OutOfRange {
            field: "dip_cm".to_string(),
            min: 0.0,
            max: max_dip_cm,
            value: dip_cm,
        });
    }

    Ok(())
}

/// Validates a stock figure in liters (opening stock, measured closing).
pub fn validate_stock_liters(field: &str, liters: f64) -> ValidationResult<()> {
    validate_finite(field, liters)?;

    if liters < 0.0 {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    Ok(())
}

/// Validates a ledger quantity against its transaction type.
///
/// ## Rules
/// - Purchase, delivery and sale quantities must be positive
/// - Adjustments may be either sign but not zero
pub fn validate_transaction_quantity(
    transaction_type: TransactionType,
    quantity_liters: f64,
) -> ValidationResult<()> {
    validate_finite("quantity_liters", quantity_liters)?;

    match transaction_type {
        TransactionType::Adjustment => {
            if quantity_liters == 0.0 {
                return Err(ValidationError::Required {
                    field: "quantity_liters".to_string(),
                });
            }
        }
        _ => {
            if quantity_liters <= 0.0 {
                return Err(ValidationError::MustBePositive {
                    field: "quantity_liters".to_string(),
                });
            }
        }
    }

    Ok(())
}

/// Largest single cash figure a shift may carry: ₹1,00,00,00,00,000 (one lakh crore).
pub const MAX_CASH_AMOUNT: Money = Money::from_rupees(1_000_000_000_000);

/// Validates a cash figure that cannot be negative (collections, deposits).
///
/// The upper bound keeps shift arithmetic far inside the paise range.
pub fn validate_cash_amount(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }
    if amount > MAX_CASH_AMOUNT {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0.0,
            max: MAX_CASH_AMOUNT.rupees() as f64,
            value: amount.rupees() as f64,
        });
    }
    Ok(())
}

// =============================================================================
// Tank Configuration Validators
// =============================================================================

/// Validates a calibration table for a tank of the given capacity.
///
/// ## Rules
/// - `dip_mm` finite, non-negative and strictly ascending
/// - `volume_liters` finite, non-negative and non-decreasing
///
/// Volumes above nominal capacity are allowed (certified charts often run a
/// little over the nameplate figure); the calculator clamps them.
pub fn validate_calibration_table(tank_name: &str, table: &[CalibrationPoint]) -> CoreResult<()> {
    let invalid = |index: usize, reason: &str| ConfigurationError::InvalidCalibrationTable {
        tank: tank_name.to_string(),
        index,
        reason: reason.to_string(),
    };

    for (index, point) in table.iter().enumerate() {
        if !point.dip_mm.is_finite() || !point.volume_liters.is_finite() {
            return Err(invalid(index, "values must be finite").into());
        }
        if point.dip_mm < 0.0 || point.volume_liters < 0.0 {
            return Err(invalid(index, "values must not be negative").into());
        }
        if index > 0 {
            let prev = &table[index - 1];
            if point.dip_mm <= prev.dip_mm {
                return Err(invalid(index, "dip_mm must be strictly ascending").into());
            }
            if point.volume_liters < prev.volume_liters {
                return Err(invalid(index, "volume_liters must not decrease").into());
            }
        }
    }

    Ok(())
}

/// Validates a tank configuration before it is saved.
///
/// ## Rules
/// - Name present
/// - `capacity_liters > 0`
/// - Every dimension that is present is finite and positive
/// - Calibration table well-formed (if present)
/// - A configured formula constant must be positive
///
/// Missing dimensions and a missing chart are NOT rejected here: an operator
/// saves a tank first and attaches the dip chart afterwards. The calculator
/// raises `MissingDimensions` / `CalibrationRequired` when a dip actually
/// needs them.
pub fn validate_tank_config(tank: &TankConfig) -> CoreResult<()> {
    validate_name("name", &tank.name)?;

    if !tank.capacity_liters.is_finite() || tank.capacity_liters <= 0.0 {
        return Err(ConfigurationError::NonPositiveCapacity {
            tank: tank.name.clone(),
            capacity: tank.capacity_liters,
        }
        .into());
    }

    let dims = &tank.dimensions;
    for (dimension, value) in [
        ("diameter_m", dims.diameter_m),
        ("length_m", dims.length_m),
        ("width_m", dims.width_m),
        ("height_m", dims.height_m),
    ] {
        if let Some(value) = value.filter(|v| !v.is_finite() || *v <= 0.0) {
            return Err(ConfigurationError::InvalidDimension {
                tank: tank.name.clone(),
                dimension: dimension.to_string(),
                value,
            }
            .into());
        }
    }

    validate_calibration_table(&tank.name, &tank.calibration_table)?;

    if let Some(constant) = tank.formula_constant {
        if !constant.is_finite() || constant <= 0.0 {
            return Err(ConfigurationError::InvalidFormulaConstant {
                tank: tank.name.clone(),
                constant,
            }
            .into());
        }
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::{FuelProduct, TankDimensions, TankShape};

    fn tank() -> TankConfig {
        TankConfig::new(
            "MS Tank 1",
            FuelProduct::Petrol,
            15_000.0,
            TankShape::HorizontalCylinder,
            TankDimensions::cylinder(2.0, 4.968),
        )
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("name", "HSD Tank 1").is_ok());
        assert!(validate_name("name", "   ").is_err());
        assert!(validate_name("name", &"A".repeat(101)).is_err());
    }

    #[test]
    fn test_validate_dip_reading() {
        assert!(validate_dip_reading(0.0, 200.0).is_ok());
        assert!(validate_dip_reading(138.6, 200.0).is_ok());
        assert!(validate_dip_reading(200.0, 200.0).is_ok());

        assert!(matches!(
            validate_dip_reading(-0.1, 200.0),
            Err(ValidationError::MustNotBeNegative { .. })
        ));
        assert!(matches!(
            validate_dip_reading(1386.0, 200.0),
            Err(ValidationError::OutOfRange { .. })
        ));
        assert!(matches!(
            validate_dip_reading(f64::NAN, 200.0),
            Err(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn test_validate_transaction_quantity() {
        assert!(validate_transaction_quantity(TransactionType::Purchase, 12_000.0).is_ok());
        assert!(validate_transaction_quantity(TransactionType::Sale, 0.0).is_err());
        assert!(validate_transaction_quantity(TransactionType::Delivery, -5.0).is_err());
        assert!(validate_transaction_quantity(TransactionType::Adjustment, -5.0).is_ok());
        assert!(validate_transaction_quantity(TransactionType::Adjustment, 0.0).is_err());
    }

    #[test]
    fn test_validate_cash_amount() {
        assert!(validate_cash_amount("expenses", Money::zero()).is_ok());
        assert!(validate_cash_amount("expenses", Money::from_paise(-1)).is_err());
        assert!(validate_cash_amount("deposit", MAX_CASH_AMOUNT).is_ok());
        assert!(matches!(
            validate_cash_amount("deposit", Money::from_paise(i64::MAX)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_calibration_table_ordering() {
        let good = vec![
            CalibrationPoint::new(0.0, 0.0),
            CalibrationPoint::new(100.0, 320.0),
            CalibrationPoint::new(200.0, 900.0),
        ];
        assert!(validate_calibration_table("T", &good).is_ok());

        let unsorted = vec![
            CalibrationPoint::new(100.0, 320.0),
            CalibrationPoint::new(100.0, 330.0),
        ];
        let err = validate_calibration_table("T", &unsorted).unwrap_err();
        assert!(matches!(
            err,
            CoreError::Configuration(ConfigurationError::InvalidCalibrationTable { index: 1, .. })
        ));

        let shrinking = vec![
            CalibrationPoint::new(100.0, 320.0),
            CalibrationPoint::new(200.0, 300.0),
        ];
        assert!(validate_calibration_table("T", &shrinking).is_err());

        let negative = vec![CalibrationPoint::new(-1.0, 0.0)];
        assert!(validate_calibration_table("T", &negative).is_err());
    }

    #[test]
    fn test_validate_tank_config() {
        assert!(validate_tank_config(&tank()).is_ok());

        let mut bad = tank();
        bad.capacity_liters = 0.0;
        assert!(validate_tank_config(&bad).unwrap_err().is_configuration());

        let bad = tank().with_formula_constant(-3.0);
        assert!(validate_tank_config(&bad).is_err());

        let mut bad = tank();
        bad.name = String::new();
        assert!(validate_tank_config(&bad).unwrap_err().is_validation());
    }

    #[test]
    fn test_present_dimensions_must_be_positive() {
        for diameter in [0.0, -2.0, f64::NAN, f64::INFINITY] {
            let mut bad = tank();
            bad.dimensions.diameter_m = Some(diameter);
            assert!(matches!(
                validate_tank_config(&bad).unwrap_err(),
                CoreError::Configuration(ConfigurationError::InvalidDimension { ref dimension, .. })
                    if dimension == "diameter_m"
            ));
        }

        let mut bad = tank();
        bad.dimensions.height_m = Some(-0.5);
        assert!(validate_tank_config(&bad).is_err());

        // Absent dimensions are still allowed; the chart may come later.
        let mut partial = tank();
        partial.dimensions.length_m = None;
        assert!(validate_tank_config(&partial).is_ok());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("").is_err());
        assert!(validate_uuid("123").is_err());
    }
}
