//! # Error Types
//!
//! Domain-specific error types for fuelbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fuelbook-core errors (this file)                                      │
//! │  ├── CoreError           - General domain errors                       │
//! │  ├── ValidationError     - Bad or out-of-range input                   │
//! │  └── ConfigurationError  - Tank is not calibration-ready               │
//! │                                                                         │
//! │  fuelbook-db errors (separate crate)                                   │
//! │  └── DbError             - Database operation failures                 │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → CLI (anyhow)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! None of these are retried: recomputing with the same bad input gives the
//! same answer. The caller shows the message and lets the operator resubmit.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Tank cannot be found (or has been retired).
    ///
    /// ## When This Occurs
    /// - Tank ID doesn't exist in the configuration store
    /// - Tank was deactivated (`is_active = false`)
    #[error("Tank not found: {0}")]
    TankNotFound(String),

    /// Shift cannot be found.
    #[error("Shift not found: {0}")]
    ShiftNotFound(String),

    /// A ledger entry does not satisfy `new = previous + signed quantity`.
    ///
    /// ## When This Occurs
    /// - A transaction row was edited by hand
    /// - Two entries were recorded against a stale `previous_stock`
    #[error("Ledger mismatch on transaction {transaction_id}: expected {expected} L, found {found} L")]
    LedgerMismatch {
        transaction_id: String,
        expected: f64,
        found: f64,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Tank configuration error (wraps ConfigurationError).
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),
}

impl CoreError {
    /// True for errors the operator fixes by re-entering input.
    pub fn is_validation(&self) -> bool {
        matches!(self, CoreError::Validation(_))
    }

    /// True for unknown tank/shift references.
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::TankNotFound(_) | CoreError::ShiftNotFound(_))
    }

    /// True when the tank itself needs to be fixed before it can be used.
    pub fn is_configuration(&self) -> bool {
        matches!(self, CoreError::Configuration(_))
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur when operator input doesn't meet requirements and are raised
/// before any calculation runs.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}, got {value}")]
    OutOfRange {
        field: String,
        min: f64,
        max: f64,
        value: f64,
    },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// NaN or infinity where a measurement was expected.
    #[error("{field} must be a finite number")]
    NotFinite { field: String },

    /// Invalid format (e.g., invalid UUID, unknown product code).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },
}

// =============================================================================
// Configuration Error
// =============================================================================

/// The tank is not calibration-ready.
///
/// ## User Workflow
/// ```text
/// Operator enters dip 120.5 cm for "MS Tank 2"
///      │
///      ▼
/// Tank has no calibration chart and no diameter on file
///      │
///      ▼
/// MissingDimensions { shape: "horizontal_cylinder", missing: ["diameter_m"] }
///      │
///      ▼
/// UI shows: "MS Tank 2 needs a diameter before dips can be converted"
/// ```
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Capacity is zero or negative.
    #[error("Tank {tank} has non-positive capacity {capacity}")]
    NonPositiveCapacity { tank: String, capacity: f64 },

    /// Shape-required dimensions are absent or not positive.
    #[error("Tank {tank} ({shape}) is missing dimensions: {missing:?}")]
    MissingDimensions {
        tank: String,
        shape: String,
        missing: Vec<String>,
    },

    /// No calibration table and the shape has no closed-form formula.
    #[error("Tank {tank} ({shape}) requires a calibration table")]
    CalibrationRequired { tank: String, shape: String },

    /// Calibration table points are out of order or contain bad values.
    #[error("Tank {tank} calibration table is invalid at point {index}: {reason}")]
    InvalidCalibrationTable {
        tank: String,
        index: usize,
        reason: String,
    },

    /// A dimension was supplied but is zero, negative or not finite.
    #[error("Tank {tank} has invalid {dimension} {value}")]
    InvalidDimension {
        tank: String,
        dimension: String,
        value: f64,
    },

    /// A configured formula constant is zero, negative, or not finite.
    #[error("Tank {tank} has invalid formula constant {constant}")]
    InvalidFormulaConstant { tank: String, constant: f64 },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::TankNotFound("tank-9".to_string());
        assert_eq!(err.to_string(), "Tank not found: tank-9");

        let err = ValidationError::OutOfRange {
            field: "dip_cm".to_string(),
            min: 0.0,
            max: 200.0,
            value: 1386.0,
        };
        assert_eq!(err.to_string(), "dip_cm must be between 0 and 200, got 1386");
    }

    #[test]
    fn test_configuration_error_message() {
        let err = ConfigurationError::MissingDimensions {
            tank: "MS Tank 2".to_string(),
            shape: "horizontal_cylinder".to_string(),
            missing: vec!["diameter_m".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Tank MS Tank 2 (horizontal_cylinder) is missing dimensions: [\"diameter_m\"]"
        );
    }

    #[test]
    fn test_conversions_and_classification() {
        let core_err: CoreError = ValidationError::Required {
            field: "name".to_string(),
        }
        .into();
        assert!(core_err.is_validation());
        assert!(!core_err.is_not_found());

        let core_err: CoreError = ConfigurationError::NonPositiveCapacity {
            tank: "t".to_string(),
            capacity: 0.0,
        }
        .into();
        assert!(core_err.is_configuration());

        assert!(CoreError::ShiftNotFound("s".to_string()).is_not_found());
    }
}
