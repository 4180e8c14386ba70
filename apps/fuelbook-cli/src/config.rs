//! # Station Configuration
//!
//! Settings for the `fuelbook` binary: where the books live, how dips are
//! bounded, and how much variance the audits tolerate.
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Command-line flags (--db, --config)            (highest priority)  │
//! │                                                                         │
//! │  2. Environment Variables                                              │
//! │     FUELBOOK_DB_PATH=/srv/pump/fuelbook.db                             │
//! │     FUELBOOK_MAX_DIP_CM=250                                            │
//! │     FUELBOOK_TOLERANCE_LITERS=10                                       │
//! │     FUELBOOK_CASH_TOLERANCE_PAISE=100                                  │
//! │     FUELBOOK_LOG_LEVEL=debug                                           │
//! │                                                                         │
//! │  3. TOML Config File                                                   │
//! │     ~/.config/fuelbook/fuelbook.toml (Linux)                           │
//! │     ~/Library/Application Support/com.fuelbook.fuelbook/... (macOS)    │
//! │                                                                         │
//! │  4. Default Values                                 (lowest priority)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [database]
//! path = "/srv/pump/fuelbook.db"
//! max_connections = 5
//!
//! [calculation]
//! max_dip_cm = 200.0
//!
//! [audit]
//! tolerance_liters = 5.0
//! high_absolute_liters = 100.0
//! high_capacity_fraction = 0.01
//!
//! [shift]
//! cash_tolerance_paise = 0
//!
//! [logging]
//! level = "info"
//! ```

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, info, warn};

use fuelbook_core::{
    DiscrepancyPolicy, Money, VolumeLimits, DEFAULT_TOLERANCE_LITERS,
    HIGH_SEVERITY_CAPACITY_FRACTION, HIGH_SEVERITY_LITERS, MAX_DIP_CM,
};
use fuelbook_db::DbConfig;

// =============================================================================
// Errors
// =============================================================================

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    /// A setting is out of range.
    #[error("Invalid configuration: {0}")]
    Invalid(String),

    /// Failed to read or parse the config file.
    #[error("Failed to load config: {0}")]
    LoadFailed(String),

    /// Failed to write the config file.
    #[error("Failed to save config: {0}")]
    SaveFailed(String),

    /// The platform has no home/config directory to fall back on.
    #[error("Could not determine the {0} directory")]
    NoPlatformDir(&'static str),
}

impl From<std::io::Error> for ConfigError {
    fn from(err: std::io::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::LoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for ConfigError {
    fn from(err: toml::ser::Error) -> Self {
        ConfigError::SaveFailed(err.to_string())
    }
}

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

// =============================================================================
// Sections
// =============================================================================

/// `[database]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseSettings {
    /// SQLite file. Defaults to the platform data directory.
    #[serde(default)]
    pub path: Option<PathBuf>,

    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        DatabaseSettings {
            path: None,
            max_connections: default_max_connections(),
        }
    }
}

/// `[calculation]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalculationSettings {
    /// Largest dip accepted, in centimeters.
    #[serde(default = "default_max_dip_cm")]
    pub max_dip_cm: f64,
}

fn default_max_dip_cm() -> f64 {
    MAX_DIP_CM
}

impl Default for CalculationSettings {
    fn default() -> Self {
        CalculationSettings {
            max_dip_cm: default_max_dip_cm(),
        }
    }
}

/// `[audit]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSettings {
    /// Variance absorbed as dipstick noise.
    #[serde(default = "default_tolerance_liters")]
    pub tolerance_liters: f64,

    /// Variance above which a finding is `high`.
    #[serde(default = "default_high_absolute_liters")]
    pub high_absolute_liters: f64,

    /// Share of capacity above which a finding is `high`.
    #[serde(default = "default_high_capacity_fraction")]
    pub high_capacity_fraction: f64,
}

fn default_tolerance_liters() -> f64 {
    DEFAULT_TOLERANCE_LITERS
}
fn default_high_absolute_liters() -> f64 {
    HIGH_SEVERITY_LITERS
}
fn default_high_capacity_fraction() -> f64 {
    HIGH_SEVERITY_CAPACITY_FRACTION
}

impl Default for AuditSettings {
    fn default() -> Self {
        AuditSettings {
            tolerance_liters: default_tolerance_liters(),
            high_absolute_liters: default_high_absolute_liters(),
            high_capacity_fraction: default_high_capacity_fraction(),
        }
    }
}

/// `[shift]`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShiftSettings {
    /// Cash difference (paise) still treated as balanced. Zero means exact.
    #[serde(default)]
    pub cash_tolerance_paise: i64,
}

/// `[logging]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default filter level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: default_log_level(),
        }
    }
}

// =============================================================================
// Main Configuration
// =============================================================================

/// Complete station configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FuelbookConfig {
    #[serde(default)]
    pub database: DatabaseSettings,

    #[serde(default)]
    pub calculation: CalculationSettings,

    #[serde(default)]
    pub audit: AuditSettings,

    #[serde(default)]
    pub shift: ShiftSettings,

    #[serde(default)]
    pub logging: LoggingSettings,
}

impl FuelbookConfig {
    /// Loads configuration from file, environment, and defaults.
    ///
    /// ## Load Order (later overrides earlier)
    /// 1. Default values
    /// 2. Config file (fuelbook.toml)
    /// 3. Environment variables
    pub fn load(config_path: Option<PathBuf>) -> ConfigResult<Self> {
        let mut config = Self::default();

        if let Some(path) = config_path.or_else(Self::default_config_path) {
            if path.exists() {
                info!(?path, "Loading config from file");
                let contents = std::fs::read_to_string(&path)?;
                config = toml::from_str(&contents)?;
            } else {
                debug!(?path, "Config file not found, using defaults");
            }
        }

        config.apply_env_overrides();
        config.validate()?;

        Ok(config)
    }

    /// Loads config or returns default if load fails.
    pub fn load_or_default(config_path: Option<PathBuf>) -> Self {
        Self::load(config_path).unwrap_or_else(|e| {
            warn!("Failed to load config: {}. Using defaults.", e);
            Self::default()
        })
    }

    /// Saves configuration to file, returning the path written.
    pub fn save(&self, config_path: Option<PathBuf>) -> ConfigResult<PathBuf> {
        let path = config_path
            .or_else(Self::default_config_path)
            .ok_or(ConfigError::NoPlatformDir("config"))?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ConfigError::SaveFailed(e.to_string()))?;
        }

        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&path, contents).map_err(|e| ConfigError::SaveFailed(e.to_string()))?;

        info!(?path, "Config saved");
        Ok(path)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.database.max_connections == 0 {
            return Err(ConfigError::Invalid(
                "database.max_connections must be greater than 0".into(),
            ));
        }

        let max_dip = self.calculation.max_dip_cm;
        if !max_dip.is_finite() || max_dip <= 0.0 {
            return Err(ConfigError::Invalid(format!(
                "calculation.max_dip_cm must be positive, got {}",
                max_dip
            )));
        }

        let audit = &self.audit;
        if !audit.tolerance_liters.is_finite() || audit.tolerance_liters < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "audit.tolerance_liters must be zero or more, got {}",
                audit.tolerance_liters
            )));
        }
        if !audit.high_absolute_liters.is_finite()
            || audit.high_absolute_liters < audit.tolerance_liters
        {
            return Err(ConfigError::Invalid(format!(
                "audit.high_absolute_liters ({}) must not be below tolerance_liters ({})",
                audit.high_absolute_liters, audit.tolerance_liters
            )));
        }
        if !(audit.high_capacity_fraction > 0.0 && audit.high_capacity_fraction <= 1.0) {
            return Err(ConfigError::Invalid(format!(
                "audit.high_capacity_fraction must be in (0, 1], got {}",
                audit.high_capacity_fraction
            )));
        }

        if self.shift.cash_tolerance_paise < 0 {
            return Err(ConfigError::Invalid(
                "shift.cash_tolerance_paise must not be negative".into(),
            ));
        }

        if !LOG_LEVELS.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}, got {}",
                LOG_LEVELS.join(", "),
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Applies environment variable overrides.
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Applies overrides from any key lookup. Unparseable numbers are
    /// ignored with a warning.
    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(path) = lookup("FUELBOOK_DB_PATH") {
            debug!(path = %path, "Overriding database path from environment");
            self.database.path = Some(PathBuf::from(path));
        }

        if let Some(value) = lookup("FUELBOOK_MAX_DIP_CM") {
            match value.parse::<f64>() {
                Ok(cm) => self.calculation.max_dip_cm = cm,
                Err(_) => warn!(value = %value, "Ignoring FUELBOOK_MAX_DIP_CM"),
            }
        }

        if let Some(value) = lookup("FUELBOOK_TOLERANCE_LITERS") {
            match value.parse::<f64>() {
                Ok(liters) => self.audit.tolerance_liters = liters,
                Err(_) => warn!(value = %value, "Ignoring FUELBOOK_TOLERANCE_LITERS"),
            }
        }

        if let Some(value) = lookup("FUELBOOK_CASH_TOLERANCE_PAISE") {
            match value.parse::<i64>() {
                Ok(paise) => self.shift.cash_tolerance_paise = paise,
                Err(_) => warn!(value = %value, "Ignoring FUELBOOK_CASH_TOLERANCE_PAISE"),
            }
        }

        if let Some(level) = lookup("FUELBOOK_LOG_LEVEL") {
            self.logging.level = level;
        }
    }

    /// Returns the default config file path.
    pub fn default_config_path() -> Option<PathBuf> {
        project_dirs().map(|dirs| dirs.config_dir().join("fuelbook.toml"))
    }

    // =========================================================================
    // Convenience Methods
    // =========================================================================

    /// Resolved database file: the configured path or the platform data dir.
    pub fn database_path(&self) -> ConfigResult<PathBuf> {
        if let Some(path) = &self.database.path {
            return Ok(path.clone());
        }
        project_dirs()
            .map(|dirs| dirs.data_dir().join("fuelbook.db"))
            .ok_or(ConfigError::NoPlatformDir("data"))
    }

    /// Pool settings for the resolved database file.
    pub fn db_config(&self) -> ConfigResult<DbConfig> {
        Ok(DbConfig::new(self.database_path()?).max_connections(self.database.max_connections))
    }

    pub fn discrepancy_policy(&self) -> DiscrepancyPolicy {
        DiscrepancyPolicy {
            tolerance_liters: self.audit.tolerance_liters,
            high_absolute_liters: self.audit.high_absolute_liters,
            high_capacity_fraction: self.audit.high_capacity_fraction,
        }
    }

    pub fn volume_limits(&self) -> VolumeLimits {
        VolumeLimits {
            max_dip_cm: self.calculation.max_dip_cm,
        }
    }

    pub fn cash_tolerance(&self) -> Money {
        Money::from_paise(self.shift.cash_tolerance_paise)
    }
}

fn project_dirs() -> Option<directories::ProjectDirs> {
    directories::ProjectDirs::from("com", "fuelbook", "fuelbook")
}
