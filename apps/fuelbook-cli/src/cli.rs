//! CLI definition using clap

use chrono::NaiveDate;
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use fuelbook_core::{FuelProduct, Money, TankShape, TransactionType};

/// Output format for results
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "fuelbook")]
#[command(version)]
#[command(about = "Tank dips, stock ledger audits and shift cash for a fuel station")]
#[command(long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Database file, overriding config and FUELBOOK_DB_PATH
    #[arg(long, global = true)]
    pub db: Option<PathBuf>,

    /// Output format
    #[arg(long, short = 'f', global = true, default_value_t = OutputFormat::Table, value_enum)]
    pub format: OutputFormat,

    /// Verbose output (debug logging)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Manage storage tanks
    #[command(subcommand)]
    Tank(TankCommand),

    /// Convert a dip reading to liters
    Dip {
        /// Tank name or ID
        tank: String,

        /// Fuel depth in centimeters
        cm: f64,

        /// Write the reading to the dip log
        #[arg(long)]
        record: bool,
    },

    /// Stock ledger entries
    #[command(subcommand)]
    Ledger(LedgerCommand),

    /// Compare ledger stock against dips
    #[command(subcommand)]
    Audit(AuditCommand),

    /// Shift cash
    #[command(subcommand)]
    Shift(ShiftCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

// =============================================================================
// Tanks
// =============================================================================

#[derive(Subcommand)]
pub enum TankCommand {
    /// Register a tank
    Add(TankAddArgs),

    /// List tanks with current book stock
    List {
        /// Include retired tanks
        #[arg(long)]
        all: bool,
    },

    /// Show one tank, its chart and recent dips
    Show {
        /// Tank name or ID
        tank: String,
    },

    /// Replace a tank's certified dip chart from CSV (dip_mm,volume_liters)
    Calibrate {
        /// Tank name or ID
        tank: String,

        /// Chart file
        chart: PathBuf,
    },

    /// Retire a tank (kept for history)
    Deactivate {
        /// Tank name or ID
        tank: String,
    },
}

#[derive(Args)]
pub struct TankAddArgs {
    /// Display name, e.g. "HSD Tank 1"
    pub name: String,

    /// Product: petrol (MS), diesel (HSD) or cng
    #[arg(long, short = 'p')]
    pub product: FuelProduct,

    /// Nominal capacity in liters
    #[arg(long, short = 'c')]
    pub capacity: f64,

    /// horizontal_cylinder, rectangular, capsule or custom
    #[arg(long, default_value = "horizontal_cylinder")]
    pub shape: TankShape,

    /// Diameter in meters (cylinder, capsule)
    #[arg(long)]
    pub diameter: Option<f64>,

    /// Length in meters
    #[arg(long)]
    pub length: Option<f64>,

    /// Width in meters (rectangular)
    #[arg(long)]
    pub width: Option<f64>,

    /// Height in meters (rectangular)
    #[arg(long)]
    pub height: Option<f64>,

    /// Pin the segment-formula constant instead of deriving it
    #[arg(long, short = 'k')]
    pub constant: Option<f64>,

    /// Certified chart to attach (CSV)
    #[arg(long)]
    pub chart: Option<PathBuf>,
}

// =============================================================================
// Ledger
// =============================================================================

#[derive(Subcommand)]
pub enum LedgerCommand {
    /// Record a purchase, delivery, sale or adjustment
    Record {
        /// Tank name or ID
        tank: String,

        /// purchase, delivery, sale or adjustment
        #[arg(long = "type", short = 't')]
        transaction_type: TransactionType,

        /// Liters; adjustments may be negative
        #[arg(long, short = 'q', allow_hyphen_values = true)]
        quantity: f64,

        /// Rate per liter in rupees, e.g. 94.72
        #[arg(long)]
        rate: Option<Money>,

        /// Business date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        #[arg(long)]
        notes: Option<String>,
    },

    /// List entries for a tank
    List {
        /// Tank name or ID
        tank: String,

        /// First date (inclusive)
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Last date (inclusive)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Latest N entries when no window is given
        #[arg(long, short = 'n', default_value_t = 20)]
        limit: u32,
    },
}

// =============================================================================
// Audit
// =============================================================================

#[derive(Subcommand)]
pub enum AuditCommand {
    /// Record closing dips and audit each tank for the day
    Daily {
        /// Audit date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,

        /// Closing dip as TANK=CM; repeat per tank
        #[arg(long = "dip", value_parser = parse_dip_arg, required = true)]
        dips: Vec<(String, f64)>,
    },

    /// Audit one tank over a date window against a measured closing stock
    Tank {
        /// Tank name or ID
        tank: String,

        #[arg(long)]
        from: NaiveDate,

        /// Last date (defaults to `from`)
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Measured closing stock in liters
        #[arg(long)]
        actual: f64,
    },

    /// List stored findings
    Findings {
        #[arg(long)]
        from: Option<NaiveDate>,

        #[arg(long)]
        to: Option<NaiveDate>,

        /// Only high-severity findings
        #[arg(long)]
        high_only: bool,
    },
}

/// Parses `HSD Tank 1=138.6`. The last `=` splits, so names may contain one.
pub fn parse_dip_arg(s: &str) -> Result<(String, f64), String> {
    let (tank, cm) = s
        .rsplit_once('=')
        .ok_or_else(|| format!("expected TANK=CM, got '{}'", s))?;
    let tank = tank.trim();
    if tank.is_empty() {
        return Err(format!("missing tank in '{}'", s));
    }
    let cm: f64 = cm
        .trim()
        .parse()
        .map_err(|_| format!("invalid dip '{}' in '{}'", cm.trim(), s))?;
    Ok((tank.to_string(), cm))
}

// =============================================================================
// Shifts
// =============================================================================

#[derive(Subcommand)]
pub enum ShiftCommand {
    /// Open a shift for an operator
    Open {
        operator: String,

        /// Shift date (defaults to today)
        #[arg(long)]
        date: Option<NaiveDate>,
    },

    /// Close a shift with its cash figures and reconcile it
    Close {
        shift_id: String,

        #[command(flatten)]
        cash: CashArgs,

        #[arg(long)]
        notes: Option<String>,
    },

    /// Reconcile a stored shift's cash
    Reconcile { shift_id: String },

    /// List shifts for a date, or all open shifts
    List {
        #[arg(long, conflicts_with = "open")]
        date: Option<NaiveDate>,

        #[arg(long)]
        open: bool,
    },
}

/// Cash figures in rupees.
#[derive(Args)]
pub struct CashArgs {
    /// Total cash collected from sales
    #[arg(long)]
    pub collected: Money,

    #[arg(long, default_value = "0")]
    pub expenses: Money,

    /// Cash deposited to the bank
    #[arg(long, default_value = "0")]
    pub deposit: Money,

    /// Cash physically counted at close
    #[arg(long)]
    pub in_hand: Money,
}

// =============================================================================
// Config
// =============================================================================

#[derive(Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration
    Show,

    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
