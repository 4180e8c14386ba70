//! Command handlers

use anyhow::{bail, Context as _, Result};
use chrono::{Local, NaiveDate, Utc};
use std::path::PathBuf;
use tracing::{debug, info};

use crate::calibration::load_chart;
use crate::cli::{
    AuditCommand, CashArgs, Cli, Commands, ConfigCommand, LedgerCommand, OutputFormat,
    ShiftCommand, TankAddArgs, TankCommand,
};
use crate::config::FuelbookConfig;
use crate::output::{self, render, DipOutput, ShiftOutput, TankDetail, TankStock};
use fuelbook_core::validation::validate_uuid;
use fuelbook_core::{DipReading, TankConfig, TankDimensions};
use fuelbook_db::{Database, DbError, NewStockTransaction, ShiftCash, StockAuditor};

/// How many dip log rows `tank show` prints.
const RECENT_DIPS: u32 = 10;

/// Everything a command needs once the database is open.
struct Context {
    db: Database,
    auditor: StockAuditor,
    format: OutputFormat,
}

pub async fn execute(cli: Cli, config: FuelbookConfig) -> Result<()> {
    let Cli {
        command,
        config: config_path,
        db: db_override,
        format,
        ..
    } = cli;

    // Config commands work without a database.
    let command = match command {
        Commands::Config(cmd) => return cmd_config(cmd, &config, config_path, format),
        other => other,
    };

    let ctx = open(&config, db_override, format).await?;

    let result = match command {
        Commands::Tank(cmd) => cmd_tank(&ctx, cmd).await,
        Commands::Dip { tank, cm, record } => cmd_dip(&ctx, &tank, cm, record).await,
        Commands::Ledger(cmd) => cmd_ledger(&ctx, cmd).await,
        Commands::Audit(cmd) => cmd_audit(&ctx, cmd).await,
        Commands::Shift(cmd) => cmd_shift(&ctx, cmd).await,
        Commands::Config(_) => Ok(()),
    };

    ctx.db.close().await;
    result
}

async fn open(
    config: &FuelbookConfig,
    db_override: Option<PathBuf>,
    format: OutputFormat,
) -> Result<Context> {
    let mut db_config = config.db_config()?;
    if let Some(path) = db_override {
        db_config.database_path = path;
    }

    if let Some(parent) = db_config.database_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("creating {}", parent.display()))?;
        }
    }

    let db = Database::new(db_config).await?;
    let auditor = StockAuditor::new(db.clone())
        .with_policy(config.discrepancy_policy())
        .with_limits(config.volume_limits())
        .with_cash_tolerance(config.cash_tolerance());

    Ok(Context { db, auditor, format })
}

/// Finds a tank by ID when `reference` is a UUID, otherwise by name.
async fn find_tank(db: &Database, reference: &str) -> Result<TankConfig> {
    let tanks = db.tanks();
    let found = if validate_uuid(reference).is_ok() {
        tanks.get_by_id(reference).await?
    } else {
        tanks.get_by_name(reference).await?
    };
    found.ok_or_else(|| DbError::not_found("Tank", reference).into())
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

// =============================================================================
// Tanks
// =============================================================================

async fn cmd_tank(ctx: &Context, cmd: TankCommand) -> Result<()> {
    match cmd {
        TankCommand::Add(args) => cmd_tank_add(ctx, args).await,

        TankCommand::List { all } => {
            let tanks = if all {
                ctx.db.tanks().list_all().await?
            } else {
                ctx.db.tanks().list_active().await?
            };

            let mut rows = Vec::with_capacity(tanks.len());
            for tank in tanks {
                let book_stock_liters = ctx.db.ledger().current_stock(&tank.id).await?;
                rows.push(TankStock {
                    tank,
                    book_stock_liters,
                });
            }
            render(ctx.format, rows.as_slice(), output::print_tank_list)
        }

        TankCommand::Show { tank } => {
            let tank = find_tank(&ctx.db, &tank).await?;
            let book_stock_liters = ctx.db.ledger().current_stock(&tank.id).await?;
            let recent_dips = ctx.db.dip_readings().list_for_tank(&tank.id, RECENT_DIPS).await?;
            let detail = TankDetail {
                stock: TankStock {
                    tank,
                    book_stock_liters,
                },
                recent_dips,
            };
            render(ctx.format, &detail, output::print_tank_detail)
        }

        TankCommand::Calibrate { tank, chart } => {
            let tank = find_tank(&ctx.db, &tank).await?;
            let points = load_chart(&chart, &tank.name)
                .with_context(|| format!("reading dip chart {}", chart.display()))?;
            let updated = ctx
                .db
                .tanks()
                .replace_calibration_table(&tank.id, &points)
                .await?;
            info!(tank = %tank.name, points = points.len(), "Dip chart replaced");

            render(ctx.format, &updated, |t| {
                println!(
                    "✓ {} now converts dips from a {}-point chart",
                    t.name,
                    t.calibration_table.len()
                )
            })
        }

        TankCommand::Deactivate { tank } => {
            let tank = find_tank(&ctx.db, &tank).await?;
            ctx.db.tanks().deactivate(&tank.id).await?;
            let retired = ctx.db.tanks().require(&tank.id).await?;
            render(ctx.format, &retired, |t| println!("✓ {} retired", t.name))
        }
    }
}

async fn cmd_tank_add(ctx: &Context, args: TankAddArgs) -> Result<()> {
    let dimensions = TankDimensions {
        diameter_m: args.diameter,
        length_m: args.length,
        width_m: args.width,
        height_m: args.height,
    };

    let mut tank = TankConfig::new(args.name, args.product, args.capacity, args.shape, dimensions);
    if let Some(constant) = args.constant {
        tank = tank.with_formula_constant(constant);
    }
    if let Some(chart) = &args.chart {
        let points = load_chart(chart, &tank.name)
            .with_context(|| format!("reading dip chart {}", chart.display()))?;
        tank = tank.with_calibration_table(points);
    }

    let missing = tank.dimensions.missing_for(tank.shape);
    if !missing.is_empty() && !tank.has_calibration_table() {
        debug!(?missing, "Tank saved without full dimensions");
    }

    let saved = ctx.db.tanks().insert(&tank).await?;
    render(ctx.format, &saved, |t| {
        println!("✓ Added {} ({}, {:.0} L)", t.name, t.product.code(), t.capacity_liters);
        println!("  ID: {}", t.id);
        if !missing.is_empty() && !t.has_calibration_table() {
            println!(
                "  Note: missing {}; attach a chart with `fuelbook tank calibrate` before taking dips",
                missing.join(", ")
            );
        }
    })
}

// =============================================================================
// Dips
// =============================================================================

async fn cmd_dip(ctx: &Context, tank: &str, dip_cm: f64, record: bool) -> Result<()> {
    let tank = find_tank(&ctx.db, tank).await?;

    let output = if record {
        let reading = DipReading {
            tank_id: tank.id.clone(),
            dip_cm,
            taken_at: Utc::now(),
        };
        let (result, entry) = ctx.auditor.record_dip(&reading).await?;
        DipOutput {
            result,
            logged: Some(entry),
        }
    } else {
        DipOutput {
            result: ctx.auditor.calculate_dip(&tank.id, dip_cm).await?,
            logged: None,
        }
    };

    render(ctx.format, &output, output::print_dip)
}

// =============================================================================
// Ledger
// =============================================================================

async fn cmd_ledger(ctx: &Context, cmd: LedgerCommand) -> Result<()> {
    match cmd {
        LedgerCommand::Record {
            tank,
            transaction_type,
            quantity,
            rate,
            date,
            notes,
        } => {
            let tank = find_tank(&ctx.db, &tank).await?;
            let mut entry = NewStockTransaction::new(
                &tank.id,
                transaction_type,
                quantity,
                date.unwrap_or_else(today),
            );
            if let Some(rate) = rate {
                entry = entry.with_rate(rate);
            }
            if let Some(notes) = notes {
                entry = entry.with_notes(notes);
            }

            let txn = ctx.db.ledger().record(&entry).await?;
            render(ctx.format, &txn, output::print_transaction)
        }

        LedgerCommand::List {
            tank,
            from,
            to,
            limit,
        } => {
            let tank = find_tank(&ctx.db, &tank).await?;
            let ledger = ctx.db.ledger();

            let entries = match (from, to) {
                (None, None) => ledger.list_recent(&tank.id, limit).await?,
                (from, to) => {
                    let to = to.unwrap_or_else(today);
                    let from = from.unwrap_or(to);
                    if to < from {
                        bail!("--to ({}) is before --from ({})", to, from);
                    }
                    ledger.list_for_tank(&tank.id, from, to).await?
                }
            };
            render(ctx.format, entries.as_slice(), output::print_ledger)
        }
    }
}

// =============================================================================
// Audit
// =============================================================================

async fn cmd_audit(ctx: &Context, cmd: AuditCommand) -> Result<()> {
    match cmd {
        AuditCommand::Daily { date, dips } => {
            let date = date.unwrap_or_else(today);

            let mut readings = Vec::with_capacity(dips.len());
            for (reference, dip_cm) in dips {
                let tank = find_tank(&ctx.db, &reference).await?;
                readings.push(DipReading {
                    tank_id: tank.id,
                    dip_cm,
                    taken_at: Utc::now(),
                });
            }

            let report = ctx.auditor.run_daily_audit(date, &readings).await?;
            render(ctx.format, &report, output::print_daily_report)
        }

        AuditCommand::Tank {
            tank,
            from,
            to,
            actual,
        } => {
            let tank = find_tank(&ctx.db, &tank).await?;
            let to = to.unwrap_or(from);
            let reconciliation = ctx.auditor.audit_tank(&tank.id, from, to, actual).await?;
            render(ctx.format, &reconciliation, |r| {
                output::print_reconciliation(&tank.name, r)
            })
        }

        AuditCommand::Findings {
            from,
            to,
            high_only,
        } => {
            let to = to.unwrap_or_else(today);
            let from = from.unwrap_or(NaiveDate::MIN);
            let records = ctx.db.discrepancies().list(from, to, high_only).await?;
            render(ctx.format, records.as_slice(), output::print_findings)
        }
    }
}

// =============================================================================
// Shifts
// =============================================================================

impl From<CashArgs> for ShiftCash {
    fn from(args: CashArgs) -> Self {
        ShiftCash {
            cash_collected: args.collected,
            expenses: args.expenses,
            cash_deposit: args.deposit,
            cash_in_hand: args.in_hand,
        }
    }
}

async fn cmd_shift(ctx: &Context, cmd: ShiftCommand) -> Result<()> {
    match cmd {
        ShiftCommand::Open { operator, date } => {
            let shift = ctx
                .db
                .shifts()
                .open(&operator, date.unwrap_or_else(today))
                .await?;
            render(ctx.format, &shift, output::print_shift)
        }

        ShiftCommand::Close {
            shift_id,
            cash,
            notes,
        } => {
            let cash = ShiftCash::from(cash);
            let (shift, reconciliation) = ctx
                .auditor
                .close_shift(&shift_id, &cash, notes.as_deref())
                .await?;
            let out = ShiftOutput {
                shift,
                reconciliation,
            };
            render(ctx.format, &out, output::print_shift_reconciliation)
        }

        ShiftCommand::Reconcile { shift_id } => {
            let reconciliation = ctx.auditor.reconcile_shift(&shift_id).await?;
            let shift = ctx.db.shifts().require(&shift_id).await?;
            let out = ShiftOutput {
                shift,
                reconciliation,
            };
            render(ctx.format, &out, output::print_shift_reconciliation)
        }

        ShiftCommand::List { date, open } => {
            let shifts = if open {
                ctx.db.shifts().list_open().await?
            } else {
                ctx.db
                    .shifts()
                    .list_by_date(date.unwrap_or_else(today))
                    .await?
            };
            render(ctx.format, shifts.as_slice(), output::print_shifts)
        }
    }
}

// =============================================================================
// Config
// =============================================================================

fn cmd_config(
    cmd: ConfigCommand,
    config: &FuelbookConfig,
    config_path: Option<PathBuf>,
    format: OutputFormat,
) -> Result<()> {
    match cmd {
        ConfigCommand::Show => match format {
            OutputFormat::Json => render(format, config, |_| {}),
            OutputFormat::Table => {
                let path = config_path.or_else(FuelbookConfig::default_config_path);
                if let Some(path) = path {
                    println!("# {}", path.display());
                }
                if let Ok(db) = config.database_path() {
                    println!("# database: {}", db.display());
                }
                print!("{}", toml::to_string_pretty(config)?);
                Ok(())
            }
        },

        ConfigCommand::Init { force } => {
            let path = config_path
                .or_else(FuelbookConfig::default_config_path)
                .context("no config directory on this platform; pass --config")?;
            if path.exists() && !force {
                bail!(
                    "{} already exists (use --force to overwrite)",
                    path.display()
                );
            }

            let written = FuelbookConfig::default().save(Some(path))?;
            println!("✓ Wrote {}", written.display());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fuelbook_core::{FuelProduct, TankShape};
    use fuelbook_db::DbConfig;

    async fn context() -> Context {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let auditor = StockAuditor::new(db.clone());
        Context {
            db,
            auditor,
            format: OutputFormat::Json,
        }
    }

    #[tokio::test]
    async fn test_find_tank_by_id_or_name() {
        let ctx = context().await;
        let tank = TankConfig::new(
            "HSD Tank 1",
            FuelProduct::Diesel,
            20_000.0,
            TankShape::HorizontalCylinder,
            TankDimensions::cylinder(2.0, 6.718),
        );
        ctx.db.tanks().insert(&tank).await.unwrap();

        assert_eq!(find_tank(&ctx.db, &tank.id).await.unwrap().id, tank.id);
        assert_eq!(find_tank(&ctx.db, "HSD Tank 1").await.unwrap().id, tank.id);

        let err = find_tank(&ctx.db, "MS Tank 9").await.unwrap_err();
        let db_err = err.downcast_ref::<DbError>().unwrap();
        assert!(db_err.is_not_found());
    }

    #[tokio::test]
    async fn test_tank_add_and_dip_flow() {
        let ctx = context().await;
        let args = TankAddArgs {
            name: "MS Tank 1".to_string(),
            product: FuelProduct::Petrol,
            capacity: 15_000.0,
            shape: TankShape::HorizontalCylinder,
            diameter: Some(2.0),
            length: Some(4.968),
            width: None,
            height: None,
            constant: Some(496.8),
            chart: None,
        };
        cmd_tank_add(&ctx, args).await.unwrap();

        cmd_dip(&ctx, "MS Tank 1", 99.6, true).await.unwrap();
        let tank = find_tank(&ctx.db, "MS Tank 1").await.unwrap();
        let logged = ctx.db.dip_readings().list_for_tank(&tank.id, 5).await.unwrap();
        assert_eq!(logged.len(), 1);

        assert!(cmd_dip(&ctx, "MS Tank 1", 250.0, false).await.is_err());
    }

    #[tokio::test]
    async fn test_shift_close_short() {
        let ctx = context().await;
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let shift = ctx.db.shifts().open("Ravi", date).await.unwrap();

        cmd_shift(
            &ctx,
            ShiftCommand::Close {
                shift_id: shift.id.clone(),
                cash: CashArgs {
                    collected: "10000".parse().unwrap(),
                    expenses: "2000".parse().unwrap(),
                    deposit: "3000".parse().unwrap(),
                    in_hand: "4800".parse().unwrap(),
                },
                notes: None,
            },
        )
        .await
        .unwrap();

        let reconciliation = ctx.auditor.reconcile_shift(&shift.id).await.unwrap();
        assert!(!reconciliation.balanced);
        assert!(reconciliation.is_short());
    }
}
