//! # nightly-sync
//!
//! Command line entry point for the warehouse report jobs.
//!
//! ## Commands
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  nightly-sync [--config PATH] <command>                                 │
//! │                                                                         │
//! │  run [JOB...]              Run table jobs, then dashboards              │
//! │  list                      Show configured jobs                         │
//! │  convert ITEM UNIT QTY     Convert a quantity to the item's base unit   │
//! │  uom-check                 Report rejected items and table issues       │
//! │  history [--limit N]       Show recent job runs                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use chrono::Utc;
use clap::{Parser, Subcommand};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use nightly_sync::config::EtlConfig;
use nightly_sync::dashboards::run_dashboard;
use nightly_sync::jobs::{run_recorded, JobContext, WriteMode};
use wms_db::Database;
use wms_report::{DashboardClient, ReportClient, UomCache};

#[derive(Debug, Parser)]
#[command(name = "nightly-sync", version, about = "Warehouse report ETL jobs")]
struct Cli {
    /// Config file (default: platform config dir)
    #[arg(long, short, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Run all jobs, or only the named ones
    Run {
        jobs: Vec<String>,
    },
    /// List configured jobs
    List,
    /// Convert a quantity to the item's base unit
    Convert {
        item: String,
        unit: String,
        quantity: String,
    },
    /// Load the conversion table and print its problems
    UomCheck,
    /// Show recent job runs
    History {
        #[arg(long, default_value_t = 20)]
        limit: u32,
        /// Print as JSON lines
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();
    let config = EtlConfig::load(cli.config).context("Failed to load configuration")?;

    match cli.command {
        Command::Run { jobs } => run(&config, &jobs).await,
        Command::List => {
            list(&config);
            Ok(ExitCode::SUCCESS)
        }
        Command::Convert {
            item,
            unit,
            quantity,
        } => {
            let (client, cache) = uom_setup(&config)?;
            let table = cache.get_or_load(&client).await?;
            let converted = table
                .convert_to_base_units(&item, &unit, quantity.as_str())
                .with_context(|| format!("Cannot convert {quantity} {unit} of {item}"))?;
            let base = table
                .get(&item)
                .and_then(|entry| entry.base_unit.as_deref())
                .unwrap_or("base units");
            println!("{converted} {base}");
            Ok(ExitCode::SUCCESS)
        }
        Command::UomCheck => {
            let (client, cache) = uom_setup(&config)?;
            let table = cache.get_or_load(&client).await?;
            println!("{} items", table.len());

            let mut rejected: Vec<_> = table.rejected().iter().collect();
            rejected.sort_by(|a, b| a.0.cmp(b.0));
            for (item, reason) in &rejected {
                println!("rejected  {item}: {reason}");
            }
            for issue in table.issues() {
                println!("issue     {issue}");
            }
            Ok(if rejected.is_empty() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::History { limit, json } => {
            let db = Database::new(config.db_config()?).await?;
            for run in db.job_runs().recent(limit).await? {
                if json {
                    println!("{}", serde_json::to_string(&run)?);
                } else {
                    println!(
                        "{}  {:<24} {:<10} rows={:<8} {}",
                        run.started_at.format("%Y-%m-%d %H:%M:%S"),
                        run.job,
                        run.status.as_str(),
                        run.rows_written,
                        run.error.as_deref().unwrap_or("")
                    );
                }
            }
            db.close().await;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn uom_setup(config: &EtlConfig) -> anyhow::Result<(ReportClient, UomCache)> {
    config.require_api()?;
    let client = ReportClient::new(config.client_config())?;
    let cache = UomCache::new(config.uom.partial_policy, config.unit_aliases());
    Ok((client, cache))
}

fn list(config: &EtlConfig) {
    for job in &config.jobs {
        let mode = match &job.write {
            WriteMode::Upsert { keys } => format!("upsert({})", keys.join(",")),
            WriteMode::ReplaceWindow { column } => format!("replace_window({column})"),
            WriteMode::Snapshot => "snapshot".to_string(),
        };
        println!(
            "table      {:<24} {} -> {} [{}]{}{}",
            job.name,
            job.report,
            job.table,
            mode,
            if job.needs_uom() { " +uom" } else { "" },
            if job.key_source.is_some() { " +keys" } else { "" }
        );
    }
    for dashboard in &config.dashboards {
        println!("dashboard  {:<24} {}", dashboard.name, dashboard.report);
    }
}

async fn run(config: &EtlConfig, names: &[String]) -> anyhow::Result<ExitCode> {
    config.require_api()?;
    let (tables, dashboards) = config.select(names)?;
    let tz = config.tz()?;

    let (client, cache) = uom_setup(config)?;
    let db = Database::new(config.db_config()?).await?;
    let ctx = JobContext {
        source: &client,
        db: &db,
        uom: &cache,
        now: Utc::now().with_timezone(&tz),
    };

    info!(
        tables = tables.len(),
        dashboards = dashboards.len(),
        "Starting nightly sync"
    );

    let mut failed = 0usize;
    for job in tables {
        if run_recorded(job, &ctx).await.is_err() {
            failed += 1;
        }
    }

    if !dashboards.is_empty() {
        let pusher = DashboardClient::new(config.request_timeout())?;
        for dashboard in dashboards {
            if let Err(err) = run_dashboard(dashboard, &client, &pusher, &ctx.now).await {
                error!(dashboard = %dashboard.name, error = %err, "Dashboard job failed");
                failed += 1;
            }
        }
    }

    db.close().await;

    if failed > 0 {
        warn!(failed, "Nightly sync finished with failures");
        Ok(ExitCode::FAILURE)
    } else {
        info!("Nightly sync finished");
        Ok(ExitCode::SUCCESS)
    }
}
