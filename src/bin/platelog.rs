use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use platecam::config::PlatecamConfig;
use platecam::log_store::{CsvLogStore, LogAudit, LogCategory, LogStore, LogSummary};
use serde::Serialize;

/// Inspect the plate logs written by platecam.
#[derive(Parser, Debug)]
#[command(name = "platelog")]
#[command(about = "Inspect platecam entry, exit and fishy logs")]
#[command(version)]
struct Args {
    /// Path to platecam configuration file (for log locations and slot count)
    #[arg(short = 'c', long, default_value = "platecam.toml")]
    config: PathBuf,

    /// Read logs from this directory instead of log.directory
    #[arg(short = 'd', long)]
    directory: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Record counts, occupancy and the plates currently inside
    Summary {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Plates that entered and have not exited
    Present {
        #[arg(long)]
        json: bool,
    },
    /// Exit attempts with no matching entry
    Fishy {
        #[arg(long)]
        json: bool,
    },
    /// Report malformed rows and duplicate entries; exits non-zero if any are found
    Check {
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Serialize)]
struct CheckReport {
    clean: bool,
    logs: Vec<LogAudit>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("platecam=warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let mut config = PlatecamConfig::load_from_file(&args.config)
        .with_context(|| format!("Failed to load configuration from {}", args.config.display()))?;
    if let Some(directory) = &args.directory {
        config.log.directory = directory.display().to_string();
    }

    let store = CsvLogStore::from_config(&config.log).context("Invalid log configuration")?;

    match args.command {
        Command::Summary { json } => {
            let summary = LogSummary::collect(&store, config.parking.total_slots).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                println!("Entries:  {}", summary.entry_records);
                println!("Exits:    {}", summary.exit_records);
                println!("Fishy:    {}", summary.fishy_records);
                println!(
                    "Occupied: {} / {}",
                    summary.occupancy.occupied, summary.occupancy.total_slots
                );
                println!("Vacant:   {}", summary.occupancy.vacant);
                if !summary.present.is_empty() {
                    println!();
                    println!("Inside:");
                    for plate in &summary.present {
                        println!("  {}", plate);
                    }
                }
            }
        }
        Command::Present { json } => {
            let summary = LogSummary::collect(&store, config.parking.total_slots).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&summary.present)?);
            } else {
                for plate in &summary.present {
                    println!("{}", plate);
                }
            }
        }
        Command::Fishy { json } => {
            let records = store.load_records(LogCategory::Fishy).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else {
                for record in &records {
                    println!("{}  {}", record.recorded_at, record.plate);
                }
            }
        }
        Command::Check { json } => {
            let format = config.plate_format()?;
            let logs = LogCategory::ALL
                .iter()
                .map(|category| LogAudit::run(*category, &store.path(*category), &format))
                .collect::<Result<Vec<_>, _>>()?;
            let report = CheckReport {
                clean: logs.iter().all(LogAudit::is_clean),
                logs,
            };

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_check(&store, &report);
            }

            if !report.clean {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}

fn print_check(store: &CsvLogStore, report: &CheckReport) {
    for audit in &report.logs {
        let path = store.path(audit.category);
        if audit.missing {
            println!("✗ {} log missing: {}", audit.category, path.display());
            continue;
        }
        if audit.is_clean() {
            println!("✓ {} log: {} row(s)", audit.category, audit.rows);
            continue;
        }

        println!("✗ {} log: {} row(s), {}", audit.category, audit.rows, path.display());
        if !audit.header_ok {
            println!("    header is not \"Plate Number,Time\"");
        }
        for row in &audit.malformed {
            println!("    line {}: {}", row.line, row.reason);
        }
        for (plate, count) in &audit.duplicates {
            println!("    {} recorded {} times", plate, count);
        }
    }
}
