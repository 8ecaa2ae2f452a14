use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod config;
mod logging;

use config::{Settings, DEFAULT_CONFIG_FILE};
use tally_core::DateFormat;

#[derive(Parser)]
#[command(
    name = "tally",
    version,
    about = "Biweekly categorized ledger: import pay, expenses and statements, then roll periods forward"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Import new data and add every period that is due
    Run {
        /// Date to roll forward to (MM/DD/YY), defaults to today
        #[arg(long)]
        today: Option<String>,
        /// Report what would happen without saving the ledger
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the latest period and whether the ledger is behind
    Status {
        /// Date to compare against (MM/DD/YY), defaults to today
        #[arg(long)]
        today: Option<String>,
    },
    /// Extract paystub fields and aggregates as JSON
    Paystub {
        /// Paystub text file
        #[arg(required_unless_present = "period", conflicts_with = "period")]
        file: Option<PathBuf>,
        /// Begin date (MM/DD/YY) of the pay period whose paystub to read
        #[arg(long)]
        period: Option<String>,
    },
    /// Move a sheet between CSV and the ledger
    #[command(subcommand)]
    Sheet(SheetCommands),
    /// Show recent runs
    History {
        #[arg(short, long, default_value = "10")]
        limit: u32,
    },
}

#[derive(Subcommand)]
enum SheetCommands {
    /// Replace a sheet with the contents of a CSV file
    Import { sheet: String, csv: PathBuf },
    /// Write a sheet to stdout as CSV
    Export { sheet: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(&cli.config)?;
    logging::init(settings.paths.log_file.as_deref())?;

    match cli.command {
        Commands::Run { today, dry_run } => {
            let today = commands::parse_today(today.as_deref())?;
            tracing::info!("--------------------------------");
            tracing::info!("Opening ledger: {}", settings.paths.workbook.display());
            tracing::info!("--------------------------------");
            commands::run(&settings, today, dry_run).await
        }
        Commands::Status { today } => {
            let today = commands::parse_today(today.as_deref())?;
            commands::status(&settings, today).await
        }
        Commands::Paystub { file: Some(file), .. } => commands::paystub_file(&file),
        Commands::Paystub { period, .. } => {
            let begin = DateFormat::ShortYear.parse(period.as_deref().unwrap_or_default())?;
            commands::paystub_period(&settings, begin)
        }
        Commands::Sheet(SheetCommands::Import { sheet, csv }) => commands::sheet_import(&settings, &sheet, &csv).await,
        Commands::Sheet(SheetCommands::Export { sheet }) => commands::sheet_export(&settings, &sheet).await,
        Commands::History { limit } => commands::history(&settings, limit).await,
    }
}
