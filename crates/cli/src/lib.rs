pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use spreadline_core::config::{EngineConfig, LoadOptions, LogFormat};
use tracing::Level;

use commands::allocate::AllocateArgs;
use commands::reconcile::ReconcileArgs;

#[derive(Debug, Parser)]
#[command(
    name = "spreadline",
    about = "Spreadline revenue allocation CLI",
    long_about = "Spread proposal amounts month by month over the tracked horizon, reconcile yearly production, and inspect data quality.",
    after_help = "Examples:\n  spreadline allocate --input proposals.json\n  spreadline reconcile --input proposals.json --year 2026 --quarter 3\n  spreadline views --input proposals.json --today 2026-03-31\n  spreadline config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a spreadline.toml configuration file")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Allocate every proposal of a JSON batch across the tracked horizon")]
    Allocate {
        #[arg(long, help = "JSON array of proposals")]
        input: PathBuf,
        #[arg(long, help = "First tracked year (defaults to the current year)")]
        first_year: Option<i32>,
        #[arg(long, help = "Number of tracked years")]
        years: Option<u32>,
    },
    #[command(about = "Split a production year into current-year work and carryover")]
    Reconcile {
        #[arg(long)]
        input: PathBuf,
        #[arg(long)]
        year: i32,
        #[arg(long, help = "Also distribute this quarter's carryover over accounting periods")]
        quarter: Option<u32>,
        #[arg(long, help = "Use probability-weighted amounts")]
        weighted: bool,
        #[arg(long, conflicts_with = "typology", help = "Restrict to one category")]
        category: Option<String>,
        #[arg(long, help = "Restrict to one primary typology")]
        typology: Option<String>,
    },
    #[command(about = "Inspect effective configuration values with source attribution")]
    Config,
    #[command(about = "Report data-quality flags for a JSON batch")]
    Diagnose {
        #[arg(long)]
        input: PathBuf,
    },
    #[command(about = "List pending works proposals likely to sign soon")]
    Projection {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, help = "Reference date (YYYY-MM-DD), defaults to today")]
        today: Option<NaiveDate>,
    },
    #[command(about = "List pending proposals to follow up, grouped by owner")]
    Followup {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, help = "Reference date (YYYY-MM-DD), defaults to today")]
        today: Option<NaiveDate>,
    },
    #[command(about = "Build the pending, sent-this-month and won-this-month views")]
    Views {
        #[arg(long)]
        input: PathBuf,
        #[arg(long, help = "Reference date (YYYY-MM-DD), defaults to today")]
        today: Option<NaiveDate>,
    },
}

fn init_logging(config: &EngineConfig) {
    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    let _ = match config.logging.format {
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    // A broken config is reported by the command itself.
    if let Ok(config) =
        EngineConfig::load(LoadOptions { config_path: cli.config.clone(), ..LoadOptions::default() })
    {
        init_logging(&config);
    }

    let today = Local::now().date_naive();
    let config_path = cli.config;

    let result = match cli.command {
        Command::Allocate { input, first_year, years } => {
            commands::allocate::run(&AllocateArgs { input, first_year, years }, config_path, today)
        }
        Command::Reconcile { input, year, quarter, weighted, category, typology } => {
            let args = ReconcileArgs { input, year, quarter, weighted, category, typology };
            commands::reconcile::run(&args, config_path, today)
        }
        Command::Config => match commands::config::run(config_path) {
            Ok(output) => commands::CommandResult { exit_code: 0, output },
            Err(output) => commands::CommandResult { exit_code: commands::EXIT_CONFIG, output },
        },
        Command::Diagnose { input } => commands::diagnose::run(&input, config_path, today),
        Command::Projection { input, today: reference } => {
            commands::projection::run(&input, config_path, reference.unwrap_or(today))
        }
        Command::Followup { input, today: reference } => {
            commands::followup::run(&input, config_path, reference.unwrap_or(today))
        }
        Command::Views { input, today: reference } => {
            commands::views::run(&input, config_path, reference.unwrap_or(today))
        }
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
