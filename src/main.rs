// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

mod config;
mod overtime_allocation;
mod report_error;
mod report_io;
mod report_table;
mod report_tests;
mod timesheet_loader;

use config::ReportConfig;

/// Splits a timesheet export into regular and overtime hours per day.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Output CSV path [default: REPORT_OUTPUT_PATH or report_output.csv]
    output: Option<PathBuf>,

    /// Timesheet CSV to read; a bare file name is looked up in the input directory
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Directory searched for the newest timesheet CSV [default: REPORT_INPUT_DIR or redmine]
    #[arg(long)]
    input_dir: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn init_tracing(level: &str) -> Result<()> {
    let filter = EnvFilter::try_new(level)
        .with_context(|| format!("Invalid log level directive '{}'", level))?;
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Setting tracing subscriber failed")?;
    Ok(())
}

fn run(cli: Cli, config: ReportConfig) -> Result<()> {
    let input_dir = cli.input_dir.unwrap_or(config.input_dir);
    let output = cli.output.unwrap_or(config.output_path);

    let input = report_io::resolve_input(cli.input.as_deref(), &input_dir)
        .context("Could not locate the timesheet export")?;
    info!("Using timesheet {}", input.display());

    report_io::generate_report(&input, &output)
        .with_context(|| format!("Failed to generate report from {}", input.display()))?;
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = ReportConfig::from_env().context("Failed to load REPORT_* configuration")?;

    let level = if cli.verbose {
        "debug"
    } else {
        config.log_level.as_str()
    };
    init_tracing(level)?;
    info!("Configuration loaded: {:?}", config);

    // anyhow prints the error chain to stderr and exits non-zero.
    run(cli, config)
}
