//! sptest-rr - speaking-test record reconciler
//!
//! **Usage:**
//! ```bash
//! sptest-rr [--root <DIR>] [--config <FILE>] [--export <FILE>] <find-duplicates|process|compile>
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use sptest_common::config::{RootFolderResolver, TomlConfig};
use sptest_common::layout::RecordsLayout;
use sptest_rr::{CliFormatter, Pipeline, Stages};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Reconcile speaking-test records
#[derive(Parser, Debug)]
#[clap(name = "sptest-rr")]
#[clap(about = "Complete, de-duplicate and summarize speaking-test records")]
struct Args {
    /// Records root directory (overrides SPTEST_RECORDS_ROOT and the config file)
    #[clap(long, value_name = "DIR")]
    root: Option<PathBuf>,

    /// Configuration file (overrides SPTEST_CONFIG and the platform default)
    #[clap(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Also write the run report as JSON
    #[clap(long, value_name = "FILE")]
    export: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    /// Move stale duplicate records to quarantine
    FindDuplicates,
    /// Complete headless records, move stale duplicates, rebuild summaries
    Process,
    /// Rebuild class summaries only
    Compile,
}

impl Command {
    fn stages(self) -> Stages {
        match self {
            Command::FindDuplicates => Stages::FIND_DUPLICATES,
            Command::Process => Stages::PROCESS,
            Command::Compile => Stages::COMPILE,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Command::FindDuplicates => "find-duplicates",
            Command::Process => "process",
            Command::Compile => "compile",
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let config = TomlConfig::discover(args.config.as_deref());
    let level = config
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());

    // RUST_LOG wins over the configured level; progress output owns stdout
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&level)),
        )
        .with_writer(std::io::stderr)
        .init();

    match config
        .context("Invalid configuration")
        .and_then(|config| run(&args, config))
    {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args, config: TomlConfig) -> Result<()> {
    let root = RootFolderResolver::new(args.root.clone(), &config).resolve();
    info!(root = %root.display(), command = args.command.name(), "Starting sptest-rr");

    let pipeline = Pipeline::new(RecordsLayout::new(&root), config);
    let report = pipeline
        .run(args.command.stages(), args.command.name())
        .with_context(|| format!("Cannot process records root {}", root.display()))?;

    print!("{}", CliFormatter::format_report(&report));

    if let Some(export_path) = &args.export {
        match report.export_json(export_path) {
            Ok(()) => println!("\nReport exported to: {}", export_path.display()),
            Err(e) => error!("Failed to export report to {}: {}", export_path.display(), e),
        }
    }

    Ok(())
}
