//! CLI command definitions.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing::info;

use crate::config::Config;
use crate::inputs::BatchInputs;
use crate::ops::{HttpOpsFactory, TaskKind, TaskRegistry};
use crate::pipeline::Orchestrator;
use crate::report::OutcomeReporter;
use crate::stats::StatsCollector;

/// Default configuration file path.
const DEFAULT_CONFIG_FILE: &str = "config.yaml";

/// Default directory holding the input files.
const DEFAULT_DATA_DIR: &str = "data";

/// Account fleet orchestrator.
#[derive(Parser)]
#[command(name = "fleet-forge")]
#[command(about = "Drive batches of accounts through remote task flows")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info", global = true)]
    pub log_level: String,
}

/// Available CLI subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Run the configured batch across all selected accounts.
    Run(RunArgs),

    /// Load and validate the configuration without launching anything.
    #[command(name = "check-config")]
    CheckConfig(CheckConfigArgs),
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Directory holding the input files.
    #[arg(short, long, default_value = DEFAULT_DATA_DIR)]
    pub data_dir: PathBuf,

    /// Override the configured base seed.
    #[arg(long)]
    pub seed: Option<u64>,
}

/// Arguments for the `check-config` command.
#[derive(Parser, Debug)]
pub struct CheckConfigArgs {
    /// Path to the configuration file.
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,
}

/// Parses CLI arguments.
pub fn parse_cli() -> Cli {
    Cli::parse()
}

/// Dispatches the parsed CLI to its command handler.
pub async fn run_with_cli(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Commands::Run(args) => run_batch_command(args).await,
        Commands::CheckConfig(args) => check_config_command(args),
    }
}

async fn run_batch_command(args: RunArgs) -> anyhow::Result<()> {
    let mut config = Config::load(&args.config)?;
    if let Some(seed) = args.seed {
        config.settings.seed = Some(seed);
    }
    config.validate()?;

    let specs = config.flow.task_specs()?;
    let use_faucet_keys = specs.iter().any(|spec| spec.mentions(TaskKind::Faucet));
    let inputs = BatchInputs::load(&args.data_dir, use_faucet_keys)?;

    let config = Arc::new(config);
    let stats = Arc::new(StatsCollector::new());
    let registry = Arc::new(TaskRegistry::standard());
    let reporter = Arc::new(OutcomeReporter::new(config.report.output_dir.clone()));
    let factory = Arc::new(HttpOpsFactory::new(
        Arc::clone(&config),
        registry,
        Arc::clone(&stats),
    ));

    let orchestrator = Orchestrator::new(config, factory, reporter, stats)?;
    let batch_stats = orchestrator.run_batch(inputs).await?;

    info!(
        "Done: {}/{} accounts succeeded ({:.1}%)",
        batch_stats.succeeded,
        batch_stats.total,
        batch_stats.success_rate()
    );
    Ok(())
}

fn check_config_command(args: CheckConfigArgs) -> anyhow::Result<()> {
    let config = Config::load(&args.config)?;
    config.validate()?;

    let specs = config.flow.task_specs()?;
    info!(
        "Configuration OK: {} threads, {} attempts, {} flow slots",
        config.settings.threads,
        config.settings.attempts,
        specs.len()
    );
    for (i, spec) in specs.iter().enumerate() {
        match spec {
            crate::ops::TaskSpec::Single(kind) => info!("  {}. {kind}", i + 1),
            crate::ops::TaskSpec::OneOf(kinds) => {
                let names: Vec<String> = kinds.iter().map(|k| k.to_string()).collect();
                info!("  {}. one of: {}", i + 1, names.join(", "));
            }
        }
    }
    Ok(())
}
