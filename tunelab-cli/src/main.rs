//! TuneLab CLI: turn trading telemetry into adapter fine-tuning runs.
//!
//! Commands:
//! - `extract`: derive round trips from the latest backtest file into the backtest store
//! - `prepare`: join signals with PnL, render examples, write train/eval/stats files
//! - `train`: hand the dataset to the external adapter trainer
//! - `evaluate`: score base vs base+adapter completions on the eval set

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{error, warn};
use tracing_subscriber::EnvFilter;
use tunelab_runner::export::{backtest_summary, sample_signals, SAMPLE_SIGNALS};
use tunelab_runner::{
    configured_generators, format_summary, run_evaluation, run_extraction, run_prepare,
    run_training, ExternalTrainer, ExtractionOutcome, Generator, PipelineConfig, PrepareOutcome,
    DEFAULT_CONFIG_PATH,
};

#[derive(Parser)]
#[command(
    name = "tunelab",
    about = "TuneLab CLI: trading telemetry to fine-tuning examples"
)]
struct Cli {
    /// Path to the TOML pipeline config. Defaults to training/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract derived signals from the most recent backtest file.
    Extract {
        /// Also write the derived signals as a CSV tape.
        #[arg(long)]
        tape: Option<PathBuf>,
    },
    /// Build the train/eval dataset from live and backtest signals.
    Prepare,
    /// Run the external adapter trainer on the prepared dataset.
    Train,
    /// Compare base and adapter completions on the eval set.
    Evaluate,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Extract { tape } => run_extract_cmd(&config, tape.as_deref()),
        Commands::Prepare => run_prepare_cmd(&config),
        Commands::Train => run_train_cmd(&config),
        Commands::Evaluate => run_evaluate_cmd(&config),
    }
}

/// An explicit `--config` must exist; the default path falls back to defaults.
fn load_config(path: Option<&Path>) -> Result<PipelineConfig> {
    match path {
        Some(path) => PipelineConfig::from_file(path)
            .with_context(|| format!("failed to load config {}", path.display())),
        None => {
            let default = Path::new(DEFAULT_CONFIG_PATH);
            if default.is_file() {
                PipelineConfig::from_file(default)
                    .with_context(|| format!("failed to load config {}", default.display()))
            } else {
                warn!(path = DEFAULT_CONFIG_PATH, "config file not found, using defaults");
                Ok(PipelineConfig::default())
            }
        }
    }
}

fn run_extract_cmd(config: &PipelineConfig, tape: Option<&Path>) -> Result<()> {
    match run_extraction(config, tape)? {
        Some(outcome) => print_extraction(&outcome),
        None => println!("No backtest files found in {}", config.paths.backtest_dir.display()),
    }
    Ok(())
}

fn run_prepare_cmd(config: &PipelineConfig) -> Result<()> {
    match run_prepare(config)? {
        Some(outcome) => print_prepare(&outcome),
        None => println!("No training examples created. Check your data sources."),
    }
    Ok(())
}

fn run_train_cmd(config: &PipelineConfig) -> Result<()> {
    let trainer = ExternalTrainer::from_config(config);
    match run_training(config, &trainer) {
        Ok(metadata) => {
            println!();
            println!("=== Training Complete ===");
            println!("Model:          {}", metadata.model_name);
            println!("Duration:       {}", metadata.training_duration);
            println!("Completed:      {}", metadata.training_completed);
            println!("Adapter:        {}", config.training.output_dir.display());
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "training failed");
            std::process::exit(1);
        }
    }
}

fn run_evaluate_cmd(config: &PipelineConfig) -> Result<()> {
    let (base, lora) = configured_generators(config);
    let lora_ref = lora.as_ref().map(|g| g as &dyn Generator);

    match run_evaluation(config, &base, lora_ref)? {
        Some(report) => {
            println!();
            println!("{}", format_summary(&report.metrics));
            println!("Results saved to: {}", report.results_path.display());
            println!("Metrics saved to: {}", report.metrics_path.display());
        }
        None => println!("No evaluation data available. Run `tunelab prepare` first."),
    }
    Ok(())
}

fn print_extraction(outcome: &ExtractionOutcome) {
    println!();
    println!("Processing backtest: {}", outcome.source.display());
    println!("{}", backtest_summary(&outcome.report));
    println!("Extracted {} trading signals", outcome.signals.len());
    println!("Backtest store now holds {} signals", outcome.store_rows);
    if !outcome.signals.is_empty() {
        println!();
        println!("{}", sample_signals(&outcome.signals, SAMPLE_SIGNALS));
    }
}

fn print_prepare(outcome: &PrepareOutcome) {
    let stats = &outcome.stats;
    println!();
    println!("=== Dataset ===");
    println!("Signals:        {}", outcome.signals);
    println!("PnL records:    {}", outcome.pnl_records);
    println!("Examples:       {}", outcome.examples);
    println!(
        "Split:          {} train / {} eval",
        stats.train_examples, stats.eval_examples
    );
    println!(
        "Labels:         {} profitable / {} unprofitable",
        stats.profitable_trades, stats.unprofitable_trades
    );
    println!("Dataset hash:   {}", stats.dataset_hash);
    println!("Written to:     {}", outcome.files.train.parent().unwrap_or(Path::new(".")).display());
}
