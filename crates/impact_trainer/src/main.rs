//! Impact scorer CLI
//!
//! Trains the impact score model on a registry export and writes a
//! prediction report, or re-scores an export with a persisted model.

use anyhow::{Context, Result};
use canopy_impact_core::PipelineConfig;
use canopy_impact_trainer::{run_scoring, run_training, ImpactReport, VERSION};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(name = "impact-scorer")]
#[command(author = "Carbon Canopy Contributors")]
#[command(version = VERSION)]
#[command(about = "Impact score trainer for carbon-offset projects", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    common: CommonArgs,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train the model and write predictions for a sample of projects (default)
    Train,
    /// Score every filtered project with a previously saved model
    Score,
}

#[derive(Args, Debug)]
struct CommonArgs {
    /// TOML configuration file; flags override its values
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Registry export CSV
    #[arg(short, long, global = true)]
    input: Option<PathBuf>,

    /// Prediction report path
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,

    /// Model artifact path (written by train, read by score)
    #[arg(short, long, global = true)]
    model: Option<PathBuf>,

    /// Country projects must be registered in
    #[arg(long, global = true)]
    country: Option<String>,

    /// Minimum estimated annual credits
    #[arg(long, global = true)]
    min_credits: Option<f64>,

    /// Maximum training epochs
    #[arg(long, global = true)]
    epochs: Option<usize>,

    /// Number of projects written to the training report
    #[arg(long, global = true)]
    sample_size: Option<usize>,

    /// Random seed for splitting, initialization and sampling
    #[arg(long, global = true)]
    seed: Option<i64>,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

impl CommonArgs {
    fn resolve(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_toml_file(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        if let Some(input) = &self.input {
            config.input_path = input.clone();
        }
        if let Some(output) = &self.output {
            config.output_path = output.clone();
        }
        if let Some(model) = &self.model {
            config.model_path = model.clone();
        }
        if let Some(country) = &self.country {
            config.target_country = country.clone();
        }
        if let Some(min_credits) = self.min_credits {
            config.min_estimated_credits = min_credits;
        }
        if let Some(seed) = self.seed {
            config.random_seed = seed;
        }
        if let Some(epochs) = self.epochs {
            config.training.epochs = epochs;
        }
        if let Some(sample_size) = self.sample_size {
            config.sample_size = sample_size;
        }
        config.validate().context("Invalid configuration")?;
        Ok(config)
    }
}

fn init_tracing(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_str().to_ascii_lowercase()));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_target(false)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.common.verbose)?;

    let config = cli.common.resolve()?;

    info!("Carbon Canopy impact scorer v{}", VERSION);
    info!("═══════════════════════════════════════════");

    let report = match cli.command.unwrap_or(Command::Train) {
        Command::Train => run_training(&config),
        Command::Score => run_scoring(&config, &config.model_path),
    }
    .context("Failed to write impact report")?;

    info!("═══════════════════════════════════════════");
    match report {
        ImpactReport::Predictions(predictions) => info!(
            "✓ Wrote {} predictions to {}",
            predictions.len(),
            config.output_path.display()
        ),
        ImpactReport::Failure { error } => info!(
            "✗ Run failed, error report written to {}: {}",
            config.output_path.display(),
            error
        ),
    }

    Ok(())
}
