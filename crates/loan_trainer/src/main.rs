//! Loan approval trainer CLI
//!
//! Trains the random-forest model from the raw loan CSV and inspects or
//! applies the resulting bundle.

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use loan_model::ArtifactStore;
use loan_trainer::config::LoggingConfig;
use loan_trainer::logging::{ensure_logging, init_logging};
use loan_trainer::{predict_file, Pipeline, PipelineConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "loan-train")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Seeded random-forest trainer for loan approval", long_about = None)]
struct Cli {
    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full training pipeline
    Train {
        /// TOML configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Input CSV, overriding `data.input`
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Model bundle path, overriding `output.model_path`
        #[arg(short, long)]
        model: Option<PathBuf>,
    },

    /// Label every row of a raw CSV with a trained bundle
    Predict {
        #[arg(short, long)]
        model: PathBuf,

        #[arg(short, long)]
        input: PathBuf,
    },

    /// Print a bundle's metadata
    Inspect {
        #[arg(short, long)]
        model: PathBuf,

        /// Print the metadata and transform as JSON
        #[arg(long)]
        json: bool,
    },

    /// Write the default configuration as TOML
    InitConfig {
        #[arg(short, long, default_value = "loan_pipeline.toml")]
        output: PathBuf,

        /// Replace an existing file
        #[arg(long)]
        force: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let verbose = cli.verbose;

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            // A config that failed to load never installed its subscriber
            if ensure_logging(&LoggingConfig::default(), verbose) {
                error!(error = %format!("{err:#}"), "loan-train failed");
            } else {
                eprintln!("error: {err:#}");
            }
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Train { config, input, model } => {
            let mut pipeline_config = match &config {
                Some(path) => PipelineConfig::load_from_file(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?,
                None => PipelineConfig::default(),
            };
            pipeline_config.apply_env_overrides();
            if let Some(input) = input {
                pipeline_config.data.input = input;
            }
            if let Some(model) = model {
                pipeline_config.output.model_path = model;
            }

            init_logging(&pipeline_config.logging, cli.verbose)
                .context("Failed to set tracing subscriber")?;

            info!("Loan Approval Trainer v{}", env!("CARGO_PKG_VERSION"));
            info!("═══════════════════════════════════════════");
            info!("Input: {}", pipeline_config.data.input.display());
            info!("Trees: {}", pipeline_config.forest.n_trees);
            info!("Max features: {}", pipeline_config.forest.max_features);
            info!("Test fraction: {}", pipeline_config.split.test_fraction);
            info!("═══════════════════════════════════════════");

            let pipeline = Pipeline::new(pipeline_config).context("Invalid configuration")?;
            let outcome = pipeline.run().context("Training pipeline failed")?;

            info!("═══════════════════════════════════════════");
            info!("✓ Training completed successfully");
            info!("  Model: {}", outcome.model_path.display());
            info!("  Hash: {}", outcome.bundle.content_hash);
            info!("  Accuracy: {:.4}", outcome.report.accuracy);
        }

        Command::Predict { model, input } => {
            init_logging(&LoggingConfig::default(), cli.verbose)
                .context("Failed to set tracing subscriber")?;

            let predictions = predict_file(&model, &input)
                .with_context(|| format!("Failed to predict {}", input.display()))?;
            for prediction in predictions {
                match prediction.id {
                    Some(id) => println!("{id},{}", prediction.label),
                    None => println!("{}", prediction.label),
                }
            }
        }

        Command::Inspect { model, json } => {
            init_logging(&LoggingConfig::default(), cli.verbose)
                .context("Failed to set tracing subscriber")?;

            let bundle = ArtifactStore::new(&model)
                .read()
                .with_context(|| format!("Failed to read model {}", model.display()))?;

            if json {
                let summary = serde_json::json!({
                    "format_version": bundle.format_version,
                    "content_hash": bundle.content_hash,
                    "metadata": bundle.metadata,
                    "transform": bundle.transform,
                    "scaling": bundle.scaling,
                    "trees": bundle.forest.num_trees(),
                });
                println!(
                    "{}",
                    serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
                );
                return Ok(());
            }

            println!("path:           {}", model.display());
            println!("format_version: {}", bundle.format_version);
            println!("content_hash:   {}", bundle.content_hash);
            println!("trainer:        {}", bundle.metadata.trainer_version);
            println!("created_at:     {}", bundle.metadata.created_at);
            println!(
                "rows:           {} train / {} test",
                bundle.metadata.train_rows, bundle.metadata.test_rows
            );
            println!(
                "seeds:          split {} / forest {}",
                bundle.metadata.split_seed, bundle.metadata.forest_seed
            );
            println!("trees:          {}", bundle.forest.num_trees());
            println!("features:");
            for scale in &bundle.scaling.features {
                println!("  {:<20} mean={:.4} std={:.4}", scale.name, scale.mean, scale.std);
            }
            println!("mappings:");
            for (column, mapping) in &bundle.transform.mappings {
                let pairs: Vec<String> = mapping
                    .values
                    .iter()
                    .enumerate()
                    .map(|(code, value)| format!("{value}={code}"))
                    .collect();
                println!("  {:<20} {}", column, pairs.join(", "));
            }
        }

        Command::InitConfig { output, force } => {
            if output.exists() && !force {
                bail!("{} already exists (use --force to replace it)", output.display());
            }
            let toml = PipelineConfig::default()
                .to_toml_string()
                .context("Failed to serialize default config")?;
            std::fs::write(&output, toml)
                .with_context(|| format!("Failed to write {}", output.display()))?;
            println!("Wrote default configuration to {}", output.display());
        }
    }

    Ok(())
}
