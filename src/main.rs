//! Melanet CLI
//!
//! Entry point for training and evaluating skin lesion classifiers from a
//! JSON run configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use colored::Colorize;

use melanet::backend::{backend_name, TrainingBackend};
use melanet::config::RunConfig;
use melanet::training::run::{checkpoint_path, run_training};
use melanet::utils::logging::{init_file_logging, init_logging, log_file_path, LogConfig};
use melanet::DefaultBackend;

#[derive(Parser)]
#[command(name = "melanet")]
#[command(about = "Skin lesion classification training pipeline", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Train a model from a JSON configuration, then evaluate the best
    /// checkpoint on the test set
    Train {
        /// Path to the JSON run configuration
        #[arg(short, long)]
        config: PathBuf,
    },

    /// Evaluate an existing checkpoint on the configured test set
    Evaluate {
        /// Path to the JSON run configuration
        #[arg(short, long)]
        config: PathBuf,

        /// Checkpoint path (as printed by `train`)
        #[arg(short = 'k', long)]
        checkpoint: PathBuf,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_config = if cli.verbose {
        LogConfig::verbose()
    } else {
        LogConfig::default()
    };

    match cli.command {
        Commands::Train { config } => train(&config, &log_config),
        Commands::Evaluate { config, checkpoint } => evaluate(&config, &checkpoint, &log_config),
    }
}

fn train(config_path: &PathBuf, log_config: &LogConfig) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("invalid configuration: {}", config_path.display()))?;

    let timestamp = Local::now().format("%Y%m%d-%H%M").to_string();
    let log_path = log_file_path(&config.session.sess_name, &timestamp);
    init_file_logging(log_config, &log_path)?;

    println!("{}", "Melanet Training".green().bold());
    println!("  Backend:   {}", backend_name());
    println!("  Session:   {}", config.session.sess_name);
    println!("  Extractor: {}", config.train.extractor);
    println!("  Log file:  {}", log_path.display());
    println!(
        "  Checkpoint: {}",
        checkpoint_path(&config.train.save_as_name, &timestamp).display()
    );
    println!();

    let summary = run_training::<TrainingBackend>(&config, &timestamp, Path::new("."))?;

    println!("{}", "Training Complete".green().bold());
    println!(
        "  Best val F1: {:.4} ({} saves over {} epochs)",
        summary.outcome.best_f1, summary.outcome.saves, summary.outcome.epochs_run
    );
    println!("  Checkpoint:  {}", summary.checkpoint.display());
    println!();
    println!("{}", "Test Set Results".cyan().bold());
    for (name, value) in &summary.test_report {
        println!("  {:<12} {:.4}", name, value);
    }

    Ok(())
}

fn evaluate(config_path: &PathBuf, checkpoint: &PathBuf, log_config: &LogConfig) -> Result<()> {
    let config = RunConfig::load(config_path)
        .with_context(|| format!("invalid configuration: {}", config_path.display()))?;

    if let Err(e) = init_logging(log_config) {
        eprintln!("{}", e);
    }

    let report = melanet::inference::run_test::<DefaultBackend>(&config, checkpoint)?;

    println!("{}", "Test Set Results".cyan().bold());
    println!("  Checkpoint: {}", checkpoint.display());
    for (name, value) in &report {
        println!("  {:<12} {:.4}", name, value);
    }

    Ok(())
}
