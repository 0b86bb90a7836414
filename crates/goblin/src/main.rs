// SPDX-FileCopyrightText: 2026 Goblin Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Goblin - a quota-aware Telegram AI assistant backend.
//!
//! This is the binary entry point: it loads configuration, opens storage,
//! wires the pipeline, and runs the Telegram polling loop.

mod serve;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

/// Goblin - a quota-aware Telegram AI assistant backend.
#[derive(Parser, Debug)]
#[command(name = "goblin", version, about, long_about = None)]
struct Cli {
    /// Path to a config file (defaults to the XDG hierarchy).
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the assistant and poll Telegram for updates.
    Serve,
    /// Load the configuration, report problems, and exit.
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => goblin_config::load_config_from_path(path),
        None => goblin_config::load_config(),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("goblin: invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.agent.log_level.clone())),
        )
        .init();

    match cli.command {
        Some(Commands::Serve) | None => match serve::run(config).await {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!(error = %e, "goblin exited with an error");
                ExitCode::FAILURE
            }
        },
        Some(Commands::CheckConfig) => {
            println!(
                "goblin: config ok (agent.name={}, storage.database_path={})",
                config.agent.name, config.storage.database_path
            );
            ExitCode::SUCCESS
        }
    }
}
