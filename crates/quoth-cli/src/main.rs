//! Quoth CLI
//!
//! Command-line interface for Quoth - a quote collection that syncs with a
//! remote quote source.

use std::fs::OpenOptions;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::EnvFilter;

use quoth_core::{Config, QuoteRepository};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "quoth")]
#[command(about = "Quoth - Local-first quote collection with remote sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default one
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new quote
    Add {
        /// Quote text
        text: String,
        /// Category label
        #[arg(short, long)]
        category: String,
    },
    /// List quotes, optionally under one category
    #[command(alias = "ls")]
    List {
        /// Category label, or "all" (remembered for next time)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// List all categories
    Categories,
    /// Show a quote and remember it as the last viewed one
    Show {
        /// Quote ID
        id: u64,
    },
    /// Show the last viewed quote of this session
    Last {
        /// Forget the last viewed quote instead
        #[arg(long)]
        clear: bool,
    },
    /// Append quotes from a JSON file
    Import {
        /// File containing a JSON array of quotes
        file: PathBuf,
    },
    /// Export all quotes as JSON
    Export {
        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Sync once with the remote quote source
    Sync,
    /// Keep syncing on an interval until interrupted
    Watch,
    /// Show status (storage, sync settings, counts)
    Status,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (data_dir, remote_url, sync_enabled, ...)
        key: String,
        /// Configuration value
        value: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(OutputFormat::from_flags(cli.json, cli.quiet));
    let config_path = cli.config.as_ref();

    // Config commands work on the file itself, not the collection
    if let Commands::Config { command } = &cli.command {
        return match command {
            Some(ConfigCommands::Show) | None => commands::config::show(config_path, &output),
            Some(ConfigCommands::Set { key, value }) => {
                commands::config::set(key, value, config_path, &output)
            }
        };
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    let mut repo = QuoteRepository::open_with_config(&config);
    if let Some(issue) = repo.take_load_issue() {
        output.warn(&issue.notification());
    }

    match cli.command {
        Commands::Add { text, category } => {
            commands::quote::add(&mut repo, &config, &text, &category, &output).await
        }
        Commands::List { category } => commands::quote::list(&repo, category, &output),
        Commands::Categories => commands::quote::categories(&repo, &output),
        Commands::Show { id } => commands::quote::show(&repo, &config, id, &output),
        Commands::Last { clear } => commands::quote::last(&config, clear, &output),
        Commands::Import { file } => commands::transfer::import(&mut repo, &file, &output),
        Commands::Export { output: path } => {
            commands::transfer::export(&repo, path.as_deref(), &output)
        }
        Commands::Sync => commands::sync::sync(repo, &config, &output).await,
        Commands::Watch => commands::sync::watch(repo, &config, &output).await,
        Commands::Status => commands::status::show(&repo, &config, &output),
        Commands::Config { .. } => unreachable!(), // Handled above
    }
}

/// Initialize logging (only if QUOTH_LOG is set)
///
/// Logs go to `log_file` when configured, stderr otherwise.
fn init_logging(config: &Config) {
    let log_level = match std::env::var("QUOTH_LOG") {
        Ok(level) if !level.is_empty() => level,
        _ => return,
    };

    let env_filter = EnvFilter::new(format!("quoth_core={},quoth_cli={}", log_level, log_level));

    match &config.log_file {
        Some(log_path) => {
            let log_file = match OpenOptions::new().create(true).append(true).open(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not open log file {:?}: {}", log_path, e);
                    return;
                }
            };

            // Ignore error if already initialized
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(log_file)
                .try_init();

            info!("Logging initialized to {:?}", log_path);
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
}
