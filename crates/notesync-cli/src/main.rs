//! notesync CLI
//!
//! Command-line interface for notesync - a shared, live-updating note list.

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use notesync_core::{Config, OriginTag, SyncEngine, WsGateway};

mod commands;
mod output;

use output::{Output, OutputFormat};

#[derive(Parser)]
#[command(name = "notesync")]
#[command(about = "notesync - Shared notes that stay in sync")]
#[command(version)]
#[command(propagate_version = true)]
struct Cli {
    /// Output as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Quiet mode - minimal output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Use this config file instead of the default
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List all notes
    #[command(alias = "ls")]
    List,
    /// Create a note
    #[command(alias = "create")]
    Add {
        /// Note name
        #[arg(short, long, default_value = "")]
        name: String,
        /// Note description
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Flip a note between open and done
    Toggle {
        /// Note ID (full ID or prefix)
        id: String,
    },
    /// Delete a note
    #[command(alias = "delete")]
    Rm {
        /// Note ID (full ID or prefix)
        id: String,
    },
    /// Print changes made by other clients as they happen
    Watch,
    /// Show or set configuration
    Config {
        #[command(subcommand)]
        command: Option<ConfigCommands>,
    },
    /// Show client and server status
    Status,
}

#[derive(Subcommand, Clone)]
enum ConfigCommands {
    /// Show current configuration
    Show,
    /// Set a configuration value
    Set {
        /// Configuration key (server_url, request_timeout_secs, log_file)
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

    // Config commands work without a server
    if let Commands::Config { command } = &cli.command {
        return handle_config_command(command.clone(), config_path, &output);
    }

    let config =
        Config::load_with_cli_override(config_path).context("Failed to load configuration")?;
    init_logging(&config);

    if let Commands::Status = &cli.command {
        return commands::status::show(&config, &output).await;
    }

    let mut engine = connect(&config).await?;

    match cli.command {
        Commands::List => commands::notes::list(&mut engine, &output).await,
        Commands::Add { name, description } => {
            commands::notes::add(&mut engine, name, description, &output).await
        }
        Commands::Toggle { id } => commands::notes::toggle(&mut engine, id, &output).await,
        Commands::Rm { id } => commands::notes::delete(&mut engine, id, &output).await,
        Commands::Watch => commands::watch::run(&mut engine, &output).await,
        Commands::Config { .. } => unreachable!(), // Handled above
        Commands::Status => unreachable!(),        // Handled above
    }
}

fn handle_config_command(
    command: Option<ConfigCommands>,
    config_path: Option<&PathBuf>,
    output: &Output,
) -> Result<()> {
    match command {
        Some(ConfigCommands::Show) | None => commands::config::show(config_path, output),
        Some(ConfigCommands::Set { key, value }) => {
            commands::config::set(key, value, config_path, output)
        }
    }
}

/// Connect to the configured server and build an engine for this process
async fn connect(config: &Config) -> Result<SyncEngine> {
    let Some(url) = config.server_url.as_deref() else {
        bail!(
            "Server not configured. Set one with:\n  \
             notesync config set server_url ws://your-server:3030"
        );
    };

    let gateway = WsGateway::connect(url, config.request_timeout())
        .await
        .with_context(|| format!("Failed to connect to {}", url))?;

    Ok(SyncEngine::new(
        Arc::new(gateway),
        OriginTag::process().clone(),
    ))
}

/// Initialize logging, only when NOTESYNC_LOG is set
fn init_logging(config: &Config) {
    let Ok(log_level) = std::env::var("NOTESYNC_LOG") else {
        return;
    };

    let env_filter = EnvFilter::new(format!(
        "notesync_core={},notesync_cli={}",
        log_level, log_level
    ));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false);

    // Ignore error if already initialized
    let _ = match &config.log_file {
        Some(log_path) => {
            let log_file = match File::create(log_path) {
                Ok(f) => f,
                Err(e) => {
                    eprintln!("Warning: Could not create log file {:?}: {}", log_path, e);
                    return;
                }
            };
            builder.with_ansi(false).with_writer(log_file).try_init()
        }
        None => builder.with_writer(std::io::stderr).try_init(),
    };
}
