//! Thin command-line front end over the recall engine: `serve` starts the
//! IPC daemon in the foreground, `health` makes a single `health.ping` call
//! against a running daemon's socket.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "recall-cli")]
#[command(about = "Start and probe the recall engine's IPC daemon")]
#[command(version)]
pub struct Cli {
    /// Configuration file path (defaults to ./recall-cli.toml if present)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Override the data directory the stores persist to
    #[arg(long, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Override the Unix-domain-socket path
    #[arg(long, value_name = "PATH")]
    socket_path: Option<PathBuf>,

    /// Enable debug-level logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the IPC daemon and block until it shuts down
    Serve,
    /// Send a single `health.ping` to a running daemon
    Health,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt().with_max_level(level).init();

    let recall_config = config::load_config(&cli)?;

    match cli.command {
        Commands::Serve => commands::serve::run(recall_config).await,
        Commands::Health => commands::health::run(&recall_config).await,
    }
}
