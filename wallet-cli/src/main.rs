//! W-Wallet CLI - the wallet client in your terminal

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod output;
mod terminal;

use commands::{demo, logs, open};

/// W-Wallet - send and receive W from your terminal
#[derive(Parser)]
#[command(name = "ww", version, about, long_about = None)]
struct Cli {
    /// Diagnostic output level (error, warn, info, debug, trace)
    #[arg(long, global = true, env = "WALLET_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open the wallet at an address, following any payment request in it
    Open {
        /// Address to open, e.g. https://wallet.local/?from=ACC123
        url: Option<String>,
        /// Use the built-in demo backend for this session
        #[arg(long)]
        demo: bool,
    },

    /// View and manage the event log
    Logs {
        #[command(subcommand)]
        command: logs::LogsCommands,
    },

    /// Manage demo mode
    Demo {
        #[command(subcommand)]
        command: Option<demo::DemoCommands>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&format!("{:#}", e));
            ExitCode::FAILURE
        }
    }
}

/// Diagnostics go to stderr so they stay out of the prompts
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Open { url, demo } => open::run(url, demo).await,
        Commands::Logs { command } => logs::run(command),
        Commands::Demo { command } => demo::run(command),
    }
}
