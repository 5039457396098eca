//! Demo command - switch between the real backend and the demo backend

use anyhow::Result;
use clap::Subcommand;
use colored::Colorize;

use super::ensure_wallet_dir;
use wallet_core::config::{Config, DEMO_MODE_ENV};

#[derive(Subcommand)]
pub enum DemoCommands {
    /// Enable demo mode
    #[command(name = "on")]
    On,
    /// Disable demo mode
    #[command(name = "off")]
    Off,
    /// Show demo mode status
    Status,
}

pub fn run(command: Option<DemoCommands>) -> Result<()> {
    let wallet_dir = ensure_wallet_dir()?;
    let mut config = Config::load(&wallet_dir)?;

    match command {
        Some(DemoCommands::On) => {
            config.enable_demo_mode();
            config.save(&wallet_dir)?;
            println!("{}", "Demo mode enabled".green());
            println!("Log in as alice/p1 or bob/p2. Both PINs are 1234.");
        }
        Some(DemoCommands::Off) => {
            config.disable_demo_mode();
            config.save(&wallet_dir)?;
            println!("{}", "Demo mode disabled".yellow());
        }
        Some(DemoCommands::Status) | None => {
            if config.demo_mode {
                println!("Demo mode is {}", "ON".green());
            } else {
                println!("Demo mode is {}", "OFF".yellow());
            }
            if std::env::var(DEMO_MODE_ENV).is_ok() {
                println!("{}", format!("(set by {})", DEMO_MODE_ENV).dimmed());
            }
        }
    }
    Ok(())
}
