//! CLI command implementations

pub mod demo;
pub mod logs;
pub mod open;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use wallet_core::services::{EntryPoint, LogEvent, LoggingService};

/// Get the logging service for CLI operations
///
/// Returns None if logging fails to initialize (shouldn't block operations)
pub fn get_logger() -> Option<Arc<LoggingService>> {
    let wallet_dir = get_wallet_dir().ok()?;
    std::fs::create_dir_all(&wallet_dir).ok()?;
    LoggingService::new(&wallet_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))
        .map(Arc::new)
        .ok()
}

/// Log an event, ignoring any errors (logging should never break the app)
pub fn log_event(logger: &Option<Arc<LoggingService>>, event: LogEvent) {
    if let Some(l) = logger {
        let _ = l.log(event);
    }
}

/// Get the wallet directory from environment or default
pub fn get_wallet_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var("WALLET_DIR") {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(".wwallet"))
        .context("Could not find home directory")
}

/// Get the wallet directory, creating it if needed
pub fn ensure_wallet_dir() -> Result<PathBuf> {
    let wallet_dir = get_wallet_dir()?;
    std::fs::create_dir_all(&wallet_dir)
        .with_context(|| format!("Failed to create wallet directory: {:?}", wallet_dir))?;
    Ok(wallet_dir)
}
