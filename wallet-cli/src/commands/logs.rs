//! Logs command - inspect the wallet's event log
//!
//! `list` browses events by flow or name, `payments` shows how deep-link
//! payment requests ended, and `stats` tallies every event.

use anyhow::Result;
use chrono::{Local, TimeZone};
use clap::{Subcommand, ValueEnum};
use colored::Colorize;
use serde_json::json;

use super::ensure_wallet_dir;
use crate::output;
use wallet_core::services::logging::{events, flows, now_ms};
use wallet_core::services::{EntryPoint, EventCount, LogEntry, LogFilter, LoggingService};

const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// Flows that record events
#[derive(Clone, Copy, ValueEnum)]
pub enum Flow {
    Session,
    Payment,
    Transfer,
    Refresh,
    Account,
}

impl Flow {
    fn name(self) -> &'static str {
        match self {
            Flow::Session => flows::SESSION,
            Flow::Payment => flows::PAYMENT,
            Flow::Transfer => flows::TRANSFER,
            Flow::Refresh => flows::REFRESH,
            Flow::Account => flows::ACCOUNT,
        }
    }
}

#[derive(Subcommand)]
pub enum LogsCommands {
    /// Show recent events, newest first
    List {
        /// Number of events to show
        #[arg(short, long, default_value = "50")]
        limit: usize,
        /// Only events of this flow
        #[arg(long, value_enum)]
        flow: Option<Flow>,
        /// Only events with this name, e.g. pin_rejected
        #[arg(long)]
        event: Option<String>,
        /// Only events that carry an error
        #[arg(long)]
        errors: bool,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Show how deep-link payment requests ended
    Payments {
        /// Look back this many days
        #[arg(long, default_value = "30")]
        days: u64,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Count every event and show where the log is stored
    Stats {
        /// Look back this many days (all time when omitted)
        #[arg(long)]
        days: Option<u64>,
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },
    /// Delete old events
    Clear {
        /// Delete events older than N days
        #[arg(long, default_value = "30")]
        older_than_days: u64,
        /// Skip confirmation prompt
        #[arg(long, short = 'f')]
        force: bool,
    },
}

pub fn run(command: LogsCommands) -> Result<()> {
    let wallet_dir = ensure_wallet_dir()?;
    let service = LoggingService::new(&wallet_dir, EntryPoint::Cli, env!("CARGO_PKG_VERSION"))?;

    match command {
        LogsCommands::List {
            limit,
            flow,
            event,
            errors,
            json,
        } => {
            let filter = LogFilter {
                flow: flow.map(|f| f.name().to_string()),
                event,
                errors_only: errors,
                since_ms: None,
            };
            list(&service, &filter, limit, json)
        }
        LogsCommands::Payments { days, json } => payments(&service, days, json),
        LogsCommands::Stats { days, json } => stats(&service, days, json),
        LogsCommands::Clear {
            older_than_days,
            force,
        } => clear(&service, older_than_days, force),
    }
}

fn since(days: u64) -> i64 {
    now_ms() - days as i64 * DAY_MS
}

fn format_timestamp(timestamp_ms: i64) -> String {
    Local
        .timestamp_millis_opt(timestamp_ms)
        .single()
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp_ms.to_string())
}

fn list(service: &LoggingService, filter: &LogFilter, limit: usize, json: bool) -> Result<()> {
    let entries = service.query(filter, limit)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }
    if entries.is_empty() {
        output::info("No matching events.");
        return Ok(());
    }

    let mut table = output::create_table();
    table.set_header(vec!["Time", "Flow", "Event", "Action", "Error"]);
    for entry in &entries {
        table.add_row(vec![
            format_timestamp(entry.timestamp),
            entry.flow.clone().unwrap_or_default(),
            entry.event.clone(),
            entry.action.clone().unwrap_or_default(),
            entry
                .error_message
                .as_deref()
                .map(|msg| msg.red().to_string())
                .unwrap_or_default(),
        ]);
    }
    println!("{}", table);

    print_details(&entries);
    Ok(())
}

/// Error details are too long for the table
fn print_details(entries: &[LogEntry]) {
    let detailed: Vec<_> = entries
        .iter()
        .filter_map(|e| e.error_details.as_deref().map(|details| (e, details)))
        .take(3)
        .collect();
    if detailed.is_empty() {
        return;
    }
    println!();
    println!("{}", "Details:".red().bold());
    for (entry, details) in detailed {
        println!(
            "  {} [{}]: {}",
            format_timestamp(entry.timestamp).dimmed(),
            entry.event,
            details
        );
    }
}

/// Outcome counts of the deep-link payment flow
#[derive(Debug, Default, PartialEq, Eq)]
struct PaymentSummary {
    /// Requests refused before PIN entry
    aborted: u64,
    /// Requests that reached PIN entry
    started: u64,
    completed: u64,
    cancelled: u64,
    pin_rejections: u64,
    transfer_failures: u64,
}

impl PaymentSummary {
    fn from_counts(counts: &[EventCount]) -> Self {
        let mut summary = Self::default();
        for count in counts
            .iter()
            .filter(|c| c.flow.as_deref() == Some(flows::PAYMENT))
        {
            let slot = match count.event.as_str() {
                events::PAYMENT_ABORTED => &mut summary.aborted,
                events::PAYMENT_STARTED => &mut summary.started,
                events::PAYMENT_COMPLETED => &mut summary.completed,
                events::PAYMENT_CANCELLED => &mut summary.cancelled,
                events::PIN_REJECTED => &mut summary.pin_rejections,
                events::TRANSFER_FAILED => &mut summary.transfer_failures,
                _ => continue,
            };
            *slot += count.total;
        }
        summary
    }

    fn requests(&self) -> u64 {
        self.started + self.aborted
    }

    /// Started but neither completed nor cancelled, e.g. the page was left
    fn abandoned(&self) -> u64 {
        self.started
            .saturating_sub(self.completed)
            .saturating_sub(self.cancelled)
    }
}

fn payments(service: &LoggingService, days: u64, json: bool) -> Result<()> {
    let summary = PaymentSummary::from_counts(&service.event_counts(since(days))?);

    if json {
        println!(
            "{}",
            json!({
                "days": days,
                "requests": summary.requests(),
                "aborted": summary.aborted,
                "started": summary.started,
                "completed": summary.completed,
                "cancelled": summary.cancelled,
                "abandoned": summary.abandoned(),
                "pin_rejections": summary.pin_rejections,
                "transfer_failures": summary.transfer_failures,
            })
        );
        return Ok(());
    }

    if summary.requests() == 0 {
        output::info(&format!("No payment requests in the last {} days.", days));
        return Ok(());
    }

    println!("{}", format!("Payment requests, last {} days", days).bold());
    let mut table = output::create_table();
    table.set_header(vec!["Outcome", "Count"]);
    table.add_row(vec!["Refused before PIN entry".to_string(), summary.aborted.to_string()]);
    table.add_row(vec!["Completed".to_string(), summary.completed.to_string().green().to_string()]);
    table.add_row(vec!["Cancelled".to_string(), summary.cancelled.to_string()]);
    table.add_row(vec!["Abandoned".to_string(), summary.abandoned().to_string()]);
    println!("{}", table);

    if summary.pin_rejections > 0 || summary.transfer_failures > 0 {
        output::warning(&format!(
            "{} wrong PIN attempts, {} failed transfers",
            summary.pin_rejections, summary.transfer_failures
        ));
    }
    Ok(())
}

fn stats(service: &LoggingService, days: Option<u64>, json: bool) -> Result<()> {
    let counts = service.event_counts(days.map(since).unwrap_or(i64::MIN))?;
    let total: u64 = counts.iter().map(|c| c.total).sum();
    let errors: u64 = counts.iter().map(|c| c.errors).sum();
    let db_path = service.db_path();
    let size_bytes = std::fs::metadata(db_path).map(|m| m.len()).unwrap_or(0);

    if json {
        println!(
            "{}",
            json!({
                "total_entries": total,
                "error_count": errors,
                "events": counts,
                "database_path": db_path.to_string_lossy(),
                "database_size_bytes": size_bytes,
            })
        );
        return Ok(());
    }

    if !counts.is_empty() {
        let mut table = output::create_table();
        table.set_header(vec!["Event", "Flow", "Count", "Errors"]);
        for count in &counts {
            let errors = if count.errors > 0 {
                count.errors.to_string().red().to_string()
            } else {
                String::new()
            };
            table.add_row(vec![
                count.event.clone(),
                count.flow.clone().unwrap_or_default(),
                count.total.to_string(),
                errors,
            ]);
        }
        println!("{}", table);
    }

    println!("  Total entries: {}", total);
    println!("  Errors: {}", errors);
    println!("  Database: {}", db_path.display());
    println!("  Size: {}", output::format_size(size_bytes));
    Ok(())
}

fn clear(service: &LoggingService, older_than_days: u64, force: bool) -> Result<()> {
    if !force {
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(format!("Delete events older than {} days?", older_than_days))
            .default(false)
            .interact()?;
        if !confirmed {
            println!("Cancelled.");
            return Ok(());
        }
    }

    let deleted = service.delete_before(since(older_than_days))?;
    output::success(&format!("Deleted {} events", deleted));
    Ok(())
}
