//! Output formatting utilities

use colored::Colorize;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, CellAlignment, ContentArrangement, Table};

use wallet_core::domain::Direction;
use wallet_core::{Session, Transaction};

/// Print a success message
pub fn success(msg: &str) {
    println!("{}", msg.green());
}

/// Print an error message
pub fn error(msg: &str) {
    eprintln!("{}", msg.red());
}

/// Print a warning message
pub fn warning(msg: &str) {
    println!("{}", msg.yellow());
}

/// Print an info message
pub fn info(msg: &str) {
    println!("{}", msg.cyan());
}

/// Create a styled table
pub fn create_table() -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Format bytes as human-readable size
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Format a whole-unit amount, e.g. `1,500 W`
pub fn format_amount(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    let sign = if amount < 0 { "-" } else { "" };
    format!("{}{} W", sign, grouped)
}

/// Print the account header and transaction history
pub fn print_dashboard(session: &Session, transactions: &[Transaction]) {
    println!();
    println!(
        "{} {} ({})",
        "Account".bold(),
        session.username.bold(),
        session.account_id.dimmed()
    );
    println!("{} {}", "Balance".bold(), format_amount(session.balance).green().bold());

    if transactions.is_empty() {
        println!("{}", "No transactions yet.".dimmed());
        return;
    }

    let mut table = create_table();
    table.set_header(vec!["Date", "Counterparty", "Account", "Amount"]);
    for tx in transactions {
        let (name, account_id) = tx.counterparty_for(&session.account_id);
        let signed = tx.signed_amount_for(&session.account_id);
        let amount = match tx.direction_for(&session.account_id) {
            Direction::Received => format!("+{}", format_amount(signed)).green().to_string(),
            Direction::Sent => format_amount(signed).red().to_string(),
        };
        table.add_row(vec![
            Cell::new(tx.date.format("%Y-%m-%d %H:%M")),
            Cell::new(name),
            Cell::new(account_id),
            Cell::new(amount).set_alignment(CellAlignment::Right),
        ]);
    }
    println!("{}", table);
}
