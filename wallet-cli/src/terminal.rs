//! Terminal view - renders the wallet screens to stdout

use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};

use wallet_core::adapters::headless::Screen;
use wallet_core::ports::View;
use wallet_core::{Session, Transaction};

use crate::output;

#[derive(Default)]
struct State {
    screen: Option<Screen>,
    spinner: Option<ProgressBar>,
    /// Balance and history length of the last printed dashboard
    last_dashboard: Option<(i64, usize)>,
}

/// `View` that prints to the terminal and remembers which screen is up
///
/// The prompt loop reads `screen()` to decide what to ask next. Refreshes
/// that change nothing are not reprinted.
#[derive(Default)]
pub struct TerminalView {
    state: Mutex<State>,
}

impl TerminalView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn screen(&self) -> Screen {
        self.lock().screen.unwrap_or(Screen::Blank)
    }

    /// Forget the current screen, as on a fresh page load
    pub fn reset(&self) {
        let mut state = self.lock();
        if let Some(spinner) = state.spinner.take() {
            spinner.finish_and_clear();
        }
        state.screen = None;
        state.last_dashboard = None;
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Print without tearing the spinner line
    fn print(&self, state: &State, f: impl FnOnce()) {
        match &state.spinner {
            Some(spinner) => spinner.suspend(f),
            None => f(),
        }
    }
}

impl View for TerminalView {
    fn render_dashboard(&self, session: &Session, transactions: &[Transaction]) {
        let mut state = self.lock();
        let summary = (session.balance, transactions.len());
        let unchanged =
            state.screen == Some(Screen::Dashboard) && state.last_dashboard == Some(summary);
        state.screen = Some(Screen::Dashboard);
        state.last_dashboard = Some(summary);
        if !unchanged {
            self.print(&state, || output::print_dashboard(session, transactions));
        }
    }

    fn render_login_view(&self) {
        let mut state = self.lock();
        state.screen = Some(Screen::Login);
        state.last_dashboard = None;
    }

    fn render_pin_view(&self) {
        let mut state = self.lock();
        state.screen = Some(Screen::Pin);
        self.print(&state, || output::info("Enter the PIN of the paying account."));
    }

    fn render_amount_view(&self, from_account_id: &str) {
        let mut state = self.lock();
        state.screen = Some(Screen::Amount);
        self.print(&state, || {
            output::info(&format!("Paying from {}. Enter the amount.", from_account_id))
        });
    }

    fn clear_pin_input(&self) {}

    fn show_transient_message(&self, text: &str, is_error: bool) {
        let state = self.lock();
        self.print(&state, || {
            if is_error {
                output::error(text);
            } else {
                output::success(text);
            }
        });
    }

    fn show_busy_indicator(&self, message: &str) {
        let mut state = self.lock();
        if let Some(spinner) = &state.spinner {
            spinner.set_message(message.to_string());
            return;
        }
        let spinner = ProgressBar::new_spinner();
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            spinner.set_style(style);
        }
        spinner.set_message(message.to_string());
        spinner.enable_steady_tick(Duration::from_millis(80));
        state.spinner = Some(spinner);
    }

    fn hide_busy_indicator(&self) {
        if let Some(spinner) = self.lock().spinner.take() {
            spinner.finish_and_clear();
        }
    }
}
