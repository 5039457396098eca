//! Headless view
//!
//! A `View` that renders nothing and records every call instead. Hosts
//! without a screen (scripts, embedding applications, tests) use it to
//! observe where the flows took the user.

use std::sync::Mutex;

use crate::domain::{Session, Transaction};
use crate::ports::View;

/// One recorded view call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ViewEvent {
    Dashboard {
        account_id: String,
        balance: i64,
        transactions: usize,
    },
    Login,
    Pin,
    Amount {
        from_account_id: String,
    },
    PinCleared,
    Message {
        text: String,
        is_error: bool,
    },
    BusyShown(String),
    BusyHidden,
}

/// Screen the user is currently looking at
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Blank,
    Login,
    Dashboard,
    Pin,
    Amount,
}

#[derive(Default)]
pub struct HeadlessView {
    events: Mutex<Vec<ViewEvent>>,
}

impl HeadlessView {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, event: ViewEvent) {
        self.lock().push(event);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ViewEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Every call so far
    pub fn events(&self) -> Vec<ViewEvent> {
        self.lock().clone()
    }

    /// Drain the recorded calls
    pub fn take_events(&self) -> Vec<ViewEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Transient messages shown so far, as `(text, is_error)`
    pub fn messages(&self) -> Vec<(String, bool)> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ViewEvent::Message { text, is_error } => Some((text.clone(), *is_error)),
                _ => None,
            })
            .collect()
    }

    pub fn last_message(&self) -> Option<(String, bool)> {
        self.messages().pop()
    }

    /// Whether the busy indicator is currently visible
    pub fn busy_visible(&self) -> bool {
        self.lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                ViewEvent::BusyShown(_) => Some(true),
                ViewEvent::BusyHidden => Some(false),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Texts the busy indicator displayed, in order
    pub fn busy_messages(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter_map(|event| match event {
                ViewEvent::BusyShown(text) => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    /// The screen rendered last
    pub fn screen(&self) -> Screen {
        self.lock()
            .iter()
            .rev()
            .find_map(|event| match event {
                ViewEvent::Dashboard { .. } => Some(Screen::Dashboard),
                ViewEvent::Login => Some(Screen::Login),
                ViewEvent::Pin => Some(Screen::Pin),
                ViewEvent::Amount { .. } => Some(Screen::Amount),
                _ => None,
            })
            .unwrap_or(Screen::Blank)
    }

    /// How many times the dashboard was rendered
    pub fn dashboard_renders(&self) -> usize {
        self.lock()
            .iter()
            .filter(|event| matches!(event, ViewEvent::Dashboard { .. }))
            .count()
    }
}

impl View for HeadlessView {
    fn render_dashboard(&self, session: &Session, transactions: &[Transaction]) {
        self.push(ViewEvent::Dashboard {
            account_id: session.account_id.clone(),
            balance: session.balance,
            transactions: transactions.len(),
        });
    }

    fn render_login_view(&self) {
        self.push(ViewEvent::Login);
    }

    fn render_pin_view(&self) {
        self.push(ViewEvent::Pin);
    }

    fn render_amount_view(&self, from_account_id: &str) {
        self.push(ViewEvent::Amount {
            from_account_id: from_account_id.to_string(),
        });
    }

    fn clear_pin_input(&self) {
        self.push(ViewEvent::PinCleared);
    }

    fn show_transient_message(&self, text: &str, is_error: bool) {
        self.push(ViewEvent::Message {
            text: text.to_string(),
            is_error,
        });
    }

    fn show_busy_indicator(&self, message: &str) {
        self.push(ViewEvent::BusyShown(message.to_string()));
    }

    fn hide_busy_indicator(&self) {
        self.push(ViewEvent::BusyHidden);
    }
}
