//! View port - everything the core asks the presentation layer to do

use crate::domain::{Session, Transaction};

/// Presentation collaborator
///
/// The core never touches presentation elements directly; it only calls
/// these methods. Implementations must be cheap and non-blocking because
/// they are invoked from inside async flows.
pub trait View: Send + Sync {
    /// Show (or refresh) the dashboard with the current session and history
    fn render_dashboard(&self, session: &Session, transactions: &[Transaction]);

    /// Show the login form
    fn render_login_view(&self);

    /// Show the PIN entry form of a deep-link payment
    fn render_pin_view(&self);

    /// Show the amount entry form, naming the paying account
    fn render_amount_view(&self, from_account_id: &str);

    /// Empty the PIN input after a verification attempt
    fn clear_pin_input(&self);

    /// Short-lived notification
    fn show_transient_message(&self, text: &str, is_error: bool);

    /// Reveal the busy indicator, or update its text if already visible
    fn show_busy_indicator(&self, message: &str);

    /// Hide the busy indicator
    fn hide_busy_indicator(&self);
}
