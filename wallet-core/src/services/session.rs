//! Session manager - login, auto-login, logout and the dashboard
//!
//! Owns the lifecycle of the one live session: restoring it from the
//! credential store on start, establishing it on manual login, routing a
//! fresh session either into a deep-link payment or onto the dashboard, and
//! tearing it down on logout.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::domain::action::{Action, GetTransactions, Login};
use crate::domain::messages;
use crate::domain::result::{Error, Result};
use crate::domain::{Credentials, PaymentState, Session, StoredSession};
use crate::ports::{CredentialStore, Location, View};
use crate::services::logging::{events, flows, EventLog, LogEvent};
use crate::services::{
    ActionGateway, AutoUpdater, Indicator, LoadingCoordinator, PaymentOrchestrator, SessionStore,
};

/// Outcome of the auto-login attempted when the client starts
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutoLogin {
    /// The saved credentials were accepted
    Restored,
    /// A saved session existed but could not be restored
    Failed,
    /// Nothing to restore, or the user logged out explicitly
    Skipped,
}

pub struct SessionManager {
    gateway: Arc<ActionGateway>,
    loading: Arc<LoadingCoordinator>,
    store: Arc<SessionStore>,
    credentials: Arc<dyn CredentialStore>,
    location: Arc<dyn Location>,
    view: Arc<dyn View>,
    updater: Arc<AutoUpdater>,
    payments: Arc<PaymentOrchestrator>,
    events: EventLog,
}

impl SessionManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<ActionGateway>,
        loading: Arc<LoadingCoordinator>,
        store: Arc<SessionStore>,
        credentials: Arc<dyn CredentialStore>,
        location: Arc<dyn Location>,
        view: Arc<dyn View>,
        updater: Arc<AutoUpdater>,
        payments: Arc<PaymentOrchestrator>,
        events: EventLog,
    ) -> Self {
        Self {
            gateway,
            loading,
            store,
            credentials,
            location,
            view,
            updater,
            payments,
            events,
        }
    }

    /// The live session, if any
    pub fn current(&self) -> Option<Session> {
        self.store.session()
    }

    /// Restore the saved session, once per page load
    ///
    /// With a deep-link payment request in the URL a saved session is always
    /// tried, even after an explicit logout, and kept when it fails. Without
    /// one it is tried only if the user did not log out, and erased when it
    /// fails.
    pub async fn start(&self) -> AutoLogin {
        let has_deep_link = self.location.has_deep_link();
        let record = self.credentials.load();
        let has_record = !matches!(record, Ok(None));

        if has_deep_link && has_record {
            debug!("Deep-link request present, restoring saved session");
            match self.restore(record).await {
                Ok(()) => AutoLogin::Restored,
                Err(e) => {
                    self.auto_login_failed(&e);
                    self.show_login();
                    AutoLogin::Failed
                }
            }
        } else if has_record && !self.logged_out_explicitly() {
            debug!("Restoring saved session");
            match self.restore(record).await {
                Ok(()) => AutoLogin::Restored,
                Err(e) => {
                    self.auto_login_failed(&e);
                    if let Err(e) = self.credentials.clear() {
                        warn!(error = %e, "Failed to erase saved session");
                    }
                    self.show_login();
                    AutoLogin::Failed
                }
            }
        } else {
            self.show_login();
            AutoLogin::Skipped
        }
    }

    fn logged_out_explicitly(&self) -> bool {
        self.credentials.is_logged_out().unwrap_or_else(|e| {
            warn!(error = %e, "Failed to read logout flag");
            false
        })
    }

    fn auto_login_failed(&self, error: &Error) {
        warn!(error = %error, "Auto login failed");
        self.events.record(
            LogEvent::new(events::AUTO_LOGIN_FAILED)
                .with_flow(flows::SESSION)
                .with_action(Login::NAME)
                .with_error(error.to_string()),
        );
    }

    async fn restore(&self, record: Result<Option<StoredSession>>) -> Result<()> {
        let stored = record?.ok_or_else(|| Error::Storage("no saved session".into()))?;

        self.loading
            .show(messages::LOADING_AUTO_LOGIN, async {
                let credentials = stored.credentials();
                let info = self
                    .gateway
                    .call(&Login::from(credentials.clone()), Indicator::Silent)
                    .await?;
                self.store
                    .set_session(Session::from_login(info, credentials.password));
                // Post-login failures are surfaced there and don't count
                // as a failed restore
                let _ = self.after_login().await;
                Ok::<_, Error>(())
            })
            .await
    }

    /// Authenticate with a username and password
    ///
    /// On success the session is saved for auto-login and the explicit
    /// logout flag is cleared. Failures are shown before being returned.
    pub async fn login(&self, username: &str, password: &str) -> Result<Session> {
        let credentials = Credentials::new(username, password);

        let outcome = self
            .loading
            .show(messages::LOADING_LOGIN, async {
                let info = self
                    .gateway
                    .call(&Login::from(credentials.clone()), Indicator::Shown)
                    .await?;
                let session = Session::from_login(info, credentials.password.clone());
                self.store.set_session(session.clone());
                self.persist(&session);
                let initialized = self.after_login().await;
                Ok::<_, Error>((session, initialized))
            })
            .await;

        match outcome {
            Ok((session, Ok(()))) => {
                info!(username = %session.username, "Logged in");
                self.events
                    .record(LogEvent::new(events::LOGIN_SUCCEEDED).with_flow(flows::SESSION));
                self.view
                    .show_transient_message(&messages::welcome(username), false);
                Ok(session)
            }
            // Already surfaced by post-login initialization
            Ok((_, Err(e))) => Err(e),
            Err(e) => {
                self.events.record(
                    LogEvent::new(events::LOGIN_FAILED)
                        .with_flow(flows::SESSION)
                        .with_action(Login::NAME)
                        .with_error(e.to_string()),
                );
                self.view.show_transient_message(&e.to_string(), true);
                Err(e)
            }
        }
    }

    fn persist(&self, session: &Session) {
        if let Err(e) = self.credentials.save(session) {
            warn!(error = %e, "Failed to save session for auto-login");
        }
        if let Err(e) = self.credentials.set_logged_out(false) {
            warn!(error = %e, "Failed to clear logout flag");
        }
    }

    /// Load the history, then enter the deep-link payment or the dashboard
    ///
    /// A failure is shown, the session is dropped and the login view is
    /// rendered.
    async fn after_login(&self) -> Result<()> {
        let result = self
            .loading
            .show(messages::LOADING_POST_LOGIN, async {
                let account_id = self
                    .store
                    .session()
                    .map(|session| session.account_id)
                    .ok_or_else(|| Error::state(messages::LOGIN_REQUIRED))?;
                let transactions = self
                    .gateway
                    .call(&GetTransactions { account_id }, Indicator::Silent)
                    .await?;
                self.store.set_transactions(transactions);

                if self.location.has_deep_link() {
                    // The payment flow reports its own failures
                    let _ = self.payments.begin().await;
                } else {
                    self.show_dashboard();
                }
                Ok::<_, Error>(())
            })
            .await;

        if let Err(e) = &result {
            warn!(error = %e, "Post-login initialization failed");
            self.view.show_transient_message(&e.to_string(), true);
            self.store.clear();
            self.show_login();
        }
        result
    }

    /// End the session
    ///
    /// Without a deep-link request the saved session is erased, auto-login
    /// is suppressed until the next manual login, and the client goes home.
    /// With one, the URL and the saved session are kept so the payment can
    /// be resumed.
    pub fn logout(&self) {
        self.updater.stop();
        self.payments.reset();
        self.store.clear();

        let has_deep_link = self.location.has_deep_link();
        if !has_deep_link {
            if let Err(e) = self.credentials.set_logged_out(true) {
                warn!(error = %e, "Failed to set logout flag");
            }
            if let Err(e) = self.credentials.clear() {
                warn!(error = %e, "Failed to erase saved session");
            }
        }

        self.events
            .record(LogEvent::new(events::LOGOUT).with_flow(flows::SESSION));
        self.show_login();
        self.view.show_transient_message(messages::LOGGED_OUT, false);

        if !has_deep_link {
            self.location.navigate_to_base();
        }
    }

    /// Render the login form; the auto-update loop never runs behind it
    pub fn show_login(&self) {
        self.updater.stop();
        self.view.render_login_view();
    }

    /// Render the dashboard and (re)start the auto-update loop
    ///
    /// Falls back to the login form when nobody is logged in.
    pub fn show_dashboard(&self) {
        match self.store.snapshot() {
            Some((session, transactions)) => {
                self.view.render_dashboard(&session, &transactions);
                self.updater.start();
            }
            None => self.show_login(),
        }
    }

    /// Resume the auto-update loop after connectivity returns
    ///
    /// Only the dashboard polls. While a deep-link request is open the
    /// payment forms stay on screen and the loop stays off.
    pub fn resume_updates(&self) {
        let on_dashboard = self.store.is_logged_in()
            && !self.location.has_deep_link()
            && matches!(self.payments.state(), PaymentState::Idle);
        if on_dashboard {
            self.updater.start();
        } else {
            debug!("Not on the dashboard, auto-update stays off");
        }
    }

    /// Pause the auto-update loop while offline
    pub fn pause_updates(&self) {
        self.updater.stop();
    }
}
