//! W-Wallet Core - session and deep-link payment orchestration
//!
//! This crate implements the client-side flows of the wallet following
//! hexagonal architecture:
//!
//! - **domain**: Core entities (Session, Transaction, PaymentState, actions)
//! - **ports**: Trait definitions for external collaborators (View, Location,
//!   Transport, CredentialStore)
//! - **services**: Flow orchestration (gateway, loading, session, payments)
//! - **adapters**: Concrete implementations (HTTP, demo backend, stores)

pub mod adapters;
pub mod config;
pub mod domain;
pub mod log_migrations;
pub mod ports;
pub mod services;

use std::fmt::Display;
use std::path::Path;
use std::sync::Arc;

use anyhow::Result;

use adapters::demo::DemoBackend;
use adapters::http::HttpTransport;
use adapters::store::JsonFileStore;
use config::Config;
use domain::messages;
use ports::{CredentialStore, Location, Transport, View};
use services::logging::events;
use services::*;

// Re-export commonly used types at crate root
pub use domain::result::{Error, Result as CoreResult};
pub use domain::{PaymentState, PendingPayment, RegistrationForm, Session, Transaction};
pub use services::AutoLogin;

/// Main context for wallet client operations
///
/// The single entry point for a page load: it owns the shared session
/// state and every flow service, wired to the given view and location.
pub struct WalletContext {
    pub config: Config,
    pub store: Arc<SessionStore>,
    pub loading: Arc<LoadingCoordinator>,
    pub gateway: Arc<ActionGateway>,
    pub updater: Arc<AutoUpdater>,
    pub payments: Arc<PaymentOrchestrator>,
    pub sessions: Arc<SessionManager>,
    pub accounts: AccountService,
    view: Arc<dyn View>,
    events: EventLog,
}

impl WalletContext {
    /// Open the client for the wallet directory
    ///
    /// Loads `settings.json`, picks the HTTP transport or the in-process
    /// demo backend, and keeps the saved session in `storage.json`
    /// (`demo-storage.json` in demo mode).
    pub fn new(
        wallet_dir: &Path,
        view: Arc<dyn View>,
        location: Arc<dyn Location>,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        let config = Config::load(wallet_dir)?;
        Self::with_config(wallet_dir, config, view, location, logger)
    }

    /// Open the client for the wallet directory with an already loaded config
    pub fn with_config(
        wallet_dir: &Path,
        config: Config,
        view: Arc<dyn View>,
        location: Arc<dyn Location>,
        logger: Option<Arc<LoggingService>>,
    ) -> Result<Self> {
        let (transport, storage_file): (Arc<dyn Transport>, &str) = if config.demo_mode {
            (Arc::new(DemoBackend::seeded()), "demo-storage.json")
        } else {
            (Arc::new(HttpTransport::from_config(&config)?), "storage.json")
        };
        let credentials = Arc::new(JsonFileStore::at(wallet_dir.join(storage_file)));
        let events = logger.map(EventLog::new).unwrap_or_default();

        Ok(Self::with_parts(
            config,
            transport,
            credentials,
            view,
            location,
            events,
        ))
    }

    /// Wire a context from explicit collaborators
    pub fn with_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        credentials: Arc<dyn CredentialStore>,
        view: Arc<dyn View>,
        location: Arc<dyn Location>,
        events: EventLog,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let loading = Arc::new(LoadingCoordinator::new(Arc::clone(&view), config.min_loading));
        let gateway = Arc::new(ActionGateway::new(transport, Arc::clone(&loading)));
        let updater = Arc::new(AutoUpdater::new(
            Arc::clone(&gateway),
            Arc::clone(&store),
            Arc::clone(&view),
            events.clone(),
            config.refresh_interval,
        ));
        let payments = Arc::new(PaymentOrchestrator::new(
            Arc::clone(&gateway),
            Arc::clone(&loading),
            Arc::clone(&store),
            Arc::clone(&location),
            Arc::clone(&view),
            events.clone(),
            config.redirect_delay,
        ));
        let sessions = Arc::new(SessionManager::new(
            Arc::clone(&gateway),
            Arc::clone(&loading),
            Arc::clone(&store),
            credentials,
            location,
            Arc::clone(&view),
            Arc::clone(&updater),
            Arc::clone(&payments),
            events.clone(),
        ));
        let accounts = AccountService::new(
            Arc::clone(&gateway),
            Arc::clone(&loading),
            Arc::clone(&view),
            Arc::clone(&sessions),
            events.clone(),
        );

        Self {
            config,
            store,
            loading,
            gateway,
            updater,
            payments,
            sessions,
            accounts,
            view,
            events,
        }
    }

    /// Run auto-login for this page load
    pub async fn start(&self) -> AutoLogin {
        self.sessions.start().await
    }

    pub async fn login(&self, username: &str, password: &str) -> CoreResult<Session> {
        self.sessions.login(username, password).await
    }

    pub fn logout(&self) {
        self.sessions.logout();
    }

    pub async fn register(&self, form: &RegistrationForm) -> CoreResult<String> {
        self.accounts.register(form).await
    }

    pub async fn submit_pin(&self, pin: &str) -> CoreResult<()> {
        self.payments.submit_pin(pin).await
    }

    pub async fn submit_amount(&self, amount: i64) -> CoreResult<()> {
        self.payments.submit_amount(amount).await
    }

    pub fn cancel_payment(&self) {
        self.payments.cancel();
    }

    /// Send funds from the dashboard, then show the refreshed dashboard
    pub async fn transfer(&self, to_account_id: &str, amount: i64) -> CoreResult<()> {
        self.payments.transfer(to_account_id, amount).await?;
        self.sessions.show_dashboard();
        Ok(())
    }

    /// The live session, if any
    pub fn session(&self) -> Option<Session> {
        self.store.session()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.store.transactions()
    }

    pub fn payment_state(&self) -> PaymentState {
        self.payments.state()
    }

    /// Last-resort handler for failures no flow caught
    ///
    /// The failure is logged. The generic error message is shown only while
    /// nothing is loading, since an active flow reports its own outcome.
    pub fn report_unhandled(&self, error: &dyn Display) {
        tracing::error!(error = %error, "Unhandled error");
        self.events.record(
            LogEvent::new(events::UNHANDLED_ERROR).with_error(error.to_string()),
        );
        if !self.loading.is_busy() {
            self.view
                .show_transient_message(messages::GENERIC_ERROR, true);
        }
    }

    /// Connectivity came back
    pub fn network_online(&self) {
        self.view
            .show_transient_message(messages::NETWORK_ONLINE, false);
        self.sessions.resume_updates();
    }

    /// Connectivity was lost
    pub fn network_offline(&self) {
        self.view
            .show_transient_message(messages::NETWORK_OFFLINE, true);
        self.sessions.pause_updates();
    }
}
