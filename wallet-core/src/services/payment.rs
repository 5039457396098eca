//! Payment orchestrator - deep-link payments and direct transfers
//!
//! A deep-link payment (`?from=<accountId>`) pulls funds from the linked
//! account into the visitor's own, gated by the linked account's PIN:
//!
//! 1. `begin`: check that the source account has a PIN, then ask for it
//! 2. `submit_pin`: verify the PIN, then ask for the amount
//! 3. `submit_amount`: run the transfer, refresh the history, redirect home
//!
//! `cancel` abandons the flow at any point. Every step surfaces its own
//! failure through the view before returning the error; callers must not
//! show it again.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::domain::account::validate_pin;
use crate::domain::action::{Action, CheckPin, GetTransactions, Transfer, VerifyPin};
use crate::domain::messages;
use crate::domain::payment::validate_amount;
use crate::domain::result::{Error, Result};
use crate::domain::{PaymentState, PendingPayment};
use crate::ports::{Location, View};
use crate::services::logging::{events, flows, EventLog, LogEvent};
use crate::services::{ActionGateway, Indicator, LoadingCoordinator, SessionStore};

/// Default pause between a final payment message and the redirect home
pub const DEFAULT_REDIRECT_DELAY: Duration = Duration::from_millis(2000);

pub struct PaymentOrchestrator {
    gateway: Arc<ActionGateway>,
    loading: Arc<LoadingCoordinator>,
    store: Arc<SessionStore>,
    location: Arc<dyn Location>,
    view: Arc<dyn View>,
    events: EventLog,
    redirect_delay: Duration,
    state: Mutex<PaymentState>,
    /// Bumped on every begin and cancel; results of older flows are dropped
    epoch: AtomicU64,
}

impl PaymentOrchestrator {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        gateway: Arc<ActionGateway>,
        loading: Arc<LoadingCoordinator>,
        store: Arc<SessionStore>,
        location: Arc<dyn Location>,
        view: Arc<dyn View>,
        events: EventLog,
        redirect_delay: Duration,
    ) -> Self {
        Self {
            gateway,
            loading,
            store,
            location,
            view,
            events,
            redirect_delay,
            state: Mutex::new(PaymentState::Idle),
            epoch: AtomicU64::new(0),
        }
    }

    /// Current step of the deep-link flow
    pub fn state(&self) -> PaymentState {
        self.lock().clone()
    }

    /// The payment in progress, if any
    pub fn pending(&self) -> Option<PendingPayment> {
        self.lock().pending().cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, PaymentState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn current_epoch(&self) -> u64 {
        self.epoch.load(Ordering::SeqCst)
    }

    /// Apply a transition; the state is left as is when it is refused
    fn advance(&self, transition: impl FnOnce(PaymentState) -> Result<PaymentState>) -> Result<()> {
        let mut state = self.lock();
        *state = transition(state.clone())?;
        debug!(state = state.name(), "Payment state changed");
        Ok(())
    }

    /// Whether the flow that started at `epoch` is still the live one
    fn is_current(&self, epoch: u64) -> bool {
        let current = self.current_epoch() == epoch;
        if !current {
            debug!("Discarding result of a cancelled payment flow");
        }
        current
    }

    fn surface(&self, error: &Error) {
        self.view.show_transient_message(&error.to_string(), true);
    }

    /// Navigate home once the redirect delay has passed
    fn schedule_redirect(&self) {
        let location = Arc::clone(&self.location);
        let delay = self.redirect_delay;
        debug!(delay_ms = delay.as_millis() as u64, "Redirect scheduled");
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            location.navigate_to_base();
        });
    }

    /// Start a deep-link payment for the logged-in visitor
    ///
    /// On failure the flow is reset, the message is shown and the client
    /// is sent home after the redirect delay.
    pub async fn begin(&self) -> Result<()> {
        if let Err(e) = self.advance(PaymentState::begin_check) {
            self.surface(&e);
            return Err(e);
        }
        let epoch = self.epoch.fetch_add(1, Ordering::SeqCst) + 1;

        match self.check_source().await {
            Ok(pending) => {
                if !self.is_current(epoch) {
                    return Ok(());
                }
                self.advance(|state| state.pin_configured(pending))?;
                self.events
                    .record(LogEvent::new(events::PAYMENT_STARTED).with_flow(flows::PAYMENT));
                self.view.render_pin_view();
                Ok(())
            }
            Err(e) => {
                if !self.is_current(epoch) {
                    return Ok(());
                }
                *self.lock() = PaymentState::Idle;
                info!(error = %e, "Deep-link payment aborted");
                self.events.record(
                    LogEvent::new(events::PAYMENT_ABORTED)
                        .with_flow(flows::PAYMENT)
                        .with_action(CheckPin::NAME)
                        .with_error(e.to_string()),
                );
                self.surface(&e);
                self.schedule_redirect();
                Err(e)
            }
        }
    }

    async fn check_source(&self) -> Result<PendingPayment> {
        let session = self
            .store
            .session()
            .ok_or_else(|| Error::state(messages::LOGIN_REQUIRED))?;
        let from = self
            .location
            .deep_link_source()
            .ok_or_else(|| Error::validation(messages::SOURCE_MISSING))?;
        let pending = PendingPayment::new(from, session.account_id)?;

        self.loading
            .show(messages::LOADING_CHECK_PIN, async {
                let status = self
                    .gateway
                    .call(
                        &CheckPin {
                            account_id: pending.from_account_id.clone(),
                        },
                        Indicator::Silent,
                    )
                    .await?;
                if !status.has_pin {
                    return Err(Error::Action(messages::SOURCE_PIN_NOT_SET.to_string()));
                }
                Ok(())
            })
            .await?;

        Ok(pending)
    }

    /// Verify the source account's PIN
    ///
    /// Any failure keeps the flow at PIN entry with the payment intact.
    pub async fn submit_pin(&self, pin: &str) -> Result<()> {
        let epoch = self.current_epoch();
        let result = self.verify_pin(pin).await;
        if !self.is_current(epoch) {
            return Ok(());
        }
        self.view.clear_pin_input();

        match result.and_then(|from| self.advance(PaymentState::pin_verified).map(|_| from)) {
            Ok(from_account_id) => {
                self.view.render_amount_view(&from_account_id);
                Ok(())
            }
            Err(e) => {
                if matches!(e, Error::Action(ref m) if m == messages::WRONG_PIN) {
                    self.events.record(
                        LogEvent::new(events::PIN_REJECTED)
                            .with_flow(flows::PAYMENT)
                            .with_action(VerifyPin::NAME),
                    );
                }
                self.surface(&e);
                Err(e)
            }
        }
    }

    async fn verify_pin(&self, pin: &str) -> Result<String> {
        let pending = match &*self.lock() {
            PaymentState::PinEntry { pending } => pending.clone(),
            _ => return Err(Error::state(messages::PAYMENT_NOT_FOUND)),
        };
        validate_pin(pin)?;

        self.loading
            .show(messages::LOADING_VERIFY_PIN, async {
                let verification = self
                    .gateway
                    .call(
                        &VerifyPin {
                            account_id: pending.from_account_id.clone(),
                            pin: pin.to_string(),
                        },
                        Indicator::Silent,
                    )
                    .await?;
                if !verification.success {
                    return Err(Error::Action(messages::WRONG_PIN.to_string()));
                }
                Ok(())
            })
            .await?;

        Ok(pending.from_account_id)
    }

    /// Transfer `amount` from the linked account
    ///
    /// A rejected amount leaves the flow untouched. A failed transfer returns
    /// to amount entry. On success the balance and history are refreshed and
    /// the client is sent home after the redirect delay.
    pub async fn submit_amount(&self, amount: i64) -> Result<()> {
        let epoch = self.current_epoch();
        let pending = match self.prepare_transfer(amount) {
            Ok(pending) => pending,
            Err(e) => {
                self.surface(&e);
                return Err(e);
            }
        };

        let transferred = self
            .loading
            .show(messages::LOADING_TRANSFER, async {
                let transferred = self
                    .gateway
                    .call(&Transfer::try_from(&pending)?, Indicator::Shown)
                    .await?;
                if !self.is_current(epoch) {
                    return Ok(None);
                }
                self.store.set_balance(transferred.new_balance);
                let refetched = self.refetch_transactions().await;
                Ok::<_, Error>(Some(refetched))
            })
            .await;

        match transferred {
            Ok(None) => Ok(()),
            Ok(Some(refetched)) => {
                if !self.is_current(epoch) {
                    return Ok(());
                }
                if let Err(e) = refetched {
                    warn!(error = %e, "Transaction history refresh failed after transfer");
                    self.surface(&e);
                }
                self.advance(PaymentState::transfer_succeeded)?;
                self.events.record(
                    LogEvent::new(events::PAYMENT_COMPLETED)
                        .with_flow(flows::PAYMENT)
                        .with_action(Transfer::NAME),
                );
                self.view
                    .show_transient_message(messages::TRANSFER_COMPLETED, false);
                self.schedule_redirect();
                Ok(())
            }
            Err(e) => {
                if !self.is_current(epoch) {
                    return Ok(());
                }
                self.advance(PaymentState::transfer_failed)?;
                self.events.record(
                    LogEvent::new(events::TRANSFER_FAILED)
                        .with_flow(flows::PAYMENT)
                        .with_action(Transfer::NAME)
                        .with_error(e.to_string()),
                );
                self.surface(&e);
                Err(e)
            }
        }
    }

    fn prepare_transfer(&self, amount: i64) -> Result<PendingPayment> {
        let mut state = self.lock();
        if !matches!(*state, PaymentState::AmountEntry { .. }) {
            return Err(Error::state(messages::PAYMENT_NOT_FOUND));
        }
        validate_amount(amount)?;
        let next = state.clone().start_transfer(amount)?;
        let pending = next
            .pending()
            .cloned()
            .ok_or_else(|| Error::state(messages::PAYMENT_NOT_FOUND))?;
        *state = next;
        Ok(pending)
    }

    async fn refetch_transactions(&self) -> Result<()> {
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
        Ok(())
    }

    /// Abandon the deep-link flow and go home immediately
    pub fn cancel(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        let previous = std::mem::take(&mut *self.lock());
        if previous.pending().is_some() {
            self.events
                .record(LogEvent::new(events::PAYMENT_CANCELLED).with_flow(flows::PAYMENT));
        }
        debug!(from = previous.name(), "Payment cancelled");
        self.location.navigate_to_base();
    }

    /// Drop any flow in progress without navigating (logout)
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        *self.lock() = PaymentState::Idle;
    }

    /// Send funds from the logged-in account
    ///
    /// Self-transfers, non-positive amounts and amounts above the known
    /// balance are rejected before anything is sent. On success the balance
    /// and history in the session store are up to date.
    pub async fn transfer(&self, to_account_id: &str, amount: i64) -> Result<()> {
        match self.direct_transfer(to_account_id.trim(), amount).await {
            Ok(()) => {
                self.events.record(
                    LogEvent::new(events::PAYMENT_COMPLETED)
                        .with_flow(flows::TRANSFER)
                        .with_action(Transfer::NAME),
                );
                self.view
                    .show_transient_message(messages::TRANSFER_COMPLETED, false);
                Ok(())
            }
            Err(e) => {
                if !e.is_validation() {
                    self.events.record(
                        LogEvent::new(events::TRANSFER_FAILED)
                            .with_flow(flows::TRANSFER)
                            .with_action(Transfer::NAME)
                            .with_error(e.to_string()),
                    );
                }
                self.surface(&e);
                Err(e)
            }
        }
    }

    async fn direct_transfer(&self, to_account_id: &str, amount: i64) -> Result<()> {
        let session = self
            .store
            .session()
            .ok_or_else(|| Error::state(messages::LOGIN_REQUIRED))?;
        if to_account_id == session.account_id {
            return Err(Error::validation(messages::SELF_TRANSFER));
        }
        validate_amount(amount)?;
        if amount > session.balance {
            return Err(Error::validation(messages::INSUFFICIENT_BALANCE));
        }

        self.loading
            .show(messages::LOADING_TRANSFER, async {
                let transferred = self
                    .gateway
                    .call(
                        &Transfer {
                            from_account_id: session.account_id.clone(),
                            to_account_id: to_account_id.to_string(),
                            amount,
                        },
                        Indicator::Shown,
                    )
                    .await?;
                self.store.set_balance(transferred.new_balance);
                self.refetch_transactions().await
            })
            .await
    }
}
