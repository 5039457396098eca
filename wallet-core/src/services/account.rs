//! Account service - sign-up

use std::sync::Arc;

use tracing::info;

use crate::domain::action::{Register, SetPin};
use crate::domain::messages;
use crate::domain::result::{Error, Result};
use crate::domain::RegistrationForm;
use crate::ports::View;
use crate::services::logging::{events, flows, EventLog, LogEvent};
use crate::services::{ActionGateway, Indicator, LoadingCoordinator, SessionManager};

pub struct AccountService {
    gateway: Arc<ActionGateway>,
    loading: Arc<LoadingCoordinator>,
    view: Arc<dyn View>,
    sessions: Arc<SessionManager>,
    events: EventLog,
}

impl AccountService {
    pub fn new(
        gateway: Arc<ActionGateway>,
        loading: Arc<LoadingCoordinator>,
        view: Arc<dyn View>,
        sessions: Arc<SessionManager>,
        events: EventLog,
    ) -> Self {
        Self {
            gateway,
            loading,
            view,
            sessions,
            events,
        }
    }

    /// Create an account and configure its PIN
    ///
    /// The form is checked before anything is sent. On success the user is
    /// asked to log in; the new account id is returned.
    pub async fn register(&self, form: &RegistrationForm) -> Result<String> {
        match self.create(form).await {
            Ok(account_id) => {
                info!(username = %form.username, "Account created");
                self.events
                    .record(LogEvent::new(events::ACCOUNT_REGISTERED).with_flow(flows::ACCOUNT));
                self.view
                    .show_transient_message(messages::ACCOUNT_CREATED, false);
                self.sessions.show_login();
                Ok(account_id)
            }
            Err(e) => {
                self.view.show_transient_message(&e.to_string(), true);
                Err(e)
            }
        }
    }

    async fn create(&self, form: &RegistrationForm) -> Result<String> {
        form.validate()?;

        self.loading
            .show(messages::LOADING_REGISTER, async {
                let registered = self
                    .gateway
                    .call(
                        &Register {
                            username: form.username.clone(),
                            password: form.password.clone(),
                        },
                        Indicator::Shown,
                    )
                    .await?;
                self.gateway
                    .call(
                        &SetPin {
                            account_id: registered.account_id.clone(),
                            pin: form.pin.clone(),
                        },
                        Indicator::Shown,
                    )
                    .await?;
                Ok::<_, Error>(registered.account_id)
            })
            .await
    }
}
