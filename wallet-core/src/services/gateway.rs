//! Action gateway - the single chokepoint for server communication

use std::sync::Arc;

use crate::domain::action::Action;
use crate::domain::messages;
use crate::domain::result::{Error, Result};
use crate::domain::ActionRequest;
use crate::ports::Transport;
use crate::services::LoadingCoordinator;

/// Whether a call drives the busy indicator itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    /// Wrap the call in the loading coordinator with the generic message
    Shown,
    /// Run the call bare; the caller owns the indicator
    Silent,
}

pub struct ActionGateway {
    transport: Arc<dyn Transport>,
    loading: Arc<LoadingCoordinator>,
}

impl ActionGateway {
    pub fn new(transport: Arc<dyn Transport>, loading: Arc<LoadingCoordinator>) -> Self {
        Self { transport, loading }
    }

    /// Send a typed action and decode its response
    ///
    /// `success: false` becomes `Error::Action` with the server's message;
    /// network failures and undecodable payloads become `Error::Transport`.
    pub async fn call<A: Action>(&self, action: &A, indicator: Indicator) -> Result<A::Response> {
        match indicator {
            Indicator::Shown => {
                self.loading
                    .show(messages::LOADING_DEFAULT, self.send(action))
                    .await
            }
            Indicator::Silent => self.send(action).await,
        }
    }

    async fn send<A: Action>(&self, action: &A) -> Result<A::Response> {
        let request = ActionRequest::encode(action)?;
        tracing::debug!(action = A::NAME, endpoint = A::ENDPOINT.as_str(), "Sending action");

        let envelope = self.transport.post(A::ENDPOINT, &request).await?;
        let data = envelope.into_data().map_err(|e| {
            tracing::debug!(action = A::NAME, error = %e, "Action rejected by server");
            e
        })?;

        serde_json::from_value(data).map_err(|e| {
            Error::transport(format!("Unexpected response to {}: {}", A::NAME, e))
        })
    }
}
