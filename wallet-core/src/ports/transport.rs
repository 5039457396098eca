//! Transport port - delivery of encoded actions to a backend service

use async_trait::async_trait;

use crate::domain::result::{ActionEnvelope, Result};
use crate::domain::{ActionRequest, Endpoint};

/// Sends one encoded action and returns the raw response envelope
///
/// Implementations only move bytes: unwrapping `success: false` into an
/// error is the gateway's job. Network failures and undecodable bodies are
/// reported as `Error::Transport`.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn post(&self, endpoint: Endpoint, request: &ActionRequest) -> Result<ActionEnvelope>;
}
