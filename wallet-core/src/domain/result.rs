//! Result and error types for the core library

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::messages;

/// Core library error type
///
/// User-facing kinds (`Validation`, `Action`, `Transport`, `State`) display
/// their raw message so flows can hand it straight to the view.
#[derive(Error, Debug)]
pub enum Error {
    /// Rejected on the client before any network call
    #[error("{0}")]
    Validation(String),

    /// The server answered with `success: false`
    #[error("{0}")]
    Action(String),

    /// Network failure or a response that could not be decoded
    #[error("{0}")]
    Transport(String),

    /// Operation not allowed in the current flow state
    #[error("{0}")]
    State(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a flow state error
    pub fn state(msg: impl Into<String>) -> Self {
        Self::State(msg.into())
    }

    /// Create a transport error
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    /// Whether this error was raised locally, before anything hit the network
    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
    }
}

/// Core library result type
pub type Result<T> = std::result::Result<T, Error>;

/// Uniform response envelope of the action protocol
///
/// `{ "success": true, "data": ... }` or `{ "success": false, "error": "..." }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionEnvelope {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ActionEnvelope {
    /// Create a successful envelope
    pub fn ok(data: serde_json::Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Create a failed envelope
    pub fn fail(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Unwrap the payload, turning `success: false` into an action error
    ///
    /// A missing `error` text falls back to the generic message. A missing
    /// `data` on success unwraps to `null`.
    pub fn into_data(self) -> Result<serde_json::Value> {
        if !self.success {
            let message = self
                .error
                .filter(|e| !e.trim().is_empty())
                .unwrap_or_else(|| messages::UNEXPECTED_ERROR.to_string());
            return Err(Error::Action(message));
        }
        Ok(self.data.unwrap_or(serde_json::Value::Null))
    }
}
