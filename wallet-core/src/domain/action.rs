//! Server actions
//!
//! Each action the client can issue is its own request type, statically bound
//! to its wire name, the endpoint that serves it and the shape of its response.
//! The set is closed: `Action` is sealed, so a request can't be routed to the
//! wrong service or decoded into the wrong response type.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::payment::PendingPayment;
use super::result::{Error, Result};
use super::session::{AccountInfo, Credentials};
use super::transaction::Transaction;

/// Backend service an action is sent to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    /// General API: accounts, ledger, transfers
    Api,
    /// PIN service
    Pin,
}

impl Endpoint {
    pub fn as_str(&self) -> &'static str {
        match self {
            Endpoint::Api => "api",
            Endpoint::Pin => "pin",
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// A typed server action
pub trait Action: Serialize + sealed::Sealed + Send + Sync {
    /// Wire name sent in the `action` field
    const NAME: &'static str;
    /// Service that handles this action
    const ENDPOINT: Endpoint;
    /// Decoded `data` of a successful response
    type Response: DeserializeOwned + Send;
}

macro_rules! action {
    ($ty:ty, $name:literal, $endpoint:expr, $response:ty) => {
        impl sealed::Sealed for $ty {}
        impl Action for $ty {
            const NAME: &'static str = $name;
            const ENDPOINT: Endpoint = $endpoint;
            type Response = $response;
        }
    };
}

/// Authenticate, returning the account's current state
#[derive(Clone, Serialize, Deserialize)]
pub struct Login {
    pub username: String,
    pub password: String,
}

impl From<Credentials> for Login {
    fn from(credentials: Credentials) -> Self {
        Self {
            username: credentials.username,
            password: credentials.password,
        }
    }
}

/// Create an account
#[derive(Clone, Serialize, Deserialize)]
pub struct Register {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registered {
    pub account_id: String,
}

/// Full transaction history of an account, in server order
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetTransactions {
    pub account_id: String,
}

/// Move funds between two accounts
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transfer {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: i64,
}

impl TryFrom<&PendingPayment> for Transfer {
    type Error = Error;

    fn try_from(pending: &PendingPayment) -> Result<Self> {
        let amount = pending
            .amount
            .ok_or_else(|| Error::state("payment amount has not been entered"))?;
        Ok(Self {
            from_account_id: pending.from_account_id.clone(),
            to_account_id: pending.to_account_id.clone(),
            amount,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transferred {
    pub new_balance: i64,
}

/// Whether an account has a PIN configured
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckPin {
    pub account_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PinStatus {
    #[serde(default)]
    pub has_pin: bool,
}

/// Configure an account's PIN
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetPin {
    pub account_id: String,
    pub pin: String,
}

/// Check a PIN against an account
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyPin {
    pub account_id: String,
    pub pin: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PinVerification {
    #[serde(default)]
    pub success: bool,
}

impl std::fmt::Debug for Login {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Login").field("username", &self.username).finish_non_exhaustive()
    }
}

impl std::fmt::Debug for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Register").field("username", &self.username).finish_non_exhaustive()
    }
}

impl std::fmt::Debug for SetPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SetPin").field("account_id", &self.account_id).finish_non_exhaustive()
    }
}

impl std::fmt::Debug for VerifyPin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyPin").field("account_id", &self.account_id).finish_non_exhaustive()
    }
}

action!(Login, "login", Endpoint::Api, AccountInfo);
action!(Register, "register", Endpoint::Api, Registered);
action!(GetTransactions, "getTransactions", Endpoint::Api, Vec<Transaction>);
action!(Transfer, "transfer", Endpoint::Api, Transferred);
action!(CheckPin, "checkPin", Endpoint::Pin, PinStatus);
action!(SetPin, "setPin", Endpoint::Pin, serde_json::Value);
action!(VerifyPin, "verifyPin", Endpoint::Pin, PinVerification);

/// Flat wire form of a request: `action=<name>&data=<json>`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    pub data: String,
}

impl ActionRequest {
    /// Encode a typed action
    pub fn encode<A: Action>(action: &A) -> Result<Self> {
        Ok(Self {
            action: A::NAME.to_string(),
            data: serde_json::to_string(action)?,
        })
    }

    /// Decode the payload (used by in-process backends)
    pub fn payload<T: DeserializeOwned>(&self) -> Result<T> {
        Ok(serde_json::from_str(&self.data)?)
    }
}
