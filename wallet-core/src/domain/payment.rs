//! Deep-link payment state machine
//!
//! The payment flow is a tagged state with pure transitions. Every transition
//! consumes the current state and either returns the next one or an
//! `Error::State` describing why the move is not allowed, so a submission
//! arriving in the wrong step is a checked precondition instead of a crash.
//!
//! ```text
//! Idle -> CheckingPin -> PinEntry -> AmountEntry -> Transferring -> Done
//!   ^__________________________ cancel / abort ____________________|
//! ```

use serde::{Deserialize, Serialize};

use super::messages;
use super::result::{Error, Result};

/// A deep-link transfer awaiting PIN verification and/or amount entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingPayment {
    pub from_account_id: String,
    pub to_account_id: String,
    pub amount: Option<i64>,
}

impl PendingPayment {
    /// Payment from the linked account to the visitor's own account
    ///
    /// Rejects a link naming the visitor's own account.
    pub fn new(from_account_id: impl Into<String>, to_account_id: impl Into<String>) -> Result<Self> {
        let from_account_id = from_account_id.into();
        let to_account_id = to_account_id.into();
        if from_account_id == to_account_id {
            return Err(Error::validation(messages::SELF_TRANSFER));
        }
        Ok(Self {
            from_account_id,
            to_account_id,
            amount: None,
        })
    }

    /// Copy of this payment with the amount set
    pub fn with_amount(&self, amount: i64) -> Result<Self> {
        validate_amount(amount)?;
        Ok(Self {
            amount: Some(amount),
            ..self.clone()
        })
    }
}

/// Step of the deep-link payment flow
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PaymentState {
    #[default]
    Idle,
    CheckingPin,
    PinEntry { pending: PendingPayment },
    AmountEntry { pending: PendingPayment },
    Transferring { pending: PendingPayment },
    Done,
}

impl PaymentState {
    /// Short name for diagnostics
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::CheckingPin => "checking_pin",
            Self::PinEntry { .. } => "pin_entry",
            Self::AmountEntry { .. } => "amount_entry",
            Self::Transferring { .. } => "transferring",
            Self::Done => "done",
        }
    }

    /// The pending payment, if the flow currently holds one
    pub fn pending(&self) -> Option<&PendingPayment> {
        match self {
            Self::PinEntry { pending }
            | Self::AmountEntry { pending }
            | Self::Transferring { pending } => Some(pending),
            _ => None,
        }
    }

    /// Enter the flow. Only allowed from a resting state.
    pub fn begin_check(self) -> Result<Self> {
        match self {
            Self::Idle | Self::Done => Ok(Self::CheckingPin),
            other => Err(unexpected(&other, "begin")),
        }
    }

    /// The source account has a PIN configured
    pub fn pin_configured(self, pending: PendingPayment) -> Result<Self> {
        match self {
            Self::CheckingPin => Ok(Self::PinEntry { pending }),
            other => Err(unexpected(&other, "pin_configured")),
        }
    }

    /// The submitted PIN was accepted
    pub fn pin_verified(self) -> Result<Self> {
        match self {
            Self::PinEntry { pending } => Ok(Self::AmountEntry { pending }),
            _ => Err(missing_payment()),
        }
    }

    /// Set the amount and start the transfer
    pub fn start_transfer(self, amount: i64) -> Result<Self> {
        match self {
            Self::AmountEntry { pending } => Ok(Self::Transferring {
                pending: pending.with_amount(amount)?,
            }),
            _ => Err(missing_payment()),
        }
    }

    /// The transfer failed; the amount must be entered again
    pub fn transfer_failed(self) -> Result<Self> {
        match self {
            Self::Transferring { pending } => Ok(Self::AmountEntry {
                pending: PendingPayment {
                    amount: None,
                    ..pending
                },
            }),
            other => Err(unexpected(&other, "transfer_failed")),
        }
    }

    /// The transfer went through; the pending payment is discarded
    pub fn transfer_succeeded(self) -> Result<Self> {
        match self {
            Self::Transferring { .. } => Ok(Self::Done),
            other => Err(unexpected(&other, "transfer_succeeded")),
        }
    }

    /// Abandon the flow from any state
    pub fn cancel(self) -> Self {
        Self::Idle
    }
}

fn unexpected(state: &PaymentState, transition: &str) -> Error {
    Error::state(format!(
        "cannot apply {} while payment is {}",
        transition,
        state.name()
    ))
}

fn missing_payment() -> Error {
    Error::state(messages::PAYMENT_NOT_FOUND)
}

/// Amounts are whole W units and must be at least 1
pub fn validate_amount(amount: i64) -> Result<()> {
    if amount <= 0 {
        return Err(Error::validation(messages::AMOUNT_TOO_SMALL));
    }
    Ok(())
}

/// Parse an amount typed by the user
///
/// Leading/trailing whitespace is ignored; anything that is not a positive
/// integer is rejected with the amount message.
pub fn parse_amount(input: &str) -> Result<i64> {
    let amount: i64 = input
        .trim()
        .parse()
        .map_err(|_| Error::validation(messages::AMOUNT_TOO_SMALL))?;
    validate_amount(amount)?;
    Ok(amount)
}
