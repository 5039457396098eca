//! Transaction domain model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A completed transfer between two wallet accounts, as reported by the server
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub from_account_id: String,
    pub from_name: String,
    pub to_account_id: String,
    pub to_name: String,
    pub amount: i64,
    pub date: DateTime<Utc>,
}

/// Which side of a transaction the viewing account is on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Received,
    Sent,
}

impl Transaction {
    /// Direction of this transaction relative to `account_id`
    pub fn direction_for(&self, account_id: &str) -> Direction {
        if self.to_account_id == account_id {
            Direction::Received
        } else {
            Direction::Sent
        }
    }

    /// The other party's (name, account id) from `account_id`'s point of view
    pub fn counterparty_for(&self, account_id: &str) -> (&str, &str) {
        match self.direction_for(account_id) {
            Direction::Received => (&self.from_name, &self.from_account_id),
            Direction::Sent => (&self.to_name, &self.to_account_id),
        }
    }

    /// Amount signed from `account_id`'s point of view
    pub fn signed_amount_for(&self, account_id: &str) -> i64 {
        match self.direction_for(account_id) {
            Direction::Received => self.amount,
            Direction::Sent => -self.amount,
        }
    }
}
