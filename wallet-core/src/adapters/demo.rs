//! In-process demo backend
//!
//! Implements the action protocol against an in-memory ledger so the client
//! can run without a server (demo mode) and so flows can be tested end to end.
//! It answers exactly like the real services: a `{success, data, error}`
//! envelope per action, PIN actions only on the PIN endpoint.
//!
//! Seeded accounts (`DemoBackend::seeded`):
//! - `alice` / `p1` - ACC999, 2,000 W, PIN 1234
//! - `bob` / `p2` - ACC123, 2,000 W, PIN 1234
//! - `carol` / `p3` - ACC555, 300 W, no PIN

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;

use crate::domain::action::{
    Action, CheckPin, GetTransactions, Login, Register, SetPin, Transfer, VerifyPin,
};
use crate::domain::result::{ActionEnvelope, Error, Result};
use crate::domain::{ActionRequest, Endpoint, Transaction};
use crate::ports::Transport;

#[derive(Debug, Clone)]
struct DemoAccount {
    account_id: String,
    username: String,
    password: String,
    balance: i64,
    pin: Option<String>,
}

/// One request as received by the demo backend
#[derive(Debug, Clone, PartialEq)]
pub struct JournalEntry {
    pub endpoint: Endpoint,
    pub action: String,
    pub data: serde_json::Value,
}

/// Scripted outcome for the next call of an action
#[derive(Debug, Clone)]
enum Scripted {
    /// Answer `success: false` with this message
    ActionError(String),
    /// Fail as if the network were down
    TransportError(String),
}

#[derive(Default)]
struct Ledger {
    accounts: Vec<DemoAccount>,
    /// Oldest first; served newest first
    transactions: Vec<Transaction>,
    journal: Vec<JournalEntry>,
    scripted: HashMap<String, VecDeque<Scripted>>,
    latency: HashMap<String, Duration>,
    next_account: u32,
}

/// In-memory implementation of both backend services
#[derive(Default)]
pub struct DemoBackend {
    ledger: Mutex<Ledger>,
}

impl DemoBackend {
    /// An empty backend
    pub fn new() -> Self {
        Self::default()
    }

    /// A backend with the demo accounts
    pub fn seeded() -> Self {
        let backend = Self::new();
        backend.insert_account("ACC999", "alice", "p1", 2000, Some("1234"));
        backend.insert_account("ACC123", "bob", "p2", 2000, Some("1234"));
        backend.insert_account("ACC555", "carol", "p3", 300, None);
        backend
    }

    /// Add an account with a fixed id
    pub fn insert_account(
        &self,
        account_id: &str,
        username: &str,
        password: &str,
        balance: i64,
        pin: Option<&str>,
    ) {
        let mut ledger = self.lock();
        ledger.accounts.push(DemoAccount {
            account_id: account_id.to_string(),
            username: username.to_string(),
            password: password.to_string(),
            balance,
            pin: pin.map(str::to_string),
        });
    }

    /// Make the next call of `A` answer `success: false` with `message`
    pub fn fail_next<A: Action>(&self, message: &str) {
        self.script(A::NAME, Scripted::ActionError(message.to_string()));
    }

    /// Make the next call of `A` fail at the transport level
    pub fn disconnect_next<A: Action>(&self, message: &str) {
        self.script(A::NAME, Scripted::TransportError(message.to_string()));
    }

    /// Delay every response to `A`
    pub fn set_latency<A: Action>(&self, latency: Duration) {
        self.lock().latency.insert(A::NAME.to_string(), latency);
    }

    /// Every request received so far
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.lock().journal.clone()
    }

    /// How many times `A` was called
    pub fn calls<A: Action>(&self) -> usize {
        self.lock()
            .journal
            .iter()
            .filter(|entry| entry.action == A::NAME)
            .count()
    }

    /// Current balance of an account
    pub fn balance_of(&self, account_id: &str) -> Option<i64> {
        self.lock()
            .accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .map(|a| a.balance)
    }

    /// Set an account's balance directly (simulates activity elsewhere)
    pub fn set_balance(&self, account_id: &str, balance: i64) {
        let mut ledger = self.lock();
        if let Some(account) = ledger.accounts.iter_mut().find(|a| a.account_id == account_id) {
            account.balance = balance;
        }
    }

    fn script(&self, action: &str, outcome: Scripted) {
        self.lock()
            .scripted
            .entry(action.to_string())
            .or_default()
            .push_back(outcome);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Ledger> {
        // The ledger holds no invariants a panicking test could break halfway
        self.ledger.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn handle(&self, endpoint: Endpoint, request: &ActionRequest) -> Result<ActionEnvelope> {
        let mut ledger = self.lock();

        let data = serde_json::from_str(&request.data).unwrap_or(serde_json::Value::Null);
        ledger.journal.push(JournalEntry {
            endpoint,
            action: request.action.clone(),
            data,
        });

        if let Some(outcome) = ledger
            .scripted
            .get_mut(&request.action)
            .and_then(|queue| queue.pop_front())
        {
            return match outcome {
                Scripted::ActionError(message) => Ok(ActionEnvelope::fail(message)),
                Scripted::TransportError(message) => Err(Error::transport(message)),
            };
        }

        let routed = match (endpoint, request.action.as_str()) {
            (Endpoint::Api, Login::NAME) => ledger.login(request.payload()?),
            (Endpoint::Api, Register::NAME) => ledger.register(request.payload()?),
            (Endpoint::Api, GetTransactions::NAME) => ledger.get_transactions(request.payload()?),
            (Endpoint::Api, Transfer::NAME) => ledger.transfer(request.payload()?),
            (Endpoint::Pin, CheckPin::NAME) => ledger.check_pin(request.payload()?),
            (Endpoint::Pin, SetPin::NAME) => ledger.set_pin(request.payload()?),
            (Endpoint::Pin, VerifyPin::NAME) => ledger.verify_pin(request.payload()?),
            (_, other) => Err(format!("Unknown action: {}", other)),
        };

        Ok(match routed {
            Ok(data) => ActionEnvelope::ok(data),
            Err(message) => ActionEnvelope::fail(message),
        })
    }
}

type Handled = std::result::Result<serde_json::Value, String>;

impl Ledger {
    fn account(&self, account_id: &str) -> std::result::Result<&DemoAccount, String> {
        self.accounts
            .iter()
            .find(|a| a.account_id == account_id)
            .ok_or_else(|| "アカウントが見つかりません".to_string())
    }

    fn login(&self, request: Login) -> Handled {
        let account = self
            .accounts
            .iter()
            .find(|a| a.username == request.username && a.password == request.password)
            .ok_or_else(|| "ユーザー名またはパスワードが正しくありません".to_string())?;
        Ok(json!({
            "accountId": account.account_id,
            "username": account.username,
            "balance": account.balance,
        }))
    }

    fn register(&mut self, request: Register) -> Handled {
        if request.username.trim().is_empty() || request.password.is_empty() {
            return Err("ユーザー名とパスワードを入力してください".to_string());
        }
        if self.accounts.iter().any(|a| a.username == request.username) {
            return Err("このユーザー名は既に使用されています".to_string());
        }
        self.next_account += 1;
        let account_id = format!("ACC{:06}", self.next_account);
        self.accounts.push(DemoAccount {
            account_id: account_id.clone(),
            username: request.username,
            password: request.password,
            balance: 0,
            pin: None,
        });
        Ok(json!({ "accountId": account_id }))
    }

    fn get_transactions(&self, request: GetTransactions) -> Handled {
        self.account(&request.account_id)?;
        let history: Vec<&Transaction> = self
            .transactions
            .iter()
            .rev()
            .filter(|tx| {
                tx.from_account_id == request.account_id || tx.to_account_id == request.account_id
            })
            .collect();
        serde_json::to_value(history).map_err(|e| e.to_string())
    }

    fn transfer(&mut self, request: Transfer) -> Handled {
        if request.amount <= 0 {
            return Err("送金額が不正です".to_string());
        }
        if request.from_account_id == request.to_account_id {
            return Err("自分自身には送金できません".to_string());
        }
        let from = self.account(&request.from_account_id)?.clone();
        let to = self.account(&request.to_account_id)?.clone();
        if from.balance < request.amount {
            return Err("残高が不足しています".to_string());
        }

        let mut new_balance = 0;
        for account in self.accounts.iter_mut() {
            if account.account_id == from.account_id {
                account.balance -= request.amount;
                new_balance = account.balance;
            } else if account.account_id == to.account_id {
                account.balance += request.amount;
            }
        }

        self.transactions.push(Transaction {
            from_account_id: from.account_id,
            from_name: from.username,
            to_account_id: to.account_id,
            to_name: to.username,
            amount: request.amount,
            date: Utc::now(),
        });

        Ok(json!({ "newBalance": new_balance }))
    }

    fn check_pin(&self, request: CheckPin) -> Handled {
        let account = self.account(&request.account_id)?;
        Ok(json!({ "hasPin": account.pin.is_some() }))
    }

    fn set_pin(&mut self, request: SetPin) -> Handled {
        let account = self
            .accounts
            .iter_mut()
            .find(|a| a.account_id == request.account_id)
            .ok_or_else(|| "アカウントが見つかりません".to_string())?;
        account.pin = Some(request.pin);
        Ok(json!({}))
    }

    fn verify_pin(&self, request: VerifyPin) -> Handled {
        let account = self.account(&request.account_id)?;
        let matches = account.pin.as_deref() == Some(request.pin.as_str());
        Ok(json!({ "success": matches }))
    }
}

#[async_trait]
impl Transport for DemoBackend {
    async fn post(&self, endpoint: Endpoint, request: &ActionRequest) -> Result<ActionEnvelope> {
        let latency = self.lock().latency.get(&request.action).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
        self.handle(endpoint, request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn send<A: Action>(backend: &DemoBackend, action: &A) -> ActionEnvelope {
        let request = ActionRequest::encode(action).unwrap();
        backend.post(A::ENDPOINT, &request).await.unwrap()
    }

    #[tokio::test]
    async fn test_login_seeded_account() {
        let backend = DemoBackend::seeded();
        let envelope = send(
            &backend,
            &Login {
                username: "alice".into(),
                password: "p1".into(),
            },
        )
        .await;
        let data = envelope.into_data().unwrap();
        assert_eq!(data["accountId"], "ACC999");
        assert_eq!(data["balance"], 2000);
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let backend = DemoBackend::seeded();
        let envelope = send(
            &backend,
            &Login {
                username: "alice".into(),
                password: "nope".into(),
            },
        )
        .await;
        assert!(!envelope.success);
    }

    #[tokio::test]
    async fn test_transfer_moves_funds_and_records_history() {
        let backend = DemoBackend::seeded();
        let envelope = send(
            &backend,
            &Transfer {
                from_account_id: "ACC123".into(),
                to_account_id: "ACC999".into(),
                amount: 500,
            },
        )
        .await;
        assert_eq!(envelope.into_data().unwrap()["newBalance"], 1500);
        assert_eq!(backend.balance_of("ACC999"), Some(2500));

        let history = send(
            &backend,
            &GetTransactions {
                account_id: "ACC999".into(),
            },
        )
        .await
        .into_data()
        .unwrap();
        assert_eq!(history.as_array().unwrap().len(), 1);
        assert_eq!(history[0]["fromName"], "bob");
    }

    #[tokio::test]
    async fn test_transfer_insufficient_funds() {
        let backend = DemoBackend::seeded();
        let envelope = send(
            &backend,
            &Transfer {
                from_account_id: "ACC555".into(),
                to_account_id: "ACC999".into(),
                amount: 301,
            },
        )
        .await;
        assert!(!envelope.success);
        assert_eq!(backend.balance_of("ACC555"), Some(300));
    }

    #[tokio::test]
    async fn test_pin_action_on_api_endpoint_is_rejected() {
        let backend = DemoBackend::seeded();
        let request = ActionRequest::encode(&CheckPin {
            account_id: "ACC123".into(),
        })
        .unwrap();
        let envelope = backend.post(Endpoint::Api, &request).await.unwrap();
        assert!(!envelope.success);
        assert!(envelope.error.unwrap().contains("Unknown action"));
    }

    #[tokio::test]
    async fn test_verify_pin_reports_mismatch_in_data() {
        let backend = DemoBackend::seeded();
        let envelope = send(
            &backend,
            &VerifyPin {
                account_id: "ACC123".into(),
                pin: "0000".into(),
            },
        )
        .await;
        assert!(envelope.success);
        assert_eq!(envelope.into_data().unwrap()["success"], false);
    }

    #[tokio::test]
    async fn test_register_then_set_pin() {
        let backend = DemoBackend::new();
        let data = send(
            &backend,
            &Register {
                username: "dave".into(),
                password: "pw".into(),
            },
        )
        .await
        .into_data()
        .unwrap();
        let account_id = data["accountId"].as_str().unwrap().to_string();

        send(
            &backend,
            &SetPin {
                account_id: account_id.clone(),
                pin: "4321".into(),
            },
        )
        .await;
        let status = send(&backend, &CheckPin { account_id }).await.into_data().unwrap();
        assert_eq!(status["hasPin"], true);
    }

    #[tokio::test]
    async fn test_scripted_failures_are_consumed_once() {
        let backend = DemoBackend::seeded();
        backend.fail_next::<CheckPin>("サーバーエラー");
        backend.disconnect_next::<CheckPin>("offline");

        let request = ActionRequest::encode(&CheckPin {
            account_id: "ACC123".into(),
        })
        .unwrap();
        let first = backend.post(Endpoint::Pin, &request).await.unwrap();
        assert_eq!(first.error.as_deref(), Some("サーバーエラー"));
        assert!(backend.post(Endpoint::Pin, &request).await.is_err());
        assert!(backend.post(Endpoint::Pin, &request).await.unwrap().success);
        assert_eq!(backend.calls::<CheckPin>(), 3);
    }
}
