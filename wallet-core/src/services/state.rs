//! Shared in-memory session state

use std::sync::Mutex;

use crate::domain::{Session, Transaction};

#[derive(Default)]
struct Inner {
    session: Option<Session>,
    transactions: Vec<Transaction>,
}

/// Holder of the one live session and its transaction history
///
/// Reads hand out clones; writers replace fields wholesale. The lock is
/// never held across an await.
#[derive(Default)]
pub struct SessionStore {
    inner: Mutex<Inner>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn session(&self) -> Option<Session> {
        self.lock().session.clone()
    }

    pub fn is_logged_in(&self) -> bool {
        self.lock().session.is_some()
    }

    pub fn transactions(&self) -> Vec<Transaction> {
        self.lock().transactions.clone()
    }

    /// Session and history read under one lock
    pub fn snapshot(&self) -> Option<(Session, Vec<Transaction>)> {
        let inner = self.lock();
        inner
            .session
            .clone()
            .map(|session| (session, inner.transactions.clone()))
    }

    /// Start a new session; the history starts empty
    pub fn set_session(&self, session: Session) {
        let mut inner = self.lock();
        inner.session = Some(session);
        inner.transactions.clear();
    }

    pub fn set_transactions(&self, transactions: Vec<Transaction>) {
        self.lock().transactions = transactions;
    }

    /// Set the balance reported by the server; no-op when logged out
    pub fn set_balance(&self, balance: i64) {
        if let Some(session) = self.lock().session.as_mut() {
            session.balance = balance;
        }
    }

    /// Replace session and history together
    ///
    /// Only applies while the same account is still logged in, so a
    /// snapshot that raced a logout or an account switch is dropped.
    pub fn replace(&self, session: Session, transactions: Vec<Transaction>) -> bool {
        let mut inner = self.lock();
        match &inner.session {
            Some(current) if current.account_id == session.account_id => {
                inner.session = Some(session);
                inner.transactions = transactions;
                true
            }
            _ => false,
        }
    }

    /// Forget the session and its history
    pub fn clear(&self) {
        let mut inner = self.lock();
        inner.session = None;
        inner.transactions.clear();
    }
}
