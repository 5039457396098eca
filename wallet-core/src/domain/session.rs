//! Session domain model

use serde::{Deserialize, Serialize};

/// The authenticated user, as held in memory and persisted for auto-login
///
/// The password is kept so the session can re-authenticate silently.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub account_id: String,
    pub username: String,
    pub balance: i64,
    pub password: String,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("account_id", &self.account_id)
            .field("username", &self.username)
            .field("balance", &self.balance)
            .field("password", &"***")
            .finish()
    }
}

/// Account fields returned by a successful `login` action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub account_id: String,
    pub username: String,
    pub balance: i64,
}

impl Session {
    /// Merge server account fields with the password used to authenticate
    pub fn from_login(info: AccountInfo, password: impl Into<String>) -> Self {
        Self {
            account_id: info.account_id,
            username: info.username,
            balance: info.balance,
            password: password.into(),
        }
    }

    /// Credentials for a silent re-login
    pub fn credentials(&self) -> Credentials {
        Credentials {
            username: self.username.clone(),
            password: self.password.clone(),
        }
    }
}

/// Username/password pair
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"***")
            .finish()
    }
}

/// Persisted auto-login record
///
/// Only the credentials are required to restore a session; the remaining
/// fields of the last-known session are carried along but not trusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub username: String,
    pub password: String,
    #[serde(default)]
    pub account_id: Option<String>,
    #[serde(default)]
    pub balance: Option<i64>,
}

impl StoredSession {
    pub fn credentials(&self) -> Credentials {
        Credentials::new(&self.username, &self.password)
    }
}

impl From<&Session> for StoredSession {
    fn from(session: &Session) -> Self {
        Self {
            username: session.username.clone(),
            password: session.password.clone(),
            account_id: Some(session.account_id.clone()),
            balance: Some(session.balance),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_from_login_keeps_password() {
        let info = AccountInfo {
            account_id: "ACC999".into(),
            username: "alice".into(),
            balance: 2000,
        };
        let session = Session::from_login(info, "p1");
        assert_eq!(session.password, "p1");
        assert_eq!(session.credentials(), Credentials::new("alice", "p1"));
    }

    #[test]
    fn test_stored_session_roundtrip_with_partial_record() {
        let stored: StoredSession =
            serde_json::from_str(r#"{"username":"alice","password":"p1"}"#).unwrap();
        assert_eq!(stored.account_id, None);
        assert_eq!(stored.credentials(), Credentials::new("alice", "p1"));
    }

    #[test]
    fn test_credentials_debug_hides_password() {
        let creds = Credentials::new("alice", "secret");
        assert!(!format!("{:?}", creds).contains("secret"));
    }
}
