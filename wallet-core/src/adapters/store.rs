//! Credential store adapters
//!
//! `JsonFileStore` keeps a flat string key-value map in `storage.json` inside
//! the wallet directory:
//! ```json
//! {
//!   "w_wallet_user": "{\"accountId\":\"ACC999\",\"username\":\"alice\",...}",
//!   "manual_logout": "true"
//! }
//! ```
//! Values are strings so the file stays readable by any key-value consumer;
//! the session record is itself a JSON document. `MemoryStore` holds the same
//! map in memory.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::domain::result::{Error, Result};
use crate::domain::{Session, StoredSession};
use crate::ports::CredentialStore;

/// Key of the persisted session record
pub const SESSION_KEY: &str = "w_wallet_user";

/// Key of the explicit-logout flag
pub const LOGOUT_FLAG_KEY: &str = "manual_logout";

type Entries = BTreeMap<String, String>;

/// Any non-empty value under the logout key counts as set
fn logout_flag_set(entries: &Entries) -> bool {
    entries
        .get(LOGOUT_FLAG_KEY)
        .is_some_and(|value| !value.is_empty())
}

fn decode_session(raw: Option<&String>) -> Result<Option<StoredSession>> {
    match raw {
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|e| Error::Storage(format!("Saved session is unreadable: {}", e))),
        None => Ok(None),
    }
}

fn encode_session(session: &Session) -> Result<String> {
    Ok(serde_json::to_string(session)?)
}

/// `storage.json`-backed store
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    /// Store in `wallet_dir/storage.json`
    pub fn new(wallet_dir: &Path) -> Self {
        Self::at(wallet_dir.join("storage.json"))
    }

    /// Store at an explicit file path
    pub fn at(path: PathBuf) -> Self {
        Self {
            path,
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Entries> {
        if !self.path.exists() {
            return Ok(Entries::new());
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(Entries::new());
        }
        serde_json::from_str(&content)
            .map_err(|e| Error::Storage(format!("{} is corrupt: {}", self.path.display(), e)))
    }

    fn write(&self, entries: &Entries) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, content)?;
        Ok(())
    }

    /// Read-modify-write under the store lock
    fn update(&self, change: impl FnOnce(&mut Entries) -> Result<()>) -> Result<()> {
        let _guard = self.lock.lock().map_err(|_| Error::Storage("store lock poisoned".into()))?;
        let mut entries = self.read()?;
        change(&mut entries)?;
        self.write(&entries)
    }
}

impl CredentialStore for JsonFileStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        decode_session(self.read()?.get(SESSION_KEY))
    }

    fn save(&self, session: &Session) -> Result<()> {
        let encoded = encode_session(session)?;
        self.update(|entries| {
            entries.insert(SESSION_KEY.to_string(), encoded);
            Ok(())
        })
    }

    fn clear(&self) -> Result<()> {
        self.update(|entries| {
            entries.remove(SESSION_KEY);
            Ok(())
        })
    }

    fn is_logged_out(&self) -> Result<bool> {
        Ok(logout_flag_set(&self.read()?))
    }

    fn set_logged_out(&self, logged_out: bool) -> Result<()> {
        self.update(|entries| {
            if logged_out {
                entries.insert(LOGOUT_FLAG_KEY.to_string(), "true".to_string());
            } else {
                entries.remove(LOGOUT_FLAG_KEY);
            }
            Ok(())
        })
    }
}

/// In-memory store
#[derive(Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a saved session as if a previous visit had logged in
    pub fn with_saved(username: &str, password: &str) -> Self {
        let store = Self::new();
        let record = serde_json::json!({ "username": username, "password": password });
        store.put_raw(SESSION_KEY, &record.to_string());
        store
    }

    /// Write a raw value, bypassing encoding
    pub fn put_raw(&self, key: &str, value: &str) {
        self.entries().insert(key.to_string(), value.to_string());
    }

    /// Read a raw value
    pub fn get_raw(&self, key: &str) -> Option<String> {
        self.entries().get(key).cloned()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Option<StoredSession>> {
        decode_session(self.entries().get(SESSION_KEY))
    }

    fn save(&self, session: &Session) -> Result<()> {
        let encoded = encode_session(session)?;
        self.entries().insert(SESSION_KEY.to_string(), encoded);
        Ok(())
    }

    fn clear(&self) -> Result<()> {
        self.entries().remove(SESSION_KEY);
        Ok(())
    }

    fn is_logged_out(&self) -> Result<bool> {
        Ok(logout_flag_set(&self.entries()))
    }

    fn set_logged_out(&self, logged_out: bool) -> Result<()> {
        let mut entries = self.entries();
        if logged_out {
            entries.insert(LOGOUT_FLAG_KEY.to_string(), "true".to_string());
        } else {
            entries.remove(LOGOUT_FLAG_KEY);
        }
        Ok(())
    }
}
