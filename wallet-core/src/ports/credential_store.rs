//! Credential store port - durable auto-login data

use crate::domain::result::Result;
use crate::domain::{Session, StoredSession};

/// Durable key-value storage for the auto-login record and logout flag
pub trait CredentialStore: Send + Sync {
    /// Read the saved session
    ///
    /// `Ok(None)` when nothing is saved; an error when a record exists but
    /// can't be decoded.
    fn load(&self) -> Result<Option<StoredSession>>;

    /// Save the full last-known session
    fn save(&self, session: &Session) -> Result<()>;

    /// Erase the saved session
    fn clear(&self) -> Result<()>;

    /// Whether the user explicitly logged out
    fn is_logged_out(&self) -> Result<bool>;

    /// Set or clear the explicit-logout flag
    fn set_logged_out(&self, logged_out: bool) -> Result<()>;
}
