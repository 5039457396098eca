//! URL-backed location
//!
//! Holds the address the client was opened with. `navigate_to_base` strips
//! the query and fragment and records that a navigation happened; the
//! presentation layer polls `take_navigation` and reloads.

use std::sync::Mutex;

use url::Url;

use crate::domain::result::{Error, Result};
use crate::ports::Location;

/// Query parameter naming the paying account of a deep-link request
pub const SOURCE_PARAM: &str = "from";

struct Current {
    url: Url,
    navigated: bool,
}

pub struct UrlLocation {
    current: Mutex<Current>,
}

impl UrlLocation {
    /// Parse the address the page was opened with
    pub fn parse(address: &str) -> Result<Self> {
        let url = Url::parse(address.trim())
            .map_err(|e| Error::validation(format!("Invalid URL '{}': {}", address, e)))?;
        Ok(Self::new(url))
    }

    pub fn new(url: Url) -> Self {
        Self {
            current: Mutex::new(Current {
                url,
                navigated: false,
            }),
        }
    }

    /// The current address
    pub fn url(&self) -> Url {
        self.lock().url.clone()
    }

    /// Whether `navigate_to_base` was called since the last check
    pub fn take_navigation(&self) -> bool {
        std::mem::take(&mut self.lock().navigated)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Current> {
        self.current.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Location for UrlLocation {
    fn deep_link_source(&self) -> Option<String> {
        self.lock()
            .url
            .query_pairs()
            .find(|(key, _)| key == SOURCE_PARAM)
            .map(|(_, value)| value.trim().to_string())
            .filter(|value| !value.is_empty())
    }

    fn navigate_to_base(&self) {
        let mut current = self.lock();
        current.url.set_query(None);
        current.url.set_fragment(None);
        current.navigated = true;
        tracing::debug!(url = %current.url, "Navigated to base path");
    }
}
