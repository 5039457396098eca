//! Configuration management
//!
//! Settings live in `settings.json` in the wallet directory:
//! ```json
//! {
//!   "api": {
//!     "apiUrl": "https://wallet.example/api",
//!     "pinApiUrl": "https://wallet.example/pin",
//!     "requestTimeoutSecs": 30
//!   },
//!   "app": {
//!     "demoMode": false,
//!     "refreshIntervalSecs": 10,
//!     "minLoadingMs": 1000,
//!     "redirectDelayMs": 2000
//!   }
//! }
//! ```
//! Fields this crate doesn't know about are kept when saving.

use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::adapters::http::{API_URL_ENV, PIN_API_URL_ENV};

/// Environment variable forcing demo mode on or off
pub const DEMO_MODE_ENV: &str = "WALLET_DEMO_MODE";

const DEFAULT_REFRESH_INTERVAL_SECS: u64 = 10;
const DEFAULT_MIN_LOADING_MS: u64 = 1000;
const DEFAULT_REDIRECT_DELAY_MS: u64 = 2000;

/// Raw settings.json structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SettingsFile {
    #[serde(default)]
    api: ApiSettings,
    #[serde(default)]
    app: AppSettings,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiSettings {
    #[serde(default)]
    api_url: String,
    #[serde(default)]
    pin_api_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    request_timeout_secs: Option<u64>,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AppSettings {
    #[serde(default)]
    demo_mode: bool,
    #[serde(default = "default_refresh_interval_secs")]
    refresh_interval_secs: u64,
    #[serde(default = "default_min_loading_ms")]
    min_loading_ms: u64,
    #[serde(default = "default_redirect_delay_ms")]
    redirect_delay_ms: u64,
    #[serde(flatten)]
    other: HashMap<String, serde_json::Value>,
}

fn default_refresh_interval_secs() -> u64 {
    DEFAULT_REFRESH_INTERVAL_SECS
}

fn default_min_loading_ms() -> u64 {
    DEFAULT_MIN_LOADING_MS
}

fn default_redirect_delay_ms() -> u64 {
    DEFAULT_REDIRECT_DELAY_MS
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            demo_mode: false,
            refresh_interval_secs: DEFAULT_REFRESH_INTERVAL_SECS,
            min_loading_ms: DEFAULT_MIN_LOADING_MS,
            redirect_delay_ms: DEFAULT_REDIRECT_DELAY_MS,
            other: HashMap::new(),
        }
    }
}

/// Wallet client configuration (simplified view of settings)
#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub pin_api_url: String,
    /// Per-request bound; unbounded when unset
    pub request_timeout: Option<Duration>,
    pub demo_mode: bool,
    pub refresh_interval: Duration,
    pub min_loading: Duration,
    pub redirect_delay: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self::from_settings(&SettingsFile::default())
    }
}

impl Config {
    fn from_settings(raw: &SettingsFile) -> Self {
        Self {
            api_url: raw.api.api_url.clone(),
            pin_api_url: raw.api.pin_api_url.clone(),
            request_timeout: raw.api.request_timeout_secs.map(Duration::from_secs),
            demo_mode: raw.app.demo_mode,
            // A zero interval would spin; treat it as unset
            refresh_interval: Duration::from_secs(match raw.app.refresh_interval_secs {
                0 => DEFAULT_REFRESH_INTERVAL_SECS,
                secs => secs,
            }),
            min_loading: Duration::from_millis(raw.app.min_loading_ms),
            redirect_delay: Duration::from_millis(raw.app.redirect_delay_ms),
        }
    }

    /// Load config from the wallet directory
    ///
    /// A missing or unreadable settings file yields the defaults. The API
    /// URLs and demo mode can be overridden with `WALLET_API_URL`,
    /// `WALLET_PIN_API_URL` and `WALLET_DEMO_MODE`.
    pub fn load(wallet_dir: &Path) -> Result<Self> {
        let mut config = Self::from_settings(&read_settings(wallet_dir)?);
        config.apply_overrides(|name| std::env::var(name).ok());
        Ok(config)
    }

    /// Apply environment-style overrides from `lookup`
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup(API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_url = url;
        }
        if let Some(url) = lookup(PIN_API_URL_ENV).filter(|v| !v.trim().is_empty()) {
            self.pin_api_url = url;
        }
        match lookup(DEMO_MODE_ENV).as_deref() {
            Some("true" | "1" | "yes" | "TRUE" | "YES") => self.demo_mode = true,
            Some("false" | "0" | "no" | "FALSE" | "NO") => self.demo_mode = false,
            _ => {}
        }
    }

    /// Save config to the wallet directory
    ///
    /// Only the fields this crate manages are written; everything else in
    /// the file is preserved.
    pub fn save(&self, wallet_dir: &Path) -> Result<()> {
        std::fs::create_dir_all(wallet_dir)
            .with_context(|| format!("Failed to create {}", wallet_dir.display()))?;
        let settings_path = wallet_dir.join("settings.json");

        let mut settings = read_settings(wallet_dir)?;
        settings.api.api_url = self.api_url.clone();
        settings.api.pin_api_url = self.pin_api_url.clone();
        settings.api.request_timeout_secs = self.request_timeout.map(|t| t.as_secs());
        settings.app.demo_mode = self.demo_mode;
        settings.app.refresh_interval_secs = self.refresh_interval.as_secs();
        settings.app.min_loading_ms = self.min_loading.as_millis() as u64;
        settings.app.redirect_delay_ms = self.redirect_delay.as_millis() as u64;

        let content = serde_json::to_string_pretty(&settings)?;
        std::fs::write(&settings_path, content)
            .with_context(|| format!("Failed to write {}", settings_path.display()))?;
        Ok(())
    }

    /// Enable demo mode
    pub fn enable_demo_mode(&mut self) {
        self.demo_mode = true;
    }

    /// Disable demo mode
    pub fn disable_demo_mode(&mut self) {
        self.demo_mode = false;
    }
}

fn read_settings(wallet_dir: &Path) -> Result<SettingsFile> {
    let settings_path = wallet_dir.join("settings.json");
    if !settings_path.exists() {
        return Ok(SettingsFile::default());
    }
    let content = std::fs::read_to_string(&settings_path)
        .with_context(|| format!("Failed to read {}", settings_path.display()))?;
    Ok(serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "settings.json is invalid, using defaults");
        SettingsFile::default()
    }))
}
