//! HTTP transport for the action protocol
//!
//! Every action is a form-encoded `POST` (`action=<name>&data=<json>`) to one
//! of two service URLs. The response body is always read as an envelope,
//! whatever the HTTP status: the backend reports failures inside the envelope.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use crate::config::Config;
use crate::domain::result::{ActionEnvelope, Error, Result};
use crate::domain::{ActionRequest, Endpoint};
use crate::ports::Transport;

/// Environment variable overriding the general API URL
pub const API_URL_ENV: &str = "WALLET_API_URL";

/// Environment variable overriding the PIN service URL
pub const PIN_API_URL_ENV: &str = "WALLET_PIN_API_URL";

/// reqwest-backed transport
#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    api_url: String,
    pin_api_url: String,
}

impl HttpTransport {
    /// Create a transport without a request timeout
    pub fn new(api_url: &str, pin_api_url: &str) -> Result<Self> {
        Self::with_timeout(api_url, pin_api_url, None)
    }

    /// Create a transport, optionally bounding each request
    pub fn with_timeout(api_url: &str, pin_api_url: &str, timeout: Option<Duration>) -> Result<Self> {
        let api_url = normalize_url(api_url, "apiUrl")?;
        let pin_api_url = normalize_url(pin_api_url, "pinApiUrl")?;

        let mut builder = Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder
            .build()
            .map_err(|e| Error::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_url,
            pin_api_url,
        })
    }

    /// Create a transport from the API section of the configuration
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_timeout(&config.api_url, &config.pin_api_url, config.request_timeout)
    }

    /// Service URL for an endpoint
    pub fn url_for(&self, endpoint: Endpoint) -> &str {
        match endpoint {
            Endpoint::Api => &self.api_url,
            Endpoint::Pin => &self.pin_api_url,
        }
    }

    /// Map request errors to user-friendly messages
    fn map_request_error(&self, endpoint: Endpoint, error: reqwest::Error) -> Error {
        if error.is_timeout() {
            Error::transport(format!("The {} service did not respond in time", endpoint.as_str()))
        } else if error.is_connect() {
            Error::transport(format!("Unable to connect to the {} service", endpoint.as_str()))
        } else {
            Error::transport(format!("Request to the {} service failed: {}", endpoint.as_str(), error))
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn post(&self, endpoint: Endpoint, request: &ActionRequest) -> Result<ActionEnvelope> {
        let response = self
            .client
            .post(self.url_for(endpoint))
            .form(request)
            .send()
            .await
            .map_err(|e| self.map_request_error(endpoint, e))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| self.map_request_error(endpoint, e))?;

        serde_json::from_str(&body).map_err(|e| {
            Error::transport(format!(
                "Malformed response from the {} service (HTTP {}): {}",
                endpoint.as_str(),
                status,
                e
            ))
        })
    }
}

fn normalize_url(raw: &str, field: &str) -> Result<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::Config(format!("{} cannot be empty", field)));
    }
    url::Url::parse(trimmed).map_err(|e| Error::Config(format!("{} is not a valid URL: {}", field, e)))?;
    Ok(trimmed.to_string())
}
