//! Adapter implementations
//!
//! Adapters implement the port traits with concrete technologies:
//! - reqwest HTTP client for the Transport port
//! - In-process demo backend for the Transport port (demo mode, tests)
//! - JSON file and in-memory stores for the CredentialStore port
//! - `url`-backed Location
//! - Headless recording View

pub mod demo;
pub mod headless;
pub mod http;
pub mod location;
pub mod store;

#[cfg(test)]
pub mod http_mock;
