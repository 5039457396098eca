//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external collaborators. Flows depend only
//! on these traits: the presentation layer implements `View` and `Location`,
//! adapters implement `Transport` and `CredentialStore`.

mod credential_store;
mod location;
mod transport;
mod view;

pub use credential_store::CredentialStore;
pub use location::Location;
pub use transport::Transport;
pub use view::View;
