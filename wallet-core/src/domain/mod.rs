//! Core domain entities
//!
//! Pure data structures with validation and state transitions - no I/O.

pub mod account;
pub mod action;
pub mod messages;
pub mod payment;
pub mod result;
mod session;
mod transaction;

pub use account::RegistrationForm;
pub use action::{ActionRequest, Endpoint};
pub use payment::{PaymentState, PendingPayment};
pub use session::{AccountInfo, Credentials, Session, StoredSession};
pub use transaction::{Direction, Transaction};
