//! Service layer - flow orchestration
//!
//! Services coordinate domain logic and port interactions. Each service
//! focuses on a specific flow: talking to the backend, the busy indicator,
//! the session lifecycle, the auto-update loop, payments and sign-up.

mod account;
mod gateway;
mod loading;
pub mod logging;
pub mod payment;
pub mod refresh;
pub mod session;
mod state;

pub use account::AccountService;
pub use gateway::{ActionGateway, Indicator};
pub use loading::{LoadingCoordinator, DEFAULT_MIN_DURATION};
pub use logging::{EntryPoint, EventCount, EventLog, LogEntry, LogEvent, LogFilter, LoggingService};
pub use payment::{PaymentOrchestrator, DEFAULT_REDIRECT_DELAY};
pub use refresh::{AutoUpdater, Snapshot, DEFAULT_INTERVAL};
pub use session::{AutoLogin, SessionManager};
pub use state::SessionStore;
