//! Auto-update loop - keeps the dashboard's balance and history fresh
//!
//! While running, a ticker task re-authenticates with the stored credentials
//! every interval to obtain the current balance, refetches the history, and
//! publishes the pair as a `Snapshot` over a channel. A single applier task
//! swaps the snapshot into the `SessionStore` and re-renders the dashboard.
//!
//! Each start of the loop gets a new generation number. The applier drops
//! snapshots from an older generation, so a refresh still in flight when the
//! loop is stopped (logout, going offline) never overwrites newer state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::domain::action::{GetTransactions, Login};
use crate::domain::result::{Error, Result};
use crate::domain::{Session, Transaction};
use crate::ports::View;
use crate::services::logging::{events, flows, EventLog, LogEvent};
use crate::services::{ActionGateway, Indicator, SessionStore};

/// Default time between refreshes
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(10);

/// Snapshots queued between the ticker and the applier
const SNAPSHOT_BACKLOG: usize = 4;

/// Fresh state fetched by one refresh
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub generation: u64,
    pub session: Session,
    pub transactions: Vec<Transaction>,
}

struct Running {
    generation: u64,
    stop: oneshot::Sender<()>,
    ticker: JoinHandle<()>,
}

pub struct AutoUpdater {
    gateway: Arc<ActionGateway>,
    store: Arc<SessionStore>,
    view: Arc<dyn View>,
    events: EventLog,
    interval: Duration,
    generation: Arc<AtomicU64>,
    running: Mutex<Option<Running>>,
}

impl AutoUpdater {
    pub fn new(
        gateway: Arc<ActionGateway>,
        store: Arc<SessionStore>,
        view: Arc<dyn View>,
        events: EventLog,
        interval: Duration,
    ) -> Self {
        Self {
            gateway,
            store,
            view,
            events,
            interval,
            generation: Arc::new(AtomicU64::new(0)),
            running: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a loop is running
    pub fn is_running(&self) -> bool {
        self.lock()
            .as_ref()
            .is_some_and(|running| !running.ticker.is_finished())
    }

    /// Generation of the current (or last) loop
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start the loop, replacing any loop already running
    ///
    /// The first refresh happens one interval from now. Must be called from
    /// within a tokio runtime.
    pub fn start(&self) {
        self.stop();

        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let (stop_tx, stop_rx) = oneshot::channel();
        let (snapshot_tx, snapshot_rx) = mpsc::channel(SNAPSHOT_BACKLOG);

        tokio::spawn(apply_snapshots(
            snapshot_rx,
            Arc::clone(&self.generation),
            Arc::clone(&self.store),
            Arc::clone(&self.view),
        ));

        let ticker = tokio::spawn(run_ticker(
            Refresher {
                gateway: Arc::clone(&self.gateway),
                store: Arc::clone(&self.store),
                events: self.events.clone(),
                generation,
            },
            Arc::clone(&self.generation),
            self.interval,
            stop_rx,
            snapshot_tx,
        ));

        debug!(generation, interval_ms = self.interval.as_millis() as u64, "Auto-update started");
        *self.lock() = Some(Running {
            generation,
            stop: stop_tx,
            ticker,
        });
    }

    /// Stop the loop; a no-op when nothing is running
    ///
    /// A refresh already in flight completes, but its snapshot is discarded.
    pub fn stop(&self) {
        let Some(running) = self.lock().take() else {
            return;
        };
        // Retire the generation first so an in-flight snapshot can't apply
        let _ = self.generation.compare_exchange(
            running.generation,
            running.generation + 1,
            Ordering::SeqCst,
            Ordering::SeqCst,
        );
        let _ = running.stop.send(());
        debug!(generation = running.generation, "Auto-update stopped");
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for AutoUpdater {
    fn drop(&mut self) {
        self.stop();
    }
}

/// What one ticker needs to fetch a snapshot
struct Refresher {
    gateway: Arc<ActionGateway>,
    store: Arc<SessionStore>,
    events: EventLog,
    generation: u64,
}

impl Refresher {
    /// Silent re-login plus history fetch for the current session
    async fn fetch(&self, session: &Session) -> Result<Snapshot> {
        let info = self
            .gateway
            .call(&Login::from(session.credentials()), Indicator::Silent)
            .await?;
        let transactions = self
            .gateway
            .call(
                &GetTransactions {
                    account_id: info.account_id.clone(),
                },
                Indicator::Silent,
            )
            .await?;
        Ok(Snapshot {
            generation: self.generation,
            session: Session::from_login(info, session.password.clone()),
            transactions,
        })
    }

    fn report(&self, error: &Error) {
        warn!(error = %error, "Auto-update failed");
        self.events.record(
            LogEvent::new(events::REFRESH_FAILED)
                .with_flow(flows::REFRESH)
                .with_error(error.to_string()),
        );
    }
}

async fn run_ticker(
    refresher: Refresher,
    current: Arc<AtomicU64>,
    interval: Duration,
    mut stop: oneshot::Receiver<()>,
    snapshots: mpsc::Sender<Snapshot>,
) {
    let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {}
        }
        if current.load(Ordering::SeqCst) != refresher.generation {
            break;
        }
        // Skip the tick while logged out
        let Some(session) = refresher.store.session() else {
            continue;
        };

        match refresher.fetch(&session).await {
            Ok(snapshot) => {
                if snapshots.send(snapshot).await.is_err() {
                    break;
                }
            }
            Err(e) => refresher.report(&e),
        }
    }
}

async fn apply_snapshots(
    mut snapshots: mpsc::Receiver<Snapshot>,
    current: Arc<AtomicU64>,
    store: Arc<SessionStore>,
    view: Arc<dyn View>,
) {
    while let Some(snapshot) = snapshots.recv().await {
        if snapshot.generation != current.load(Ordering::SeqCst) {
            debug!(generation = snapshot.generation, "Discarding stale snapshot");
            continue;
        }
        if !store.replace(snapshot.session.clone(), snapshot.transactions.clone()) {
            debug!("Discarding snapshot for a session that ended");
            continue;
        }
        view.render_dashboard(&snapshot.session, &snapshot.transactions);
    }
}
