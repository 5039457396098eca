//! Loading coordinator - the busy indicator gate
//!
//! Tracks in-flight operations and keeps the busy indicator visible while
//! at least one of them is active. Every operation stays visible for a
//! minimum duration so quick round-trips don't flicker.

use std::collections::HashSet;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::ports::View;

/// Default minimum time the indicator stays up per operation
pub const DEFAULT_MIN_DURATION: Duration = Duration::from_millis(1000);

pub struct LoadingCoordinator {
    view: Arc<dyn View>,
    min_duration: Duration,
    active: Mutex<HashSet<Uuid>>,
}

/// Registration of one in-flight operation
///
/// Deregisters on drop, so a failed or abandoned operation is released too.
struct ActiveOperation<'a> {
    coordinator: &'a LoadingCoordinator,
    id: Uuid,
}

impl Drop for ActiveOperation<'_> {
    fn drop(&mut self) {
        self.coordinator.finish(self.id);
    }
}

impl LoadingCoordinator {
    pub fn new(view: Arc<dyn View>, min_duration: Duration) -> Self {
        Self {
            view,
            min_duration,
            active: Mutex::new(HashSet::new()),
        }
    }

    pub fn min_duration(&self) -> Duration {
        self.min_duration
    }

    /// Whether any operation is in flight
    pub fn is_busy(&self) -> bool {
        !self.lock().is_empty()
    }

    /// Number of operations in flight
    pub fn active_count(&self) -> usize {
        self.lock().len()
    }

    /// Run `operation` behind the busy indicator with the default minimum duration
    pub async fn show<F, T>(&self, message: &str, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        self.show_for(message, self.min_duration, operation).await
    }

    /// Run `operation` behind the busy indicator
    ///
    /// The indicator shows `message` (the latest caller wins). The returned
    /// future resolves no earlier than `min_duration` after the call, with
    /// the operation's own output, success or failure alike.
    pub async fn show_for<F, T>(&self, message: &str, min_duration: Duration, operation: F) -> T
    where
        F: Future<Output = T>,
    {
        let _active = self.begin(message);
        let started = Instant::now();

        let output = operation.await;

        let elapsed = started.elapsed();
        if elapsed < min_duration {
            tokio::time::sleep(min_duration - elapsed).await;
        }
        output
    }

    // The view is updated under the lock so the indicator always matches
    // the active set
    fn begin(&self, message: &str) -> ActiveOperation<'_> {
        let id = Uuid::new_v4();
        let mut active = self.lock();
        active.insert(id);
        self.view.show_busy_indicator(message);
        ActiveOperation {
            coordinator: self,
            id,
        }
    }

    fn finish(&self, id: Uuid) {
        let mut active = self.lock();
        active.remove(&id);
        if active.is_empty() {
            self.view.hide_busy_indicator();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashSet<Uuid>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
