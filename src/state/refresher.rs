use log::{debug, error};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::{Instant, interval};

/// Minimum time between two successful score refreshes.
pub const REFRESH_INTERVAL: Duration = Duration::from_secs(120);

/// How often a watcher asks for a refresh. The coordinator decides whether
/// one actually runs.
pub const POLL_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshOutcome<T> {
    /// The last successful refresh is too recent; nothing was fetched.
    Throttled,
    Refreshed(T),
    Failed(String),
}

/// Throttles score refreshes so that at most one runs per interval, no matter
/// how many callers ask for one at the same time.
///
/// Only a successful refresh moves the clock forward, so a failed one is
/// retried by the next caller.
#[derive(Debug)]
pub struct RefreshCoordinator {
    interval: Duration,
    last_refresh: RwLock<Option<Instant>>,
    gate: Mutex<()>,
}

impl Default for RefreshCoordinator {
    fn default() -> Self {
        Self::new(REFRESH_INTERVAL)
    }
}

impl RefreshCoordinator {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_refresh: RwLock::new(None), gate: Mutex::new(()) }
    }

    pub async fn is_due(&self) -> bool {
        match *self.last_refresh.read().await {
            Some(at) => at.elapsed() >= self.interval,
            None => true,
        }
    }

    pub async fn run_if_due<F, Fut, T, E>(&self, refresh: F) -> RefreshOutcome<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        if !self.is_due().await {
            return RefreshOutcome::Throttled;
        }

        let _gate = self.gate.lock().await;
        // Someone else may have refreshed while we waited for the gate.
        if !self.is_due().await {
            debug!("refresh completed by another caller");
            return RefreshOutcome::Throttled;
        }

        match refresh().await {
            Ok(value) => {
                *self.last_refresh.write().await = Some(Instant::now());
                RefreshOutcome::Refreshed(value)
            }
            Err(e) => {
                error!("score refresh failed: {e}");
                RefreshOutcome::Failed(e.to_string())
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefreshRequest {
    pub season_id: String,
}

/// Periodic score refresh for one season. Only sends requests; whoever owns
/// the receiving end does the work through a [`RefreshCoordinator`].
pub struct PeriodicRefresher {
    season_id: String,
    period: Duration,
    requests: mpsc::Sender<RefreshRequest>,
}

impl PeriodicRefresher {
    pub fn new(season_id: String, period: Duration, requests: mpsc::Sender<RefreshRequest>) -> Self {
        Self { season_id, period, requests }
    }

    pub async fn run(self) {
        let mut ticks = interval(self.period);
        // Skip the immediate first tick; the caller refreshes once on startup.
        ticks.tick().await;

        loop {
            ticks.tick().await;
            let request = RefreshRequest { season_id: self.season_id.clone() };
            if self.requests.send(request).await.is_err() {
                debug!("refresh receiver closed, stopping");
                break;
            }
        }
    }
}
