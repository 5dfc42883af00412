//! Fixed-interval auto-refresh.
//!
//! The timer is a spawned task guarded by a `CancellationToken`. Starting it
//! again cancels the previous task first, so at most one timer runs.

use std::future::Future;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Default refresh period.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(15);

struct Running {
    cancel: CancellationToken,
    started_at: Instant,
}

/// Cancellable repeating task that fires once per period.
pub struct AutoRefresh {
    period: Duration,
    running: Mutex<Option<Running>>,
}

impl AutoRefresh {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            running: Mutex::new(None),
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    fn lock(&self) -> MutexGuard<'_, Option<Running>> {
        self.running.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// (Re)starts the timer. `on_tick` runs one period after the start and
    /// every period after that; a tick is awaited before the next one fires.
    pub fn start<F, Fut>(&self, mut on_tick: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let previous = self.lock().replace(Running {
            cancel: cancel.clone(),
            started_at: Instant::now(),
        });
        if let Some(previous) = previous {
            previous.cancel.cancel();
        }

        let period = self.period;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await; // consume the immediate first tick

            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    _ = interval.tick() => {
                        debug!("auto-refresh tick");
                        on_tick().await;
                    }
                }
            }
            debug!("auto-refresh task stopped");
        });
    }

    /// Stops the timer. A tick that is already running is left to finish.
    pub fn stop(&self) {
        if let Some(running) = self.lock().take() {
            running.cancel.cancel();
        }
    }

    pub fn is_running(&self) -> bool {
        self.lock().is_some()
    }

    /// Whole seconds until the next tick, rounded up; `None` when stopped.
    pub fn seconds_until_refresh(&self) -> Option<u64> {
        let guard = self.lock();
        let running = guard.as_ref()?;
        let period_ms = self.period.as_millis().max(1);
        let elapsed_ms = running.started_at.elapsed().as_millis() % period_ms;
        let remaining_ms = period_ms - elapsed_ms;
        u64::try_from(remaining_ms.div_ceil(1000)).ok()
    }
}

impl Drop for AutoRefresh {
    fn drop(&mut self) {
        self.stop();
    }
}
