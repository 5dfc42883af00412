use secrecy::SecretString;
use std::collections::BTreeSet;
use std::env;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tera::Tera;
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;
use tracing::{info, warn};

use crate::error::DashboardError;
use crate::fetcher::UpstreamClient;
use crate::models::{Delta, SiteView, Snapshot};
use crate::refresh::{run_cycle, CycleOutcome};
use crate::scheduler::{AutoRefresh, DEFAULT_REFRESH_INTERVAL};
use crate::selection::SiteSelection;

/// Application configuration from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to.
    pub bind_address: String,
    /// Base URL of the controller API, e.g. `https://host/proxy/network/integration/v1`.
    pub api_url: String,
    /// Static API key sent as `X-API-KEY`.
    pub api_key: SecretString,
    pub refresh_interval: Duration,
    pub request_timeout: Duration,
    /// Upper bound on sites fetched at the same time.
    pub max_concurrent_site_fetches: usize,
    /// How long a client-count notification stays on the dashboard.
    pub notification_ttl: Duration,
    pub template_glob: String,
    pub static_dir: String,
}

impl Config {
    /// Creates Config from environment variables with defaults.
    ///
    /// `UNIFI_API_KEY` and `UNIFI_API_URL` are required.
    pub fn from_env() -> Result<Self, DashboardError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, DashboardError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &str| {
            var(key).ok_or_else(|| {
                DashboardError::Config(format!("{key} environment variable is required"))
            })
        };
        let number = |key: &str, default: u64| -> Result<u64, DashboardError> {
            match var(key) {
                None => Ok(default),
                Some(raw) => raw.trim().parse().map_err(|e| {
                    DashboardError::Config(format!(
                        "{key} must be a non-negative integer, got {raw:?}: {e}"
                    ))
                }),
            }
        };
        let positive = |key: &str, default: u64| -> Result<u64, DashboardError> {
            match number(key, default)? {
                0 => Err(DashboardError::Config(format!("{key} must be greater than zero"))),
                n => Ok(n),
            }
        };

        let api_key = SecretString::from(required("UNIFI_API_KEY")?);
        let api_url = required("UNIFI_API_URL")?;
        let bind_address = match var("BIND_ADDRESS") {
            Some(addr) => addr,
            None => format!("0.0.0.0:{}", number("PORT", 3000)?),
        };
        let max_concurrent_site_fetches =
            usize::try_from(positive("MAX_CONCURRENT_SITE_FETCHES", 16)?).map_err(|e| {
                DashboardError::Config(format!("MAX_CONCURRENT_SITE_FETCHES: {e}"))
            })?;

        Ok(Self {
            bind_address,
            api_url,
            api_key,
            refresh_interval: Duration::from_secs(positive(
                "REFRESH_INTERVAL_SECS",
                DEFAULT_REFRESH_INTERVAL.as_secs(),
            )?),
            request_timeout: Duration::from_secs(positive("REQUEST_TIMEOUT_SECS", 10)?),
            max_concurrent_site_fetches,
            notification_ttl: Duration::from_secs(number("NOTIFICATION_TTL_SECS", 5)?),
            template_glob: var("TEMPLATE_GLOB").unwrap_or_else(|| "templates/**/*.html".into()),
            static_dir: var("STATIC_DIR").unwrap_or_else(|| "static".into()),
        })
    }
}

/// A client-count change waiting to be shown.
///
/// The display window starts when a page first renders it, so a delta from
/// a slow cycle is not lost between two page reloads.
#[derive(Debug, Clone, Copy)]
pub struct Notification {
    pub delta: Delta,
    pub first_shown: Option<Instant>,
}

/// State carried from one refresh cycle to the next.
///
/// Only `AppState::refresh` and the dashboard handlers mutate it.
#[derive(Debug, Default)]
pub struct Session {
    snapshot: Arc<Snapshot>,
    previous_client_count: Option<usize>,
    selection: SiteSelection,
    last_error: Option<String>,
    notification: Option<Notification>,
    loaded: bool,
    collapsed_sites: BTreeSet<String>,
    filter_hidden: bool,
}

impl Session {
    /// Stores a successful cycle result.
    ///
    /// An empty site list leaves the previous client count untouched.
    pub fn apply(&mut self, outcome: CycleOutcome) {
        let CycleOutcome { snapshot, delta } = outcome;
        self.selection.sync(&snapshot);
        if !snapshot.is_empty() {
            self.previous_client_count = Some(snapshot.total_client_count());
        }
        if let Some(delta) = delta {
            self.notification = Some(Notification {
                delta,
                first_shown: None,
            });
        }
        self.snapshot = Arc::new(snapshot);
        self.last_error = None;
        self.loaded = true;
    }

    /// Records a failed cycle. The last good snapshot stays visible.
    pub fn record_failure(&mut self, err: &DashboardError) {
        self.last_error = Some(err.to_string());
    }

    pub fn snapshot(&self) -> &Arc<Snapshot> {
        &self.snapshot
    }

    pub fn previous_client_count(&self) -> Option<usize> {
        self.previous_client_count
    }

    pub fn selection(&self) -> &SiteSelection {
        &self.selection
    }

    pub fn selection_mut(&mut self) -> (&mut SiteSelection, &Snapshot) {
        (&mut self.selection, self.snapshot.as_ref())
    }

    pub fn filtered_sites(&self) -> Vec<&SiteView> {
        self.selection.apply(&self.snapshot)
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Starts the display window of a pending notification. Later calls keep
    /// the first timestamp.
    pub fn mark_notification_shown(&mut self, now: Instant) {
        if let Some(notification) = self.notification.as_mut() {
            notification.first_shown.get_or_insert(now);
        }
    }

    /// The latest delta until `ttl` has passed since it was first shown.
    pub fn active_notification(&self, now: Instant, ttl: Duration) -> Option<Delta> {
        self.notification
            .filter(|n| match n.first_shown {
                None => true,
                Some(shown) => now.saturating_duration_since(shown) < ttl,
            })
            .map(|n| n.delta)
    }

    /// Collapses an expanded site card or expands a collapsed one.
    pub fn toggle_collapsed(&mut self, site_id: &str) {
        if !self.collapsed_sites.remove(site_id) {
            self.collapsed_sites.insert(site_id.to_string());
        }
    }

    pub fn is_collapsed(&self, site_id: &str) -> bool {
        self.collapsed_sites.contains(site_id)
    }

    pub fn toggle_filter_panel(&mut self) {
        self.filter_hidden = !self.filter_hidden;
    }

    pub fn filter_visible(&self) -> bool {
        !self.filter_hidden
    }
}

/// Shared application state passed to all request handlers.
pub struct AppState {
    pub config: Config,
    /// Template engine for rendering HTML pages.
    pub tera: Tera,
    pub upstream: UpstreamClient,
    pub session: RwLock<Session>,
    pub auto_refresh: AutoRefresh,
    /// Serializes cycles so timer ticks and manual reloads never interleave.
    cycle_gate: Mutex<()>,
}

impl AppState {
    pub fn new(config: Config, tera: Tera, upstream: UpstreamClient) -> Self {
        let auto_refresh = AutoRefresh::new(config.refresh_interval);
        Self {
            config,
            tera,
            upstream,
            session: RwLock::new(Session::default()),
            auto_refresh,
            cycle_gate: Mutex::new(()),
        }
    }

    /// Runs one cycle and applies the result to the session.
    pub async fn refresh(&self) -> Result<(), DashboardError> {
        let _gate = self.cycle_gate.lock().await;
        let previous = self.session.read().await.previous_client_count();

        match run_cycle(
            &self.upstream,
            previous,
            self.config.max_concurrent_site_fetches,
        )
        .await
        {
            Ok(outcome) => {
                if let Some(delta) = outcome.delta {
                    info!(total = delta.total, "{}", delta.message());
                }
                self.session.write().await.apply(outcome);
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "refresh cycle failed");
                self.session.write().await.record_failure(&e);
                Err(e)
            }
        }
    }

    /// (Re)starts the auto-refresh timer.
    pub fn start_auto_refresh(self: &Arc<Self>) {
        // the timer lives inside the state, so the task must not keep it alive
        let state: Weak<Self> = Arc::downgrade(self);
        self.auto_refresh.start(move || {
            let state = state.upgrade();
            async move {
                if let Some(state) = state {
                    // failures are recorded on the session
                    let _ = state.refresh().await;
                }
            }
        });
        info!(
            period_secs = self.auto_refresh.period().as_secs(),
            "auto-refresh started"
        );
    }

    pub fn stop_auto_refresh(&self) {
        if self.auto_refresh.is_running() {
            self.auto_refresh.stop();
            info!("auto-refresh stopped");
        }
    }
}
