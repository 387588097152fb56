// ── Adaptive poll scheduler ──
//
// One fetch per tick. Poll 1 and every Nth poll fetch the full graph;
// the rest fetch subscription state only. Results replace the snapshot,
// drive the connection status, and tell consumers when to rebuild
// definitions and re-evaluate feedbacks.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use dantesync_api::QueryOptions;
use tokio::sync::{Mutex, broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::backend::{DomainBackend, FetchMode};
use crate::error::CoreError;
use crate::fetch::DomainFetcher;
use crate::model::Domain;
use crate::status::{ConnectionStatus, StatusTracker};
use crate::store::DomainStore;

/// Notifications for consumers that render the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Device or channel structure may have changed; rebuild definitions.
    DefinitionsStale,
    /// Routing state may have changed; re-evaluate feedbacks.
    CheckFeedbacks,
    /// A poll replaced the snapshot.
    Refreshed { mode: FetchMode, poll: u64 },
}

/// What a single tick did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Paused,
    NoDomain,
    Refreshed(FetchMode),
    /// The primary fetch failed and the un-cached full fallback succeeded.
    RecoveredByFallback,
    DomainMissing,
    Failed,
}

/// Tuning for a [`PollScheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollSettings {
    pub interval: Duration,
    pub full_fetch_interval_polls: u64,
    pub max_channels_for_dropdowns: usize,
}

pub struct PollScheduler<B> {
    fetcher: DomainFetcher<B>,
    store: Arc<DomainStore>,
    status: Arc<StatusTracker>,
    events: broadcast::Sender<SyncEvent>,
    settings: PollSettings,
    poll_count: AtomicU64,
    successful_polls: AtomicU64,
    /// Set once a snapshot with tx data has been accepted.
    seen_full: AtomicBool,
    paused: watch::Sender<Option<String>>,
    /// Held for the duration of a tick or forced fetch.
    in_flight: Mutex<()>,
}

impl<B: DomainBackend> PollScheduler<B> {
    pub fn new(
        fetcher: DomainFetcher<B>,
        store: Arc<DomainStore>,
        status: Arc<StatusTracker>,
        events: broadcast::Sender<SyncEvent>,
        settings: PollSettings,
    ) -> Self {
        let (paused, _) = watch::channel(None);
        Self {
            fetcher,
            store,
            status,
            events,
            settings,
            poll_count: AtomicU64::new(0),
            successful_polls: AtomicU64::new(0),
            seen_full: AtomicBool::new(false),
            paused,
            in_flight: Mutex::new(()),
        }
    }

    pub fn poll_count(&self) -> u64 {
        self.poll_count.load(Ordering::SeqCst)
    }

    // ── Pause control ────────────────────────────────────────────────

    /// Skip ticks until [`resume`](Self::resume). Waits for a tick that is
    /// already running to finish.
    pub async fn pause(&self, reason: &str) {
        self.paused.send_replace(Some(reason.to_owned()));
        info!(reason, "polling paused");
        let _drain = self.in_flight.lock().await;
    }

    pub fn resume(&self) {
        if let Some(reason) = self.paused.send_replace(None) {
            info!(reason, "polling resumed");
        }
    }

    pub fn is_paused(&self) -> bool {
        self.paused.borrow().is_some()
    }

    // ── Ticks ────────────────────────────────────────────────────────

    /// Run one poll cycle.
    pub async fn tick(&self) -> TickOutcome {
        let _guard = self.in_flight.lock().await;

        let paused = self.paused.borrow().clone();
        if let Some(reason) = paused {
            debug!(%reason, "tick skipped while paused");
            return TickOutcome::Paused;
        }

        let Some(domain_id) = self.fetcher.domain_id().map(str::to_owned) else {
            self.status
                .set(ConnectionStatus::BadConfig, Some("No domain selected".into()));
            return TickOutcome::NoDomain;
        };

        let poll = self.poll_count.fetch_add(1, Ordering::SeqCst) + 1;
        let mode = fetch_mode_for_poll(poll, self.settings.full_fetch_interval_polls);
        debug!(poll, %mode, "polling domain");

        match self.fetcher.fetch(mode, QueryOptions::network_only()).await {
            Ok(Some(domain)) => {
                self.accept(domain, mode, poll);
                self.status.set(ConnectionStatus::Ok, None);
                TickOutcome::Refreshed(mode)
            }
            Ok(None) => {
                self.report_missing(&domain_id);
                TickOutcome::DomainMissing
            }
            Err(e) => self.fallback(&domain_id, poll, &e).await,
        }
    }

    /// One strict, un-cached full fetch after a failed tick.
    async fn fallback(&self, domain_id: &str, poll: u64, cause: &CoreError) -> TickOutcome {
        warn!(poll, error = %cause, "poll failed, trying full fetch fallback");

        match self
            .fetcher
            .fetch(FetchMode::Full, QueryOptions::strict())
            .await
        {
            Ok(Some(domain)) => {
                self.accept(domain, FetchMode::Full, poll);
                self.status
                    .set(ConnectionStatus::Ok, Some("Recovered by fallback fetch".into()));
                TickOutcome::RecoveredByFallback
            }
            Ok(None) => {
                self.report_missing(domain_id);
                TickOutcome::DomainMissing
            }
            Err(e) => {
                error!(poll, error = %e, "fallback fetch failed");
                let status = if e.is_connectivity() {
                    ConnectionStatus::Disconnected
                } else {
                    ConnectionStatus::Connecting
                };
                self.status.set(status, Some(e.to_string()));
                TickOutcome::Failed
            }
        }
    }

    /// Immediate full fetch outside the tick cadence.
    ///
    /// Success always marks definitions stale. Does not count as a poll.
    pub async fn force_fetch(&self) -> Result<(), CoreError> {
        let _guard = self.in_flight.lock().await;
        info!("forced full fetch");

        match self.fetcher.fetch_full().await {
            Ok(Some(domain)) => {
                log_stats(&domain, FetchMode::Full);
                self.store.replace(domain);
                self.seen_full.store(true, Ordering::SeqCst);
                self.status.set(ConnectionStatus::Ok, None);
                self.emit(SyncEvent::DefinitionsStale);
                self.emit(SyncEvent::CheckFeedbacks);
                Ok(())
            }
            Ok(None) => {
                let id = self.fetcher.domain_id().unwrap_or_default().to_owned();
                self.report_missing(&id);
                Err(CoreError::DomainNotFound { id })
            }
            Err(e) => {
                error!(error = %e, "forced fetch failed");
                let status = if matches!(e, CoreError::NoDomainSelected) {
                    ConnectionStatus::BadConfig
                } else {
                    ConnectionStatus::Disconnected
                };
                self.status.set(status, Some(e.to_string()));
                Err(e)
            }
        }
    }

    /// Tick every `interval` until cancelled. Ticks never overlap; missed
    /// ticks are skipped rather than bunched.
    pub async fn run(self: Arc<Self>, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.settings.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                _ = interval.tick() => {
                    let outcome = self.tick().await;
                    debug!(?outcome, "tick finished");
                }
            }
        }
        debug!("poll loop stopped");
    }

    // ── Helpers ──────────────────────────────────────────────────────

    fn accept(&self, domain: Domain, mode: FetchMode, poll: u64) {
        log_stats(&domain, mode);

        let large = domain.rx_channel_count() > self.settings.max_channels_for_dropdowns;
        let diverged = self.store.replace(domain);
        if diverged > 0 {
            debug!(diverged, "fetched state overrode optimistic patches");
        }

        let first_success = self.successful_polls.fetch_add(1, Ordering::SeqCst) == 0;
        // A first success without tx data leaves tx choices empty until a
        // full snapshot arrives.
        let first_full = mode == FetchMode::Full && !self.seen_full.swap(true, Ordering::SeqCst);
        let regenerate = if large {
            first_success || first_full
        } else {
            first_success
                || first_full
                || poll % self.settings.full_fetch_interval_polls.max(1) == 0
        };

        if regenerate {
            self.emit(SyncEvent::DefinitionsStale);
        }
        self.emit(SyncEvent::Refreshed { mode, poll });
        self.emit(SyncEvent::CheckFeedbacks);
    }

    fn report_missing(&self, domain_id: &str) {
        warn!(domain = domain_id, "domain not found");
        self.status.set(
            ConnectionStatus::Connecting,
            Some(format!("Domain not found: {domain_id}")),
        );
    }

    fn emit(&self, event: SyncEvent) {
        // No receivers is fine.
        let _ = self.events.send(event);
    }
}

/// Poll 1 and every Nth poll carry tx data.
pub fn fetch_mode_for_poll(poll: u64, full_fetch_interval_polls: u64) -> FetchMode {
    if poll == 1 || poll % full_fetch_interval_polls.max(1) == 0 {
        FetchMode::Full
    } else {
        FetchMode::SubscriptionsOnly
    }
}

fn log_stats(domain: &Domain, mode: FetchMode) {
    let stats = domain.stats();
    debug!(
        %mode,
        devices = stats.devices,
        rx_channels = stats.rx_channels,
        tx_channels = stats.tx_channels,
        "domain snapshot"
    );
    if stats.devices == 0 {
        warn!(domain = %domain.id, "domain has no devices");
    }
}
