// ── Controller abstraction ──
//
// Lifecycle management for one synced domain: builds the API client,
// runs the poll scheduler in the background, and routes apply requests
// through the verifying applier. Consumers observe the snapshot, the
// connection status and sync events without touching the API.

use std::sync::Arc;

use dantesync_api::{DanteClient, TlsMode, TransportConfig};
use tokio::sync::{Mutex, broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::apply::{ApplyOutcome, SubscriptionApplier, SubscriptionSetResult};
use crate::backend::{ClientSlot, DomainBackend};
use crate::config::{BulkApplyOptions, SyncConfig, TlsVerification};
use crate::error::CoreError;
use crate::fetch::DomainFetcher;
use crate::mapping::{self, ParsedMapping};
use crate::model::{ChannelSubscription, Device, Domain, DomainSummary, MultipleChannelSubscription};
use crate::scheduler::{PollScheduler, PollSettings, SyncEvent};
use crate::status::{ConnectionStatus, StatusReport, StatusTracker};
use crate::store::DomainStore;
use crate::stream::DomainStream;

const EVENT_CHANNEL_SIZE: usize = 64;
const BULK_PAUSE_REASON: &str = "bulk subscription apply";

type Connector<B> = Box<dyn Fn(&SyncConfig) -> Result<Arc<B>, CoreError> + Send + Sync>;

// ── Controller ───────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<ControllerInner>`. The snapshot store,
/// status and event channels outlive reconnects; the scheduler and
/// applier are rebuilt on every `connect`.
pub struct Controller<B = DanteClient>
where
    B: DomainBackend,
{
    inner: Arc<ControllerInner<B>>,
}

impl<B: DomainBackend> Clone for Controller<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct ControllerInner<B> {
    config: Mutex<SyncConfig>,
    connector: Connector<B>,
    store: Arc<DomainStore>,
    client: Arc<ClientSlot<B>>,
    status: Arc<StatusTracker>,
    events: broadcast::Sender<SyncEvent>,
    session: Mutex<Option<Session<B>>>,
}

/// Everything that lives between `connect` and `disconnect`.
struct Session<B> {
    scheduler: Arc<PollScheduler<B>>,
    applier: Arc<SubscriptionApplier<B>>,
    bulk: BulkApplyOptions,
    pause_on_bulk: bool,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl Controller<DanteClient> {
    /// Create a controller talking to the Dante API. Does NOT connect --
    /// call [`connect()`](Self::connect) to build the client and start polling.
    pub fn new(config: SyncConfig) -> Self {
        Self::with_connector(config, |config: &SyncConfig| {
            build_client(config).map(Arc::new)
        })
    }

    /// One-shot: connect without polling, run closure, disconnect.
    pub async fn oneshot<F, Fut, T>(config: SyncConfig, f: F) -> Result<T, CoreError>
    where
        F: FnOnce(Controller) -> Fut,
        Fut: std::future::Future<Output = Result<T, CoreError>>,
    {
        let controller = Controller::new(config);
        controller.start(false).await?;
        let result = f(controller.clone()).await;
        controller.disconnect().await;
        result
    }
}

impl<B: DomainBackend> Controller<B> {
    /// Create a controller whose client is produced by `connector` on
    /// every connect.
    pub fn with_connector<C>(config: SyncConfig, connector: C) -> Self
    where
        C: Fn(&SyncConfig) -> Result<Arc<B>, CoreError> + Send + Sync + 'static,
    {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self {
            inner: Arc::new(ControllerInner {
                config: Mutex::new(config),
                connector: Box::new(connector),
                store: Arc::new(DomainStore::new()),
                client: Arc::new(ClientSlot::new()),
                status: Arc::new(StatusTracker::new()),
                events,
                session: Mutex::new(None),
            }),
        }
    }

    /// Create a controller that always connects to the given backend.
    pub fn with_backend(config: SyncConfig, backend: Arc<B>) -> Self {
        Self::with_connector(config, move |_: &SyncConfig| Ok(Arc::clone(&backend)))
    }

    pub async fn config(&self) -> SyncConfig {
        self.inner.config.lock().await.clone()
    }

    pub fn store(&self) -> &Arc<DomainStore> {
        &self.inner.store
    }

    // ── Connection lifecycle ─────────────────────────────────────

    /// Build the client and start the background poll loop.
    ///
    /// The first tick fires immediately and performs a full fetch.
    pub async fn connect(&self) -> Result<(), CoreError> {
        self.start(true).await
    }

    async fn start(&self, polling: bool) -> Result<(), CoreError> {
        let config = self.config().await;
        config.validate()?;

        if self.inner.session.lock().await.is_some() {
            self.disconnect().await;
        }

        self.inner.status.set(ConnectionStatus::Connecting, None);
        let client = match (self.inner.connector)(&config) {
            Ok(client) => client,
            Err(e) => {
                self.inner
                    .status
                    .set(ConnectionStatus::Disconnected, Some(e.to_string()));
                return Err(e);
            }
        };
        self.inner.client.set(client);

        let domain_id = config.selected_domain().map(str::to_owned);
        let fetcher = DomainFetcher::new(Arc::clone(&self.inner.client), domain_id.clone());
        let scheduler = Arc::new(PollScheduler::new(
            fetcher.clone(),
            Arc::clone(&self.inner.store),
            Arc::clone(&self.inner.status),
            self.inner.events.clone(),
            PollSettings {
                interval: config.poll_interval,
                full_fetch_interval_polls: config.full_fetch_interval_polls,
                max_channels_for_dropdowns: config.max_channels_for_dropdowns,
            },
        ));
        let applier = Arc::new(SubscriptionApplier::new(
            Arc::clone(&self.inner.client),
            fetcher,
            Arc::clone(&self.inner.store),
        ));

        let cancel = CancellationToken::new();
        let mut handles = Vec::new();
        if polling {
            handles.push(tokio::spawn(Arc::clone(&scheduler).run(cancel.clone())));
        }

        *self.inner.session.lock().await = Some(Session {
            scheduler,
            applier,
            bulk: config.bulk,
            pause_on_bulk: config.pause_polling_on_bulk_apply,
            cancel,
            handles,
        });

        info!(domain = ?domain_id, polling, "connected");
        Ok(())
    }

    /// Stop polling, drop the client and reset the snapshot.
    pub async fn disconnect(&self) {
        let session = self.inner.session.lock().await.take();

        if let Some(session) = session {
            session.cancel.cancel();
            for handle in session.handles {
                if let Err(e) = handle.await {
                    warn!(error = %e, "background task ended abnormally");
                }
            }
        }

        self.inner.client.clear();
        self.inner.store.reset();
        self.inner.status.set(ConnectionStatus::Disconnected, None);
        debug!("disconnected");
    }

    /// Swap in a new configuration: reset all state and reconnect.
    pub async fn reconfigure(&self, config: SyncConfig) -> Result<(), CoreError> {
        config.validate()?;
        self.disconnect().await;
        *self.inner.config.lock().await = config;
        self.connect().await
    }

    // ── Scheduler control ────────────────────────────────────────

    /// Immediate full fetch; always marks definitions stale on success.
    pub async fn force_fetch(&self) -> Result<(), CoreError> {
        let scheduler = self.scheduler().await.ok_or(CoreError::ClientNotReady)?;
        scheduler.force_fetch().await
    }

    pub async fn pause(&self, reason: &str) {
        if let Some(scheduler) = self.scheduler().await {
            scheduler.pause(reason).await;
        }
    }

    pub async fn resume(&self) {
        if let Some(scheduler) = self.scheduler().await {
            scheduler.resume();
        }
    }

    // ── Applying ─────────────────────────────────────────────────

    pub async fn apply_one(&self, subscription: &ChannelSubscription) -> Option<SubscriptionSetResult> {
        let applier = self.applier().await?;
        applier.apply_one(subscription).await
    }

    pub async fn apply_many(
        &self,
        request: &MultipleChannelSubscription,
    ) -> Option<SubscriptionSetResult> {
        let applier = self.applier().await?;
        applier.apply_many(request).await
    }

    pub async fn apply_many_with_retry(
        &self,
        request: &MultipleChannelSubscription,
        options: &BulkApplyOptions,
    ) -> ApplyOutcome {
        match self.applier().await {
            Some(applier) => applier.apply_many_with_retry(request, options).await,
            None => ApplyOutcome::Unverifiable {
                reason: CoreError::ClientNotReady.to_string(),
            },
        }
    }

    /// Verified bulk apply with the configured options.
    ///
    /// Polling is paused for the duration when configured and always
    /// resumed afterwards. Success triggers a feedback re-evaluation.
    pub async fn apply_bulk(&self, request: &MultipleChannelSubscription) -> ApplyOutcome {
        let parts = self.inner.session.lock().await.as_ref().map(|s| {
            (
                Arc::clone(&s.scheduler),
                Arc::clone(&s.applier),
                s.bulk,
                s.pause_on_bulk,
            )
        });
        let Some((scheduler, applier, options, pause)) = parts else {
            return ApplyOutcome::Unverifiable {
                reason: CoreError::ClientNotReady.to_string(),
            };
        };

        if pause {
            scheduler.pause(BULK_PAUSE_REASON).await;
        }
        let outcome = applier.apply_many_with_retry(request, &options).await;
        if pause {
            scheduler.resume();
        }

        if outcome.succeeded() {
            let _ = self.inner.events.send(SyncEvent::CheckFeedbacks);
        }
        outcome
    }

    /// Parse mapping text for a device in the current snapshot and apply it
    /// with [`apply_bulk`](Self::apply_bulk).
    pub async fn apply_mapping(
        &self,
        device: &str,
        text: &str,
    ) -> Result<(ParsedMapping, ApplyOutcome), CoreError> {
        let device = self.device(device)?;
        let parsed = mapping::parse_mapping(&device, text)?;
        let outcome = self.apply_bulk(&parsed.request).await;
        Ok((parsed, outcome))
    }

    // ── Queries ──────────────────────────────────────────────────

    pub async fn list_domains(&self) -> Result<Vec<DomainSummary>, CoreError> {
        self.inner.client.require()?.list_domains().await
    }

    /// Look a device up by id or name in the current snapshot.
    pub fn device(&self, identifier: &str) -> Result<Arc<Device>, CoreError> {
        self.snapshot()
            .find_device(identifier)
            .cloned()
            .ok_or_else(|| CoreError::DeviceNotFound {
                identifier: identifier.to_owned(),
            })
    }

    // ── State observation ────────────────────────────────────────

    pub fn snapshot(&self) -> Arc<Domain> {
        self.inner.store.current()
    }

    pub fn domain(&self) -> DomainStream {
        self.inner.store.subscribe()
    }

    pub fn status(&self) -> watch::Receiver<StatusReport> {
        self.inner.status.subscribe()
    }

    pub fn status_report(&self) -> StatusReport {
        self.inner.status.current()
    }

    pub fn events(&self) -> broadcast::Receiver<SyncEvent> {
        self.inner.events.subscribe()
    }

    // ── Session access ───────────────────────────────────────────

    async fn scheduler(&self) -> Option<Arc<PollScheduler<B>>> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.scheduler))
    }

    async fn applier(&self) -> Option<Arc<SubscriptionApplier<B>>> {
        self.inner
            .session
            .lock()
            .await
            .as_ref()
            .map(|s| Arc::clone(&s.applier))
    }
}

// ── Helpers ──────────────────────────────────────────────────────

fn build_client(config: &SyncConfig) -> Result<DanteClient, CoreError> {
    let transport = TransportConfig {
        tls: tls_to_transport(&config.tls),
        timeout: config.timeout,
    };
    Ok(DanteClient::from_api_key(
        &config.endpoint,
        &config.api_key,
        &transport,
    )?)
}

fn tls_to_transport(tls: &TlsVerification) -> TlsMode {
    match tls {
        TlsVerification::SystemDefaults => TlsMode::System,
        TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
        TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
    }
}
