// ── Subscription applier ──
//
// Routes rx channels to tx channels. The backend's multi-entry mutation
// is not transactional: `ok == true` only means the request was
// accepted, and individual entries can silently fail to take effect.
// `apply_many_with_retry` therefore batches the request, re-reads the
// live state, and re-sends only the entries that did not converge.

use std::sync::Arc;

use serde::Serialize;
use tokio::time::{sleep, timeout};
use tracing::{debug, error, info, warn};

use crate::backend::{ClientSlot, DomainBackend};
use crate::config::BulkApplyOptions;
use crate::fetch::DomainFetcher;
use crate::model::{ChannelSubscription, MultipleChannelSubscription, RxChannelSubscription};
use crate::store::DomainStore;

/// Backend acknowledgement of a subscription mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SubscriptionSetResult {
    pub ok: bool,
}

/// Result of a verified bulk apply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ApplyOutcome {
    /// Every requested entry matches the live state.
    Converged { attempts: u32 },
    /// Live state could not be read back, or the device vanished.
    Unverifiable { reason: String },
    /// Retries ran out. Converged entries stay applied.
    Exhausted {
        attempts: u32,
        unconverged: Vec<RxChannelSubscription>,
    },
}

impl ApplyOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self, Self::Converged { .. })
    }

    pub fn unconverged_count(&self) -> usize {
        match self {
            Self::Exhausted { unconverged, .. } => unconverged.len(),
            _ => 0,
        }
    }
}

/// Whether a mutation schedules its own background read-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Reconcile {
    Background,
    /// The caller verifies explicitly.
    Deferred,
}

pub struct SubscriptionApplier<B> {
    client: Arc<ClientSlot<B>>,
    fetcher: DomainFetcher<B>,
    store: Arc<DomainStore>,
}

impl<B: DomainBackend> SubscriptionApplier<B> {
    pub fn new(client: Arc<ClientSlot<B>>, fetcher: DomainFetcher<B>, store: Arc<DomainStore>) -> Self {
        Self {
            client,
            fetcher,
            store,
        }
    }

    /// Route one rx channel. `None` when the request is one-sided, no
    /// client is connected, or the mutation failed in transport.
    pub async fn apply_one(&self, subscription: &ChannelSubscription) -> Option<SubscriptionSetResult> {
        let request = MultipleChannelSubscription::from(subscription.clone());
        self.apply(&request, Reconcile::Background).await
    }

    /// Send one device's subscription set as a single mutation.
    pub async fn apply_many(
        &self,
        request: &MultipleChannelSubscription,
    ) -> Option<SubscriptionSetResult> {
        self.apply(request, Reconcile::Background).await
    }

    async fn apply(
        &self,
        request: &MultipleChannelSubscription,
        reconcile: Reconcile,
    ) -> Option<SubscriptionSetResult> {
        if let Err(e) = request.validate() {
            warn!(device = %request.device_id, error = %e, "subscription request rejected");
            return None;
        }
        let Some(client) = self.client.get() else {
            debug!(device = %request.device_id, "subscription apply skipped, client not ready");
            return None;
        };

        let ok = match client.set_subscriptions(request).await {
            Ok(ok) => ok,
            Err(e) => {
                warn!(device = %request.device_id, error = %e, "subscription mutation failed");
                return None;
            }
        };

        if ok {
            self.store.patch_subscriptions(request);
        } else {
            warn!(
                device = %request.device_id,
                entries = request.len(),
                "backend did not acknowledge subscription mutation"
            );
        }

        if reconcile == Reconcile::Background {
            self.spawn_read_back();
        }

        Some(SubscriptionSetResult { ok })
    }

    /// Refetch subscription state after a mutation settles.
    fn spawn_read_back(&self) {
        let fetcher = self.fetcher.clone();
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            match fetcher.fetch_subscriptions_only().await {
                Ok(Some(domain)) => {
                    store.replace(domain);
                }
                Ok(None) => warn!("read-back after mutation found no domain"),
                Err(e) => warn!(error = %e, "read-back after mutation failed"),
            }
        });
    }

    // ── Verified bulk apply ──────────────────────────────────────────

    /// Apply `request` in batches, verify against live state, and re-send
    /// the mismatched remainder up to `options.retries` more times.
    ///
    /// Each retry sends a subset of the previous attempt's mismatches.
    /// Nothing is rolled back on failure.
    pub async fn apply_many_with_retry(
        &self,
        request: &MultipleChannelSubscription,
        options: &BulkApplyOptions,
    ) -> ApplyOutcome {
        if request.is_empty() {
            return ApplyOutcome::Converged { attempts: 0 };
        }
        if let Err(e) = request.validate() {
            warn!(device = %request.device_id, error = %e, "bulk subscription request rejected");
            return ApplyOutcome::Unverifiable {
                reason: e.to_string(),
            };
        }

        let device_id = request.device_id.as_str();
        let mut pending = request.clone();
        info!(
            device = device_id,
            entries = request.len(),
            batch_size = options.batch_size,
            retries = options.retries,
            "bulk subscription apply"
        );

        for attempt in 0..=options.retries {
            self.send_batches(&pending, options, attempt).await;

            // Verification must finish before the next attempt begins.
            let live = match timeout(options.verify_timeout, self.fetcher.fetch_subscriptions_only()).await {
                Ok(Ok(Some(domain))) => domain,
                Ok(Ok(None)) => return unverifiable(device_id, "domain not found".into()),
                Ok(Err(e)) => return unverifiable(device_id, format!("verification fetch failed: {e}")),
                Err(_) => {
                    return unverifiable(
                        device_id,
                        format!(
                            "verification fetch timed out after {}ms",
                            options.verify_timeout.as_millis()
                        ),
                    );
                }
            };

            let Some(device) = live.device(device_id).cloned() else {
                self.store.replace(live);
                return unverifiable(device_id, "device not found in domain".into());
            };

            let mismatches = pending.mismatches(&device);
            self.store.replace(live);

            if mismatches.is_empty() {
                info!(device = device_id, attempts = attempt + 1, "bulk apply converged");
                return ApplyOutcome::Converged {
                    attempts: attempt + 1,
                };
            }

            warn!(
                device = device_id,
                attempt = attempt + 1,
                pending = mismatches.len(),
                "bulk apply not converged"
            );
            pending = mismatches;

            if attempt < options.retries {
                sleep(options.retry_delay).await;
            }
        }

        error!(
            device = device_id,
            unconverged = pending.len(),
            "bulk apply gave up with channels unconverged"
        );
        ApplyOutcome::Exhausted {
            attempts: options.retries + 1,
            unconverged: pending.subscriptions,
        }
    }

    async fn send_batches(
        &self,
        pending: &MultipleChannelSubscription,
        options: &BulkApplyOptions,
        attempt: u32,
    ) {
        for (i, batch) in pending.batches(options.batch_size).iter().enumerate() {
            if i > 0 {
                sleep(options.batch_delay).await;
            }
            debug!(
                device = %batch.device_id,
                attempt = attempt + 1,
                batch = i + 1,
                entries = batch.len(),
                "sending subscription batch"
            );
            if self.apply(batch, Reconcile::Deferred).await.is_none() {
                warn!(device = %batch.device_id, batch = i + 1, "batch not delivered");
            }
        }
    }
}

fn unverifiable(device_id: &str, reason: String) -> ApplyOutcome {
    error!(device = device_id, %reason, "bulk apply could not be verified");
    ApplyOutcome::Unverifiable { reason }
}
