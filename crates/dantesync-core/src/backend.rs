// ── Backend seam ──
//
// Everything the core needs from the remote API, behind one trait so the
// poller and applier can run against an in-memory domain in tests.
// `DanteClient` is the production implementation.

use std::future::Future;
use std::sync::Arc;

use dantesync_api::types::SubscriptionSetInput;
use dantesync_api::{DanteClient, QueryOptions};
use serde::Serialize;
use tokio::sync::watch;

use crate::error::CoreError;
use crate::model::{Domain, DomainSummary, MultipleChannelSubscription};

/// Which part of the domain graph a fetch retrieves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, strum::Display)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum FetchMode {
    /// Devices, rx channels with subscriptions, and tx channels.
    Full,
    /// Rx subscription state only; devices carry no tx channels.
    SubscriptionsOnly,
}

/// A fetched domain plus the partial-failure messages reported with it.
#[derive(Debug, Clone)]
pub struct FetchedDomain {
    pub domain: Domain,
    pub errors: Vec<String>,
}

/// Remote operations the sync engine depends on.
pub trait DomainBackend: Send + Sync + 'static {
    /// Fetch a domain. `Ok(None)` when the id does not exist.
    fn fetch_domain(
        &self,
        domain_id: &str,
        mode: FetchMode,
        options: QueryOptions,
    ) -> impl Future<Output = Result<Option<FetchedDomain>, CoreError>> + Send;

    /// Apply one device's subscription set; returns the backend's `ok` flag.
    fn set_subscriptions(
        &self,
        request: &MultipleChannelSubscription,
    ) -> impl Future<Output = Result<bool, CoreError>> + Send;

    fn list_domains(&self) -> impl Future<Output = Result<Vec<DomainSummary>, CoreError>> + Send;
}

impl DomainBackend for DanteClient {
    async fn fetch_domain(
        &self,
        domain_id: &str,
        mode: FetchMode,
        options: QueryOptions,
    ) -> Result<Option<FetchedDomain>, CoreError> {
        let resp = match mode {
            FetchMode::Full => self.domain(domain_id, options).await?,
            FetchMode::SubscriptionsOnly => self.domain_subscriptions(domain_id, options).await?,
        };
        let errors = resp.errors.into_iter().map(|e| e.message).collect();
        Ok(resp.data.map(|domain| FetchedDomain {
            domain: domain.into(),
            errors,
        }))
    }

    async fn set_subscriptions(
        &self,
        request: &MultipleChannelSubscription,
    ) -> Result<bool, CoreError> {
        let input = SubscriptionSetInput::from(request);
        Ok(self.set_rx_channel_subscriptions(&input).await?)
    }

    async fn list_domains(&self) -> Result<Vec<DomainSummary>, CoreError> {
        Ok(self
            .domains()
            .await?
            .into_iter()
            .map(DomainSummary::from)
            .collect())
    }
}

// ── Client slot ──────────────────────────────────────────────────────

/// Shared, swappable handle to the current backend.
///
/// Empty until `Controller::connect` and again after `disconnect`;
/// operations that find it empty report `CoreError::ClientNotReady`.
pub struct ClientSlot<B> {
    tx: watch::Sender<Option<Arc<B>>>,
}

impl<B> ClientSlot<B> {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    pub fn with_client(client: Arc<B>) -> Self {
        let (tx, _) = watch::channel(Some(client));
        Self { tx }
    }

    pub fn get(&self) -> Option<Arc<B>> {
        self.tx.borrow().clone()
    }

    pub fn require(&self) -> Result<Arc<B>, CoreError> {
        self.get().ok_or(CoreError::ClientNotReady)
    }

    pub fn set(&self, client: Arc<B>) {
        self.tx.send_replace(Some(client));
    }

    pub fn clear(&self) {
        self.tx.send_replace(None);
    }
}

impl<B> Default for ClientSlot<B> {
    fn default() -> Self {
        Self::new()
    }
}
