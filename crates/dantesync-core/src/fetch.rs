// ── Domain fetcher ──
//
// Retrieves full or subscription-only snapshots for the selected domain.
// Partial responses are accepted and their errors logged; transport
// failures are returned to the caller, which owns status reporting.

use std::sync::Arc;

use dantesync_api::QueryOptions;
use tracing::{debug, warn};

use crate::backend::{ClientSlot, DomainBackend, FetchMode};
use crate::error::CoreError;
use crate::model::Domain;

pub struct DomainFetcher<B> {
    client: Arc<ClientSlot<B>>,
    domain_id: Option<String>,
}

impl<B> Clone for DomainFetcher<B> {
    fn clone(&self) -> Self {
        Self {
            client: Arc::clone(&self.client),
            domain_id: self.domain_id.clone(),
        }
    }
}

impl<B: DomainBackend> DomainFetcher<B> {
    pub fn new(client: Arc<ClientSlot<B>>, domain_id: Option<String>) -> Self {
        Self { client, domain_id }
    }

    pub fn domain_id(&self) -> Option<&str> {
        self.domain_id.as_deref()
    }

    /// Full graph, bypassing the response cache.
    pub async fn fetch_full(&self) -> Result<Option<Domain>, CoreError> {
        self.fetch(FetchMode::Full, QueryOptions::network_only())
            .await
    }

    /// Rx subscription state only, bypassing the response cache.
    pub async fn fetch_subscriptions_only(&self) -> Result<Option<Domain>, CoreError> {
        self.fetch(FetchMode::SubscriptionsOnly, QueryOptions::network_only())
            .await
    }

    /// Fetch the selected domain. `Ok(None)` when the backend does not know it.
    pub async fn fetch(
        &self,
        mode: FetchMode,
        options: QueryOptions,
    ) -> Result<Option<Domain>, CoreError> {
        let domain_id = self.domain_id().ok_or(CoreError::NoDomainSelected)?;
        let client = self.client.require()?;

        debug!(domain = domain_id, %mode, ?options, "fetching domain");
        let Some(fetched) = client.fetch_domain(domain_id, mode, options).await? else {
            return Ok(None);
        };

        if let Some(first) = fetched.errors.first() {
            warn!(
                domain = domain_id,
                %mode,
                errors = fetched.errors.len(),
                first = %first,
                "domain fetch returned partial data"
            );
        }

        Ok(Some(fetched.domain))
    }
}
