// Async GraphQL-over-HTTP client for the Dante domain API.
//
// Every operation is a POST of `{query, variables, operationName}` to a
// single endpoint. Query responses are kept in a per-(operation,
// variables) cache that `FetchPolicy::CacheFirst` reads from.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use tracing::{debug, warn};
use url::Url;

use crate::error::Error;
use crate::queries::{self, Operation, OperationKind};
use crate::transport::TransportConfig;
use crate::types::{
    self, DomainData, DomainSummary, DomainsData, GraphQlError, RawResponse,
    SubscriptionSetData, SubscriptionSetInput,
};

// ── Request options ──────────────────────────────────────────────────

/// Where a query may be answered from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FetchPolicy {
    /// Always hit the network; the response still refreshes the cache.
    NetworkOnly,
    /// Serve from the cache when an entry exists for the same variables.
    #[default]
    CacheFirst,
}

/// How GraphQL `errors` alongside `data` are treated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ErrorPolicy {
    /// Any reported error fails the request.
    #[default]
    None,
    /// Return partial data together with the reported errors.
    All,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryOptions {
    pub fetch_policy: FetchPolicy,
    pub error_policy: ErrorPolicy,
}

impl QueryOptions {
    /// Bypass the cache and keep partial data. Used for polling.
    pub const fn network_only() -> Self {
        Self {
            fetch_policy: FetchPolicy::NetworkOnly,
            error_policy: ErrorPolicy::All,
        }
    }

    /// Serve from the cache when possible and keep partial data.
    pub const fn cache_first() -> Self {
        Self {
            fetch_policy: FetchPolicy::CacheFirst,
            error_policy: ErrorPolicy::All,
        }
    }

    /// Strict network fetch: no cache and no partial data.
    pub const fn strict() -> Self {
        Self {
            fetch_policy: FetchPolicy::NetworkOnly,
            error_policy: ErrorPolicy::None,
        }
    }
}

/// Decoded data plus any GraphQL errors the error policy let through.
#[derive(Debug, Clone)]
pub struct Response<T> {
    pub data: T,
    pub errors: Vec<GraphQlError>,
}

impl<T> Response<T> {
    pub fn is_partial(&self) -> bool {
        !self.errors.is_empty()
    }
}

// ── Client ───────────────────────────────────────────────────────────

/// Async client for the Dante domain GraphQL API.
///
/// Cheap to clone: the HTTP pool and the response cache are shared.
#[derive(Debug, Clone)]
pub struct DanteClient {
    http: reqwest::Client,
    endpoint: Url,
    timeout: Duration,
    cache: Arc<DashMap<String, Value>>,
}

impl DanteClient {
    // ── Constructors ─────────────────────────────────────────────────

    /// Build from an API key and transport config.
    ///
    /// The key is sent as the `Authorization` header on every request.
    pub fn from_api_key(
        endpoint: &str,
        api_key: &secrecy::SecretString,
        transport: &TransportConfig,
    ) -> Result<Self, Error> {
        let mut headers = HeaderMap::new();
        let mut key_value =
            HeaderValue::from_str(api_key.expose_secret()).map_err(|e| Error::Authentication {
                message: format!("invalid API key header value: {e}"),
            })?;
        key_value.set_sensitive(true);
        headers.insert(reqwest::header::AUTHORIZATION, key_value);

        let http = transport.build_client(headers)?;
        let endpoint = Url::parse(endpoint)?;

        Ok(Self {
            http,
            endpoint,
            timeout: transport.timeout,
            cache: Arc::new(DashMap::new()),
        })
    }

    /// Wrap an existing `reqwest::Client` (caller manages auth headers).
    pub fn with_client(http: reqwest::Client, endpoint: Url) -> Self {
        Self {
            http,
            endpoint,
            timeout: TransportConfig::default().timeout,
            cache: Arc::new(DashMap::new()),
        }
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Drop every cached query response.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    // ── Typed operations ─────────────────────────────────────────────

    /// List the domains visible to this API key.
    pub async fn domains(&self) -> Result<Vec<DomainSummary>, Error> {
        let resp: Response<DomainsData> = self
            .execute(&queries::DOMAINS, json!({}), QueryOptions::strict())
            .await?;
        Ok(resp.data.domains)
    }

    /// Full domain graph: devices, rx channels with subscriptions, tx channels.
    ///
    /// `data` is `None` when the domain id does not exist.
    pub async fn domain(
        &self,
        domain_id: &str,
        options: QueryOptions,
    ) -> Result<Response<Option<types::Domain>>, Error> {
        self.domain_query(&queries::DOMAIN, domain_id, options).await
    }

    /// Rx subscription state only. Devices come back without tx channels.
    pub async fn domain_subscriptions(
        &self,
        domain_id: &str,
        options: QueryOptions,
    ) -> Result<Response<Option<types::Domain>>, Error> {
        self.domain_query(&queries::DOMAIN_SUBSCRIPTIONS, domain_id, options)
            .await
    }

    async fn domain_query(
        &self,
        op: &Operation,
        domain_id: &str,
        options: QueryOptions,
    ) -> Result<Response<Option<types::Domain>>, Error> {
        let resp: Response<DomainData> = self
            .execute(op, json!({ "domainIDInput": domain_id }), options)
            .await?;
        Ok(Response {
            data: resp.data.domain,
            errors: resp.errors,
        })
    }

    /// Set the subscriptions of one or more rx channels on a single device.
    ///
    /// Returns the backend's `ok` flag. The backend applies entries
    /// individually; `ok == true` does not mean every entry took effect.
    pub async fn set_rx_channel_subscriptions(
        &self,
        input: &SubscriptionSetInput,
    ) -> Result<bool, Error> {
        let variables = json!({ "input": input });
        let resp: Response<SubscriptionSetData> = self
            .execute(
                &queries::SET_RX_CHANNEL_SUBSCRIPTIONS,
                variables,
                QueryOptions::strict(),
            )
            .await?;
        Ok(resp.data.result.and_then(|r| r.ok).unwrap_or(false))
    }

    // ── Execution ────────────────────────────────────────────────────

    /// Run one GraphQL operation and decode its `data` member.
    pub async fn execute<T: DeserializeOwned>(
        &self,
        op: &Operation,
        variables: Value,
        options: QueryOptions,
    ) -> Result<Response<T>, Error> {
        let cache_key = format!("{}:{variables}", op.name);

        if op.kind == OperationKind::Query && options.fetch_policy == FetchPolicy::CacheFirst {
            let cached = self.cache.get(&cache_key).map(|entry| entry.value().clone());
            if let Some(data) = cached {
                debug!(operation = op.name, "serving from cache");
                return Ok(Response {
                    data: decode(data)?,
                    errors: Vec::new(),
                });
            }
        }

        debug!(operation = op.name, "POST {}", self.endpoint);
        let body = json!({
            "query": op.document,
            "variables": variables,
            "operationName": op.name,
        });

        let resp = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(parse_error(status, resp).await);
        }

        let text = resp.text().await.map_err(|e| self.map_send_error(e))?;
        let raw: RawResponse = serde_json::from_str(&text).map_err(|e| {
            let preview: String = text.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: text.clone(),
            }
        })?;

        let errors = raw.errors.unwrap_or_default();
        if !errors.is_empty() {
            if options.error_policy == ErrorPolicy::None {
                return Err(Error::GraphQl { errors });
            }
            warn!(
                operation = op.name,
                count = errors.len(),
                "response carried GraphQL errors, keeping partial data"
            );
        }

        let data = match raw.data {
            Some(data) if !data.is_null() => data,
            _ if errors.is_empty() => return Err(Error::MissingData { operation: op.name }),
            _ => return Err(Error::GraphQl { errors }),
        };

        match op.kind {
            OperationKind::Query => {
                self.cache.insert(cache_key, data.clone());
            }
            // Cached reads may now be stale.
            OperationKind::Mutation => self.cache.clear(),
        }

        Ok(Response {
            data: decode(data)?,
            errors,
        })
    }

    fn map_send_error(&self, e: reqwest::Error) -> Error {
        if e.is_timeout() {
            Error::Timeout {
                timeout_secs: self.timeout.as_secs(),
            }
        } else {
            Error::Transport(e)
        }
    }
}

// ── Response helpers ─────────────────────────────────────────────────

fn decode<T: DeserializeOwned>(data: Value) -> Result<T, Error> {
    serde_json::from_value(data.clone()).map_err(|e| Error::Deserialization {
        message: e.to_string(),
        body: data.to_string(),
    })
}

async fn parse_error(status: reqwest::StatusCode, resp: reqwest::Response) -> Error {
    if status == reqwest::StatusCode::UNAUTHORIZED || status == reqwest::StatusCode::FORBIDDEN {
        return Error::InvalidApiKey;
    }

    let raw = resp.text().await.unwrap_or_default();

    // GraphQL servers often report failures as a normal envelope with a 4xx status.
    if let Ok(RawResponse {
        errors: Some(errors),
        ..
    }) = serde_json::from_str::<RawResponse>(&raw)
    {
        if let Some(first) = errors.first() {
            return Error::Api {
                status: status.as_u16(),
                message: first.message.clone(),
            };
        }
    }

    Error::Api {
        status: status.as_u16(),
        message: if raw.is_empty() {
            status.to_string()
        } else {
            raw
        },
    }
}
