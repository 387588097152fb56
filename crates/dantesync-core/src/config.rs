// ── Runtime sync configuration ──
//
// These types describe how to reach the Dante API and how the poller and
// bulk applier behave. They carry credential data and tuning, but never
// touch disk. The CLI constructs a `SyncConfig` and hands it in.

use std::ops::RangeInclusive;
use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::CoreError;

pub const DEFAULT_ENDPOINT: &str = "https://api.director.dante.cloud:443/graphql";

const POLL_INTERVAL_RANGE_MS: RangeInclusive<u64> = 1_000..=60_000;
const FULL_FETCH_INTERVAL_RANGE: RangeInclusive<u64> = 1..=1_000;
const DROPDOWN_THRESHOLD_RANGE: RangeInclusive<usize> = 10..=10_000;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (self-signed on-premises gateways).
    DangerAcceptInvalid,
}

/// Tuning for `apply_many_with_retry`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BulkApplyOptions {
    /// Maximum rx entries per mutation.
    pub batch_size: usize,
    /// Extra verify/re-apply rounds after the first attempt.
    pub retries: u32,
    /// Pause between consecutive batches of one attempt.
    pub batch_delay: Duration,
    /// Pause between a failed verification and the next attempt.
    pub retry_delay: Duration,
    /// Upper bound on each verification fetch.
    pub verify_timeout: Duration,
}

impl Default for BulkApplyOptions {
    fn default() -> Self {
        Self {
            batch_size: 10,
            retries: 2,
            batch_delay: Duration::from_millis(75),
            retry_delay: Duration::from_millis(250),
            verify_timeout: Duration::from_secs(10),
        }
    }
}

/// Configuration for syncing a single domain.
///
/// Built by the CLI, passed to `Controller` -- core never reads config files.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// GraphQL endpoint URL.
    pub endpoint: String,
    pub api_key: SecretString,
    pub tls: TlsVerification,
    /// Per-request transport timeout.
    pub timeout: Duration,
    /// Domain to sync. `None`, empty and `"default"` all mean unselected.
    pub domain_id: Option<String>,
    pub poll_interval: Duration,
    /// Every Nth poll fetches the full graph instead of subscriptions only.
    pub full_fetch_interval_polls: u64,
    /// Rx channel count above which definitions are only rebuilt on demand.
    pub max_channels_for_dropdowns: usize,
    pub bulk: BulkApplyOptions,
    pub pause_polling_on_bulk_apply: bool,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.into(),
            api_key: SecretString::from(String::new()),
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(30),
            domain_id: None,
            poll_interval: Duration::from_secs(30),
            full_fetch_interval_polls: 10,
            max_channels_for_dropdowns: 500,
            bulk: BulkApplyOptions::default(),
            pause_polling_on_bulk_apply: true,
        }
    }
}

impl SyncConfig {
    /// The domain id to poll, if one is actually selected.
    pub fn selected_domain(&self) -> Option<&str> {
        self.domain_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty() && *id != "default")
    }

    /// Check every tuning knob against its supported range.
    pub fn validate(&self) -> Result<(), CoreError> {
        let poll_ms = u64::try_from(self.poll_interval.as_millis()).unwrap_or(u64::MAX);
        if !POLL_INTERVAL_RANGE_MS.contains(&poll_ms) {
            return Err(invalid(format!(
                "poll interval must be between 1s and 60s (got {poll_ms}ms)"
            )));
        }
        if !FULL_FETCH_INTERVAL_RANGE.contains(&self.full_fetch_interval_polls) {
            return Err(invalid(format!(
                "full fetch interval must be between 1 and 1000 polls (got {})",
                self.full_fetch_interval_polls
            )));
        }
        if !DROPDOWN_THRESHOLD_RANGE.contains(&self.max_channels_for_dropdowns) {
            return Err(invalid(format!(
                "dropdown threshold must be between 10 and 10000 channels (got {})",
                self.max_channels_for_dropdowns
            )));
        }
        if self.bulk.batch_size == 0 {
            return Err(invalid("bulk batch size must be at least 1".into()));
        }
        if self.bulk.verify_timeout.is_zero() {
            return Err(invalid("verification timeout must be non-zero".into()));
        }
        Ok(())
    }
}

fn invalid(message: String) -> CoreError {
    CoreError::Config { message }
}
