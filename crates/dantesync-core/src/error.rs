// ── Core error types ──
//
// User-facing errors from dantesync-core. Consumers never see HTTP
// status codes or GraphQL envelopes directly: the
// `From<dantesync_api::Error>` impl translates transport-layer errors
// into domain variants.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach Dante API at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("API client not initialised")]
    ClientNotReady,

    // ── Data errors ──────────────────────────────────────────────────
    #[error("No domain selected")]
    NoDomainSelected,

    #[error("Domain not found: {id}")]
    DomainNotFound { id: String },

    #[error("Device not found: {identifier}")]
    DeviceNotFound { identifier: String },

    #[error("Rx channel not found on {device}: {channel}")]
    RxChannelNotFound { device: String, channel: String },

    // ── Operation errors ─────────────────────────────────────────────
    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("API error: {message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the failure means the API is unreachable rather than unhappy.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            Self::ConnectionFailed { .. }
                | Self::Timeout { .. }
                | Self::AuthenticationFailed { .. }
                | Self::ClientNotReady
        )
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<dantesync_api::Error> for CoreError {
    fn from(err: dantesync_api::Error) -> Self {
        match err {
            dantesync_api::Error::InvalidApiKey => CoreError::AuthenticationFailed {
                message: "Invalid API key".into(),
            },
            dantesync_api::Error::Authentication { message } => {
                CoreError::AuthenticationFailed { message }
            }
            dantesync_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout { timeout_secs: 0 }
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: e.status().map(|s| s.as_u16()),
                    }
                }
            }
            dantesync_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            dantesync_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            dantesync_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            dantesync_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            dantesync_api::Error::GraphQl { errors } => CoreError::Api {
                message: errors
                    .into_iter()
                    .map(|e| e.message)
                    .collect::<Vec<_>>()
                    .join("; "),
                status: None,
            },
            dantesync_api::Error::MissingData { operation } => {
                CoreError::Internal(format!("{operation} returned no data"))
            }
            dantesync_api::Error::InvalidRequest(message) => CoreError::ValidationFailed { message },
            dantesync_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
