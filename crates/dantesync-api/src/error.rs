use thiserror::Error;

use crate::types::GraphQlError;

/// Top-level error type for the `dantesync-api` crate.
///
/// Covers transport, authentication, HTTP-level and GraphQL-level
/// failures. `dantesync-core` maps these into domain diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The API key was rejected (HTTP 401/403).
    #[error("Invalid API key")]
    InvalidApiKey,

    /// The API key could not be turned into a request header.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── API ─────────────────────────────────────────────────────────
    /// Non-success HTTP status from the GraphQL endpoint.
    #[error("API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    /// The response carried GraphQL errors and the error policy rejects them.
    #[error("GraphQL error: {}", join_messages(.errors))]
    GraphQl { errors: Vec<GraphQlError> },

    /// The response had neither data nor errors.
    #[error("GraphQL response for {operation} contained no data")]
    MissingData { operation: &'static str },

    // ── Data ────────────────────────────────────────────────────────
    /// Request variables could not be serialized.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the server refused our credentials.
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, Self::InvalidApiKey | Self::Authentication { .. })
    }
}

fn join_messages(errors: &[GraphQlError]) -> String {
    errors
        .iter()
        .map(|e| e.message.as_str())
        .collect::<Vec<_>>()
        .join("; ")
}
