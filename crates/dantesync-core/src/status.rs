// ── Connection status ──
//
// A single indicator reflecting the outcome of the last fetch. Every
// change is logged once; repeated identical reports are swallowed.

use serde::Serialize;
use tokio::sync::watch;
use tracing::{info, warn};

/// Health of the link to the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
pub enum ConnectionStatus {
    Ok,
    Connecting,
    Disconnected,
    BadConfig,
}

/// Status plus an optional human-readable detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusReport {
    pub status: ConnectionStatus,
    pub message: Option<String>,
}

impl StatusReport {
    pub fn new(status: ConnectionStatus, message: Option<String>) -> Self {
        Self { status, message }
    }
}

impl std::fmt::Display for StatusReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.message {
            Some(message) => write!(f, "{}: {message}", self.status),
            None => write!(f, "{}", self.status),
        }
    }
}

/// Single-writer holder of the current [`StatusReport`].
pub struct StatusTracker {
    tx: watch::Sender<StatusReport>,
}

impl StatusTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(StatusReport::new(ConnectionStatus::Disconnected, None));
        Self { tx }
    }

    pub fn set(&self, status: ConnectionStatus, message: Option<String>) {
        let report = StatusReport::new(status, message);
        let changed = self.tx.send_if_modified(|current| {
            if *current == report {
                false
            } else {
                *current = report.clone();
                true
            }
        });

        if changed {
            match status {
                ConnectionStatus::Ok | ConnectionStatus::Connecting => {
                    info!(status = %report, "connection status changed");
                }
                ConnectionStatus::Disconnected | ConnectionStatus::BadConfig => {
                    warn!(status = %report, "connection status changed");
                }
            }
        }
    }

    pub fn current(&self) -> StatusReport {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<StatusReport> {
        self.tx.subscribe()
    }
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}
