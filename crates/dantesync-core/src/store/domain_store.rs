// ── Central domain store ──
//
// Holds the one current `Domain` snapshot. Fetch results replace it
// wholesale; the applier's optimistic patch is the only partial write.
// Every change is broadcast to subscribers through a `watch` channel.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::watch;

use crate::model::Domain;
use crate::stream::DomainStream;

pub struct DomainStore {
    pub(super) snapshot: watch::Sender<Arc<Domain>>,
    pub(super) last_refresh: watch::Sender<Option<DateTime<Utc>>>,
}

impl DomainStore {
    pub fn new() -> Self {
        let (snapshot, _) = watch::channel(Arc::new(Domain::default()));
        let (last_refresh, _) = watch::channel(None);
        Self {
            snapshot,
            last_refresh,
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    /// The current snapshot. Cheap: clones an `Arc`.
    pub fn current(&self) -> Arc<Domain> {
        self.snapshot.borrow().clone()
    }

    pub fn subscribe(&self) -> DomainStream {
        DomainStream::new(self.snapshot.subscribe())
    }

    // ── Writes ───────────────────────────────────────────────────────

    /// Drop back to the empty startup snapshot.
    pub fn reset(&self) {
        self.snapshot.send_replace(Arc::new(Domain::default()));
        self.last_refresh.send_replace(None);
    }

    // ── Metadata ─────────────────────────────────────────────────────

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        *self.last_refresh.borrow()
    }

    /// How long ago the last authoritative replace happened.
    pub fn data_age(&self) -> Option<chrono::Duration> {
        self.last_refresh().map(|t| Utc::now() - t)
    }
}

impl Default for DomainStore {
    fn default() -> Self {
        Self::new()
    }
}
