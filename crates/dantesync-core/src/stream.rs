// ── Reactive domain stream ──
//
// Subscription type for consuming snapshot changes from the DomainStore.

use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use futures_core::Stream;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::model::Domain;

/// A subscription to the domain snapshot.
///
/// Provides both point-in-time access and change notification via
/// [`changed()`](Self::changed) or by converting into a `Stream`.
pub struct DomainStream {
    current: Arc<Domain>,
    receiver: watch::Receiver<Arc<Domain>>,
}

impl DomainStream {
    pub(crate) fn new(receiver: watch::Receiver<Arc<Domain>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The snapshot captured at creation or at the last `changed()`.
    pub fn current(&self) -> &Arc<Domain> {
        &self.current
    }

    pub fn latest(&self) -> Arc<Domain> {
        self.receiver.borrow().clone()
    }

    /// Whether a newer snapshot is waiting. False once the store is gone.
    pub fn has_changed(&self) -> bool {
        self.receiver.has_changed().unwrap_or(false)
    }

    /// Wait for the next change. `None` once the store has been dropped.
    pub async fn changed(&mut self) -> Option<Arc<Domain>> {
        self.receiver.changed().await.ok()?;
        let snap = self.receiver.borrow_and_update().clone();
        self.current = Arc::clone(&snap);
        Some(snap)
    }

    pub fn into_stream(self) -> DomainWatchStream {
        DomainWatchStream {
            inner: WatchStream::new(self.receiver),
        }
    }
}

/// `Stream` adapter yielding each new snapshot.
pub struct DomainWatchStream {
    inner: WatchStream<Arc<Domain>>,
}

impl Stream for DomainWatchStream {
    type Item = Arc<Domain>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.inner).poll_next(cx)
    }
}
