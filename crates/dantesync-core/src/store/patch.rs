// ── Snapshot writes ──
//
// `replace` installs an authoritative fetch result and reconciles any
// optimistic entries it supersedes. `patch_subscriptions` is a
// device-scoped copy-on-write: only the touched device is cloned, every
// other device keeps its `Arc`.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;

use super::DomainStore;
use crate::model::{Domain, MultipleChannelSubscription};

impl DomainStore {
    /// Replace the snapshot with a fetch result.
    ///
    /// Returns how many optimistically patched channels the new snapshot
    /// disagrees with.
    pub fn replace(&self, domain: Domain) -> usize {
        let previous = self.current();
        let diverged = reconcile(&previous, &domain);

        self.snapshot.send_replace(Arc::new(domain));
        self.last_refresh.send_replace(Some(Utc::now()));
        diverged
    }

    /// Optimistically apply a subscription request to the snapshot.
    ///
    /// Patched rx channels are flagged `pending` until the next replace.
    /// Returns the number of channels patched; unknown devices and rx
    /// indices are ignored.
    pub fn patch_subscriptions(&self, request: &MultipleChannelSubscription) -> usize {
        let mut patched = 0;

        self.snapshot.send_if_modified(|current| {
            let Some(pos) = current
                .devices
                .iter()
                .position(|d| d.id == request.device_id)
            else {
                return false;
            };

            let touches_device = request.subscriptions.iter().any(|entry| {
                current.devices[pos]
                    .rx_channel(entry.rx_channel_index)
                    .is_some()
            });
            if !touches_device {
                return false;
            }

            let domain = Arc::make_mut(current);
            let device = Arc::make_mut(&mut domain.devices[pos]);
            for entry in &request.subscriptions {
                if let Some(rx) = device
                    .rx_channels
                    .iter_mut()
                    .find(|rx| rx.index == entry.rx_channel_index)
                {
                    rx.subscribed_device.clone_from(&entry.subscribed_device);
                    rx.subscribed_channel.clone_from(&entry.subscribed_channel);
                    rx.pending = true;
                    patched += 1;
                }
            }
            true
        });

        if patched > 0 {
            debug!(device = %request.device_id, patched, "optimistic subscription patch");
        }
        patched
    }
}

/// Count pending entries in `previous` that `next` does not confirm.
fn reconcile(previous: &Domain, next: &Domain) -> usize {
    let mut diverged = 0;

    for device in previous.devices.iter().filter(|d| d.rx_channels.iter().any(|rx| rx.pending)) {
        let live = next.device(&device.id);
        for rx in device.rx_channels.iter().filter(|rx| rx.pending) {
            let confirmed = live.and_then(|d| d.rx_channel(rx.index)).is_some_and(|l| {
                l.subscribed_device == rx.subscribed_device
                    && l.subscribed_channel == rx.subscribed_channel
            });
            if !confirmed {
                diverged += 1;
                debug!(
                    device = %device.id,
                    rx = rx.index,
                    "optimistic subscription superseded by fetched state"
                );
            }
        }
    }

    diverged
}
