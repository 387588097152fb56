// ── API-to-domain type conversions ──
//
// Bridges raw `dantesync_api` wire types into `dantesync_core::model`
// types. Nullable names and subscription fields collapse to empty strings.

use std::sync::Arc;

use dantesync_api::types as wire;

use crate::model::{
    Device, Domain, DomainSummary, MultipleChannelSubscription, RxChannel, RxChannelSubscription,
    TxChannel,
};

impl From<wire::Domain> for Domain {
    fn from(d: wire::Domain) -> Self {
        Self {
            id: d.id,
            name: d.name.unwrap_or_default(),
            devices: d
                .devices
                .into_iter()
                .map(|device| Arc::new(Device::from(device)))
                .collect(),
        }
    }
}

impl From<wire::Device> for Device {
    fn from(d: wire::Device) -> Self {
        Self {
            id: d.id,
            name: d.name.unwrap_or_default(),
            rx_channels: d.rx_channels.into_iter().map(RxChannel::from).collect(),
            tx_channels: d.tx_channels.into_iter().map(TxChannel::from).collect(),
        }
    }
}

impl From<wire::RxChannel> for RxChannel {
    fn from(rx: wire::RxChannel) -> Self {
        Self {
            id: rx.id,
            index: rx.index,
            name: rx.name.unwrap_or_default(),
            subscribed_device: rx.subscribed_device.unwrap_or_default(),
            subscribed_channel: rx.subscribed_channel.unwrap_or_default(),
            status: rx.status,
            summary: rx.summary,
            pending: false,
        }
    }
}

impl From<wire::TxChannel> for TxChannel {
    fn from(tx: wire::TxChannel) -> Self {
        Self {
            id: tx.id,
            index: tx.index,
            name: tx.name.unwrap_or_default(),
        }
    }
}

impl From<wire::DomainSummary> for DomainSummary {
    fn from(d: wire::DomainSummary) -> Self {
        Self {
            id: d.id,
            name: d.name.unwrap_or_default(),
        }
    }
}

// ── Domain-to-API (mutation input) ─────────────────────────────────

impl From<&RxChannelSubscription> for wire::RxChannelSubscriptionInput {
    fn from(s: &RxChannelSubscription) -> Self {
        Self {
            rx_channel_index: s.rx_channel_index,
            subscribed_device: s.subscribed_device.clone(),
            subscribed_channel: s.subscribed_channel.clone(),
        }
    }
}

impl From<&MultipleChannelSubscription> for wire::SubscriptionSetInput {
    fn from(request: &MultipleChannelSubscription) -> Self {
        Self {
            device_id: request.device_id.clone(),
            subscriptions: request.subscriptions.iter().map(Into::into).collect(),
        }
    }
}
