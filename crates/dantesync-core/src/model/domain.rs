// ── Domain tree ──

use std::sync::Arc;

use serde::Serialize;

/// A domain and every device in it.
///
/// Devices are shared behind `Arc` so an optimistic patch can replace one
/// device without cloning the rest of the tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Domain {
    pub id: String,
    pub name: String,
    pub devices: Vec<Arc<Device>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub name: String,
    pub rx_channels: Vec<RxChannel>,
    /// Empty after a subscription-only fetch.
    pub tx_channels: Vec<TxChannel>,
}

/// Receive channel. An empty device and channel pair means unsubscribed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RxChannel {
    pub id: String,
    pub index: u32,
    pub name: String,
    pub subscribed_device: String,
    pub subscribed_channel: String,
    pub status: Option<String>,
    pub summary: Option<String>,
    /// Set by an optimistic patch until the next authoritative fetch.
    #[serde(skip)]
    pub pending: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TxChannel {
    pub id: String,
    pub index: u32,
    pub name: String,
}

/// Entry of the domain list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DomainSummary {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStats {
    pub devices: usize,
    pub rx_channels: usize,
    pub tx_channels: usize,
}

impl Domain {
    /// True for the placeholder held before the first fetch.
    pub fn is_empty(&self) -> bool {
        self.id.is_empty() && self.devices.is_empty()
    }

    pub fn device(&self, id: &str) -> Option<&Arc<Device>> {
        self.devices.iter().find(|d| d.id == id)
    }

    pub fn device_by_name(&self, name: &str) -> Option<&Arc<Device>> {
        self.devices.iter().find(|d| d.name == name)
    }

    /// Look a device up by id first, then by name.
    pub fn find_device(&self, identifier: &str) -> Option<&Arc<Device>> {
        self.device(identifier)
            .or_else(|| self.device_by_name(identifier))
    }

    pub fn stats(&self) -> DomainStats {
        self.devices.iter().fold(
            DomainStats {
                devices: self.devices.len(),
                ..DomainStats::default()
            },
            |mut acc, device| {
                acc.rx_channels += device.rx_channels.len();
                acc.tx_channels += device.tx_channels.len();
                acc
            },
        )
    }

    pub fn rx_channel_count(&self) -> usize {
        self.devices.iter().map(|d| d.rx_channels.len()).sum()
    }

    pub fn has_pending(&self) -> bool {
        self.devices
            .iter()
            .any(|d| d.rx_channels.iter().any(|rx| rx.pending))
    }
}

impl Device {
    pub fn rx_channel(&self, index: u32) -> Option<&RxChannel> {
        self.rx_channels.iter().find(|rx| rx.index == index)
    }

    pub fn rx_channel_by_name(&self, name: &str) -> Option<&RxChannel> {
        self.rx_channels.iter().find(|rx| rx.name == name)
    }
}

impl RxChannel {
    pub fn is_subscribed(&self) -> bool {
        !self.subscribed_device.is_empty() || !self.subscribed_channel.is_empty()
    }

    /// Name used in mapping text; unnamed channels fall back to their index.
    pub fn label(&self) -> String {
        if self.name.is_empty() {
            self.index.to_string()
        } else {
            self.name.clone()
        }
    }
}
