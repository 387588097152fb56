// ── Routing requests ──
//
// Requests are plain values consumed once by the applier. An entry with
// both fields empty clears the rx channel; one-sided entries fail
// `validate` and never reach the backend.

use serde::Serialize;

use super::domain::{Device, RxChannel};
use crate::error::CoreError;

/// Route a single rx channel to a tx channel on another device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSubscription {
    pub rx_device_id: String,
    pub rx_channel_index: u32,
    pub tx_device_name: String,
    pub tx_channel_name: String,
}

/// Desired source of one rx channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RxChannelSubscription {
    pub rx_channel_index: u32,
    pub subscribed_device: String,
    pub subscribed_channel: String,
}

/// A set of rx routing changes on one device.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MultipleChannelSubscription {
    pub device_id: String,
    pub subscriptions: Vec<RxChannelSubscription>,
}

/// What to do with one rx channel in a bulk request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelIntent {
    /// Leave the channel out of the request.
    Skip,
    /// Unsubscribe the channel.
    Clear,
    /// Subscribe the channel to `channel` on `device`.
    Set { device: String, channel: String },
}

impl ChannelIntent {
    pub fn into_subscription(self, rx_channel_index: u32) -> Option<RxChannelSubscription> {
        match self {
            Self::Skip => None,
            Self::Clear => Some(RxChannelSubscription::clear(rx_channel_index)),
            Self::Set { device, channel } => Some(RxChannelSubscription::set(
                rx_channel_index,
                device,
                channel,
            )),
        }
    }
}

impl RxChannelSubscription {
    pub fn set(
        rx_channel_index: u32,
        device: impl Into<String>,
        channel: impl Into<String>,
    ) -> Self {
        Self {
            rx_channel_index,
            subscribed_device: device.into(),
            subscribed_channel: channel.into(),
        }
    }

    pub fn clear(rx_channel_index: u32) -> Self {
        Self {
            rx_channel_index,
            subscribed_device: String::new(),
            subscribed_channel: String::new(),
        }
    }

    pub fn is_clear(&self) -> bool {
        self.subscribed_device.is_empty() && self.subscribed_channel.is_empty()
    }

    /// Exactly one of device and channel set. Never sent to the backend.
    pub fn is_one_sided(&self) -> bool {
        self.subscribed_device.is_empty() != self.subscribed_channel.is_empty()
    }

    /// Whether the live channel already routes the way this entry asks.
    pub fn is_satisfied_by(&self, rx: &RxChannel) -> bool {
        rx.subscribed_device == self.subscribed_device
            && rx.subscribed_channel == self.subscribed_channel
    }
}

impl MultipleChannelSubscription {
    pub fn new(device_id: impl Into<String>) -> Self {
        Self {
            device_id: device_id.into(),
            subscriptions: Vec::new(),
        }
    }

    /// Build a request from per-channel intents. `Skip` entries are dropped.
    pub fn from_intents(
        device_id: impl Into<String>,
        intents: impl IntoIterator<Item = (u32, ChannelIntent)>,
    ) -> Self {
        let mut request = Self::new(device_id);
        for (index, intent) in intents {
            if let Some(entry) = intent.into_subscription(index) {
                request.push(entry);
            }
        }
        request
    }

    /// Add an entry. A later entry for the same rx index replaces the earlier one.
    pub fn push(&mut self, entry: RxChannelSubscription) {
        if let Some(existing) = self
            .subscriptions
            .iter_mut()
            .find(|s| s.rx_channel_index == entry.rx_channel_index)
        {
            *existing = entry;
        } else {
            self.subscriptions.push(entry);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.subscriptions.is_empty()
    }

    /// Reject entries that would write only one subscription field.
    pub fn validate(&self) -> Result<(), CoreError> {
        let one_sided: Vec<String> = self
            .subscriptions
            .iter()
            .filter(|s| s.is_one_sided())
            .map(|s| s.rx_channel_index.to_string())
            .collect();
        if one_sided.is_empty() {
            return Ok(());
        }
        Err(CoreError::ValidationFailed {
            message: format!(
                "rx channel(s) {} on device {} need both a tx device and a tx channel, or neither",
                one_sided.join(", "),
                self.device_id
            ),
        })
    }

    pub fn len(&self) -> usize {
        self.subscriptions.len()
    }

    /// Split into ordered requests of at most `batch_size` entries.
    pub fn batches(&self, batch_size: usize) -> Vec<MultipleChannelSubscription> {
        self.subscriptions
            .chunks(batch_size.max(1))
            .map(|chunk| MultipleChannelSubscription {
                device_id: self.device_id.clone(),
                subscriptions: chunk.to_vec(),
            })
            .collect()
    }

    /// Entries whose live routing on `device` differs from the request.
    ///
    /// An rx index the device does not have counts as a mismatch.
    pub fn mismatches(&self, device: &Device) -> MultipleChannelSubscription {
        MultipleChannelSubscription {
            device_id: self.device_id.clone(),
            subscriptions: self
                .subscriptions
                .iter()
                .filter(|entry| {
                    device
                        .rx_channel(entry.rx_channel_index)
                        .is_none_or(|rx| !entry.is_satisfied_by(rx))
                })
                .cloned()
                .collect(),
        }
    }
}

impl From<ChannelSubscription> for MultipleChannelSubscription {
    fn from(sub: ChannelSubscription) -> Self {
        Self {
            device_id: sub.rx_device_id,
            subscriptions: vec![RxChannelSubscription::set(
                sub.rx_channel_index,
                sub.tx_device_name,
                sub.tx_channel_name,
            )],
        }
    }
}
