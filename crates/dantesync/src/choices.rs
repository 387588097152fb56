//! Selectable channel choices and routing state derived from a snapshot.
//!
//! Rx choices are keyed `index@deviceId` and labelled `name@deviceName`;
//! tx choices use `name@deviceName` for both. Above the dropdown
//! threshold no lists are built and consumers fall back to free text.

use serde::Serialize;

use dantesync_core::Domain;
use dantesync_core::mapping::source_of;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Choice {
    pub id: String,
    pub label: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChannelChoices {
    pub dropdowns: bool,
    pub rx: Vec<Choice>,
    pub tx: Vec<Choice>,
}

impl ChannelChoices {
    pub fn from_domain(domain: &Domain, max_channels_for_dropdowns: usize) -> Self {
        if domain.rx_channel_count() > max_channels_for_dropdowns {
            return Self::default();
        }

        let mut devices: Vec<_> = domain.devices.iter().collect();
        devices.sort_by(|a, b| a.name.cmp(&b.name));

        let mut rx = Vec::new();
        let mut tx = Vec::new();
        for device in devices {
            let mut rx_channels: Vec<_> = device.rx_channels.iter().collect();
            rx_channels.sort_by_key(|c| c.index);
            rx.extend(rx_channels.into_iter().map(|c| Choice {
                id: format!("{}@{}", c.index, device.id),
                label: format!("{}@{}", c.label(), device.name),
            }));

            let mut tx_channels: Vec<_> = device.tx_channels.iter().collect();
            tx_channels.sort_by_key(|c| c.index);
            tx.extend(tx_channels.into_iter().map(|c| {
                let id = format!("{}@{}", c.name, device.name);
                Choice {
                    label: id.clone(),
                    id,
                }
            }));
        }

        Self {
            dropdowns: true,
            rx,
            tx,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len() + self.tx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty() && self.tx.is_empty()
    }
}

/// Current source of one rx channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteState {
    pub rx: String,
    pub source: String,
}

/// Routing of every rx channel, ordered like the rx choices.
pub fn routing_state(domain: &Domain) -> Vec<RouteState> {
    let mut devices: Vec<_> = domain.devices.iter().collect();
    devices.sort_by(|a, b| a.name.cmp(&b.name));

    devices
        .into_iter()
        .flat_map(|device| {
            let mut channels: Vec<_> = device.rx_channels.iter().collect();
            channels.sort_by_key(|c| c.index);
            channels.into_iter().map(move |c| RouteState {
                rx: format!("{}@{}", c.index, device.id),
                source: source_of(c),
            })
        })
        .collect()
}
