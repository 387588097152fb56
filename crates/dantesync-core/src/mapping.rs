// ── Mapping text ──
//
// Compact routing notation for one receiving device:
//
//     Rx1=Out1@DevA; Rx2=; Rx3=ignore
//
// Left of `=` is an rx channel name (or index). Right is a source:
// `Channel@Device` subscribes, empty or `clear` unsubscribes, `ignore`
// leaves the channel alone. `learn_mapping` renders the live routing
// back into the same notation.

use tracing::warn;

use crate::error::CoreError;
use crate::model::{ChannelIntent, Device, MultipleChannelSubscription, RxChannel};

/// Result of parsing mapping text against a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedMapping {
    pub request: MultipleChannelSubscription,
    /// Rx names that matched no channel on the device.
    pub unknown: Vec<String>,
}

/// Interpret one source string.
pub fn parse_intent(source: &str) -> Result<ChannelIntent, CoreError> {
    let source = source.trim();
    if source.is_empty() || source.eq_ignore_ascii_case("clear") {
        return Ok(ChannelIntent::Clear);
    }
    if source.eq_ignore_ascii_case("ignore") {
        return Ok(ChannelIntent::Skip);
    }

    let Some((channel, device)) = source.rsplit_once('@') else {
        return Err(CoreError::ValidationFailed {
            message: format!("source '{source}' must be Channel@Device, 'clear' or 'ignore'"),
        });
    };
    let (channel, device) = (channel.trim(), device.trim());
    if channel.is_empty() || device.is_empty() {
        return Err(CoreError::ValidationFailed {
            message: format!("source '{source}' names only one of channel and device"),
        });
    }

    Ok(ChannelIntent::Set {
        device: device.to_owned(),
        channel: channel.to_owned(),
    })
}

/// Parse mapping text into a request for `device`.
///
/// Entries are separated by `;` or newlines. Unknown rx names are
/// collected in [`ParsedMapping::unknown`]; a mapping that yields no
/// entries at all is an error.
pub fn parse_mapping(device: &Device, text: &str) -> Result<ParsedMapping, CoreError> {
    let mut intents = Vec::new();
    let mut unknown = Vec::new();

    for entry in text
        .split([';', '\n'])
        .map(str::trim)
        .filter(|e| !e.is_empty())
    {
        let Some((rx_name, source)) = entry.split_once('=') else {
            return Err(CoreError::ValidationFailed {
                message: format!("mapping entry '{entry}' is missing '='"),
            });
        };
        let rx_name = rx_name.trim();

        let Some(rx) = resolve_rx(device, rx_name) else {
            warn!(device = %device.name, rx = rx_name, "unknown rx channel in mapping");
            unknown.push(rx_name.to_owned());
            continue;
        };
        intents.push((rx.index, parse_intent(source)?));
    }

    let request = MultipleChannelSubscription::from_intents(device.id.clone(), intents);
    if request.is_empty() {
        return Err(CoreError::ValidationFailed {
            message: format!("mapping for {} contains no applicable entries", device.name),
        });
    }

    Ok(ParsedMapping { request, unknown })
}

/// Render the device's current routing as mapping text.
///
/// Parsing the result against the same device yields a request that
/// changes nothing.
pub fn learn_mapping(device: &Device) -> String {
    let mut channels: Vec<&RxChannel> = device.rx_channels.iter().collect();
    channels.sort_by_key(|rx| rx.index);

    channels
        .into_iter()
        .map(|rx| format!("{}={}", rx.label(), source_of(rx)))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Source notation for a live rx channel; empty when unsubscribed.
pub fn source_of(rx: &RxChannel) -> String {
    if rx.is_subscribed() {
        format!("{}@{}", rx.subscribed_channel, rx.subscribed_device)
    } else {
        String::new()
    }
}

fn resolve_rx<'a>(device: &'a Device, name: &str) -> Option<&'a RxChannel> {
    device.rx_channel_by_name(name).or_else(|| {
        name.parse::<u32>()
            .ok()
            .and_then(|index| device.rx_channel(index))
    })
}
