// Wire types for the Dante domain GraphQL schema.
//
// Every nullable GraphQL field is tolerated: a field that failed to
// resolve comes back as `null` next to an entry in `errors`, and the
// partial data is still worth keeping. Null list elements are dropped.

use serde::{Deserialize, Deserializer, Serialize};

// ── Envelope ────────────────────────────────────────────────────────

/// One entry of the GraphQL `errors` array.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphQlError {
    pub message: String,
    #[serde(default)]
    pub path: Option<Vec<serde_json::Value>>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RawResponse {
    #[serde(default)]
    pub data: Option<serde_json::Value>,
    #[serde(default)]
    pub errors: Option<Vec<GraphQlError>>,
}

// ── Queries ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize)]
pub struct DomainsData {
    #[serde(default, deserialize_with = "vec_skip_null")]
    pub domains: Vec<DomainSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainSummary {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DomainData {
    #[serde(default)]
    pub domain: Option<Domain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Domain {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "vec_skip_null")]
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "vec_skip_null")]
    pub rx_channels: Vec<RxChannel>,
    /// Absent on subscription-only queries.
    #[serde(default, deserialize_with = "vec_skip_null")]
    pub tx_channels: Vec<TxChannel>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxChannel {
    pub id: String,
    pub index: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub subscribed_device: Option<String>,
    #[serde(default)]
    pub subscribed_channel: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxChannel {
    pub id: String,
    pub index: u32,
    #[serde(default)]
    pub name: Option<String>,
}

// ── Mutations ───────────────────────────────────────────────────────

/// Input for `DeviceRxChannelsSubscriptionSet`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionSetInput {
    pub device_id: String,
    pub subscriptions: Vec<RxChannelSubscriptionInput>,
}

/// One rx channel routing entry. Empty strings on both sides unsubscribe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RxChannelSubscriptionInput {
    pub rx_channel_index: u32,
    pub subscribed_device: String,
    pub subscribed_channel: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscriptionSetData {
    #[serde(rename = "DeviceRxChannelsSubscriptionSet", default)]
    pub result: Option<SubscriptionSetPayload>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SubscriptionSetPayload {
    #[serde(default)]
    pub ok: Option<bool>,
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Deserialize a nullable list of nullable items into a plain `Vec`.
fn vec_skip_null<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    let items: Option<Vec<Option<T>>> = Option::deserialize(deserializer)?;
    Ok(items.unwrap_or_default().into_iter().flatten().collect())
}
