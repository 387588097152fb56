#![allow(clippy::unwrap_used)]
// Integration tests for `DanteClient` against a wiremock GraphQL endpoint.

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use dantesync_api::types::{RxChannelSubscriptionInput, SubscriptionSetInput};
use dantesync_api::{DanteClient, Error, QueryOptions, TransportConfig};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, DanteClient) {
    let server = MockServer::start().await;
    let endpoint = Url::parse(&format!("{}/graphql", server.uri())).unwrap();
    let client = DanteClient::with_client(reqwest::Client::new(), endpoint);
    (server, client)
}

fn domain_body() -> serde_json::Value {
    json!({
        "data": {
            "domain": {
                "id": "dom-1",
                "name": "Main",
                "devices": [{
                    "id": "dev-a",
                    "name": "DevA",
                    "rxChannels": [{
                        "id": "rx-1",
                        "index": 1,
                        "name": "Rx1",
                        "subscribedDevice": "DevB",
                        "subscribedChannel": "Out1",
                        "status": "DYNAMIC",
                        "summary": "CONNECTED"
                    }],
                    "txChannels": [{ "id": "tx-1", "index": 1, "name": "Out1" }]
                }]
            }
        }
    })
}

// ── Query tests ─────────────────────────────────────────────────────

#[tokio::test]
async fn test_domain_sends_operation_and_variables() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(path("/graphql"))
        .and(body_partial_json(json!({
            "operationName": "Domain",
            "variables": { "domainIDInput": "dom-1" }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(domain_body()))
        .expect(1)
        .mount(&server)
        .await;

    let resp = client
        .domain("dom-1", QueryOptions::network_only())
        .await
        .unwrap();

    let domain = resp.data.as_ref().unwrap();
    assert_eq!(domain.id, "dom-1");
    assert_eq!(domain.devices[0].rx_channels[0].subscribed_channel.as_deref(), Some("Out1"));
    assert_eq!(domain.devices[0].tx_channels.len(), 1);
    assert!(!resp.is_partial());
}

#[tokio::test]
async fn test_subscription_query_omits_tx_channels() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "operationName": "DomainSubscriptions" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "domain": { "id": "dom-1", "name": "Main", "devices": [
                { "id": "dev-a", "name": "DevA", "rxChannels": [] }
            ]}}
        })))
        .mount(&server)
        .await;

    let resp = client
        .domain_subscriptions("dom-1", QueryOptions::network_only())
        .await
        .unwrap();
    let domain = resp.data.unwrap();
    assert!(domain.devices[0].tx_channels.is_empty());
}

#[tokio::test]
async fn test_unknown_domain_is_none() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "domain": null }
        })))
        .mount(&server)
        .await;

    let resp = client
        .domain("missing", QueryOptions::network_only())
        .await
        .unwrap();
    assert!(resp.data.is_none());
}

#[tokio::test]
async fn test_list_domains() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "operationName": "Domains" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "domains": [
                { "id": "dom-1", "name": "Main" },
                { "id": "dom-2", "name": null }
            ]}
        })))
        .mount(&server)
        .await;

    let domains = client.domains().await.unwrap();
    assert_eq!(domains.len(), 2);
    assert_eq!(domains[1].name, None);
}

// ── Error policy tests ──────────────────────────────────────────────

fn partial_body() -> serde_json::Value {
    json!({
        "data": { "domain": { "id": "dom-1", "name": "Main", "devices": [
            null,
            { "id": "dev-a", "name": "DevA", "rxChannels": [], "txChannels": [] }
        ]}},
        "errors": [{ "message": "device dev-x unreachable", "path": ["domain", "devices", 0] }]
    })
}

#[tokio::test]
async fn test_error_policy_all_keeps_partial_data() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(partial_body()))
        .mount(&server)
        .await;

    let resp = client
        .domain("dom-1", QueryOptions::network_only())
        .await
        .unwrap();

    assert!(resp.is_partial());
    assert_eq!(resp.errors[0].message, "device dev-x unreachable");
    assert_eq!(resp.data.unwrap().devices.len(), 1);
}

#[tokio::test]
async fn test_error_policy_none_rejects_partial_data() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(partial_body()))
        .mount(&server)
        .await;

    let result = client.domain("dom-1", QueryOptions::strict()).await;

    assert!(
        matches!(result, Err(Error::GraphQl { ref errors }) if errors.len() == 1),
        "expected GraphQl error, got: {result:?}"
    );
}

#[tokio::test]
async fn test_errors_without_data_fail_under_any_policy() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": null,
            "errors": [{ "message": "boom" }]
        })))
        .mount(&server)
        .await;

    let result = client.domain("dom-1", QueryOptions::network_only()).await;
    assert!(matches!(result, Err(Error::GraphQl { .. })));
}

// ── Cache policy tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_cache_first_reuses_previous_response() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(domain_body()))
        .expect(1)
        .mount(&server)
        .await;

    client
        .domain("dom-1", QueryOptions::cache_first())
        .await
        .unwrap();
    let second = client
        .domain("dom-1", QueryOptions::cache_first())
        .await
        .unwrap();

    assert_eq!(second.data.unwrap().name.as_deref(), Some("Main"));
}

#[tokio::test]
async fn test_network_only_bypasses_cache() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(domain_body()))
        .expect(2)
        .mount(&server)
        .await;

    client
        .domain("dom-1", QueryOptions::cache_first())
        .await
        .unwrap();
    client
        .domain("dom-1", QueryOptions::network_only())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_mutation_invalidates_cache() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "operationName": "Domain" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(domain_body()))
        .expect(2)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(body_partial_json(json!({ "operationName": "DeviceRxChannelsSubscriptionSet" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "DeviceRxChannelsSubscriptionSet": { "ok": true } }
        })))
        .mount(&server)
        .await;

    client
        .domain("dom-1", QueryOptions::cache_first())
        .await
        .unwrap();
    let input = SubscriptionSetInput {
        device_id: "dev-a".into(),
        subscriptions: Vec::new(),
    };
    client.set_rx_channel_subscriptions(&input).await.unwrap();
    client
        .domain("dom-1", QueryOptions::cache_first())
        .await
        .unwrap();
}

// ── Mutation tests ──────────────────────────────────────────────────

#[tokio::test]
async fn test_set_subscriptions_sends_input() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .and(body_partial_json(json!({
            "operationName": "DeviceRxChannelsSubscriptionSet",
            "variables": { "input": {
                "deviceId": "dev-a",
                "subscriptions": [
                    { "rxChannelIndex": 1, "subscribedDevice": "DevB", "subscribedChannel": "Out1" },
                    { "rxChannelIndex": 2, "subscribedDevice": "", "subscribedChannel": "" }
                ]
            }}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "DeviceRxChannelsSubscriptionSet": { "ok": true } }
        })))
        .expect(1)
        .mount(&server)
        .await;

    let input = SubscriptionSetInput {
        device_id: "dev-a".into(),
        subscriptions: vec![
            RxChannelSubscriptionInput {
                rx_channel_index: 1,
                subscribed_device: "DevB".into(),
                subscribed_channel: "Out1".into(),
            },
            RxChannelSubscriptionInput {
                rx_channel_index: 2,
                subscribed_device: String::new(),
                subscribed_channel: String::new(),
            },
        ],
    };

    assert!(client.set_rx_channel_subscriptions(&input).await.unwrap());
}

#[tokio::test]
async fn test_set_subscriptions_null_ok_is_false() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": { "DeviceRxChannelsSubscriptionSet": { "ok": null } }
        })))
        .mount(&server)
        .await;

    let input = SubscriptionSetInput {
        device_id: "dev-a".into(),
        subscriptions: Vec::new(),
    };
    assert!(!client.set_rx_channel_subscriptions(&input).await.unwrap());
}

// ── HTTP failure tests ──────────────────────────────────────────────

#[tokio::test]
async fn test_unauthorized_maps_to_invalid_api_key() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(401).set_body_string("Unauthorized"))
        .mount(&server)
        .await;

    let result = client.domains().await;
    assert!(
        matches!(result, Err(Error::InvalidApiKey)),
        "expected InvalidApiKey, got: {result:?}"
    );
    assert!(result.unwrap_err().is_auth_failure());
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503).set_body_string("maintenance"))
        .mount(&server)
        .await;

    let err = client
        .domain("dom-1", QueryOptions::network_only())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Api { status: 503, ref message } if message == "maintenance"));
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_malformed_body_is_deserialization_error() {
    let (server, client) = setup().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
        .mount(&server)
        .await;

    let result = client.domains().await;
    assert!(matches!(result, Err(Error::Deserialization { ref body, .. }) if body.contains("proxy")));
}

#[tokio::test]
async fn test_from_api_key_rejects_bad_endpoint() {
    let key: secrecy::SecretString = "key".to_string().into();
    let result = DanteClient::from_api_key("not a url", &key, &TransportConfig::default());
    assert!(matches!(result, Err(Error::InvalidUrl(_))));
}
