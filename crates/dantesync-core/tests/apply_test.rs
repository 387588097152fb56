#![allow(clippy::unwrap_used)]
// Verified apply against a simulated non-transactional backend.

mod common;

use std::time::Duration;

use common::{DOMAIN_ID, RX_DEVICE, TX_DEVICE, domain_with, harness};
use dantesync_core::{
    ApplyOutcome, BulkApplyOptions, ChannelIntent, ChannelSubscription, ClientSlot, FetchMode,
    MultipleChannelSubscription, RxChannelSubscription, SubscriptionApplier,
};
use pretty_assertions::assert_eq;

fn options(retries: u32) -> BulkApplyOptions {
    BulkApplyOptions {
        retries,
        ..BulkApplyOptions::default()
    }
}

fn route_all(count: u32) -> MultipleChannelSubscription {
    let mut request = MultipleChannelSubscription::new(RX_DEVICE);
    for index in 1..=count {
        request.push(RxChannelSubscription::set(
            index,
            "DevA",
            format!("Out{index}"),
        ));
    }
    request
}

fn indices(request: &MultipleChannelSubscription) -> Vec<u32> {
    request
        .subscriptions
        .iter()
        .map(|s| s.rx_channel_index)
        .collect()
}

#[tokio::test(start_paused = true)]
async fn bulk_apply_batches_and_converges_first_time() {
    let h = harness(domain_with(25));
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());

    let outcome = applier
        .apply_many_with_retry(&route_all(25), &options(2))
        .await;

    assert_eq!(outcome, ApplyOutcome::Converged { attempts: 1 });
    let sizes: Vec<usize> = h.backend.mutation_log().iter().map(MultipleChannelSubscription::len).collect();
    assert_eq!(sizes, vec![10, 10, 5]);
    assert_eq!(h.backend.rx(RX_DEVICE, 25).subscribed_channel, "Out25");
}

#[tokio::test(start_paused = true)]
async fn dropped_writes_are_retried_until_converged() {
    let h = harness(domain_with(25));
    h.backend.drop_writes(RX_DEVICE, 4, 1);
    h.backend.drop_writes(RX_DEVICE, 13, 1);
    h.backend.drop_writes(RX_DEVICE, 22, 1);
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());

    let outcome = applier
        .apply_many_with_retry(&route_all(25), &options(2))
        .await;

    assert_eq!(outcome, ApplyOutcome::Converged { attempts: 2 });
    let log = h.backend.mutation_log();
    assert_eq!(log.len(), 4);
    assert_eq!(indices(&log[3]), vec![4, 13, 22]);

    let snapshot = h.store.current();
    let console = snapshot.device(RX_DEVICE).unwrap();
    assert!(console.rx_channels.iter().all(|rx| rx.is_subscribed() && !rx.pending));
}

#[tokio::test(start_paused = true)]
async fn each_retry_sends_a_subset_of_the_previous_mismatches() {
    let h = harness(domain_with(12));
    h.backend.drop_writes(RX_DEVICE, 2, 2);
    h.backend.drop_writes(RX_DEVICE, 7, 1);
    h.backend.drop_writes(RX_DEVICE, 11, 5);
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());

    let outcome = applier
        .apply_many_with_retry(&route_all(12), &options(2))
        .await;

    // 12 entries in two batches, then one re-send per retry.
    let log = h.backend.mutation_log();
    assert_eq!(log.len(), 4);
    assert_eq!(indices(&log[2]), vec![2, 7, 11]);
    assert_eq!(indices(&log[3]), vec![2, 11]);
    assert!(indices(&log[3]).iter().all(|i| indices(&log[2]).contains(i)));

    assert_eq!(
        outcome,
        ApplyOutcome::Exhausted {
            attempts: 3,
            unconverged: vec![RxChannelSubscription::set(11, "DevA", "Out11")],
        }
    );
    // Converged entries are not rolled back.
    assert_eq!(h.backend.rx(RX_DEVICE, 2).subscribed_channel, "Out2");
}

#[tokio::test(start_paused = true)]
async fn reapplying_a_converged_request_changes_nothing() {
    let h = harness(domain_with(8));
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());
    let request = route_all(8);

    let first = applier.apply_many_with_retry(&request, &options(2)).await;
    let after_first = h.backend.domain();
    let second = applier.apply_many_with_retry(&request, &options(2)).await;

    assert_eq!(first, ApplyOutcome::Converged { attempts: 1 });
    assert_eq!(second, ApplyOutcome::Converged { attempts: 1 });
    assert_eq!(h.backend.domain(), after_first);
}

#[tokio::test(start_paused = true)]
async fn set_clear_and_skip_in_one_request() {
    let h = harness(domain_with(3));
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());

    let request = MultipleChannelSubscription::from_intents(
        RX_DEVICE,
        [
            (
                1,
                ChannelIntent::Set {
                    device: "DevA".into(),
                    channel: "Out1".into(),
                },
            ),
            (2, ChannelIntent::Clear),
            (3, ChannelIntent::Skip),
        ],
    );
    assert_eq!(request.len(), 2);

    let outcome = applier.apply_many_with_retry(&request, &options(2)).await;
    assert!(outcome.succeeded());

    let rx1 = h.backend.rx(RX_DEVICE, 1);
    assert_eq!(
        (rx1.subscribed_device.as_str(), rx1.subscribed_channel.as_str()),
        ("DevA", "Out1")
    );
    assert!(!h.backend.rx(RX_DEVICE, 2).is_subscribed());
    assert!(!h.backend.rx(RX_DEVICE, 3).is_subscribed());
    assert!(
        h.backend.mutation_log()[0]
            .subscriptions
            .iter()
            .all(|s| s.rx_channel_index != 3)
    );
}

#[tokio::test(start_paused = true)]
async fn empty_request_sends_nothing() {
    let h = harness(domain_with(3));
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());

    let outcome = applier
        .apply_many_with_retry(&MultipleChannelSubscription::new(RX_DEVICE), &options(2))
        .await;

    assert_eq!(outcome, ApplyOutcome::Converged { attempts: 0 });
    assert!(h.backend.mutation_log().is_empty());
    assert!(h.backend.fetch_log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn vanished_device_is_unverifiable() {
    let h = harness(domain_with(4));
    h.backend.remove_device(RX_DEVICE);
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());

    let outcome = applier.apply_many_with_retry(&route_all(4), &options(2)).await;

    assert!(matches!(outcome, ApplyOutcome::Unverifiable { .. }));
    // No retries after an unverifiable read-back.
    assert_eq!(h.backend.fetch_log(), vec![FetchMode::SubscriptionsOnly]);
    assert!(h.store.current().device(TX_DEVICE).is_some());
}

#[tokio::test(start_paused = true)]
async fn slow_verification_times_out() {
    let h = harness(domain_with(4));
    h.backend.delay_fetches(Duration::from_secs(60));
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());

    let outcome = applier.apply_many_with_retry(&route_all(4), &options(2)).await;

    let ApplyOutcome::Unverifiable { reason } = outcome else {
        panic!("expected unverifiable, got {outcome:?}");
    };
    assert!(reason.contains("timed out"), "{reason}");
}

#[tokio::test(start_paused = true)]
async fn apply_without_client_is_none() {
    let h = harness(domain_with(2));
    let applier = SubscriptionApplier::new(
        std::sync::Arc::new(ClientSlot::new()),
        h.fetcher.clone(),
        h.store.clone(),
    );

    let result = applier
        .apply_one(&ChannelSubscription {
            rx_device_id: RX_DEVICE.into(),
            rx_channel_index: 1,
            tx_device_name: "DevA".into(),
            tx_channel_name: "Out1".into(),
        })
        .await;

    assert_eq!(result, None);
    assert!(h.backend.mutation_log().is_empty());
}

#[tokio::test(start_paused = true)]
async fn transport_failure_is_none_and_leaves_snapshot() {
    let h = harness(domain_with(2));
    h.store.replace(h.backend.domain());
    h.backend.fail_mutations(true);
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());
    let before = h.store.current();

    let result = applier.apply_many(&route_all(2)).await;

    assert_eq!(result, None);
    assert_eq!(*h.store.current(), *before);
}

#[tokio::test(start_paused = true)]
async fn apply_one_patches_then_reads_back() {
    let h = harness(domain_with(2));
    h.store.replace(h.backend.domain());
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());
    let mut stream = h.store.subscribe();

    let result = applier
        .apply_one(&ChannelSubscription {
            rx_device_id: RX_DEVICE.into(),
            rx_channel_index: 2,
            tx_device_name: "DevA".into(),
            tx_channel_name: "Out7".into(),
        })
        .await;
    assert_eq!(result.map(|r| r.ok), Some(true));

    // Optimistic patch first.
    let patched = stream.changed().await.unwrap();
    let rx = patched.device(RX_DEVICE).unwrap().rx_channel(2).unwrap().clone();
    assert!(rx.pending);
    assert_eq!(rx.subscribed_channel, "Out7");

    // Then the authoritative read-back clears the pending flag.
    let confirmed = stream.changed().await.unwrap();
    let rx = confirmed.device(RX_DEVICE).unwrap().rx_channel(2).unwrap().clone();
    assert!(!rx.pending);
    assert_eq!(rx.subscribed_channel, "Out7");
    assert_eq!(h.backend.fetch_log(), vec![FetchMode::SubscriptionsOnly]);
    assert_eq!(h.store.current().id, DOMAIN_ID);
}

#[tokio::test(start_paused = true)]
async fn one_sided_subscription_is_never_sent() {
    let h = harness(domain_with(2));
    h.store.replace(h.backend.domain());
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());
    let before = h.store.current();

    let result = applier
        .apply_one(&ChannelSubscription {
            rx_device_id: RX_DEVICE.into(),
            rx_channel_index: 1,
            tx_device_name: "DevA".into(),
            tx_channel_name: String::new(),
        })
        .await;

    assert_eq!(result, None);
    assert!(h.backend.mutation_log().is_empty());
    assert!(!h.backend.rx(RX_DEVICE, 1).is_subscribed());
    assert_eq!(*h.store.current(), *before);
}

#[tokio::test(start_paused = true)]
async fn bulk_request_with_one_sided_entry_is_rejected_whole() {
    let h = harness(domain_with(3));
    let applier = SubscriptionApplier::new(h.slot.clone(), h.fetcher.clone(), h.store.clone());
    let mut request = route_all(2);
    request.push(RxChannelSubscription::set(3, "", "Out3"));

    let outcome = applier.apply_many_with_retry(&request, &options(2)).await;

    let ApplyOutcome::Unverifiable { reason } = outcome else {
        panic!("expected rejection, got {outcome:?}");
    };
    assert!(reason.contains('3'), "{reason}");
    assert!(h.backend.mutation_log().is_empty());
    assert!(h.backend.fetch_log().is_empty());
    assert!(!h.backend.rx(RX_DEVICE, 1).is_subscribed());
}
