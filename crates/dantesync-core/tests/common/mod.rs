#![allow(dead_code, clippy::unwrap_used)]
// In-memory Dante domain used by the integration tests.
//
// Mutations are applied entry by entry like the real backend, and a
// configurable set of rx channels can silently drop writes to model
// its non-transactional behaviour.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::Duration;

use dantesync_api::QueryOptions;
use dantesync_core::{
    ClientSlot, CoreError, Device, Domain, DomainBackend, DomainFetcher, DomainStore,
    DomainSummary, FetchMode, FetchedDomain, MultipleChannelSubscription, RxChannel, TxChannel,
};

pub const DOMAIN_ID: &str = "dom-1";
pub const RX_DEVICE: &str = "dev-rx";
pub const TX_DEVICE: &str = "dev-tx";

#[derive(Default)]
pub struct SimulatedBackend {
    state: Mutex<Domain>,
    /// Remaining writes to ignore per (device id, rx index).
    drops: Mutex<HashMap<(String, u32), u32>>,
    pub mutations: Mutex<Vec<MultipleChannelSubscription>>,
    pub fetches: Mutex<Vec<FetchMode>>,
    failing_fetches: AtomicU32,
    failing_mutations: AtomicBool,
    fetch_delay: Mutex<Option<Duration>>,
}

impl SimulatedBackend {
    pub fn new(domain: Domain) -> Arc<Self> {
        Arc::new(Self {
            state: Mutex::new(domain),
            ..Self::default()
        })
    }

    /// Silently ignore the next `times` writes to this rx channel.
    pub fn drop_writes(&self, device_id: &str, rx_index: u32, times: u32) {
        self.drops
            .lock()
            .unwrap()
            .insert((device_id.to_owned(), rx_index), times);
    }

    pub fn fail_next_fetches(&self, count: u32) {
        self.failing_fetches.store(count, Ordering::SeqCst);
    }

    pub fn fail_mutations(&self, fail: bool) {
        self.failing_mutations.store(fail, Ordering::SeqCst);
    }

    pub fn delay_fetches(&self, delay: Duration) {
        *self.fetch_delay.lock().unwrap() = Some(delay);
    }

    pub fn remove_device(&self, device_id: &str) {
        self.state
            .lock()
            .unwrap()
            .devices
            .retain(|d| d.id != device_id);
    }

    pub fn domain(&self) -> Domain {
        self.state.lock().unwrap().clone()
    }

    pub fn rx(&self, device_id: &str, index: u32) -> RxChannel {
        self.domain()
            .device(device_id)
            .and_then(|d| d.rx_channel(index).cloned())
            .unwrap()
    }

    pub fn fetch_log(&self) -> Vec<FetchMode> {
        self.fetches.lock().unwrap().clone()
    }

    pub fn mutation_log(&self) -> Vec<MultipleChannelSubscription> {
        self.mutations.lock().unwrap().clone()
    }
}

impl DomainBackend for SimulatedBackend {
    async fn fetch_domain(
        &self,
        domain_id: &str,
        mode: FetchMode,
        _options: QueryOptions,
    ) -> Result<Option<FetchedDomain>, CoreError> {
        self.fetches.lock().unwrap().push(mode);

        let delay = *self.fetch_delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let failing = self.failing_fetches.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_fetches.store(failing - 1, Ordering::SeqCst);
            return Err(CoreError::ConnectionFailed {
                url: "sim://".into(),
                reason: "connection reset".into(),
            });
        }

        let mut domain = self.domain();
        if domain.id != domain_id {
            return Ok(None);
        }
        if mode == FetchMode::SubscriptionsOnly {
            for device in &mut domain.devices {
                Arc::make_mut(device).tx_channels.clear();
            }
        }

        Ok(Some(FetchedDomain {
            domain,
            errors: Vec::new(),
        }))
    }

    async fn set_subscriptions(
        &self,
        request: &MultipleChannelSubscription,
    ) -> Result<bool, CoreError> {
        self.mutations.lock().unwrap().push(request.clone());
        if self.failing_mutations.load(Ordering::SeqCst) {
            return Err(CoreError::Timeout { timeout_secs: 30 });
        }

        let mut drops = self.drops.lock().unwrap();
        let mut state = self.state.lock().unwrap();
        let Some(device) = state.devices.iter_mut().find(|d| d.id == request.device_id) else {
            return Ok(false);
        };
        let device = Arc::make_mut(device);

        for entry in &request.subscriptions {
            let key = (request.device_id.clone(), entry.rx_channel_index);
            if let Some(remaining) = drops.get_mut(&key) {
                if *remaining > 0 {
                    *remaining -= 1;
                    continue;
                }
            }
            if let Some(rx) = device
                .rx_channels
                .iter_mut()
                .find(|rx| rx.index == entry.rx_channel_index)
            {
                rx.subscribed_device.clone_from(&entry.subscribed_device);
                rx.subscribed_channel.clone_from(&entry.subscribed_channel);
            }
        }

        Ok(true)
    }

    async fn list_domains(&self) -> Result<Vec<DomainSummary>, CoreError> {
        let domain = self.domain();
        Ok(vec![DomainSummary {
            id: domain.id,
            name: domain.name,
        }])
    }
}

// ── Fixtures ────────────────────────────────────────────────────────

/// A receiving console with `rx_count` unsubscribed channels and a
/// stagebox ("DevA") with 32 tx channels.
pub fn domain_with(rx_count: u32) -> Domain {
    let console = Device {
        id: RX_DEVICE.into(),
        name: "Console".into(),
        rx_channels: (1..=rx_count)
            .map(|index| RxChannel {
                id: format!("rx-{index}"),
                index,
                name: format!("Rx{index}"),
                ..RxChannel::default()
            })
            .collect(),
        tx_channels: Vec::new(),
    };
    let stagebox = Device {
        id: TX_DEVICE.into(),
        name: "DevA".into(),
        rx_channels: Vec::new(),
        tx_channels: (1..=32)
            .map(|index| TxChannel {
                id: format!("tx-{index}"),
                index,
                name: format!("Out{index}"),
            })
            .collect(),
    };

    Domain {
        id: DOMAIN_ID.into(),
        name: "Main".into(),
        devices: vec![Arc::new(console), Arc::new(stagebox)],
    }
}

pub struct Harness {
    pub backend: Arc<SimulatedBackend>,
    pub slot: Arc<ClientSlot<SimulatedBackend>>,
    pub store: Arc<DomainStore>,
    pub fetcher: DomainFetcher<SimulatedBackend>,
}

pub fn harness(domain: Domain) -> Harness {
    let backend = SimulatedBackend::new(domain);
    let slot = Arc::new(ClientSlot::with_client(Arc::clone(&backend)));
    let fetcher = DomainFetcher::new(Arc::clone(&slot), Some(DOMAIN_ID.into()));
    Harness {
        backend,
        slot,
        store: Arc::new(DomainStore::new()),
        fetcher,
    }
}
