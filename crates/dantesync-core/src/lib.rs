// dantesync-core: Snapshot store, adaptive poller and verified bulk routing
// between dantesync-api and consumers (CLI).

pub mod apply;
pub mod backend;
pub mod config;
pub mod controller;
pub mod convert;
pub mod definitions;
pub mod error;
pub mod fetch;
pub mod mapping;
pub mod model;
pub mod scheduler;
pub mod status;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use apply::{ApplyOutcome, SubscriptionApplier, SubscriptionSetResult};
pub use backend::{ClientSlot, DomainBackend, FetchMode, FetchedDomain};
pub use config::{BulkApplyOptions, DEFAULT_ENDPOINT, SyncConfig, TlsVerification};
pub use controller::Controller;
pub use definitions::{DefinitionCache, DefinitionKind, DefinitionSink, Fingerprint};
pub use error::CoreError;
pub use fetch::DomainFetcher;
pub use mapping::{ParsedMapping, learn_mapping, parse_intent, parse_mapping};
pub use scheduler::{PollScheduler, PollSettings, SyncEvent, TickOutcome};
pub use status::{ConnectionStatus, StatusReport, StatusTracker};
pub use store::DomainStore;
pub use stream::DomainStream;

pub use model::{
    ChannelIntent, ChannelSubscription, Device, Domain, DomainStats, DomainSummary,
    MultipleChannelSubscription, RxChannel, RxChannelSubscription, TxChannel,
};
