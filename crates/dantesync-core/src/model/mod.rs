// ── Domain model ──
//
// Canonical types the store, poller and applier share. Wire types from
// `dantesync_api` are converted into these in `convert`.

pub mod domain;
pub mod subscription;

pub use domain::{Device, Domain, DomainStats, DomainSummary, RxChannel, TxChannel};
pub use subscription::{
    ChannelIntent, ChannelSubscription, MultipleChannelSubscription, RxChannelSubscription,
};
