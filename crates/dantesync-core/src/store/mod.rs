// ── Domain snapshot store ──

mod domain_store;
mod patch;

pub use domain_store::DomainStore;
