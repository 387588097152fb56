// dantesync-api: Async Rust client for the Dante domain GraphQL API

pub mod client;
pub mod error;
pub mod queries;
pub mod transport;
pub mod types;

pub use client::{DanteClient, ErrorPolicy, FetchPolicy, QueryOptions, Response};
pub use error::Error;
pub use transport::{TlsMode, TransportConfig};
