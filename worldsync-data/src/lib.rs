//! Data access and synchronisation logic for worldsync.
//!
//! Responsibilities:
//! - Fetch country facts, indicators and boundaries from their upstreams
//!   through one resilient HTTP client.
//! - Cache, extract and index the boundary shapefile.
//! - Persist country data in SQLite.
//! - Drive bulk and single-country synchronisation runs and serve queries.
//!
//! Boundaries:
//! - Do not encode domain rules (live in `worldsync-core`).
//! - Keep the public API synchronous; async I/O stays inside the HTTP client.
//!
//! Invariants:
//! - No global mutable state: adapters are built once and passed explicitly.
//! - Orchestrator entry points report failures in their results.
#![forbid(unsafe_code)]

pub mod geometry;
pub mod http;
pub mod query;
pub mod sources;
pub mod store;
pub mod sync;

pub use geometry::{GeometryConfig, GeometryError, GeometryExtractor, Resolution};
pub use http::{Fetch, FetchError, HttpClient, HttpClientConfig, RetryPolicy};
pub use query::{CountryService, QueryError};
pub use sources::{AdapterSet, LookupMode, SourceError};
pub use store::{SqliteCountryStore, StoreError};
pub use sync::{SyncConfig, SyncOrchestrator};
