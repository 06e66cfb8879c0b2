//! Facade crate for worldsync.
//!
//! This crate re-exports the core domain types and, behind the `store-sqlite`
//! feature, the data layer: SQLite store, sync orchestrator and query service.

#![forbid(unsafe_code)]

pub use worldsync_core::{
    Aspect, BasicFacts, BatchResult, BatchStatus, BoundaryFeature, CountryCode, CountryRecord,
    CountryStore, CountryView, Envelope, GeoJsonRecord, Geometry, IndicatorSnapshot,
    ResponseMetadata, SelectionError, SyncReport, SyncStatus, select_weighted,
};

#[cfg(feature = "store-sqlite")]
pub use worldsync_data::{
    AdapterSet, CountryService, GeometryConfig, HttpClient, QueryError, SqliteCountryStore,
    StoreError, SyncConfig, SyncOrchestrator,
};
