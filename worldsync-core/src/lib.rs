//! Core domain types for worldsync.
//!
//! The crate models country records and the partial records produced by each
//! upstream, boundary features, run bookkeeping, weighted selection and the
//! persistence gateway trait. It performs no I/O.
#![forbid(unsafe_code)]

mod batch;
mod boundary;
mod code;
mod country;
mod envelope;
mod indicators;
mod select;
mod store;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use batch::{
    Aspect, AspectFailure, BatchResult, BatchStatus, FailedCountry, SyncReport, SyncStatus,
    unix_seconds,
};
pub use boundary::{
    BoundaryFeature, COUNTRY_BOUNDARY, FeatureCollection, FeatureProperties, GeoJsonRecord,
    Geometry, GeometryKind, Position, Ring, RingSplitError,
};
pub use code::{CountryCode, CountryCodeError, normalise_lookup_code};
pub use country::{BasicFacts, CountryRecord, REQUIRED_FIELD_COUNT};
pub use envelope::{API_VERSION, Envelope, ErrorBody, ResponseMetadata};
pub use indicators::{DemographicRecord, EconomyRecord, EducationRecord, IndicatorSnapshot};
pub use select::{DEFAULT_BIRTH_RATE, SelectionCandidate, SelectionError, select_weighted};
pub use store::{CountryStore, CountryView};
