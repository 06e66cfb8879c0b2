//! Persistence gateway for country records.
//!
//! Implementations upsert one entity at a time, keyed by country code. Each
//! call must either commit fully or leave the stored state untouched.

use serde::Serialize;

use crate::{
    CountryCode, CountryRecord, DemographicRecord, EconomyRecord, EducationRecord, GeoJsonRecord,
    SelectionCandidate,
};

/// Everything stored about one country.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryView {
    /// Identity record.
    pub country: CountryRecord,
    /// Demographic indicators, if any were stored.
    pub demographics: Option<DemographicRecord>,
    /// Economic indicators, if any were stored.
    pub economy: Option<EconomyRecord>,
    /// Education indicators, if any were stored.
    pub education: Option<EducationRecord>,
    /// Boundary geometry, if any was stored.
    pub geojson: Option<GeoJsonRecord>,
}

impl CountryView {
    /// A view holding only the identity record.
    #[must_use]
    pub const fn new(country: CountryRecord) -> Self {
        Self {
            country,
            demographics: None,
            economy: None,
            education: None,
            geojson: None,
        }
    }
}

/// Idempotent, per-entity persistence of country data.
///
/// Dependent records require the identity record to exist first; writing one
/// for an unknown code is an error.
pub trait CountryStore {
    /// Backend-specific failure.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Insert or replace the identity record.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the write fails; nothing is changed.
    fn upsert_country(&self, record: &CountryRecord) -> Result<(), Self::Error>;

    /// Insert or replace demographic indicators for `code`.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the write fails; nothing is changed.
    fn upsert_demographics(
        &self,
        code: &CountryCode,
        record: &DemographicRecord,
    ) -> Result<(), Self::Error>;

    /// Insert or replace economic indicators for `code`.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the write fails; nothing is changed.
    fn upsert_economy(&self, code: &CountryCode, record: &EconomyRecord)
    -> Result<(), Self::Error>;

    /// Insert or replace education indicators for `code`.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the write fails; nothing is changed.
    fn upsert_education(
        &self,
        code: &CountryCode,
        record: &EducationRecord,
    ) -> Result<(), Self::Error>;

    /// Replace the stored boundary for `code` wholesale.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the write fails; nothing is changed.
    fn upsert_geojson(&self, code: &CountryCode, record: &GeoJsonRecord)
    -> Result<(), Self::Error>;

    /// Remove a country and every dependent record.
    ///
    /// Returns whether an identity record existed.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the delete fails; nothing is changed.
    fn delete_country(&self, code: &CountryCode) -> Result<bool, Self::Error>;

    /// Load everything stored for `code`.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the read fails.
    fn get_country(&self, code: &CountryCode) -> Result<Option<CountryView>, Self::Error>;

    /// Load population and birth rate for every stored country.
    ///
    /// Countries without a population are omitted.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the read fails.
    fn selection_candidates(&self) -> Result<Vec<SelectionCandidate>, Self::Error>;

    /// Number of stored identity records.
    ///
    /// # Errors
    ///
    /// Returns the backend error when the read fails.
    fn country_count(&self) -> Result<usize, Self::Error>;
}
