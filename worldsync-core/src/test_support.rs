//! In-memory `CountryStore` and record builders used by unit and behaviour
//! tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Mutex, MutexGuard};

use thiserror::Error;

use crate::{
    BasicFacts, CountryCode, CountryRecord, CountryStore, CountryView, DemographicRecord,
    EconomyRecord, EducationRecord, GeoJsonRecord, SelectionCandidate,
};

/// Store operations that [`MemoryStore`] can be told to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreOperation {
    /// [`CountryStore::upsert_country`].
    UpsertCountry,
    /// [`CountryStore::upsert_demographics`].
    UpsertDemographics,
    /// [`CountryStore::upsert_economy`].
    UpsertEconomy,
    /// [`CountryStore::upsert_education`].
    UpsertEducation,
    /// [`CountryStore::upsert_geojson`].
    UpsertGeojson,
}

/// Failures raised by [`MemoryStore`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
    /// A failure was injected for this operation and code.
    #[error("injected {operation:?} failure for {code}")]
    Injected {
        /// The failing operation.
        operation: StoreOperation,
        /// The affected country.
        code: CountryCode,
    },
    /// A dependent record referenced an unknown country.
    #[error("country {code} does not exist")]
    UnknownCountry {
        /// The missing country.
        code: CountryCode,
    },
    /// The inner lock was poisoned by a panicking test.
    #[error("memory store lock poisoned")]
    Poisoned,
}

/// In-memory `CountryStore` keyed by code.
///
/// Mirrors the referential rules of the SQLite gateway: dependent records
/// need an identity record first.
#[derive(Debug, Default)]
pub struct MemoryStore {
    countries: Mutex<BTreeMap<CountryCode, CountryView>>,
    failures: Mutex<HashSet<(StoreOperation, CountryCode)>>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` fail for `code` from now on.
    ///
    /// # Panics
    ///
    /// Panics when the failure set lock is poisoned.
    pub fn fail_on(&self, operation: StoreOperation, code: &CountryCode) {
        self.failures
            .lock()
            .expect("failure set lock")
            .insert((operation, code.clone()));
    }

    fn check(&self, operation: StoreOperation, code: &CountryCode) -> Result<(), MemoryStoreError> {
        let failures = self.failures.lock().map_err(|_| MemoryStoreError::Poisoned)?;
        if failures.contains(&(operation, code.clone())) {
            return Err(MemoryStoreError::Injected {
                operation,
                code: code.clone(),
            });
        }
        Ok(())
    }

    fn countries(
        &self,
    ) -> Result<MutexGuard<'_, BTreeMap<CountryCode, CountryView>>, MemoryStoreError> {
        self.countries.lock().map_err(|_| MemoryStoreError::Poisoned)
    }

    fn update_dependent(
        &self,
        operation: StoreOperation,
        code: &CountryCode,
        apply: impl FnOnce(&mut CountryView),
    ) -> Result<(), MemoryStoreError> {
        self.check(operation, code)?;
        let mut countries = self.countries()?;
        let view = countries
            .get_mut(code)
            .ok_or_else(|| MemoryStoreError::UnknownCountry { code: code.clone() })?;
        apply(view);
        Ok(())
    }
}

impl CountryStore for MemoryStore {
    type Error = MemoryStoreError;

    fn upsert_country(&self, record: &CountryRecord) -> Result<(), Self::Error> {
        self.check(StoreOperation::UpsertCountry, &record.code)?;
        let mut countries = self.countries()?;
        countries
            .entry(record.code.clone())
            .and_modify(|view| view.country = record.clone())
            .or_insert_with(|| CountryView::new(record.clone()));
        Ok(())
    }

    fn upsert_demographics(
        &self,
        code: &CountryCode,
        record: &DemographicRecord,
    ) -> Result<(), Self::Error> {
        self.update_dependent(StoreOperation::UpsertDemographics, code, |view| {
            view.demographics = Some(record.clone());
        })
    }

    fn upsert_economy(
        &self,
        code: &CountryCode,
        record: &EconomyRecord,
    ) -> Result<(), Self::Error> {
        self.update_dependent(StoreOperation::UpsertEconomy, code, |view| {
            view.economy = Some(record.clone());
        })
    }

    fn upsert_education(
        &self,
        code: &CountryCode,
        record: &EducationRecord,
    ) -> Result<(), Self::Error> {
        self.update_dependent(StoreOperation::UpsertEducation, code, |view| {
            view.education = Some(record.clone());
        })
    }

    fn upsert_geojson(
        &self,
        code: &CountryCode,
        record: &GeoJsonRecord,
    ) -> Result<(), Self::Error> {
        self.update_dependent(StoreOperation::UpsertGeojson, code, |view| {
            view.geojson = Some(record.clone());
        })
    }

    fn delete_country(&self, code: &CountryCode) -> Result<bool, Self::Error> {
        Ok(self.countries()?.remove(code).is_some())
    }

    fn get_country(&self, code: &CountryCode) -> Result<Option<CountryView>, Self::Error> {
        Ok(self.countries()?.get(code).cloned())
    }

    fn selection_candidates(&self) -> Result<Vec<SelectionCandidate>, Self::Error> {
        let countries = self.countries()?;
        Ok(countries
            .values()
            .filter_map(|view| {
                view.country.population.map(|population| SelectionCandidate {
                    code: view.country.code.clone(),
                    population,
                    birth_rate: view.demographics.as_ref().and_then(|d| d.birth_rate),
                })
            })
            .collect())
    }

    fn country_count(&self) -> Result<usize, Self::Error> {
        Ok(self.countries()?.len())
    }
}

/// Parse a code, panicking on invalid input.
///
/// # Panics
///
/// Panics when `raw` is not a valid alpha-2 code.
#[must_use]
pub fn code(raw: &str) -> CountryCode {
    CountryCode::parse(raw).expect("test country code should be valid")
}

/// A fact sheet with every required field populated.
///
/// # Panics
///
/// Panics when `raw_code` is not a valid alpha-2 code.
#[must_use]
pub fn complete_facts(raw_code: &str, name: &str) -> BasicFacts {
    let mut facts = BasicFacts::new(code(raw_code));
    facts.name = Some(name.to_owned());
    facts.population = Some(1_000_000);
    facts.capital = Some(format!("{name} City"));
    facts.longitude = Some(10.0);
    facts.latitude = Some(20.0);
    facts
}
