//! Read-side queries over a [`CountryStore`].

use rand::Rng;
use thiserror::Error;
use worldsync_core::{
    CountryCode, CountryCodeError, CountryStore, CountryView, SelectionError, select_weighted,
};

/// Failures raised by [`CountryService`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum QueryError<E: std::error::Error + 'static> {
    /// The code is not a two-letter country code.
    #[error("invalid country code: {0}")]
    InvalidCode(#[from] CountryCodeError),
    /// Nothing is stored under the code.
    #[error("country {code} not found")]
    NotFound {
        /// The requested code.
        code: CountryCode,
    },
    /// No stored country has a positive selection weight.
    #[error(transparent)]
    NoEligibleCountries(SelectionError),
    /// The store could not be read.
    #[error("failed to read from the country store")]
    Store(#[source] E),
}

/// Lookups exposed to request handlers and the CLI.
#[derive(Debug, Clone, Copy)]
pub struct CountryService<'store, S> {
    store: &'store S,
}

impl<'store, S: CountryStore> CountryService<'store, S> {
    /// Query `store`.
    #[must_use]
    pub const fn new(store: &'store S) -> Self {
        Self { store }
    }

    /// Everything stored for `raw_code`, which is trimmed and upper-cased.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidCode`] for malformed codes,
    /// [`QueryError::NotFound`] when nothing is stored and
    /// [`QueryError::Store`] when the read fails.
    pub fn get_country(&self, raw_code: &str) -> Result<CountryView, QueryError<S::Error>> {
        let code = CountryCode::parse(raw_code)?;
        self.store
            .get_country(&code)
            .map_err(QueryError::Store)?
            .ok_or(QueryError::NotFound { code })
    }

    /// Draw one stored country, weighted by expected annual births.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::NoEligibleCountries`] when no stored country
    /// has a positive weight and [`QueryError::Store`] when the read fails.
    pub fn random_weighted_country<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<CountryView, QueryError<S::Error>> {
        let candidates = self
            .store
            .selection_candidates()
            .map_err(QueryError::Store)?;
        let code = select_weighted(&candidates, rng)
            .map_err(QueryError::NoEligibleCountries)?
            .clone();
        self.store
            .get_country(&code)
            .map_err(QueryError::Store)?
            .ok_or(QueryError::NotFound { code })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;
    use rstest::{fixture, rstest};
    use worldsync_core::test_support::{MemoryStore, code, complete_facts};
    use worldsync_core::{CountryRecord, DemographicRecord};

    #[fixture]
    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .upsert_country(&CountryRecord::from_facts(complete_facts("KE", "Kenya")))
            .expect("insert KE");
        let mut empty = complete_facts("VA", "Vatican City");
        empty.population = Some(0);
        store
            .upsert_country(&CountryRecord::from_facts(empty))
            .expect("insert VA");
        store
            .upsert_demographics(
                &code("KE"),
                &DemographicRecord {
                    birth_rate: Some(27.0),
                    ..DemographicRecord::default()
                },
            )
            .expect("demographics");
        store
    }

    #[rstest]
    fn lookups_normalise_the_code(store: MemoryStore) {
        let view = CountryService::new(&store)
            .get_country(" ke ")
            .expect("stored country");
        assert_eq!(view.country.code, code("KE"));
        assert_eq!(view.country.completeness, 1.0);
    }

    #[rstest]
    fn unknown_codes_are_not_found(store: MemoryStore) {
        let err = CountryService::new(&store)
            .get_country("ZZ")
            .expect_err("nothing stored");
        assert!(matches!(err, QueryError::NotFound { code: ref c } if c.as_str() == "ZZ"));
    }

    #[rstest]
    #[case("")]
    #[case("KEN")]
    #[case("4E")]
    fn malformed_codes_are_invalid(store: MemoryStore, #[case] raw: &str) {
        let err = CountryService::new(&store)
            .get_country(raw)
            .expect_err("invalid code");
        assert!(matches!(err, QueryError::InvalidCode(_)));
    }

    #[rstest]
    fn random_draws_skip_zero_populations(store: MemoryStore) {
        let service = CountryService::new(&store);
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        for _ in 0..50 {
            let view = service
                .random_weighted_country(&mut rng)
                .expect("eligible country");
            assert_eq!(view.country.code.as_str(), "KE");
        }
    }

    #[rstest]
    fn empty_stores_have_no_eligible_countries() {
        let store = MemoryStore::new();
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let err = CountryService::new(&store)
            .random_weighted_country(&mut rng)
            .expect_err("empty pool");
        assert!(matches!(
            err,
            QueryError::NoEligibleCountries(SelectionError::NoEligibleCountries)
        ));
    }
}
