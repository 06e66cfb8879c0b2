//! Upstream adapters.
//!
//! Each adapter normalises one upstream's response shape into the partial
//! records of `worldsync-core`. Adapters are independent types behind small
//! capability traits; the orchestrator receives them bundled in an
//! [`AdapterSet`] built once by the caller.

mod boundary;
mod facts;
mod indicators;

#[doc(hidden)]
pub mod test_support;

use std::sync::Arc;

use thiserror::Error;
use worldsync_core::{BasicFacts, BoundaryFeature, CountryCode, IndicatorSnapshot};

use crate::geometry::{GeometryConfig, GeometryError};
use crate::http::{Fetch, FetchError};

pub use boundary::BoundaryAdapter;
pub use facts::{
    DEFAULT_FACTS_BASE_URL, DEFAULT_FIELD_GROUPS, FactsSourceConfig, RestCountriesSource,
};
pub use indicators::{
    DEFAULT_INDICATOR_BASE_URL, IndicatorField, IndicatorSourceConfig, WorldBankSource,
};

/// Failures raised by adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SourceError {
    /// The upstream could not be reached or rejected the request.
    #[error(transparent)]
    Fetch(#[from] FetchError),
    /// The upstream answered with an unexpected shape.
    #[error("malformed payload from {url}: {reason}")]
    Malformed {
        /// Request rendered with its query.
        url: String,
        /// What was wrong with the payload.
        reason: String,
    },
    /// The boundary dataset could not be prepared or read.
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

/// How a boundary adapter resolves a code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupMode {
    /// Through the prepared index; used by bulk runs.
    Indexed,
    /// Through a linear scan that stops at the first match; used by
    /// single-country runs.
    Scan,
}

/// Source of identity facts and of the country universe.
pub trait FactsSource: Send + Sync {
    /// Fetch every country the upstream knows.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the universe cannot be obtained.
    fn fetch_all(&self) -> Result<Vec<BasicFacts>, SourceError>;

    /// Fetch one country; `Ok(None)` when the upstream has no entry.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the request fails or the payload is
    /// malformed.
    fn fetch(&self, code: &CountryCode) -> Result<Option<BasicFacts>, SourceError>;
}

/// Source of statistical indicators.
///
/// Individual indicator failures leave the matching field empty; they are
/// never surfaced to the caller.
pub trait IndicatorSource: Send + Sync {
    /// Fetch every known indicator for `code`.
    fn fetch(&self, code: &CountryCode) -> IndicatorSnapshot;
}

/// Source of country boundaries.
pub trait BoundarySource: Send + Sync {
    /// Prepare for [`LookupMode::Indexed`] lookups.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the dataset cannot be downloaded,
    /// validated or indexed.
    fn prepare(&self) -> Result<(), SourceError> {
        Ok(())
    }

    /// Fetch the boundary for `code`; `Ok(None)` when the dataset has none.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when the dataset or upstream fails.
    fn fetch(
        &self,
        code: &CountryCode,
        mode: LookupMode,
    ) -> Result<Option<BoundaryFeature>, SourceError>;

    /// Whether `code` resolves without a prepared dataset.
    ///
    /// Bulk runs still look such codes up after [`BoundarySource::prepare`]
    /// has failed.
    fn serves_without_dataset(&self, _code: &CountryCode) -> bool {
        false
    }

    /// Release prepared resources.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] when temporary files cannot be removed.
    fn close(&self) -> Result<(), SourceError> {
        Ok(())
    }
}

impl<T: BoundarySource + ?Sized> BoundarySource for Arc<T> {
    fn prepare(&self) -> Result<(), SourceError> {
        (**self).prepare()
    }

    fn fetch(
        &self,
        code: &CountryCode,
        mode: LookupMode,
    ) -> Result<Option<BoundaryFeature>, SourceError> {
        (**self).fetch(code, mode)
    }

    fn serves_without_dataset(&self, code: &CountryCode) -> bool {
        (**self).serves_without_dataset(code)
    }

    fn close(&self) -> Result<(), SourceError> {
        (**self).close()
    }
}

/// The adapters one orchestrator works with.
pub struct AdapterSet {
    /// Identity facts and universe.
    pub facts: Box<dyn FactsSource>,
    /// Statistical indicators.
    pub indicators: Box<dyn IndicatorSource>,
    /// Boundaries.
    pub boundaries: Box<dyn BoundarySource>,
}

impl std::fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSet").finish_non_exhaustive()
    }
}

impl AdapterSet {
    /// Bundle explicit adapters.
    #[must_use]
    pub fn new(
        facts: Box<dyn FactsSource>,
        indicators: Box<dyn IndicatorSource>,
        boundaries: Box<dyn BoundarySource>,
    ) -> Self {
        Self {
            facts,
            indicators,
            boundaries,
        }
    }

    /// Build the HTTP-backed adapters, all sharing `fetch`.
    #[must_use]
    pub fn http(
        fetch: &Arc<dyn Fetch>,
        facts: FactsSourceConfig,
        indicators: IndicatorSourceConfig,
        geometry: GeometryConfig,
    ) -> Self {
        Self::new(
            Box::new(RestCountriesSource::new(Arc::clone(fetch), facts)),
            Box::new(WorldBankSource::new(Arc::clone(fetch), indicators)),
            Box::new(BoundaryAdapter::new(Arc::clone(fetch), geometry)),
        )
    }
}
