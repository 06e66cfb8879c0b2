//! In-memory adapters for orchestrator tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use worldsync_core::{
    BasicFacts, BoundaryFeature, CountryCode, FeatureProperties, Geometry, IndicatorSnapshot,
};

use super::{BoundarySource, FactsSource, IndicatorSource, LookupMode, SourceError};

fn stub_error(reason: &str) -> SourceError {
    SourceError::Malformed {
        url: "stub://".to_owned(),
        reason: reason.to_owned(),
    }
}

/// Facts adapter serving a fixed universe.
#[derive(Debug, Default)]
pub struct StubFacts {
    universe: Vec<BasicFacts>,
    unavailable: bool,
    failing: HashSet<CountryCode>,
}

impl StubFacts {
    /// Serve `universe`, in order, duplicates included.
    #[must_use]
    pub fn with_universe(universe: Vec<BasicFacts>) -> Self {
        Self {
            universe,
            ..Self::default()
        }
    }

    /// Fail every universe request.
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Fail single-country requests for `code`.
    #[must_use]
    pub fn failing_for(mut self, code: CountryCode) -> Self {
        self.failing.insert(code);
        self
    }
}

impl FactsSource for StubFacts {
    fn fetch_all(&self) -> Result<Vec<BasicFacts>, SourceError> {
        if self.unavailable {
            return Err(stub_error("universe unavailable"));
        }
        Ok(self.universe.clone())
    }

    fn fetch(&self, code: &CountryCode) -> Result<Option<BasicFacts>, SourceError> {
        if self.failing.contains(code) {
            return Err(stub_error("facts unavailable"));
        }
        Ok(self
            .universe
            .iter()
            .find(|facts| facts.code == *code)
            .cloned())
    }
}

/// Indicator adapter serving fixed snapshots; unknown codes get an empty one.
#[derive(Debug, Default)]
pub struct StubIndicators {
    snapshots: HashMap<CountryCode, IndicatorSnapshot>,
}

impl StubIndicators {
    /// Serve `snapshot` for `code`.
    #[must_use]
    pub fn with(mut self, code: CountryCode, snapshot: IndicatorSnapshot) -> Self {
        self.snapshots.insert(code, snapshot);
        self
    }
}

impl IndicatorSource for StubIndicators {
    fn fetch(&self, code: &CountryCode) -> IndicatorSnapshot {
        self.snapshots.get(code).cloned().unwrap_or_default()
    }
}

/// Boundary adapter serving fixed features and recording lookups.
#[derive(Debug, Default)]
pub struct StubBoundaries {
    features: HashMap<CountryCode, BoundaryFeature>,
    failing: HashSet<CountryCode>,
    independent: HashSet<CountryCode>,
    unprepared: bool,
    lookups: Mutex<Vec<(CountryCode, LookupMode)>>,
}

impl StubBoundaries {
    /// Serve a unit-square boundary for `code`.
    #[must_use]
    pub fn with_square(mut self, code: CountryCode) -> Self {
        let feature = square_feature(&code);
        self.features.insert(code, feature);
        self
    }

    /// Fail lookups for `code`.
    #[must_use]
    pub fn failing_for(mut self, code: CountryCode) -> Self {
        self.failing.insert(code);
        self
    }

    /// Serve a unit square for `code` even when preparation fails.
    #[must_use]
    pub fn with_reserved(mut self, code: CountryCode) -> Self {
        self.independent.insert(code.clone());
        self.with_square(code)
    }

    /// Fail [`BoundarySource::prepare`].
    #[must_use]
    pub const fn unpreparable(mut self) -> Self {
        self.unprepared = true;
        self
    }

    /// Lookups made so far, in order.
    ///
    /// # Panics
    ///
    /// Panics when the lookup log lock is poisoned.
    #[must_use]
    pub fn lookups(&self) -> Vec<(CountryCode, LookupMode)> {
        self.lookups.lock().expect("lookup log lock").clone()
    }
}

impl BoundarySource for StubBoundaries {
    fn prepare(&self) -> Result<(), SourceError> {
        if self.unprepared {
            return Err(stub_error("archive is missing required members"));
        }
        Ok(())
    }

    fn fetch(
        &self,
        code: &CountryCode,
        mode: LookupMode,
    ) -> Result<Option<BoundaryFeature>, SourceError> {
        if let Ok(mut lookups) = self.lookups.lock() {
            lookups.push((code.clone(), mode));
        }
        if self.failing.contains(code) {
            return Err(stub_error("boundary unavailable"));
        }
        if self.unprepared && !self.independent.contains(code) {
            return Err(stub_error("boundary dataset was not prepared"));
        }
        Ok(self.features.get(code).cloned())
    }

    fn serves_without_dataset(&self, code: &CountryCode) -> bool {
        self.independent.contains(code)
    }
}

/// A unit-square polygon tagged with `code`.
#[must_use]
pub fn square_feature(code: &CountryCode) -> BoundaryFeature {
    BoundaryFeature {
        properties: FeatureProperties {
            country_id: Some(code.to_string()),
            iso_a2: Some(code.to_string()),
            ..FeatureProperties::default()
        },
        geometry: Geometry::Polygon(vec![vec![
            [0.0, 0.0],
            [0.0, 1.0],
            [1.0, 1.0],
            [1.0, 0.0],
            [0.0, 0.0],
        ]]),
    }
}
