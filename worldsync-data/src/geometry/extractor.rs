//! Phase-tracked boundary extractor for one resolution tier.

use std::ops::ControlFlow;
use std::sync::{Arc, Mutex, RwLock};

use camino::Utf8PathBuf;
use log::{debug, info, warn};
use worldsync_core::{BoundaryFeature, normalise_lookup_code};

use super::cache::ensure_cached;
use super::index::{FeatureIndex, FeatureIndexBuilder};
use super::records::scan_records;
use super::{GeometryConfig, GeometryError};
use crate::http::Fetch;

/// Lifecycle of the extractor's index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExtractorPhase {
    /// No index is held.
    Unloaded,
    /// The archive is being fetched into the cache.
    Downloading,
    /// Records are being converted and written to the index.
    Indexing,
    /// An index is ready for lookups.
    Loaded,
}

#[derive(Debug)]
struct ExtractorState {
    phase: ExtractorPhase,
    index: Option<FeatureIndex>,
}

/// Converts the cached shapefile of one tier into boundary features.
///
/// Builds are serialised: at most one download or index build runs at a
/// time. Lookups against a loaded index only take a read lock and may run
/// concurrently.
pub struct GeometryExtractor {
    fetch: Arc<dyn Fetch>,
    config: GeometryConfig,
    build: Mutex<()>,
    state: RwLock<ExtractorState>,
}

impl std::fmt::Debug for GeometryExtractor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeometryExtractor")
            .field("config", &self.config)
            .field("phase", &self.phase())
            .finish_non_exhaustive()
    }
}

impl GeometryExtractor {
    /// Create an extractor in the [`ExtractorPhase::Unloaded`] phase.
    #[must_use]
    pub fn new(fetch: Arc<dyn Fetch>, config: GeometryConfig) -> Self {
        Self {
            fetch,
            config,
            build: Mutex::new(()),
            state: RwLock::new(ExtractorState {
                phase: ExtractorPhase::Unloaded,
                index: None,
            }),
        }
    }

    /// Configuration this extractor was created with.
    #[must_use]
    pub const fn config(&self) -> &GeometryConfig {
        &self.config
    }

    /// Current lifecycle phase. A poisoned state reads as unloaded.
    #[must_use]
    pub fn phase(&self) -> ExtractorPhase {
        self.state
            .read()
            .map_or(ExtractorPhase::Unloaded, |state| state.phase)
    }

    /// Number of indexed features, when loaded.
    #[must_use]
    pub fn record_count(&self) -> Option<usize> {
        self.state
            .read()
            .ok()
            .and_then(|state| state.index.as_ref().map(FeatureIndex::record_count))
    }

    /// Codes held by the loaded index, sorted; empty when unloaded.
    #[must_use]
    pub fn indexed_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = self
            .state
            .read()
            .ok()
            .and_then(|state| {
                state
                    .index
                    .as_ref()
                    .map(|index| index.codes().map(str::to_owned).collect())
            })
            .unwrap_or_default();
        codes.sort_unstable();
        codes
    }

    /// Data file of the loaded index.
    #[must_use]
    pub fn index_path(&self) -> Option<Utf8PathBuf> {
        self.state.read().ok().and_then(|state| {
            state
                .index
                .as_ref()
                .map(|index| index.data_path().to_path_buf())
        })
    }

    /// Download the tier if needed and index every record, replacing any
    /// previous index.
    ///
    /// Returns the number of indexed features. Unparseable geometries are
    /// logged and skipped; on any other failure the extractor returns to
    /// [`ExtractorPhase::Unloaded`].
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError`] for download, archive validation, cache I/O,
    /// shapefile decoding and alias collision failures.
    pub fn build_index(&self) -> Result<usize, GeometryError> {
        let _build = self.build.lock().map_err(|_| GeometryError::Poisoned)?;
        self.rebuild()
    }

    /// Build the index unless one is already loaded.
    ///
    /// # Errors
    ///
    /// See [`GeometryExtractor::build_index`].
    pub fn ensure_index(&self) -> Result<usize, GeometryError> {
        let _build = self.build.lock().map_err(|_| GeometryError::Poisoned)?;
        if let Some(count) = self.record_count() {
            return Ok(count);
        }
        self.rebuild()
    }

    fn rebuild(&self) -> Result<usize, GeometryError> {
        self.set_phase(ExtractorPhase::Downloading)?;
        match self.download_and_index() {
            Ok(index) => {
                let count = index.record_count();
                let mut state = self.state.write().map_err(|_| GeometryError::Poisoned)?;
                let previous = state.index.replace(index);
                state.phase = ExtractorPhase::Loaded;
                drop(state);
                if let Some(previous) = previous {
                    previous.close()?;
                }
                Ok(count)
            }
            Err(err) => {
                let mut state = self.state.write().map_err(|_| GeometryError::Poisoned)?;
                state.phase = if state.index.is_some() {
                    ExtractorPhase::Loaded
                } else {
                    ExtractorPhase::Unloaded
                };
                Err(err)
            }
        }
    }

    fn download_and_index(&self) -> Result<FeatureIndex, GeometryError> {
        let shp = ensure_cached(self.fetch.as_ref(), &self.config)?;
        self.set_phase(ExtractorPhase::Indexing)?;

        let mut builder = FeatureIndexBuilder::create_in(&self.config.tier_dir())?;
        let mut skipped = 0_usize;
        scan_records(&shp, |record| {
            match record.into_feature() {
                Ok(feature) => {
                    builder.append(&feature)?;
                }
                Err(err) => {
                    warn!("skipping record: {err}");
                    skipped = skipped.saturating_add(1);
                }
            }
            Ok(ControlFlow::Continue(()))
        })?;
        let index = builder.finish()?;
        info!(
            "indexed {} boundary features ({} codes, {skipped} skipped) for the {} tier",
            index.record_count(),
            index.code_count(),
            self.config.resolution
        );
        Ok(index)
    }

    fn set_phase(&self, phase: ExtractorPhase) -> Result<(), GeometryError> {
        self.state
            .write()
            .map_err(|_| GeometryError::Poisoned)?
            .phase = phase;
        Ok(())
    }

    /// Look up a feature by alpha-2 or alpha-3 code in the loaded index.
    ///
    /// Codes are trimmed and upper-cased first; malformed codes find nothing.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::NotLoaded`] before an index is built, and
    /// data file I/O or decoding failures.
    pub fn by_code(&self, code: &str) -> Result<Option<BoundaryFeature>, GeometryError> {
        let state = self.state.read().map_err(|_| GeometryError::Poisoned)?;
        let index = state.index.as_ref().ok_or(GeometryError::NotLoaded {
            resolution: self.config.resolution,
        })?;
        let Some(code) = normalise_lookup_code(code) else {
            return Ok(None);
        };
        let found = index.lookup(&code)?;
        debug!(
            "index lookup for {code}: {}",
            if found.is_some() { "hit" } else { "miss" }
        );
        Ok(found)
    }

    /// Find one country by scanning the cached dataset, without building an
    /// index. Stops at the first matching record.
    ///
    /// # Errors
    ///
    /// Returns download, archive validation and shapefile decoding failures,
    /// and [`GeometryError::UnparseableGeometry`] when the matching record
    /// cannot be converted.
    pub fn extract_one(&self, code: &str) -> Result<Option<BoundaryFeature>, GeometryError> {
        let Some(code) = normalise_lookup_code(code) else {
            return Ok(None);
        };
        let shp = {
            let _build = self.build.lock().map_err(|_| GeometryError::Poisoned)?;
            ensure_cached(self.fetch.as_ref(), &self.config)?
        };

        let mut found = None;
        scan_records(&shp, |record| {
            if !record.matches_code(&code) {
                return Ok(ControlFlow::Continue(()));
            }
            found = Some(record.into_feature()?);
            Ok(ControlFlow::Break(()))
        })?;
        debug!(
            "scan for {code}: {}",
            if found.is_some() { "hit" } else { "miss" }
        );
        Ok(found)
    }

    /// Drop the index and delete its data file, returning to
    /// [`ExtractorPhase::Unloaded`]. The shapefile cache is kept.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while removing the data file.
    pub fn close(&self) -> Result<(), GeometryError> {
        let _build = self.build.lock().map_err(|_| GeometryError::Poisoned)?;
        let index = {
            let mut state = self.state.write().map_err(|_| GeometryError::Poisoned)?;
            state.phase = ExtractorPhase::Unloaded;
            state.index.take()
        };
        match index {
            Some(index) => index.close(),
            None => Ok(()),
        }
    }
}
