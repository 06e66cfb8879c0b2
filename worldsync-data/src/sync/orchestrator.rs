//! Bulk and single-country synchronisation.

use std::collections::HashSet;
use std::time::SystemTime;

use log::{debug, error, info, warn};
use worldsync_core::{
    Aspect, BasicFacts, BatchResult, CountryCode, CountryRecord, CountryStore, GeoJsonRecord,
    IndicatorSnapshot, SyncReport, unix_seconds,
};

use super::SyncConfig;
use crate::sources::{AdapterSet, LookupMode};

fn now() -> u64 {
    unix_seconds(SystemTime::now())
}

/// Outcome of one aspect write.
type AspectWrite<E> = (Aspect, Result<(), E>);

/// Drives synchronisation runs over one adapter set and one store.
///
/// Sources are called strictly in sequence for each country.
#[derive(Debug)]
pub struct SyncOrchestrator<'store, S> {
    adapters: AdapterSet,
    store: &'store S,
    config: SyncConfig,
}

impl<'store, S: CountryStore> SyncOrchestrator<'store, S> {
    /// Create an orchestrator with the default [`SyncConfig`].
    #[must_use]
    pub fn new(adapters: AdapterSet, store: &'store S) -> Self {
        Self {
            adapters,
            store,
            config: SyncConfig::default(),
        }
    }

    /// Replace the run settings.
    #[must_use]
    pub const fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Current run settings.
    #[must_use]
    pub const fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Synchronise every country the facts upstream knows about.
    ///
    /// The universe is processed in batches of
    /// [`SyncConfig::batch_size`]. A country's failure is recorded in
    /// `failed_countries` and the run carries on. The run ends in
    /// [`worldsync_core::BatchStatus::Error`] only when the universe cannot
    /// be fetched or the boundary dataset cannot be prepared; in the latter
    /// case countries are still synchronised without geometry, except for
    /// codes the boundary source serves without its dataset.
    ///
    /// Codes already synchronised earlier in the same run are skipped. A code
    /// whose synchronisation failed is attempted again if the universe lists
    /// it twice.
    #[must_use]
    pub fn sync_all(&self) -> BatchResult {
        let mut result = BatchResult::start(now());
        let universe = match self.adapters.facts.fetch_all() {
            Ok(universe) => universe,
            Err(err) => {
                error!("failed to fetch the country universe: {err}");
                return result.abort(now(), format!("failed to fetch country universe: {err}"));
            }
        };
        result.total = universe.len();

        let boundary_error = self.adapters.boundaries.prepare().err().map(|err| {
            error!("boundary dataset unavailable; syncing without geometry: {err}");
            format!("failed to prepare boundary dataset: {err}")
        });
        let with_geometry = boundary_error.is_none();

        let batch_size = self.config.batch_size();
        let batch_count = universe.len().div_ceil(batch_size);
        let mut processed: HashSet<CountryCode> = HashSet::new();
        for (batch_number, batch) in universe.chunks(batch_size).enumerate() {
            let (updated_before, failed_before) = (result.updated, result.failed);
            for facts in batch {
                if processed.contains(&facts.code) {
                    debug!("skipping {}; already synchronised in this run", facts.code);
                    continue;
                }
                match self.sync_country(facts, with_geometry) {
                    Ok(()) => {
                        processed.insert(facts.code.clone());
                        result.record_success();
                    }
                    Err(reason) => {
                        warn!("failed to synchronise {}: {reason}", facts.code);
                        result.record_failure(facts.code.clone(), facts.name.clone(), reason);
                    }
                }
            }
            info!(
                "batch {}/{batch_count}: {} updated, {} failed",
                batch_number.saturating_add(1),
                result.updated.saturating_sub(updated_before),
                result.failed.saturating_sub(failed_before),
            );
        }

        if let Err(err) = self.adapters.boundaries.close() {
            warn!("failed to release boundary resources: {err}");
        }
        info!(
            "sync finished: {} of {} countries updated, {} failed",
            result.updated, result.total, result.failed
        );
        match boundary_error {
            Some(reason) => result.abort(now(), reason),
            None => result.complete(now()),
        }
    }

    /// Identity first; indicators and geometry only once it is stored.
    fn sync_country(&self, facts: &BasicFacts, with_geometry: bool) -> Result<(), String> {
        let code = &facts.code;
        let record = CountryRecord::from_facts(facts.clone());
        self.store
            .upsert_country(&record)
            .map_err(|err| format!("{}: {err}", Aspect::Country))?;

        let snapshot = self.adapters.indicators.fetch(code);
        let mut writes = self.write_indicators(code, &snapshot);
        if with_geometry || self.adapters.boundaries.serves_without_dataset(code) {
            match self.adapters.boundaries.fetch(code, LookupMode::Indexed) {
                Ok(Some(feature)) => writes.push((
                    Aspect::Geometry,
                    self.store
                        .upsert_geojson(code, &GeoJsonRecord::from_feature(feature)),
                )),
                Ok(None) => debug!("no boundary for {code}"),
                Err(err) => warn!("boundary lookup for {code} failed: {err}"),
            }
        }

        let failures: Vec<String> = writes
            .into_iter()
            .filter_map(|(aspect, outcome)| outcome.err().map(|err| format!("{aspect}: {err}")))
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures.join("; "))
        }
    }

    /// Write each non-empty indicator section.
    fn write_indicators(
        &self,
        code: &CountryCode,
        snapshot: &IndicatorSnapshot,
    ) -> Vec<AspectWrite<S::Error>> {
        let mut writes = Vec::new();
        if !snapshot.demographics.is_empty() {
            writes.push((
                Aspect::Demographics,
                self.store.upsert_demographics(code, &snapshot.demographics),
            ));
        }
        if !snapshot.economy.is_empty() {
            writes.push((
                Aspect::Economy,
                self.store.upsert_economy(code, &snapshot.economy),
            ));
        }
        if !snapshot.education.is_empty() {
            writes.push((
                Aspect::Education,
                self.store.upsert_education(code, &snapshot.education),
            ));
        }
        writes
    }

    /// Synchronise one country, each aspect independently.
    ///
    /// `raw_code` is trimmed and upper-cased; anything other than two ASCII
    /// letters yields a rejected report. Geometry is resolved by a linear
    /// scan rather than a full index build. The report lists the aspects
    /// that were written and those whose fetch or write failed; it is an
    /// error overall only when nothing was written.
    #[must_use]
    pub fn sync_one(&self, raw_code: &str) -> SyncReport {
        let code = match CountryCode::parse(raw_code) {
            Ok(code) => code,
            Err(err) => return SyncReport::rejected(raw_code.trim().to_owned(), err.to_string()),
        };
        let mut report = SyncReport::new(code.to_string());

        match self.adapters.facts.fetch(&code) {
            Ok(Some(facts)) => {
                let record = CountryRecord::from_facts(facts);
                record_write(&mut report, Aspect::Country, self.store.upsert_country(&record));
            }
            Ok(None) => debug!("no basic facts for {code}"),
            Err(err) => report.record_failure(Aspect::Country, err.to_string()),
        }

        let snapshot = self.adapters.indicators.fetch(&code);
        for (aspect, outcome) in self.write_indicators(&code, &snapshot) {
            record_write(&mut report, aspect, outcome);
        }

        match self.adapters.boundaries.fetch(&code, LookupMode::Scan) {
            Ok(Some(feature)) => {
                let outcome = self
                    .store
                    .upsert_geojson(&code, &GeoJsonRecord::from_feature(feature));
                record_write(&mut report, Aspect::Geometry, outcome);
            }
            Ok(None) => debug!("no boundary for {code}"),
            Err(err) => report.record_failure(Aspect::Geometry, err.to_string()),
        }

        let report = report.finish();
        info!(
            "synchronised {}: updated [{}], {} failed",
            report.code,
            report
                .updated
                .iter()
                .map(|aspect| aspect.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            report.failures.len()
        );
        report
    }
}

fn record_write<E: std::error::Error>(
    report: &mut SyncReport,
    aspect: Aspect,
    outcome: Result<(), E>,
) {
    match outcome {
        Ok(()) => report.updated.push(aspect),
        Err(err) => {
            warn!("failed to write {aspect} for {}: {err}", report.code);
            report.record_failure(aspect, err.to_string());
        }
    }
}
