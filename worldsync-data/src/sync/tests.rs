//! Unit tests for the sync orchestrator.


use std::sync::Arc;

use rstest::{fixture, rstest};
use worldsync_core::test_support::{MemoryStore, StoreOperation, code, complete_facts};
use worldsync_core::{
    Aspect, BatchStatus, CountryStore, DemographicRecord, EconomyRecord, IndicatorSnapshot,
    SyncStatus,
};

use super::{SyncConfig, SyncOrchestrator};
use crate::sources::test_support::{StubBoundaries, StubFacts, StubIndicators};
use crate::sources::{AdapterSet, LookupMode};

fn snapshot(birth_rate: f64) -> IndicatorSnapshot {
    IndicatorSnapshot {
        demographics: DemographicRecord {
            birth_rate: Some(birth_rate),
            ..DemographicRecord::default()
        },
        economy: EconomyRecord {
            gdp_per_capita: Some(40_000.0),
            ..EconomyRecord::default()
        },
        ..IndicatorSnapshot::default()
    }
}

fn adapters(
    facts: StubFacts,
    indicators: StubIndicators,
    boundaries: &Arc<StubBoundaries>,
) -> AdapterSet {
    AdapterSet::new(
        Box::new(facts),
        Box::new(indicators),
        Box::new(Arc::clone(boundaries)),
    )
}

fn three_countries() -> StubFacts {
    StubFacts::with_universe(vec![
        complete_facts("FR", "France"),
        complete_facts("DE", "Germany"),
        complete_facts("IT", "Italy"),
    ])
}

fn full_indicators() -> StubIndicators {
    StubIndicators::default()
        .with(code("FR"), snapshot(10.9))
        .with(code("DE"), snapshot(9.3))
        .with(code("IT"), snapshot(6.8))
}

#[fixture]
fn store() -> MemoryStore {
    MemoryStore::new()
}

#[fixture]
fn boundaries() -> Arc<StubBoundaries> {
    Arc::new(
        StubBoundaries::default()
            .with_square(code("FR"))
            .with_square(code("DE"))
            .with_square(code("IT")),
    )
}

#[rstest]
fn bulk_runs_store_every_aspect(store: MemoryStore, boundaries: Arc<StubBoundaries>) {
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    );

    let result = orchestrator.sync_all();

    assert_eq!(result.status, BatchStatus::Completed);
    assert_eq!((result.total, result.updated, result.failed), (3, 3, 0));
    assert!(result.finished_at.is_some());
    let view = store
        .get_country(&code("DE"))
        .expect("load")
        .expect("stored country");
    assert_eq!(view.country.completeness, 1.0);
    assert_eq!(view.demographics.and_then(|d| d.birth_rate), Some(9.3));
    assert!(view.economy.is_some());
    assert!(view.education.is_none(), "empty sections are not written");
    assert!(view.geojson.is_some());
    assert!(
        boundaries
            .lookups()
            .iter()
            .all(|(_, mode)| *mode == LookupMode::Indexed)
    );
}

#[rstest]
#[case::one_per_batch(1)]
#[case::uneven_batches(2)]
#[case::single_batch(50)]
fn batch_size_does_not_change_the_outcome(
    store: MemoryStore,
    boundaries: Arc<StubBoundaries>,
    #[case] batch_size: usize,
) {
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    )
    .with_config(SyncConfig::default().with_batch_size(batch_size));

    let result = orchestrator.sync_all();

    assert_eq!((result.updated, result.failed), (3, 0));
    assert_eq!(store.country_count().expect("count"), 3);
}

#[rstest]
fn duplicate_codes_are_synchronised_once(store: MemoryStore, boundaries: Arc<StubBoundaries>) {
    let facts = StubFacts::with_universe(vec![
        complete_facts("FR", "France"),
        complete_facts("DE", "Germany"),
        complete_facts("FR", "France again"),
    ]);
    let orchestrator =
        SyncOrchestrator::new(adapters(facts, full_indicators(), &boundaries), &store)
            .with_config(SyncConfig::default().with_batch_size(2));

    let result = orchestrator.sync_all();

    assert_eq!(result.total, 3);
    assert_eq!(result.updated, 2);
    assert_eq!(boundaries.lookups().len(), 2);
    let france = store
        .get_country(&code("FR"))
        .expect("load")
        .expect("stored country");
    assert_eq!(france.country.name.as_deref(), Some("France"));
}

#[rstest]
fn failed_countries_are_recorded_and_the_run_continues(
    store: MemoryStore,
    boundaries: Arc<StubBoundaries>,
) {
    store.fail_on(StoreOperation::UpsertCountry, &code("DE"));
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    );

    let result = orchestrator.sync_all();

    assert_eq!(result.status, BatchStatus::Completed);
    assert_eq!((result.updated, result.failed), (2, 1));
    let failure = &result.failed_countries[0];
    assert_eq!(failure.code, code("DE"));
    assert_eq!(failure.name.as_deref(), Some("Germany"));
    assert!(failure.error.starts_with("country: "), "{}", failure.error);
    assert!(
        !boundaries.lookups().iter().any(|(c, _)| *c == code("DE")),
        "dependents are skipped when the identity write fails"
    );
    assert!(store.get_country(&code("IT")).expect("load").is_some());
}

#[rstest]
fn aspect_write_failures_count_as_failed_countries(
    store: MemoryStore,
    boundaries: Arc<StubBoundaries>,
) {
    store.fail_on(StoreOperation::UpsertEconomy, &code("IT"));
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    );

    let result = orchestrator.sync_all();

    assert_eq!((result.updated, result.failed), (2, 1));
    assert!(result.failed_countries[0].error.starts_with("economy: "));
    let italy = store
        .get_country(&code("IT"))
        .expect("load")
        .expect("identity record kept");
    assert!(italy.economy.is_none());
    assert!(italy.demographics.is_some());
    assert!(italy.geojson.is_some());
}

#[rstest]
fn fetch_failures_are_partial_successes(store: MemoryStore) {
    let boundaries = Arc::new(
        StubBoundaries::default()
            .with_square(code("FR"))
            .failing_for(code("DE")),
    );
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), StubIndicators::default(), &boundaries),
        &store,
    );

    let result = orchestrator.sync_all();

    assert_eq!((result.updated, result.failed), (3, 0));
    let germany = store
        .get_country(&code("DE"))
        .expect("load")
        .expect("stored country");
    assert!(germany.geojson.is_none());
    assert!(germany.demographics.is_none());
}

#[rstest]
fn an_unavailable_universe_ends_the_run_in_error(
    store: MemoryStore,
    boundaries: Arc<StubBoundaries>,
) {
    let orchestrator = SyncOrchestrator::new(
        adapters(StubFacts::unavailable(), full_indicators(), &boundaries),
        &store,
    );

    let result = orchestrator.sync_all();

    assert_eq!(result.status, BatchStatus::Error);
    assert_eq!((result.total, result.updated), (0, 0));
    let message = result.error.expect("run-level error");
    assert!(message.contains("universe unavailable"), "{message}");
    assert!(boundaries.lookups().is_empty());
}

#[rstest]
fn an_unpreparable_boundary_dataset_skips_geometry(store: MemoryStore) {
    let boundaries = Arc::new(
        StubBoundaries::default()
            .with_square(code("FR"))
            .unpreparable(),
    );
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    );

    let result = orchestrator.sync_all();

    assert_eq!(result.status, BatchStatus::Error);
    assert_eq!(result.updated, 3);
    assert!(boundaries.lookups().is_empty());
    let message = result.error.expect("run-level error");
    assert!(message.contains("missing required members"), "{message}");
}

#[rstest]
fn reserved_boundaries_survive_an_unpreparable_dataset(store: MemoryStore) {
    let boundaries = Arc::new(
        StubBoundaries::default()
            .with_square(code("FR"))
            .with_reserved(code("CN"))
            .unpreparable(),
    );
    let facts = StubFacts::with_universe(vec![
        complete_facts("FR", "France"),
        complete_facts("CN", "China"),
    ]);
    let orchestrator = SyncOrchestrator::new(
        adapters(facts, StubIndicators::default(), &boundaries),
        &store,
    );

    let result = orchestrator.sync_all();

    assert_eq!(result.status, BatchStatus::Error);
    assert_eq!((result.updated, result.failed), (2, 0));
    assert_eq!(boundaries.lookups(), vec![(code("CN"), LookupMode::Indexed)]);
    let china = store
        .get_country(&code("CN"))
        .expect("load")
        .expect("stored country");
    assert!(china.geojson.is_some());
    let france = store
        .get_country(&code("FR"))
        .expect("load")
        .expect("stored country");
    assert!(france.geojson.is_none());
}

#[rstest]
fn repeated_runs_are_idempotent(store: MemoryStore, boundaries: Arc<StubBoundaries>) {
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    );

    let first_result = orchestrator.sync_all();
    let first = store.get_country(&code("FR")).expect("load");
    let second_result = orchestrator.sync_all();

    assert_eq!(first_result.updated, 3);
    assert_eq!(second_result.updated, 3);
    assert_eq!(store.country_count().expect("count"), 3);
    assert_eq!(store.get_country(&code("FR")).expect("load"), first);
}

#[rstest]
#[case::empty("")]
#[case::alpha3("FRA")]
#[case::digits("F1")]
fn malformed_codes_are_rejected(
    store: MemoryStore,
    boundaries: Arc<StubBoundaries>,
    #[case] raw: &str,
) {
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    );

    let report = orchestrator.sync_one(raw);

    assert_eq!(report.status, SyncStatus::Error);
    assert!(report.error.is_some());
    assert!(boundaries.lookups().is_empty());
    assert_eq!(store.country_count().expect("count"), 0);
}

#[rstest]
fn single_runs_scan_for_geometry(store: MemoryStore, boundaries: Arc<StubBoundaries>) {
    let orchestrator = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    );

    let report = orchestrator.sync_one(" fr ");

    assert_eq!(report.code, "FR");
    assert_eq!(report.status, SyncStatus::Completed);
    assert_eq!(
        report.updated,
        vec![
            Aspect::Country,
            Aspect::Demographics,
            Aspect::Economy,
            Aspect::Geometry
        ]
    );
    assert!(report.failures.is_empty());
    assert_eq!(boundaries.lookups(), vec![(code("FR"), LookupMode::Scan)]);
    let view = store
        .get_country(&code("FR"))
        .expect("load")
        .expect("stored country");
    assert_eq!(
        view.country.completeness,
        f64::from(view.country.present_required_fields()) / 5.0
    );
}

#[rstest]
fn single_run_aspects_fail_independently(store: MemoryStore, boundaries: Arc<StubBoundaries>) {
    let seeded = SyncOrchestrator::new(
        adapters(three_countries(), full_indicators(), &boundaries),
        &store,
    )
    .sync_one("FR");
    assert_eq!(seeded.status, SyncStatus::Completed);

    let orchestrator = SyncOrchestrator::new(
        adapters(
            three_countries().failing_for(code("FR")),
            full_indicators(),
            &Arc::new(StubBoundaries::default().failing_for(code("FR"))),
        ),
        &store,
    );
    let report = orchestrator.sync_one("FR");

    assert_eq!(report.status, SyncStatus::Completed);
    assert_eq!(report.updated, vec![Aspect::Demographics, Aspect::Economy]);
    let failed: Vec<Aspect> = report.failures.iter().map(|f| f.aspect).collect();
    assert_eq!(failed, vec![Aspect::Country, Aspect::Geometry]);
}

#[rstest]
fn single_runs_for_unknown_countries_report_write_failures(
    store: MemoryStore,
    boundaries: Arc<StubBoundaries>,
) {
    let indicators = StubIndicators::default().with(code("ZZ"), snapshot(12.0));
    let orchestrator =
        SyncOrchestrator::new(adapters(three_countries(), indicators, &boundaries), &store);

    let report = orchestrator.sync_one("ZZ");

    assert_eq!(report.status, SyncStatus::Error);
    assert!(report.updated.is_empty());
    let failed: Vec<Aspect> = report.failures.iter().map(|f| f.aspect).collect();
    assert_eq!(failed, vec![Aspect::Demographics, Aspect::Economy]);
    assert_eq!(store.country_count().expect("count"), 0);
}
