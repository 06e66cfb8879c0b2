//! Extractor tests against synthetic archives served by a stub fetcher.

use std::sync::Arc;

use camino::Utf8PathBuf;
use rstest::{fixture, rstest};
use tempfile::TempDir;
use worldsync_core::{Geometry, GeometryKind};

use super::test_support::{build_archive, sample_countries};
use super::*;
use crate::http::test_support::{StubFetch, StubReply};

struct Harness {
    _tmp: TempDir,
    config: GeometryConfig,
    fetch: Arc<StubFetch>,
}

impl Harness {
    fn serving(extensions: &[&str]) -> Self {
        let tmp = TempDir::new().expect("tempdir");
        let root = worldsync_fs::utf8_path(tmp.path().to_path_buf()).expect("utf-8 tempdir");
        let config = GeometryConfig::default().with_cache_dir(root.join("cache"));
        let archive = build_archive(
            &config.resolution.dataset_stem(),
            &sample_countries(),
            extensions,
        )
        .expect("build archive");
        let fetch = Arc::new(
            StubFetch::new().with_reply(config.archive_url(), StubReply::Bytes(archive)),
        );
        Self {
            _tmp: tmp,
            config,
            fetch,
        }
    }

    fn extractor(&self) -> GeometryExtractor {
        GeometryExtractor::new(self.fetch.clone(), self.config.clone())
    }

    fn cache_entries(&self) -> Vec<Utf8PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.config.cache_dir) else {
            return Vec::new();
        };
        entries
            .map(|entry| {
                let path = entry.expect("dir entry").path();
                Utf8PathBuf::from_path_buf(path).expect("utf-8 entry")
            })
            .collect()
    }
}

#[fixture]
fn complete() -> Harness {
    Harness::serving(&["shp", "shx", "dbf", "prj"])
}

#[rstest]
fn builds_an_index_covering_both_code_forms(complete: Harness) {
    let extractor = complete.extractor();
    assert_eq!(extractor.phase(), ExtractorPhase::Unloaded);

    let count = extractor.build_index().expect("build index");

    assert_eq!(count, 3);
    assert_eq!(extractor.phase(), ExtractorPhase::Loaded);
    for code in ["FR", "FRA", "DE", "DEU", "NO", "NOR"] {
        let feature = extractor
            .by_code(code)
            .expect("lookup")
            .unwrap_or_else(|| panic!("{code} should be indexed"));
        assert!(feature.properties.matches_code(code));
    }
}

#[rstest]
fn every_indexed_code_resolves_to_a_matching_feature(complete: Harness) {
    let extractor = complete.extractor();
    extractor.build_index().expect("build index");
    let codes = extractor.indexed_codes();
    assert_eq!(codes, ["DE", "DEU", "FR", "FRA", "NO", "NOR"]);

    for code in &codes {
        let feature = extractor.by_code(code).expect("lookup").expect("indexed");
        assert!(
            feature.properties.iso_a2.as_ref() == Some(code)
                || feature.properties.iso_a3.as_ref() == Some(code),
            "{code} resolved to {:?}",
            feature.properties
        );
    }
}

#[rstest]
fn multi_part_shapes_become_multipolygons(complete: Harness) {
    let extractor = complete.extractor();
    extractor.build_index().expect("build index");

    let france = extractor.by_code("fr").expect("lookup").expect("France");
    assert_eq!(france.geometry.kind(), GeometryKind::MultiPolygon);
    let Geometry::MultiPolygon(polygons) = france.geometry else {
        panic!("expected a multipolygon");
    };
    let ring_lengths: Vec<usize> = polygons
        .iter()
        .map(|polygon| polygon.iter().map(Vec::len).sum())
        .collect();
    assert_eq!(ring_lengths, vec![5, 5]);

    let germany = extractor.by_code("DE").expect("lookup").expect("Germany");
    assert_eq!(germany.geometry.kind(), GeometryKind::Polygon);
    assert_eq!(germany.properties.name.as_deref(), Some("Germany"));
    assert_eq!(
        germany.properties.official_name.as_deref(),
        Some("Republic of Germany")
    );
    assert_eq!(germany.properties.population, Some(83_132_799.0));
}

#[rstest]
fn placeholder_codes_fall_back_to_the_eh_attribute(complete: Harness) {
    let extractor = complete.extractor();
    extractor.build_index().expect("build index");

    let norway = extractor.by_code("NO").expect("lookup").expect("Norway");
    assert_eq!(norway.properties.iso_a2.as_deref(), Some("NO"));
    assert_eq!(norway.properties.country_id.as_deref(), Some("NO"));
}

#[rstest]
fn lookups_before_a_build_report_not_loaded(complete: Harness) {
    let extractor = complete.extractor();
    assert!(matches!(
        extractor.by_code("FR"),
        Err(GeometryError::NotLoaded { .. })
    ));
}

#[rstest]
fn archives_missing_the_attribute_table_leave_no_cache_files() {
    let harness = Harness::serving(&["shp", "shx", "prj"]);
    let extractor = harness.extractor();

    let err = extractor.build_index().expect_err("missing dbf");

    match err {
        GeometryError::MissingArchiveMembers { missing, .. } => {
            assert_eq!(missing, vec!["ne_110m_admin_0_countries.dbf".to_owned()]);
        }
        other => panic!("expected missing members, found {other:?}"),
    }
    assert_eq!(extractor.phase(), ExtractorPhase::Unloaded);
    assert!(harness.cache_entries().is_empty());
}

#[rstest]
fn cached_member_sets_are_not_downloaded_again(complete: Harness) {
    complete.extractor().build_index().expect("first build");
    complete.extractor().build_index().expect("second build");

    assert_eq!(complete.fetch.requests().len(), 1);
}

#[rstest]
fn single_country_scan_does_not_build_an_index(complete: Harness) {
    let extractor = complete.extractor();

    let germany = extractor.extract_one("deu").expect("scan").expect("Germany");

    assert_eq!(germany.properties.iso_a2.as_deref(), Some("DE"));
    assert_eq!(extractor.phase(), ExtractorPhase::Unloaded);
    assert!(extractor.extract_one("XX").expect("scan").is_none());
}

#[rstest]
fn close_discards_the_index_and_its_data_file(complete: Harness) {
    let extractor = complete.extractor();
    extractor.build_index().expect("build index");
    let data_path = extractor.index_path().expect("loaded index");
    assert!(data_path.is_file());

    extractor.close().expect("close");

    assert_eq!(extractor.phase(), ExtractorPhase::Unloaded);
    assert!(!data_path.exists());
    assert!(extractor.record_count().is_none());
}
