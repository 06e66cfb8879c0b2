//! Boundary adapter: the geometry extractor plus the reserved-country
//! upstream.

use std::sync::Arc;

use log::debug;
use serde_json::Value;
use worldsync_core::{BoundaryFeature, CountryCode};

use super::{BoundarySource, LookupMode, SourceError};
use crate::geometry::{GeometryConfig, GeometryExtractor};
use crate::http::{Fetch, HttpRequest};

/// Serves boundaries from the Natural Earth extractor, except for the
/// reserved code, which is fetched ready-made from its own upstream.
pub struct BoundaryAdapter {
    extractor: GeometryExtractor,
    fetch: Arc<dyn Fetch>,
}

impl std::fmt::Debug for BoundaryAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BoundaryAdapter")
            .field("extractor", &self.extractor)
            .finish_non_exhaustive()
    }
}

impl BoundaryAdapter {
    /// Create the adapter; nothing is downloaded until first use.
    #[must_use]
    pub fn new(fetch: Arc<dyn Fetch>, config: GeometryConfig) -> Self {
        Self {
            extractor: GeometryExtractor::new(Arc::clone(&fetch), config),
            fetch,
        }
    }

    /// The wrapped extractor.
    #[must_use]
    pub const fn extractor(&self) -> &GeometryExtractor {
        &self.extractor
    }

    fn is_reserved(&self, code: &CountryCode) -> bool {
        self.extractor
            .config()
            .reserved_code
            .trim()
            .eq_ignore_ascii_case(code.as_str())
    }

    fn fetch_reserved(&self, code: &CountryCode) -> Result<Option<BoundaryFeature>, SourceError> {
        let request = HttpRequest::new(self.extractor.config().reserved_url.as_str());
        let payload = self.fetch.get_json(&request)?;
        let malformed = |reason: String| SourceError::Malformed {
            url: request.signature(),
            reason,
        };
        let kind = payload
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_owned);
        let feature = match kind.as_deref() {
            Some("FeatureCollection") => payload
                .get("features")
                .and_then(Value::as_array)
                .and_then(|features| features.first())
                .cloned(),
            Some("Feature") => Some(payload),
            _ => return Err(malformed("expected a Feature or FeatureCollection".to_owned())),
        };
        let Some(feature) = feature else {
            return Ok(None);
        };
        let mut feature: BoundaryFeature =
            serde_json::from_value(feature).map_err(|err| malformed(err.to_string()))?;
        let properties = &mut feature.properties;
        properties
            .iso_a2
            .get_or_insert_with(|| code.as_str().to_owned());
        properties
            .country_id
            .get_or_insert_with(|| code.as_str().to_owned());
        debug!("fetched reserved boundary for {code}");
        Ok(Some(feature))
    }
}

impl BoundarySource for BoundaryAdapter {
    fn prepare(&self) -> Result<(), SourceError> {
        self.extractor.ensure_index()?;
        Ok(())
    }

    fn fetch(
        &self,
        code: &CountryCode,
        mode: LookupMode,
    ) -> Result<Option<BoundaryFeature>, SourceError> {
        if self.is_reserved(code) {
            return self.fetch_reserved(code);
        }
        let feature = match mode {
            LookupMode::Indexed => {
                self.extractor.ensure_index()?;
                self.extractor.by_code(code.as_str())?
            }
            LookupMode::Scan => self.extractor.extract_one(code.as_str())?,
        };
        Ok(feature)
    }

    fn serves_without_dataset(&self, code: &CountryCode) -> bool {
        self.is_reserved(code)
    }

    fn close(&self) -> Result<(), SourceError> {
        self.extractor.close()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::test_support::{build_archive, sample_countries};
    use crate::http::test_support::{StubFetch, StubReply};
    use rstest::rstest;
    use serde_json::json;
    use tempfile::TempDir;
    use worldsync_core::GeometryKind;

    fn config(tmp: &TempDir) -> GeometryConfig {
        let root = worldsync_fs::utf8_path(tmp.path().to_path_buf()).expect("utf-8 tempdir");
        GeometryConfig::default().with_cache_dir(root)
    }

    fn reserved_payload() -> Value {
        json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "properties": {"adcode": 100_000, "name": "China"},
                "geometry": {"type": "MultiPolygon",
                             "coordinates": [[[[73.5, 39.4], [74.0, 39.0], [73.5, 39.4]]]]}
            }]
        })
    }

    #[rstest]
    fn reserved_code_bypasses_the_shapefile() {
        let tmp = TempDir::new().expect("tempdir");
        let config = config(&tmp);
        let stub = Arc::new(
            StubFetch::new().with_json(config.reserved_url.clone(), reserved_payload()),
        );
        let adapter = BoundaryAdapter::new(stub.clone(), config);
        let code = CountryCode::parse("cn").expect("code");

        let feature = adapter
            .fetch(&code, LookupMode::Indexed)
            .expect("fetch")
            .expect("feature");

        assert_eq!(feature.geometry.kind(), GeometryKind::MultiPolygon);
        assert_eq!(feature.properties.iso_a2.as_deref(), Some("CN"));
        assert_eq!(feature.properties.name.as_deref(), Some("China"));
        assert_eq!(feature.properties.extra.get("adcode"), Some(&json!(100_000)));
        assert_eq!(stub.requests().len(), 1);
    }

    #[rstest]
    fn reserved_code_resolves_when_the_dataset_is_unavailable() {
        let tmp = TempDir::new().expect("tempdir");
        let config = config(&tmp);
        let stub = StubFetch::new().with_json(config.reserved_url.clone(), reserved_payload());
        let adapter = BoundaryAdapter::new(Arc::new(stub), config);
        let reserved = CountryCode::parse("CN").expect("code");
        let other = CountryCode::parse("FR").expect("code");

        assert!(adapter.prepare().is_err());
        assert!(adapter.serves_without_dataset(&reserved));
        assert!(!adapter.serves_without_dataset(&other));
        assert!(
            adapter
                .fetch(&reserved, LookupMode::Indexed)
                .expect("fetch")
                .is_some()
        );
    }

    #[rstest]
    fn non_reserved_codes_use_the_extractor() {
        let tmp = TempDir::new().expect("tempdir");
        let config = config(&tmp);
        let archive = build_archive(
            &config.resolution.dataset_stem(),
            &sample_countries(),
            &["shp", "shx", "dbf"],
        )
        .expect("archive");
        let stub = StubFetch::new().with_reply(config.archive_url(), StubReply::Bytes(archive));
        let adapter = BoundaryAdapter::new(Arc::new(stub), config);
        let code = CountryCode::parse("FR").expect("code");

        let scanned = adapter.fetch(&code, LookupMode::Scan).expect("scan");
        let indexed = adapter.fetch(&code, LookupMode::Indexed).expect("lookup");

        assert!(scanned.is_some());
        assert_eq!(scanned, indexed);
        adapter.close().expect("close");
    }

    #[rstest]
    fn reserved_payload_of_the_wrong_shape_is_malformed() {
        let tmp = TempDir::new().expect("tempdir");
        let config = config(&tmp);
        let stub = StubFetch::new().with_json(config.reserved_url.clone(), json!([1, 2]));
        let adapter = BoundaryAdapter::new(Arc::new(stub), config);
        let code = CountryCode::parse("CN").expect("code");

        assert!(matches!(
            adapter.fetch(&code, LookupMode::Scan),
            Err(SourceError::Malformed { .. })
        ));
    }

    #[rstest]
    fn debug_output_shows_the_extractor_only() {
        let tmp = TempDir::new().expect("tempdir");
        let adapter = BoundaryAdapter::new(Arc::new(StubFetch::new()), config(&tmp));

        let rendered = format!("{adapter:?}");

        assert!(rendered.starts_with("BoundaryAdapter"), "{rendered}");
        assert!(rendered.contains("GeometryExtractor"), "{rendered}");
        assert!(rendered.ends_with(".. }"), "{rendered}");
    }
}
