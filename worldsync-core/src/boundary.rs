//! Boundary features and their GeoJSON representation.
//!
//! A boundary feature is one geometry plus the attributes that identify the
//! country it outlines. Features serialise as GeoJSON `Feature` objects and are
//! persisted wrapped in a single-feature `FeatureCollection`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// A `[longitude, latitude]` pair.
pub type Position = [f64; 2];

/// A closed sequence of positions.
pub type Ring = Vec<Position>;

/// Feature type stored alongside persisted boundaries.
pub const COUNTRY_BOUNDARY: &str = "country_boundary";

/// Polygonal geometry in GeoJSON's nested-ring layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates")]
pub enum Geometry {
    /// A single polygon made of rings.
    Polygon(Vec<Ring>),
    /// Several polygons, each made of rings.
    MultiPolygon(Vec<Vec<Ring>>),
}

/// Discriminant of a [`Geometry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeometryKind {
    /// See [`Geometry::Polygon`].
    Polygon,
    /// See [`Geometry::MultiPolygon`].
    MultiPolygon,
}

impl GeometryKind {
    /// GeoJSON type name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Polygon => "Polygon",
            Self::MultiPolygon => "MultiPolygon",
        }
    }

    /// Parse a GeoJSON type name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Polygon" => Some(Self::Polygon),
            "MultiPolygon" => Some(Self::MultiPolygon),
            _ => None,
        }
    }
}

/// Errors raised while splitting a flat point array into rings.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RingSplitError {
    /// The shape carried no points.
    #[error("shape has no points")]
    NoPoints,
    /// A part boundary was out of order or beyond the point array.
    #[error("part boundary {start}..{end} is invalid for {len} points")]
    InvalidPart {
        /// Start index of the offending ring.
        start: usize,
        /// End index of the offending ring.
        end: usize,
        /// Length of the point array.
        len: usize,
    },
}

impl Geometry {
    /// Convert a shapefile-style flat point array into nested rings.
    ///
    /// `parts` holds the start index of every ring. A shape with at most one
    /// part becomes a single-ring [`Geometry::Polygon`]; with more parts the
    /// array is cut at every boundary, the last one being `points.len()`, and
    /// each ring becomes its own polygon inside a [`Geometry::MultiPolygon`].
    /// A trailing boundary equal to `points.len()` is accepted and ignored.
    ///
    /// # Errors
    ///
    /// Returns [`RingSplitError`] for an empty point array or when a part
    /// boundary does not describe a non-empty slice of `points`.
    ///
    /// # Examples
    ///
    /// ```
    /// use worldsync_core::Geometry;
    ///
    /// let points: Vec<[f64; 2]> = (0..9).map(|i| [f64::from(i), 0.0]).collect();
    /// let geometry = Geometry::from_parts(&[0, 4], &points).expect("valid parts");
    /// let Geometry::MultiPolygon(polygons) = geometry else {
    ///     panic!("expected a multipolygon");
    /// };
    /// assert_eq!(polygons.len(), 2);
    /// ```
    pub fn from_parts(parts: &[usize], points: &[Position]) -> Result<Self, RingSplitError> {
        if points.is_empty() {
            return Err(RingSplitError::NoPoints);
        }
        // A trailing boundary at the point count closes the last part explicitly.
        let parts = match parts.split_last() {
            Some((&last, rest)) if !rest.is_empty() && last == points.len() => rest,
            _ => parts,
        };
        if parts.len() <= 1 {
            return Ok(Self::Polygon(vec![points.to_vec()]));
        }

        let ends = parts.iter().skip(1).copied().chain(std::iter::once(points.len()));
        let polygons = parts
            .iter()
            .copied()
            .zip(ends)
            .map(|(start, end)| {
                points
                    .get(start..end)
                    .filter(|ring| !ring.is_empty())
                    .map(|ring| vec![ring.to_vec()])
                    .ok_or(RingSplitError::InvalidPart {
                        start,
                        end,
                        len: points.len(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::MultiPolygon(polygons))
    }

    /// The geometry's discriminant.
    #[must_use]
    pub const fn kind(&self) -> GeometryKind {
        match self {
            Self::Polygon(_) => GeometryKind::Polygon,
            Self::MultiPolygon(_) => GeometryKind::MultiPolygon,
        }
    }
}

/// Identifying attributes carried by a boundary feature.
///
/// Unknown attributes from upstream features are preserved in `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FeatureProperties {
    /// Preferred key: alpha-2 when known, else alpha-3.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_id: Option<String>,
    /// Short name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Official name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub official_name: Option<String>,
    /// ISO 3166-1 alpha-2 code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_a2: Option<String>,
    /// ISO 3166-1 alpha-3 code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_a3: Option<String>,
    /// World Bank region.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    /// Estimated population.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub population: Option<f64>,
    /// Surface area in square kilometres.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_km2: Option<f64>,
    /// Remaining upstream attributes.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl FeatureProperties {
    /// Whether either ISO code matches the upper-cased `code`.
    #[must_use]
    pub fn matches_code(&self, code: &str) -> bool {
        [self.iso_a2.as_deref(), self.iso_a3.as_deref()]
            .into_iter()
            .flatten()
            .any(|candidate| candidate.eq_ignore_ascii_case(code))
    }
}

/// One country outline with its identifying attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "Feature")]
pub struct BoundaryFeature {
    /// Identifying attributes.
    pub properties: FeatureProperties,
    /// The outline.
    pub geometry: Geometry,
}

/// GeoJSON `FeatureCollection` envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "FeatureCollection")]
pub struct FeatureCollection {
    /// Wrapped features.
    pub features: Vec<BoundaryFeature>,
}

/// Persisted boundary for one country.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoJsonRecord {
    /// Feature type tag, always [`COUNTRY_BOUNDARY`] for records built here.
    pub feature_type: String,
    /// Geometry discriminant of the wrapped feature.
    pub geometry_type: GeometryKind,
    /// Full payload.
    pub collection: FeatureCollection,
}

impl GeoJsonRecord {
    /// Wrap a single feature for persistence.
    #[must_use]
    pub fn from_feature(feature: BoundaryFeature) -> Self {
        Self {
            feature_type: COUNTRY_BOUNDARY.to_owned(),
            geometry_type: feature.geometry.kind(),
            collection: FeatureCollection {
                features: vec![feature],
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use serde_json::json;

    #[fixture]
    fn nine_points() -> Vec<Position> {
        (0..9_u8).map(|i| [f64::from(i), f64::from(i)]).collect()
    }

    #[rstest]
    fn splits_parts_into_multipolygon(nine_points: Vec<Position>) {
        let geometry = Geometry::from_parts(&[0, 4], &nine_points).expect("valid parts");
        let Geometry::MultiPolygon(polygons) = geometry else {
            panic!("expected multipolygon, found {geometry:?}");
        };
        let lengths: Vec<usize> = polygons.iter().map(|p| p[0].len()).collect();
        assert_eq!(lengths, vec![4, 5]);
        assert_eq!(polygons[1][0][0], [4.0, 4.0]);
    }

    #[rstest]
    fn explicit_final_boundary_matches_point_count(nine_points: Vec<Position>) {
        let implicit = Geometry::from_parts(&[0, 4], &nine_points).expect("implicit end");
        let explicit = Geometry::from_parts(&[0, 4, 9], &nine_points).expect("explicit end");
        assert_eq!(explicit, implicit);
        let Geometry::MultiPolygon(polygons) = explicit else {
            panic!("expected multipolygon");
        };
        assert_eq!(polygons.iter().map(|p| p[0].len()).sum::<usize>(), 9);
    }

    #[rstest]
    fn explicit_final_boundary_on_a_single_part_yields_polygon(nine_points: Vec<Position>) {
        let geometry = Geometry::from_parts(&[0, 9], &nine_points).expect("valid parts");
        assert_eq!(geometry, Geometry::Polygon(vec![nine_points]));
    }

    #[rstest]
    fn boundary_past_the_point_count_is_rejected(nine_points: Vec<Position>) {
        assert_eq!(
            Geometry::from_parts(&[0, 4, 10], &nine_points),
            Err(RingSplitError::InvalidPart {
                start: 4,
                end: 10,
                len: 9,
            })
        );
    }

    #[rstest]
    #[case(&[])]
    #[case(&[0])]
    fn single_part_becomes_polygon(nine_points: Vec<Position>, #[case] parts: &[usize]) {
        let geometry = Geometry::from_parts(parts, &nine_points).expect("valid parts");
        assert_eq!(geometry, Geometry::Polygon(vec![nine_points]));
    }

    #[rstest]
    fn empty_shapes_are_rejected() {
        assert_eq!(
            Geometry::from_parts(&[0], &[]),
            Err(RingSplitError::NoPoints)
        );
    }

    #[rstest]
    #[case(&[0, 12])]
    #[case(&[0, 5, 3])]
    #[case(&[0, 0])]
    fn out_of_range_parts_are_rejected(nine_points: Vec<Position>, #[case] parts: &[usize]) {
        let result = Geometry::from_parts(parts, &nine_points);
        assert!(matches!(result, Err(RingSplitError::InvalidPart { .. })));
    }

    #[rstest]
    fn feature_serialises_as_geojson() {
        let feature = BoundaryFeature {
            properties: FeatureProperties {
                iso_a2: Some("MT".into()),
                ..FeatureProperties::default()
            },
            geometry: Geometry::Polygon(vec![vec![[14.5, 35.9], [14.6, 35.9], [14.5, 35.9]]]),
        };
        let value = serde_json::to_value(&feature).expect("serialise feature");
        assert_eq!(value["type"], "Feature");
        assert_eq!(value["geometry"]["type"], "Polygon");
        assert_eq!(value["properties"]["iso_a2"], "MT");
        assert!(value["properties"].get("iso_a3").is_none());
    }

    #[rstest]
    fn upstream_features_keep_unknown_properties() {
        let payload = json!({
            "type": "Feature",
            "properties": {"name": "Somewhere", "adcode": 100_000},
            "geometry": {"type": "MultiPolygon", "coordinates": [[[[1.0, 2.0], [3.0, 4.0]]]]}
        });
        let feature: BoundaryFeature = serde_json::from_value(payload).expect("parse feature");
        assert_eq!(feature.properties.name.as_deref(), Some("Somewhere"));
        assert_eq!(feature.properties.extra["adcode"], 100_000);
        assert_eq!(feature.geometry.kind(), GeometryKind::MultiPolygon);
    }

    #[rstest]
    #[case(Some("GB"), None, "gb", true)]
    #[case(None, Some("GBR"), "GBR", true)]
    #[case(Some("GB"), Some("GBR"), "FR", false)]
    fn properties_match_either_alias(
        #[case] iso_a2: Option<&str>,
        #[case] iso_a3: Option<&str>,
        #[case] query: &str,
        #[case] expected: bool,
    ) {
        let properties = FeatureProperties {
            iso_a2: iso_a2.map(str::to_owned),
            iso_a3: iso_a3.map(str::to_owned),
            ..FeatureProperties::default()
        };
        assert_eq!(properties.matches_code(query), expected);
    }

    #[rstest]
    fn records_wrap_features_in_a_collection() {
        let feature = BoundaryFeature {
            properties: FeatureProperties::default(),
            geometry: Geometry::MultiPolygon(vec![]),
        };
        let record = GeoJsonRecord::from_feature(feature);
        assert_eq!(record.feature_type, COUNTRY_BOUNDARY);
        assert_eq!(record.geometry_type, GeometryKind::MultiPolygon);
        let value = serde_json::to_value(&record.collection).expect("serialise collection");
        assert_eq!(value["type"], "FeatureCollection");
        assert_eq!(value["features"].as_array().map(Vec::len), Some(1));
    }
}
