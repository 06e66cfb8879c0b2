//! Sequential reading of shapefile geometry + attribute pairs and their
//! conversion into boundary features.

use std::ops::ControlFlow;

use camino::Utf8Path;
use serde_json::Map;
use shapefile::dbase::{FieldValue, Record};
use shapefile::{PolygonRing, Reader, Shape};
use worldsync_core::{BoundaryFeature, FeatureProperties, Geometry, Position};

use super::GeometryError;

/// Placeholder Natural Earth uses for codes that do not exist.
const MISSING_CODE: &str = "-99";

/// One geometry + attribute pair as read from the dataset.
pub(crate) struct RawRecord {
    position: usize,
    shape: Shape,
    attributes: Record,
}

impl RawRecord {
    /// Alpha-2 code, falling back to the `_EH` attribute for placeholders.
    pub(crate) fn iso_a2(&self) -> Option<String> {
        self.code("ISO_A2").or_else(|| self.code("ISO_A2_EH"))
    }

    /// Alpha-3 code, falling back to the `_EH` attribute for placeholders.
    pub(crate) fn iso_a3(&self) -> Option<String> {
        self.code("ISO_A3").or_else(|| self.code("ISO_A3_EH"))
    }

    /// Whether either code matches the normalised lookup `code`.
    pub(crate) fn matches_code(&self, code: &str) -> bool {
        [self.iso_a2(), self.iso_a3()]
            .into_iter()
            .flatten()
            .any(|candidate| candidate == code)
    }

    /// Name used in log lines.
    pub(crate) fn label(&self) -> String {
        self.text("NAME")
            .unwrap_or_else(|| format!("record {}", self.position))
    }

    /// Convert into a boundary feature.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::UnparseableGeometry`] for non-polygon shapes
    /// and for part tables that do not describe the point array.
    pub(crate) fn into_feature(self) -> Result<BoundaryFeature, GeometryError> {
        let geometry = self.geometry()?;
        let iso_a2 = self.iso_a2();
        let iso_a3 = self.iso_a3();
        let properties = FeatureProperties {
            country_id: iso_a2.clone().or_else(|| iso_a3.clone()),
            name: self.text("NAME"),
            official_name: self.text("NAME_OFF"),
            iso_a2,
            iso_a3,
            region: self.text("REGION_WB"),
            population: self.number("POP_EST"),
            area_km2: self.number("AREA_KM2"),
            extra: Map::new(),
        };
        Ok(BoundaryFeature {
            properties,
            geometry,
        })
    }

    fn geometry(&self) -> Result<Geometry, GeometryError> {
        let (parts, points) = match &self.shape {
            Shape::Polygon(polygon) => flatten_rings(polygon.rings(), |p| [p.x, p.y]),
            Shape::PolygonM(polygon) => flatten_rings(polygon.rings(), |p| [p.x, p.y]),
            Shape::PolygonZ(polygon) => flatten_rings(polygon.rings(), |p| [p.x, p.y]),
            other => {
                return Err(GeometryError::UnparseableGeometry {
                    name: self.label(),
                    reason: format!("unsupported shape type {:?}", other.shapetype()),
                });
            }
        };
        Geometry::from_parts(&parts, &points).map_err(|err| GeometryError::UnparseableGeometry {
            name: self.label(),
            reason: err.to_string(),
        })
    }

    fn text(&self, field: &str) -> Option<String> {
        match self.attributes.get(field) {
            Some(FieldValue::Character(Some(value))) => {
                let trimmed = value.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_owned())
            }
            _ => None,
        }
    }

    fn code(&self, field: &str) -> Option<String> {
        self.text(field)
            .filter(|value| value != MISSING_CODE)
            .map(|value| value.to_ascii_uppercase())
    }

    fn number(&self, field: &str) -> Option<f64> {
        match self.attributes.get(field) {
            Some(FieldValue::Numeric(value)) => *value,
            Some(FieldValue::Float(value)) => value.map(f64::from),
            Some(FieldValue::Double(value)) => Some(*value),
            Some(FieldValue::Integer(value)) => Some(f64::from(*value)),
            _ => None,
        }
    }
}

/// Rebuild the flat part table and point array a polygon record was read from.
fn flatten_rings<P>(
    rings: &[PolygonRing<P>],
    to_position: impl Fn(&P) -> Position,
) -> (Vec<usize>, Vec<Position>) {
    let mut parts = Vec::with_capacity(rings.len());
    let mut points = Vec::new();
    for ring in rings {
        parts.push(points.len());
        points.extend(ring.points().iter().map(&to_position));
    }
    (parts, points)
}

/// Visit every record of the shapefile at `path` in file order until
/// `visit` breaks.
///
/// # Errors
///
/// Returns [`GeometryError::Shapefile`] when the member set cannot be opened
/// or a record cannot be decoded, and any error produced by `visit`.
pub(crate) fn scan_records<F>(path: &Utf8Path, mut visit: F) -> Result<(), GeometryError>
where
    F: FnMut(RawRecord) -> Result<ControlFlow<()>, GeometryError>,
{
    let shapefile_error = |source: shapefile::Error| GeometryError::Shapefile {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = Reader::from_path(path.as_std_path()).map_err(shapefile_error)?;
    for (position, item) in reader.iter_shapes_and_records().enumerate() {
        let (shape, attributes) = item.map_err(shapefile_error)?;
        let record = RawRecord {
            position,
            shape,
            attributes,
        };
        if visit(record)?.is_break() {
            break;
        }
    }
    Ok(())
}
