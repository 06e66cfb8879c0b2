//! Synthetic Natural Earth datasets for extractor tests.

use std::io::{self, Cursor, Write};

use camino::Utf8Path;
use shapefile::dbase::{FieldName, FieldValue, Record, TableWriterBuilder};
use shapefile::{Point, Polygon, PolygonRing, Writer};
use zip::ZipWriter;
use zip::write::SimpleFileOptions;

/// Attributes and outline of one synthetic country.
#[derive(Debug, Clone)]
pub struct FixtureCountry {
    /// `NAME` attribute.
    pub name: &'static str,
    /// `ISO_A2` attribute; `-99` marks a placeholder.
    pub iso_a2: &'static str,
    /// `ISO_A3` attribute.
    pub iso_a3: &'static str,
    /// `ISO_A2_EH` attribute.
    pub iso_a2_eh: &'static str,
    /// `REGION_WB` attribute.
    pub region: &'static str,
    /// `POP_EST` attribute.
    pub population: f64,
    /// Closed outer rings, one per part.
    pub rings: Vec<Vec<[f64; 2]>>,
}

fn square(x: f64, y: f64, size: f64) -> Vec<[f64; 2]> {
    vec![[x, y], [x, y + size], [x + size, y + size], [x + size, y], [x, y]]
}

/// France (two parts), Germany (one part) and Norway, whose `ISO_A2` is the
/// `-99` placeholder.
#[must_use]
pub fn sample_countries() -> Vec<FixtureCountry> {
    vec![
        FixtureCountry {
            name: "France",
            iso_a2: "FR",
            iso_a3: "FRA",
            iso_a2_eh: "FR",
            region: "Europe & Central Asia",
            population: 67_059_887.0,
            rings: vec![square(0.0, 40.0, 5.0), square(8.0, 41.0, 1.0)],
        },
        FixtureCountry {
            name: "Germany",
            iso_a2: "DE",
            iso_a3: "DEU",
            iso_a2_eh: "DE",
            region: "Europe & Central Asia",
            population: 83_132_799.0,
            rings: vec![square(6.0, 47.0, 8.0)],
        },
        FixtureCountry {
            name: "Norway",
            iso_a2: "-99",
            iso_a3: "NOR",
            iso_a2_eh: "NO",
            region: "Europe & Central Asia",
            population: 5_347_896.0,
            rings: vec![square(5.0, 58.0, 10.0)],
        },
    ]
}

fn field(name: &str) -> io::Result<FieldName> {
    FieldName::try_from(name).map_err(io::Error::other)
}

fn character(value: &str) -> FieldValue {
    FieldValue::Character(Some(value.to_owned()))
}

/// Write `{stem}.shp`, `{stem}.shx` and `{stem}.dbf` for `countries` into
/// `dir`.
///
/// # Errors
///
/// Returns any error raised while writing the member set.
pub fn write_shapefile(dir: &Utf8Path, stem: &str, countries: &[FixtureCountry]) -> io::Result<()> {
    let table = TableWriterBuilder::new()
        .add_character_field(field("NAME")?, 40)
        .add_character_field(field("NAME_OFF")?, 60)
        .add_character_field(field("ISO_A2")?, 4)
        .add_character_field(field("ISO_A3")?, 4)
        .add_character_field(field("ISO_A2_EH")?, 4)
        .add_character_field(field("REGION_WB")?, 40)
        .add_numeric_field(field("POP_EST")?, 20, 0);
    let path = dir.join(format!("{stem}.shp"));
    let mut writer = Writer::from_path(path.as_std_path(), table).map_err(io::Error::other)?;
    for country in countries {
        let rings = country
            .rings
            .iter()
            .map(|ring| {
                PolygonRing::Outer(ring.iter().map(|[x, y]| Point::new(*x, *y)).collect())
            })
            .collect();
        let mut record = Record::default();
        record.insert("NAME".to_owned(), character(country.name));
        record.insert(
            "NAME_OFF".to_owned(),
            character(&format!("Republic of {}", country.name)),
        );
        record.insert("ISO_A2".to_owned(), character(country.iso_a2));
        record.insert("ISO_A3".to_owned(), character(country.iso_a3));
        record.insert("ISO_A2_EH".to_owned(), character(country.iso_a2_eh));
        record.insert("REGION_WB".to_owned(), character(country.region));
        record.insert(
            "POP_EST".to_owned(),
            FieldValue::Numeric(Some(country.population)),
        );
        writer
            .write_shape_and_record(&Polygon::with_rings(rings), &record)
            .map_err(io::Error::other)?;
    }
    drop(writer);
    Ok(())
}

/// Zip the members of `stem` with the given extensions, as a boundary
/// archive would be served.
///
/// # Errors
///
/// Returns any error raised while writing the shapefile or the archive.
pub fn build_archive(
    stem: &str,
    countries: &[FixtureCountry],
    extensions: &[&str],
) -> io::Result<Vec<u8>> {
    let scratch = tempfile::tempdir()?;
    let dir = worldsync_fs::utf8_path(scratch.path().to_path_buf())?;
    write_shapefile(&dir, stem, countries)?;
    std::fs::write(dir.join(format!("{stem}.prj")), b"GEOGCS[\"WGS 84\"]")?;

    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    archive
        .start_file("README.html", SimpleFileOptions::default())
        .map_err(io::Error::other)?;
    archive.write_all(b"<p>synthetic admin-0 countries</p>")?;
    for ext in extensions {
        let name = format!("{stem}.{ext}");
        let bytes = std::fs::read(dir.join(&name))?;
        archive
            .start_file(name, SimpleFileOptions::default())
            .map_err(io::Error::other)?;
        archive.write_all(&bytes)?;
    }
    let cursor = archive.finish().map_err(io::Error::other)?;
    Ok(cursor.into_inner())
}
