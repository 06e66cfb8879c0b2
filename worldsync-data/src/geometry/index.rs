//! Disk-backed code → feature index.
//!
//! A [`FeatureIndex`] owns exactly one newline-delimited JSON data file and
//! one offset table. Every offset points at the first byte of a line holding
//! one complete feature. The data file lives until [`FeatureIndex::close`] is
//! called or the index is dropped.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Seek, SeekFrom, Write};

use camino::{Utf8Path, Utf8PathBuf};
use tempfile::TempPath;
use worldsync_core::BoundaryFeature;

use super::GeometryError;

/// Accumulates features into a fresh data file.
pub(crate) struct FeatureIndexBuilder {
    writer: BufWriter<File>,
    path: TempPath,
    display_path: Utf8PathBuf,
    offsets: HashMap<String, u64>,
    owners: HashMap<String, String>,
    position: u64,
    records: usize,
}

impl FeatureIndexBuilder {
    /// Create an empty data file inside `dir`.
    pub(crate) fn create_in(dir: &Utf8Path) -> Result<Self, GeometryError> {
        let (file, path) = tempfile::Builder::new()
            .prefix(".index-")
            .suffix(".ndjson")
            .tempfile_in(dir.as_std_path())
            .map_err(GeometryError::io("create index data file", dir.to_path_buf()))?
            .into_parts();
        let display_path = worldsync_fs::utf8_path(path.to_path_buf())
            .map_err(GeometryError::io("resolve index data file", dir.to_path_buf()))?;
        Ok(Self {
            writer: BufWriter::new(file),
            path,
            display_path,
            offsets: HashMap::new(),
            owners: HashMap::new(),
            position: 0,
            records: 0,
        })
    }

    /// Append `feature` as one line, indexed under its alpha-2 and alpha-3
    /// codes.
    ///
    /// Returns whether the feature carried a code and was written.
    ///
    /// # Errors
    ///
    /// Returns [`GeometryError::AliasCollision`] when a code already belongs
    /// to a different country, and I/O or encoding failures.
    pub(crate) fn append(&mut self, feature: &BoundaryFeature) -> Result<bool, GeometryError> {
        let codes: Vec<String> = [&feature.properties.iso_a2, &feature.properties.iso_a3]
            .into_iter()
            .flatten()
            .map(|code| code.to_ascii_uppercase())
            .collect();
        let Some(owner) = feature
            .properties
            .country_id
            .clone()
            .or_else(|| codes.first().cloned())
        else {
            return Ok(false);
        };
        for code in &codes {
            if let Some(first) = self.owners.get(code).filter(|first| **first != owner) {
                return Err(GeometryError::AliasCollision {
                    code: code.clone(),
                    first: first.clone(),
                    second: owner,
                });
            }
        }

        let mut line = serde_json::to_vec(feature).map_err(|source| GeometryError::Encode {
            code: owner.clone(),
            source,
        })?;
        line.push(b'\n');
        self.writer
            .write_all(&line)
            .map_err(GeometryError::io("append indexed feature", self.display_path.clone()))?;

        for code in codes {
            match self.offsets.entry(code) {
                Entry::Occupied(_) => {}
                Entry::Vacant(slot) => {
                    self.owners.insert(slot.key().clone(), owner.clone());
                    slot.insert(self.position);
                }
            }
        }
        let written = u64::try_from(line.len()).unwrap_or(u64::MAX);
        self.position = self.position.saturating_add(written);
        self.records = self.records.saturating_add(1);
        Ok(true)
    }

    /// Flush the data file and freeze the offset table.
    pub(crate) fn finish(mut self) -> Result<FeatureIndex, GeometryError> {
        self.writer
            .flush()
            .map_err(GeometryError::io("flush index data file", self.display_path.clone()))?;
        Ok(FeatureIndex {
            path: self.path,
            display_path: self.display_path,
            offsets: self.offsets,
            records: self.records,
        })
    }
}

/// Read-only code → feature lookup backed by a data file.
#[derive(Debug)]
pub struct FeatureIndex {
    path: TempPath,
    display_path: Utf8PathBuf,
    offsets: HashMap<String, u64>,
    records: usize,
}

impl FeatureIndex {
    /// Number of features written.
    #[must_use]
    pub const fn record_count(&self) -> usize {
        self.records
    }

    /// Number of lookup codes, counting alpha-2 and alpha-3 separately.
    #[must_use]
    pub fn code_count(&self) -> usize {
        self.offsets.len()
    }

    /// Indexed codes in no particular order.
    pub fn codes(&self) -> impl Iterator<Item = &str> {
        self.offsets.keys().map(String::as_str)
    }

    /// Location of the backing data file.
    #[must_use]
    pub fn data_path(&self) -> &Utf8Path {
        &self.display_path
    }

    /// Read the feature stored under the upper-cased `code`.
    ///
    /// # Errors
    ///
    /// Returns I/O or decoding failures of the data file.
    pub fn lookup(&self, code: &str) -> Result<Option<BoundaryFeature>, GeometryError> {
        let Some(offset) = self.offsets.get(code).copied() else {
            return Ok(None);
        };
        let io_error = |operation| GeometryError::io(operation, self.display_path.clone());
        let mut file = File::open(&self.path).map_err(io_error("open index data file"))?;
        file.seek(SeekFrom::Start(offset))
            .map_err(io_error("seek index data file"))?;
        let mut line = String::new();
        BufReader::new(file)
            .read_line(&mut line)
            .map_err(io_error("read index data file"))?;
        serde_json::from_str(&line)
            .map(Some)
            .map_err(|source| GeometryError::Encode {
                code: code.to_owned(),
                source,
            })
    }

    /// Delete the data file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error raised while removing the file.
    pub fn close(self) -> Result<(), GeometryError> {
        let display_path = self.display_path;
        self.path
            .close()
            .map_err(GeometryError::io("remove index data file", display_path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;
    use worldsync_core::{FeatureProperties, Geometry};

    fn feature(iso_a2: Option<&str>, iso_a3: Option<&str>, name: &str) -> BoundaryFeature {
        BoundaryFeature {
            properties: FeatureProperties {
                country_id: iso_a2.or(iso_a3).map(str::to_owned),
                name: Some(name.to_owned()),
                iso_a2: iso_a2.map(str::to_owned),
                iso_a3: iso_a3.map(str::to_owned),
                ..FeatureProperties::default()
            },
            geometry: Geometry::Polygon(vec![vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]),
        }
    }

    #[fixture]
    fn scratch() -> (TempDir, Utf8PathBuf) {
        let tmp = TempDir::new().expect("tempdir");
        let dir = worldsync_fs::utf8_path(tmp.path().to_path_buf()).expect("utf-8 tempdir");
        (tmp, dir)
    }

    #[rstest]
    fn lookups_resolve_both_aliases_repeatedly(scratch: (TempDir, Utf8PathBuf)) {
        let (_tmp, dir) = scratch;
        let mut builder = FeatureIndexBuilder::create_in(&dir).expect("builder");
        builder
            .append(&feature(Some("FR"), Some("FRA"), "France"))
            .expect("append FR");
        builder
            .append(&feature(Some("DE"), Some("DEU"), "Germany"))
            .expect("append DE");
        let index = builder.finish().expect("finish");

        assert_eq!(index.record_count(), 2);
        assert_eq!(index.code_count(), 4);
        for _ in 0..2 {
            for code in ["DE", "DEU"] {
                let found = index.lookup(code).expect("lookup").expect("indexed");
                assert_eq!(found.properties.name.as_deref(), Some("Germany"));
            }
        }
        assert!(index.lookup("XX").expect("lookup").is_none());
    }

    #[rstest]
    fn features_without_codes_are_not_written(scratch: (TempDir, Utf8PathBuf)) {
        let (_tmp, dir) = scratch;
        let mut builder = FeatureIndexBuilder::create_in(&dir).expect("builder");
        let written = builder
            .append(&feature(None, None, "Somaliland"))
            .expect("append");
        assert!(!written);
        assert_eq!(builder.finish().expect("finish").record_count(), 0);
    }

    #[rstest]
    fn colliding_codes_fail_the_build(scratch: (TempDir, Utf8PathBuf)) {
        let (_tmp, dir) = scratch;
        let mut builder = FeatureIndexBuilder::create_in(&dir).expect("builder");
        builder
            .append(&feature(Some("AA"), Some("AAA"), "First"))
            .expect("append first");
        let err = builder
            .append(&feature(Some("BB"), Some("AAA"), "Second"))
            .expect_err("collision");
        assert!(matches!(
            err,
            GeometryError::AliasCollision { ref code, .. } if code == "AAA"
        ));
    }

    #[rstest]
    fn close_removes_the_data_file(scratch: (TempDir, Utf8PathBuf)) {
        let (_tmp, dir) = scratch;
        let mut builder = FeatureIndexBuilder::create_in(&dir).expect("builder");
        builder
            .append(&feature(Some("FR"), Some("FRA"), "France"))
            .expect("append");
        let index = builder.finish().expect("finish");
        let data_path = index.data_path().to_path_buf();
        assert!(data_path.is_file());

        index.close().expect("close");
        assert!(!data_path.exists());
    }
}
