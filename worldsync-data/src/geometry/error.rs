//! Failures raised while caching, parsing and indexing boundary data.

use std::io;

use camino::Utf8PathBuf;
use thiserror::Error;

use crate::http::FetchError;

/// Errors returned by the geometry extractor.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum GeometryError {
    /// Downloading the boundary archive failed.
    #[error("failed to download boundary archive")]
    Download {
        /// Underlying fetch failure.
        #[source]
        source: FetchError,
    },
    /// The archive lacks members needed to parse the dataset.
    #[error("archive {url} is missing required members: {}", missing.join(", "))]
    MissingArchiveMembers {
        /// Archive URL.
        url: String,
        /// Names of the absent members.
        missing: Vec<String>,
    },
    /// The archive could not be read.
    #[error("failed to read boundary archive {url}")]
    Archive {
        /// Archive URL.
        url: String,
        /// Underlying archive error.
        #[source]
        source: zip::result::ZipError,
    },
    /// A filesystem operation on the cache failed.
    #[error("failed to {operation} at {path}")]
    Io {
        /// What was being attempted.
        operation: &'static str,
        /// Path involved.
        path: Utf8PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The shapefile member set could not be read.
    #[error("failed to read shapefile {path}")]
    Shapefile {
        /// Geometry stream path.
        path: Utf8PathBuf,
        /// Underlying reader error.
        #[source]
        source: shapefile::Error,
    },
    /// One record's geometry could not be converted.
    #[error("unparseable geometry for {name}: {reason}")]
    UnparseableGeometry {
        /// Country name or record position.
        name: String,
        /// Why conversion failed.
        reason: String,
    },
    /// Two different countries claimed the same lookup code.
    #[error("code {code} is claimed by both {first} and {second}")]
    AliasCollision {
        /// The contested code.
        code: String,
        /// Country indexed first.
        first: String,
        /// Country indexed second.
        second: String,
    },
    /// A feature could not be written to or read from the index.
    #[error("failed to encode indexed feature for {code}")]
    Encode {
        /// Code being written or read.
        code: String,
        /// Underlying serializer error.
        #[source]
        source: serde_json::Error,
    },
    /// A lookup was attempted before an index was built.
    #[error("no boundary index is loaded for the {resolution} tier")]
    NotLoaded {
        /// Configured tier.
        resolution: super::Resolution,
    },
    /// A build panicked while holding the extractor state.
    #[error("geometry extractor state lock poisoned")]
    Poisoned,
}

impl GeometryError {
    pub(crate) fn io(
        operation: &'static str,
        path: impl Into<Utf8PathBuf>,
    ) -> impl FnOnce(io::Error) -> Self {
        let path = path.into();
        move |source| Self::Io {
            operation,
            path,
            source,
        }
    }
}
