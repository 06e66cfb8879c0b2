//! Boundary geometry extraction.
//!
//! The extractor keeps a per-tier cache of the Natural Earth admin-0
//! shapefile member set, converts its polygon records into boundary features
//! and serves them either from a disk-backed index (bulk runs) or through a
//! short-circuiting linear scan (single-country runs).
//!
//! ```text
//! Unloaded → Downloading → Indexing → Loaded
//!     ↑__________________ close() _______|
//! ```

mod cache;
mod config;
mod error;
mod extractor;
mod index;
mod records;

#[doc(hidden)]
pub mod test_support;

pub use config::{
    DEFAULT_ARCHIVE_URL_TEMPLATE, DEFAULT_CACHE_DIR, DEFAULT_RESERVED_CODE, DEFAULT_RESERVED_URL,
    GeometryConfig, OPTIONAL_EXTENSIONS, ParseResolutionError, REQUIRED_EXTENSIONS, Resolution,
};
pub use error::GeometryError;
pub use extractor::{ExtractorPhase, GeometryExtractor};
pub use index::FeatureIndex;

#[cfg(test)]
mod tests;
