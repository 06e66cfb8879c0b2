//! Boundary dataset location and resolution tier.

use std::fmt;
use std::str::FromStr;

use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default archive URL; `{res}` is replaced by the resolution tier.
pub const DEFAULT_ARCHIVE_URL_TEMPLATE: &str =
    "https://naturalearth.s3.amazonaws.com/{res}_cultural/ne_{res}_admin_0_countries.zip";

/// Country whose boundary comes from a dedicated single-country upstream.
pub const DEFAULT_RESERVED_CODE: &str = "CN";

/// Upstream serving the reserved country's boundary as GeoJSON.
pub const DEFAULT_RESERVED_URL: &str = "https://geo.datav.aliyun.com/areas_v3/bound/100000.json";

/// Default cache directory, relative to the working directory.
pub const DEFAULT_CACHE_DIR: &str = "cache/naturalearth";

/// Shapefile members that must be present before parsing.
pub const REQUIRED_EXTENSIONS: [&str; 3] = ["shp", "shx", "dbf"];

/// Shapefile members extracted when the archive carries them.
pub const OPTIONAL_EXTENSIONS: [&str; 2] = ["prj", "cpg"];

/// Natural Earth scale tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Resolution {
    /// 1:110m, the smallest dataset.
    #[default]
    #[serde(rename = "110m")]
    Low,
    /// 1:50m.
    #[serde(rename = "50m")]
    Medium,
    /// 1:10m, the most detailed dataset.
    #[serde(rename = "10m")]
    High,
}

impl Resolution {
    /// Tier label used in URLs and file names.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Low => "110m",
            Self::Medium => "50m",
            Self::High => "10m",
        }
    }

    /// File stem shared by every shapefile member of this tier.
    #[must_use]
    pub fn dataset_stem(self) -> String {
        format!("ne_{}_admin_0_countries", self.as_str())
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a resolution label is not one of `110m`, `50m` or `10m`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown resolution '{0}', expected 110m, 50m or 10m")]
pub struct ParseResolutionError(String);

impl FromStr for Resolution {
    type Err = ParseResolutionError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "110m" => Ok(Self::Low),
            "50m" => Ok(Self::Medium),
            "10m" => Ok(Self::High),
            other => Err(ParseResolutionError(other.to_owned())),
        }
    }
}

/// Where boundary data comes from and where it is cached.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeometryConfig {
    /// Root of the cache; each tier gets its own subdirectory.
    pub cache_dir: Utf8PathBuf,
    /// Tier to download and index.
    pub resolution: Resolution,
    /// Archive URL with a `{res}` placeholder.
    pub archive_url_template: String,
    /// Code served by the secondary upstream instead of the shapefile.
    pub reserved_code: String,
    /// URL of the secondary upstream.
    pub reserved_url: String,
}

impl Default for GeometryConfig {
    fn default() -> Self {
        Self {
            cache_dir: Utf8PathBuf::from(DEFAULT_CACHE_DIR),
            resolution: Resolution::default(),
            archive_url_template: DEFAULT_ARCHIVE_URL_TEMPLATE.to_owned(),
            reserved_code: DEFAULT_RESERVED_CODE.to_owned(),
            reserved_url: DEFAULT_RESERVED_URL.to_owned(),
        }
    }
}

impl GeometryConfig {
    /// Set the cache root.
    #[must_use]
    pub fn with_cache_dir(mut self, cache_dir: impl Into<Utf8PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    /// Set the resolution tier.
    #[must_use]
    pub const fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = resolution;
        self
    }

    /// Set the archive URL template.
    #[must_use]
    pub fn with_archive_url_template(mut self, template: impl Into<String>) -> Self {
        self.archive_url_template = template.into();
        self
    }

    /// Set the reserved code and its upstream URL.
    #[must_use]
    pub fn with_reserved(mut self, code: impl Into<String>, url: impl Into<String>) -> Self {
        self.reserved_code = code.into();
        self.reserved_url = url.into();
        self
    }

    /// Archive URL for the configured tier.
    #[must_use]
    pub fn archive_url(&self) -> String {
        self.archive_url_template
            .replace("{res}", self.resolution.as_str())
    }

    /// Directory holding the extracted members of the configured tier.
    #[must_use]
    pub fn tier_dir(&self) -> Utf8PathBuf {
        self.cache_dir.join(self.resolution.as_str())
    }

    /// Name of the member with extension `ext`.
    #[must_use]
    pub fn member_name(&self, ext: &str) -> String {
        format!("{}.{ext}", self.resolution.dataset_stem())
    }

    /// Path of the cached geometry stream.
    #[must_use]
    pub fn shp_path(&self) -> Utf8PathBuf {
        self.tier_dir().join(self.member_name("shp"))
    }
}
