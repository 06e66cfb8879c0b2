//! Response envelopes and their metadata map.
//!
//! Metadata is an explicit value: callers derive variants with
//! [`ResponseMetadata::with`] and [`ResponseMetadata::without`], which return
//! new maps and never mutate shared state.

use std::collections::BTreeMap;

use serde::Serialize;

/// Envelope format version.
pub const API_VERSION: &str = "1.0";

/// Ordered key/value metadata attached to every envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ResponseMetadata(BTreeMap<String, String>);

impl Default for ResponseMetadata {
    fn default() -> Self {
        Self::empty()
            .with("source", "World Bank")
            .with("license", "CC BY 4.0")
            .with("version", "1.0.0")
    }
}

impl ResponseMetadata {
    /// A map without entries.
    #[must_use]
    pub const fn empty() -> Self {
        Self(BTreeMap::new())
    }

    /// Return a copy with `key` set to `value`.
    ///
    /// ```
    /// use worldsync_core::ResponseMetadata;
    ///
    /// let base = ResponseMetadata::default();
    /// let custom = base.with("source", "REST Countries");
    /// assert_eq!(base.get("source"), Some("World Bank"));
    /// assert_eq!(custom.get("source"), Some("REST Countries"));
    /// ```
    #[must_use]
    pub fn with(&self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut entries = self.0.clone();
        entries.insert(key.into(), value.into());
        Self(entries)
    }

    /// Return a copy without `key`.
    #[must_use]
    pub fn without(&self, key: &str) -> Self {
        let mut entries = self.0.clone();
        entries.remove(key);
        Self(entries)
    }

    /// Look up a value.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the map has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Structured error payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorBody {
    /// Machine-readable error code, e.g. `NOT_FOUND`.
    pub code: String,
    /// Human-readable summary.
    pub message: String,
    /// Additional detail.
    pub details: String,
}

impl ErrorBody {
    /// Build an error payload.
    #[must_use]
    pub fn new(
        code: impl Into<String>,
        message: impl Into<String>,
        details: impl Into<String>,
    ) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: details.into(),
        }
    }
}

/// Versioned response wrapper.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    api_version: &'static str,
    success: bool,
    timestamp: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<ErrorBody>,
    metadata: ResponseMetadata,
}

impl<T> Envelope<T> {
    /// Wrap a successful payload.
    #[must_use]
    pub fn success(data: T, metadata: &ResponseMetadata, timestamp: u64) -> Self {
        Self {
            api_version: API_VERSION,
            success: true,
            timestamp,
            data: Some(data),
            error: None,
            metadata: metadata.clone(),
        }
    }

    /// Wrap an error payload.
    #[must_use]
    pub fn failure(error: ErrorBody, metadata: &ResponseMetadata, timestamp: u64) -> Self {
        Self {
            api_version: API_VERSION,
            success: false,
            timestamp,
            data: None,
            error: Some(error),
            metadata: metadata.clone(),
        }
    }

    /// Wrap an error payload alongside the partial result that led to it.
    #[must_use]
    pub fn partial_failure(
        error: ErrorBody,
        data: T,
        metadata: &ResponseMetadata,
        timestamp: u64,
    ) -> Self {
        Self {
            data: Some(data),
            ..Self::failure(error, metadata, timestamp)
        }
    }

    /// Whether the envelope carries a payload rather than an error.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.success
    }
}
