//! Errors surfaced by the resilient HTTP client.

use std::io;

use thiserror::Error;

/// Failures returned by [`super::Fetch`] implementations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum FetchError {
    /// A retryable failure persisted after every retry.
    #[error("request to {url} still failing after {attempts} attempts: {reason}")]
    Transient {
        /// Request rendered with its query.
        url: String,
        /// Number of attempts made, including the first.
        attempts: u32,
        /// Description of the last failure.
        reason: String,
    },
    /// The upstream rejected the request with a non-retryable status.
    #[error("request to {url} failed with status {status}")]
    Status {
        /// Request rendered with its query.
        url: String,
        /// HTTP status code.
        status: u16,
    },
    /// The transport failed in a way that retrying cannot fix.
    #[error("network error contacting {url}: {source}")]
    Network {
        /// Request rendered with its query.
        url: String,
        /// Underlying transport error.
        #[source]
        source: reqwest::Error,
    },
    /// The response body was not valid JSON.
    #[error("failed to decode JSON from {url}: {source}")]
    Decode {
        /// Request rendered with its query.
        url: String,
        /// Underlying decoder error.
        #[source]
        source: serde_json::Error,
    },
    /// Writing the streamed body failed.
    #[error("failed to store response body from {url}: {source}")]
    Write {
        /// Request rendered with its query.
        url: String,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The request URL could not be parsed.
    #[error("invalid request URL {url}: {source}")]
    InvalidUrl {
        /// The offending URL.
        url: String,
        /// Underlying parser error.
        #[source]
        source: url::ParseError,
    },
}

impl FetchError {
    /// The HTTP status, when the failure carried one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the failure was a transient one that exhausted its retries.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Transient { .. })
    }
}

/// Errors raised while constructing an [`super::HttpClient`].
#[derive(Debug, Error)]
pub enum ClientBuildError {
    /// Failed to build the reqwest client.
    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[source] reqwest::Error),
    /// Failed to build the Tokio runtime.
    #[error("failed to build Tokio runtime: {0}")]
    Runtime(#[source] io::Error),
}
