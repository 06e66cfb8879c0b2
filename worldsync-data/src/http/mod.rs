//! Resilient outbound HTTP.
//!
//! Every upstream adapter issues its requests through a [`Fetch`]
//! implementation so retry, backoff and timeout policy live in one place.

mod client;
mod config;
mod error;
mod retry;

#[doc(hidden)]
pub mod test_support;

pub use client::{Fetch, HttpClient, HttpRequest};
pub use config::{
    DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT, DEFAULT_USER_AGENT, HttpClientConfig,
};
pub use error::{ClientBuildError, FetchError};
pub use retry::{
    DEFAULT_BACKOFF_FACTOR, DEFAULT_MAX_BACKOFF, DEFAULT_MAX_RETRIES, RETRYABLE_STATUSES,
    RetryPolicy,
};
