//! Blocking HTTP client with centralised retry and timeout policy.
//!
//! The [`Fetch`] trait is synchronous so the adapters and orchestrator stay
//! embeddable in synchronous callers. [`HttpClient`] bridges to reqwest by
//! blocking on a Tokio runtime it owns.

use std::fmt;
use std::future::Future;
use std::io::Write;

use futures_util::TryStreamExt;
use reqwest::{Client, Response};
use serde_json::Value;
use tokio::runtime::{Handle, Runtime, RuntimeFlavor};
use url::Url;

use super::retry::AttemptError;
use super::{ClientBuildError, FetchError, HttpClientConfig, RetryPolicy};

/// An idempotent GET request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    url: String,
    params: Vec<(String, String)>,
    headers: Vec<(String, String)>,
}

impl HttpRequest {
    /// Start a request for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            params: Vec::new(),
            headers: Vec::new(),
        }
    }

    /// Append a query parameter.
    #[must_use]
    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Append a request header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// The URL without query parameters.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query parameters in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }

    /// Headers in insertion order.
    #[must_use]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Render the URL with its query unencoded, for logs and error messages.
    ///
    /// ```
    /// use worldsync_data::http::HttpRequest;
    ///
    /// let request = HttpRequest::new("https://example.org/all").param("fields", "cca2,name");
    /// assert_eq!(request.signature(), "https://example.org/all?fields=cca2,name");
    /// ```
    #[must_use]
    pub fn signature(&self) -> String {
        if self.params.is_empty() {
            return self.url.clone();
        }
        let query = self
            .params
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}?{query}", self.url)
    }

    fn to_url(&self) -> Result<Url, FetchError> {
        let parsed = if self.params.is_empty() {
            Url::parse(&self.url)
        } else {
            Url::parse_with_params(&self.url, &self.params)
        };
        parsed.map_err(|source| FetchError::InvalidUrl {
            url: self.url.clone(),
            source,
        })
    }
}

/// Outbound GET capability shared by every upstream adapter.
pub trait Fetch: Send + Sync {
    /// Fetch `request` and decode the body as JSON.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the request fails after retries, the
    /// upstream rejects it, or the body is not JSON.
    fn get_json(&self, request: &HttpRequest) -> Result<Value, FetchError>;

    /// Stream the body of `request` into `sink`, returning the byte count.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the request fails after retries, the
    /// upstream rejects it, or writing to `sink` fails.
    fn download(&self, request: &HttpRequest, sink: &mut dyn Write) -> Result<u64, FetchError>;
}

/// reqwest-backed [`Fetch`] implementation.
///
/// # Runtime behaviour
///
/// Outside any Tokio runtime, and inside a `current_thread` runtime, the
/// client blocks on its own runtime. Inside a multi-threaded runtime it uses
/// that runtime's handle through [`tokio::task::block_in_place`].
pub struct HttpClient {
    client: Client,
    retry: RetryPolicy,
    runtime: Runtime,
}

impl fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HttpClient")
            .field("client", &self.client)
            .field("retry", &self.retry)
            .field("runtime", &"<tokio::runtime::Runtime>")
            .finish()
    }
}

impl HttpClient {
    /// Create a client with default timeouts and retries.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn new() -> Result<Self, ClientBuildError> {
        Self::with_config(&HttpClientConfig::default())
    }

    /// Create a client with explicit configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client or Tokio runtime fails to build.
    pub fn with_config(config: &HttpClientConfig) -> Result<Self, ClientBuildError> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .connect_timeout(config.connect_timeout)
            .read_timeout(config.read_timeout)
            .build()
            .map_err(ClientBuildError::HttpClient)?;
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(ClientBuildError::Runtime)?;
        Ok(Self {
            client,
            retry: config.retry,
            runtime,
        })
    }

    fn block_on<F: Future>(&self, future: F) -> F::Output {
        match Handle::try_current() {
            Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
                tokio::task::block_in_place(|| handle.block_on(future))
            }
            _ => self.runtime.block_on(future),
        }
    }

    async fn send(&self, url: &Url, request: &HttpRequest) -> Result<Response, AttemptError> {
        let signature = request.signature();
        let builder = request
            .headers()
            .iter()
            .fold(self.client.get(url.clone()), |builder, (name, value)| {
                builder.header(name.as_str(), value.as_str())
            });
        let response = builder
            .send()
            .await
            .map_err(|err| classify_transport_error(err, &signature))?;
        let status = response.status().as_u16();
        if response.status().is_success() {
            Ok(response)
        } else if RetryPolicy::is_retryable_status(status) {
            Err(AttemptError::Retryable(format!("status {status}")))
        } else {
            Err(AttemptError::Fatal(FetchError::Status {
                url: signature,
                status,
            }))
        }
    }

    async fn fetch_json(&self, request: &HttpRequest) -> Result<Value, FetchError> {
        let url = request.to_url()?;
        let signature = request.signature();
        let (url_ref, label) = (&url, signature.as_str());
        let body = self
            .retry
            .run(label, move || async move {
                let response = self.send(url_ref, request).await?;
                response
                    .bytes()
                    .await
                    .map_err(|err| classify_transport_error(err, label))
            })
            .await?;
        serde_json::from_slice(&body).map_err(|source| FetchError::Decode {
            url: signature,
            source,
        })
    }

    async fn stream_into(
        &self,
        request: &HttpRequest,
        sink: &mut dyn Write,
    ) -> Result<u64, FetchError> {
        let url = request.to_url()?;
        let signature = request.signature();
        let url_ref = &url;
        let response = self
            .retry
            .run(&signature, move || self.send(url_ref, request))
            .await?;

        // Bytes already written cannot be replayed, so only the request itself
        // is retried.
        let mut stream = response.bytes_stream();
        let mut written = 0_u64;
        while let Some(chunk) = stream
            .try_next()
            .await
            .map_err(|source| FetchError::Network {
                url: signature.clone(),
                source,
            })?
        {
            sink.write_all(&chunk).map_err(|source| FetchError::Write {
                url: signature.clone(),
                source,
            })?;
            written = written.saturating_add(u64::try_from(chunk.len()).unwrap_or(u64::MAX));
        }
        sink.flush().map_err(|source| FetchError::Write {
            url: signature,
            source,
        })?;
        Ok(written)
    }
}

impl Fetch for HttpClient {
    fn get_json(&self, request: &HttpRequest) -> Result<Value, FetchError> {
        self.block_on(self.fetch_json(request))
    }

    fn download(&self, request: &HttpRequest, sink: &mut dyn Write) -> Result<u64, FetchError> {
        self.block_on(self.stream_into(request, sink))
    }
}

fn classify_transport_error(error: reqwest::Error, url: &str) -> AttemptError {
    if error.is_timeout() {
        return AttemptError::Retryable(format!("timed out: {error}"));
    }
    if error.is_connect() || error.is_body() {
        return AttemptError::Retryable(format!("connection failed: {error}"));
    }
    AttemptError::Fatal(FetchError::Network {
        url: url.to_owned(),
        source: error,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn signature_lists_params_in_order() {
        let request = HttpRequest::new("https://api.example.org/country/GB/indicator/X")
            .param("format", "json")
            .param("per_page", "1");
        assert_eq!(
            request.signature(),
            "https://api.example.org/country/GB/indicator/X?format=json&per_page=1"
        );
    }

    #[rstest]
    fn to_url_encodes_query_values() {
        let request = HttpRequest::new("https://example.org/all").param("fields", "cca2,name");
        let url = request.to_url().expect("valid url");
        assert_eq!(url.query(), Some("fields=cca2%2Cname"));
    }

    #[rstest]
    fn urls_without_params_have_no_query() {
        let request = HttpRequest::new("https://example.org/ne_110m_admin_0_countries.zip");
        let url = request.to_url().expect("valid url");
        assert_eq!(url.query(), None);
        assert_eq!(
            url.as_str(),
            "https://example.org/ne_110m_admin_0_countries.zip"
        );
    }

    #[rstest]
    fn invalid_urls_are_reported() {
        let request = HttpRequest::new("not a url");
        assert!(matches!(
            request.to_url(),
            Err(FetchError::InvalidUrl { .. })
        ));
    }

    #[rstest]
    fn client_builds_with_defaults() {
        let client = HttpClient::new().expect("client should build");
        assert_eq!(client.retry, RetryPolicy::default());
    }
}
