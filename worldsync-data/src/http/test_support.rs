//! Deterministic [`Fetch`] double used by adapter and orchestrator tests.

use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

use serde_json::Value;

use super::{Fetch, FetchError, HttpRequest};

/// Canned reply for one request signature.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// A JSON body.
    Json(Value),
    /// A raw body for downloads.
    Bytes(Vec<u8>),
    /// A non-retryable HTTP status.
    Status(u16),
    /// A failure that exhausted its retries.
    Transient,
}

/// In-memory [`Fetch`] keyed by [`HttpRequest::signature`].
///
/// Unknown signatures answer with status 404. Every request is recorded.
#[derive(Debug, Default)]
pub struct StubFetch {
    replies: HashMap<String, StubReply>,
    requests: Mutex<Vec<String>>,
}

impl StubFetch {
    /// Create a stub without replies.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reply` for requests whose signature equals `signature`.
    #[must_use]
    pub fn with_reply(mut self, signature: impl Into<String>, reply: StubReply) -> Self {
        self.replies.insert(signature.into(), reply);
        self
    }

    /// Register a JSON reply.
    #[must_use]
    pub fn with_json(self, signature: impl Into<String>, body: Value) -> Self {
        self.with_reply(signature, StubReply::Json(body))
    }

    /// Signatures requested so far, in order.
    ///
    /// # Panics
    ///
    /// Panics when the request log lock is poisoned.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().expect("request log lock").clone()
    }

    fn reply_for(&self, request: &HttpRequest) -> Result<&StubReply, FetchError> {
        let signature = request.signature();
        if let Ok(mut log) = self.requests.lock() {
            log.push(signature.clone());
        }
        match self.replies.get(&signature) {
            Some(StubReply::Status(status)) => Err(FetchError::Status {
                url: signature,
                status: *status,
            }),
            Some(StubReply::Transient) => Err(FetchError::Transient {
                url: signature,
                attempts: 4,
                reason: "status 503".to_owned(),
            }),
            Some(reply) => Ok(reply),
            None => Err(FetchError::Status {
                url: signature,
                status: 404,
            }),
        }
    }
}

impl Fetch for StubFetch {
    fn get_json(&self, request: &HttpRequest) -> Result<Value, FetchError> {
        match self.reply_for(request)? {
            StubReply::Json(value) => Ok(value.clone()),
            StubReply::Bytes(bytes) => {
                serde_json::from_slice(bytes).map_err(|source| FetchError::Decode {
                    url: request.signature(),
                    source,
                })
            }
            StubReply::Status(_) | StubReply::Transient => Err(FetchError::Status {
                url: request.signature(),
                status: 500,
            }),
        }
    }

    fn download(&self, request: &HttpRequest, sink: &mut dyn Write) -> Result<u64, FetchError> {
        let bytes = match self.reply_for(request)? {
            StubReply::Bytes(bytes) => bytes.clone(),
            StubReply::Json(value) => value.to_string().into_bytes(),
            StubReply::Status(_) | StubReply::Transient => Vec::new(),
        };
        sink.write_all(&bytes).map_err(|source| FetchError::Write {
            url: request.signature(),
            source,
        })?;
        Ok(u64::try_from(bytes.len()).unwrap_or(u64::MAX))
    }
}
