//! Pluggable HTTP transport used by the image fetcher

use async_trait::async_trait;
use bytes::Bytes;
use imgbind_types::HttpResponse;
use std::fmt;
use url::Url;

/// A completed HTTP exchange: status line, headers and the full body
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub response: HttpResponse,
    pub body: Bytes,
}

/// Network-level failure (DNS, TLS, connection reset, timeout)
///
/// `response` is present when headers arrived before the body failed.
#[derive(Debug, Clone)]
pub struct TransportFailure {
    pub message: String,
    pub response: Option<HttpResponse>,
}

impl TransportFailure {
    #[must_use]
    pub fn new(message: impl Into<String>, response: Option<HttpResponse>) -> Self {
        Self {
            message: message.into(),
            response,
        }
    }
}

impl fmt::Display for TransportFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Issues GET requests on behalf of image downloaders
///
/// Implementations own connection pooling and HTTP caching; the image
/// pipeline only sees the final reply.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    /// Fetch `url` and read the whole body
    async fn get(&self, url: &Url) -> Result<HttpReply, TransportFailure>;
}
