//! HTTP seam for blob PUTs.
//!
//! [`BlobTransport`] is the only place a request leaves the process. The
//! default [`HttpTransport`] uses `reqwest`; tests substitute a mock.

use std::collections::BTreeMap;
use std::future::Future;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::Stream;
use reqwest::header::{CONTENT_LENGTH, HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use tracing::debug;

/// Stream of body chunks for a streaming PUT.
pub type ByteStream = Pin<Box<dyn Stream<Item = std::io::Result<Bytes>> + Send + Sync>>;

/// Errors from the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Built from errors stripped of their URL, which carries the SAS token.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    #[error("upload failed: {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("upload failed with status: {0}")]
    UnexpectedStatus(u16),

    #[error("invalid header: {0}")]
    InvalidHeader(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Request body.
pub enum PutBody {
    /// Fully buffered content.
    Bytes(Bytes),
    /// Streamed content of a known length.
    Stream { stream: ByteStream, length: u64 },
}

impl std::fmt::Debug for PutBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Bytes(data) => f.debug_tuple("Bytes").field(&data.len()).finish(),
            Self::Stream { length, .. } => {
                f.debug_struct("Stream").field("length", length).finish()
            }
        }
    }
}

/// A single blob PUT.
#[derive(Debug)]
pub struct PutRequest {
    /// Full URL including the SAS query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: PutBody,
}

impl PutRequest {
    /// Returns the first header value with the given name (case-insensitive).
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// Raw response metadata from the storage service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl TransportResponse {
    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            ..Self::default()
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Performs blob PUTs.
///
/// Non-2xx responses are returned as `Ok`; the caller decides what counts as
/// success.
pub trait BlobTransport: Send + Sync {
    fn put(
        &self,
        request: PutRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + '_>>;
}

/// `reqwest`-backed transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .build()
            .map_err(TransportError::Http)?;
        Ok(Self { http })
    }

    /// Wraps an existing client (proxies, timeouts, custom TLS roots).
    pub fn from_client(http: reqwest::Client) -> Self {
        Self { http }
    }
}

impl BlobTransport for HttpTransport {
    fn put(
        &self,
        request: PutRequest,
    ) -> Pin<Box<dyn Future<Output = Result<TransportResponse, TransportError>> + Send + '_>>
    {
        Box::pin(async move {
            let PutRequest { url, headers, body } = request;

            let mut header_map = HeaderMap::with_capacity(headers.len() + 1);
            for (name, value) in &headers {
                let header_name = HeaderName::from_bytes(name.as_bytes())
                    .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
                let header_value = HeaderValue::from_str(value)
                    .map_err(|_| TransportError::InvalidHeader(name.clone()))?;
                header_map.insert(header_name, header_value);
            }

            let body = match body {
                PutBody::Bytes(data) => reqwest::Body::from(data),
                PutBody::Stream { stream, length } => {
                    // Block blob PUTs need a length; never fall back to chunked encoding.
                    header_map.insert(CONTENT_LENGTH, HeaderValue::from(length));
                    reqwest::Body::wrap_stream(stream)
                }
            };

            let resp = self
                .http
                .put(&url)
                .headers(header_map)
                .body(body)
                .send()
                .await
                .map_err(|e| TransportError::Http(e.without_url()))?;

            let status = resp.status().as_u16();
            let headers = resp
                .headers()
                .iter()
                .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.to_string(), v.to_string())))
                .collect();
            let body = resp.text().await.unwrap_or_default();

            debug!(status, "blob PUT finished");

            Ok(TransportResponse {
                status,
                headers,
                body,
            })
        })
    }
}
