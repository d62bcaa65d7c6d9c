//! Transport seam between the fetcher and the network

use std::time::Duration;

use statline_core::{SHARED_RUNTIME, http_client};

/// Status and body of a completed HTTP exchange (any status).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// Transport failure before a status line was received.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("connection failed: {0}")]
    Connect(String),
    /// Anything the fetcher has no retry policy for
    #[error("{0}")]
    Other(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Classify a reqwest failure. Timeouts, connect errors and failures
    /// while sending or reading the body are network failures; builder,
    /// redirect and decode errors are not.
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else if e.is_connect() || e.is_request() || e.is_body() {
            Self::Connect(e.to_string())
        } else {
            Self::Other(Box::new(e))
        }
    }
}

/// Blocking GET. Implementations must not retry on their own.
pub trait Transport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpReply, TransportError>;
}

/// Transport over the shared reqwest client.
#[derive(Debug, Default, Clone, Copy)]
pub struct HttpTransport;

impl Transport for HttpTransport {
    fn get(
        &self,
        url: &str,
        query: &[(&str, &str)],
        timeout: Duration,
    ) -> Result<HttpReply, TransportError> {
        SHARED_RUNTIME.handle().block_on(async {
            let resp = http_client()
                .get(url)
                .query(query)
                .timeout(timeout)
                .send()
                .await
                .map_err(TransportError::from_reqwest)?;
            let status = resp.status().as_u16();
            let body = resp.text().await.map_err(TransportError::from_reqwest)?;
            Ok(HttpReply { status, body })
        })
    }
}
