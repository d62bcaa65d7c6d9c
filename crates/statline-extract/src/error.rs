//! Error types for paginated extraction

use crate::transport::TransportError;

/// Why a single fetch attempt failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AttemptFailure {
    #[error("HTTP 429: rate limited")]
    RateLimited,
    /// 4xx other than 429; retrying the same request cannot help
    #[error("HTTP {0}: client error")]
    ClientError(u16),
    /// 5xx and any other non-success status
    #[error("HTTP {0}")]
    HttpStatus(u16),
    #[error("network: {0}")]
    Network(String),
    /// JSON decode failure, empty payload, or wrong `[metadata, records]` shape
    #[error("bad payload: {0}")]
    BadPayload(String),
}

impl AttemptFailure {
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::ClientError(_))
    }
}

fn describe_last(last: &Option<AttemptFailure>) -> String {
    match last {
        Some(f) => f.to_string(),
        None => "no attempt made".to_string(),
    }
}

/// Fatal extraction error. Any of these aborts the pipeline run before
/// anything is loaded.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Retry budget spent, or a client error stopped the attempts early.
    #[error("request failed after {attempts} attempt(s), last error: {}; request: {request}", describe_last(.last))]
    ExhaustedRetries {
        attempts: u32,
        request: String,
        last: Option<AttemptFailure>,
    },
    /// Transport failure with no retry policy; never retried.
    #[error("unexpected transport failure; request: {request}")]
    Unclassified {
        request: String,
        #[source]
        source: TransportError,
    },
    /// Every page of every indicator came back without records.
    #[error("no data available for this parameter set; request: {request}")]
    EmptyResult { request: String },
}

impl FetchError {
    /// Attempts made by the failing page fetch, if any.
    pub fn attempts(&self) -> Option<u32> {
        match self {
            Self::ExhaustedRetries { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
