//! Paginated fetching with fixed-interval retries
//!
//! Pages are fetched strictly one after another. The total page count is
//! re-read from every response's metadata, so the last observed value wins
//! if the remote changes it mid-run.

use indicatif::ProgressBar;
use serde_json::{Map, Value};
use statline_core::{AttemptError, RetryFailure, fmt_num, retry_fixed};

use crate::error::{AttemptFailure, FetchError};
use crate::request::{PageRequest, RequestTemplate};
use crate::transport::{HttpReply, Transport, TransportError};

const STAGE: &str = "extract";

/// One decoded `[metadata, records]` response.
#[derive(Debug, Clone, PartialEq)]
pub struct PageResponse {
    pub metadata: Map<String, Value>,
    pub records: Vec<Value>,
}

impl PageResponse {
    /// Decode a response body. Every shape problem is a retryable
    /// [`AttemptFailure::BadPayload`].
    pub fn parse(body: &str) -> Result<Self, AttemptFailure> {
        let data: Value = serde_json::from_str(body)
            .map_err(|e| AttemptFailure::BadPayload(format!("invalid JSON: {e}")))?;

        let items = match data {
            Value::Array(items) if !items.is_empty() => items,
            Value::Array(_) | Value::Null => {
                return Err(AttemptFailure::BadPayload("empty payload".into()));
            }
            Value::Object(ref o) if o.is_empty() => {
                return Err(AttemptFailure::BadPayload("empty payload".into()));
            }
            Value::String(ref s) if s.is_empty() => {
                return Err(AttemptFailure::BadPayload("empty payload".into()));
            }
            other => {
                return Err(AttemptFailure::BadPayload(format!(
                    "expected [metadata, records], got {}",
                    json_kind(&other)
                )));
            }
        };

        let Ok([metadata, records]) = <[Value; 2]>::try_from(items) else {
            return Err(AttemptFailure::BadPayload(
                "expected exactly two elements [metadata, records]".into(),
            ));
        };
        let Value::Object(metadata) = metadata else {
            return Err(AttemptFailure::BadPayload(format!(
                "metadata is {}, expected object",
                json_kind(&metadata)
            )));
        };
        let Value::Array(records) = records else {
            return Err(AttemptFailure::BadPayload(format!(
                "records is {}, expected array",
                json_kind(&records)
            )));
        };
        Ok(Self { metadata, records })
    }

    /// `pages` from metadata (number or numeric string).
    pub fn total_pages(&self) -> Option<u32> {
        match self.metadata.get("pages")? {
            Value::Number(n) => n.as_u64().and_then(|p| u32::try_from(p).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }
}

fn json_kind(v: &Value) -> &'static str {
    match v {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Map an HTTP reply onto the retry policy.
///
/// 429 and 5xx retry, other 4xx abort, 2xx bodies are decoded.
fn classify(reply: HttpReply) -> Result<PageResponse, AttemptError<AttemptFailure>> {
    match reply.status {
        200..=299 => PageResponse::parse(&reply.body).map_err(AttemptError::Retryable),
        429 => Err(AttemptError::Retryable(AttemptFailure::RateLimited)),
        s @ 400..=499 => Err(AttemptError::Abort(AttemptFailure::ClientError(s))),
        s => Err(AttemptError::Retryable(AttemptFailure::HttpStatus(s))),
    }
}

/// Per-attempt failure as seen by the retry loop.
#[derive(Debug)]
enum Failed {
    Attempt(AttemptFailure),
    Unclassified(TransportError),
}

impl std::fmt::Display for Failed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Attempt(a) => write!(f, "{a}"),
            Self::Unclassified(e) => write!(f, "{e}"),
        }
    }
}

/// Fetch one page, retrying retryable failures up to the request's budget.
pub fn fetch_page<T: Transport + ?Sized>(
    transport: &T,
    req: &PageRequest,
) -> Result<PageResponse, FetchError> {
    let query = req.query();
    let label = format!("GET {req}");
    let result = retry_fixed(&label, &req.retry, |attempt| {
        log::info!(target: STAGE, "GET attempt {attempt}/{}: {req}", req.retry.attempts);
        let reply = transport
            .get(&req.url, &query, req.timeout)
            .map_err(|e| match e {
                TransportError::Timeout(_) | TransportError::Connect(_) => {
                    AttemptError::Retryable(Failed::Attempt(AttemptFailure::Network(e.to_string())))
                }
                TransportError::Other(_) => AttemptError::Fatal(Failed::Unclassified(e)),
            })?;
        classify(reply).map_err(|e| match e {
            AttemptError::Retryable(f) => AttemptError::Retryable(Failed::Attempt(f)),
            AttemptError::Abort(f) => AttemptError::Abort(Failed::Attempt(f)),
            AttemptError::Fatal(f) => AttemptError::Fatal(Failed::Attempt(f)),
        })
    });

    result.map_err(|failure| {
        let attempts = failure.attempts();
        let last = match failure {
            RetryFailure::Fatal {
                error: Failed::Unclassified(source),
                ..
            } => {
                return FetchError::Unclassified {
                    request: req.to_string(),
                    source,
                };
            }
            RetryFailure::Exhausted { last, .. } => last,
            RetryFailure::Aborted { error, .. } | RetryFailure::Fatal { error, .. } => Some(error),
        };
        FetchError::ExhaustedRetries {
            attempts,
            request: req.to_string(),
            last: last.map(|f| match f {
                Failed::Attempt(a) => a,
                Failed::Unclassified(e) => AttemptFailure::Network(e.to_string()),
            }),
        }
    })
}

/// Fetch pages `first_page..=total` and concatenate their records in page
/// order.
///
/// `first_page` below 1 is corrected to 1. The total comes from each
/// response (clamped to `last_page` when given). Pages without records
/// are skipped.
pub fn fetch_all_pages<T: Transport + ?Sized>(
    transport: &T,
    req: &PageRequest,
    first_page: i64,
    last_page: Option<u32>,
    pb: &ProgressBar,
) -> Result<Vec<Value>, FetchError> {
    let first = if first_page < 1 {
        log::warn!(target: STAGE, "invalid first_page={first_page}, using 1");
        1
    } else {
        u32::try_from(first_page).unwrap_or(u32::MAX)
    };

    let mut records = Vec::new();
    let mut page = first;
    loop {
        let page_req = req.with_page(page);
        let response = fetch_page(transport, &page_req)?;

        if response.records.is_empty() {
            log::info!(target: STAGE, "page {page} is empty, skipping");
        }

        let mut total = response.total_pages().unwrap_or(page);
        if let Some(last) = last_page {
            total = total.min(last);
        }
        let count = response.records.len();
        records.extend(response.records);

        pb.set_message(format!("page {page}/{total}, {} records", fmt_num(records.len())));
        log::info!(
            target: STAGE,
            "page {page}/{total}: {count} records ({} so far)",
            fmt_num(records.len())
        );

        if page >= total {
            log::info!(target: STAGE, "reached end of page range");
            break;
        }
        page += 1;
    }
    Ok(records)
}

/// Records extracted across every indicator pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractSummary {
    pub records: Vec<Value>,
    /// Record count per indicator pass (`None` = no indicator segment)
    pub per_indicator: Vec<(Option<String>, usize)>,
}

impl ExtractSummary {
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Run pagination once per indicator, each starting at page 1, and
/// concatenate the results. An overall empty result is fatal.
pub fn extract<T: Transport + ?Sized>(
    template: &RequestTemplate,
    transport: &T,
    pb: &ProgressBar,
) -> Result<ExtractSummary, FetchError> {
    log::info!(target: STAGE, "starting extraction from {}", template.url);
    let mut summary = ExtractSummary::default();

    for (indicator, req) in template.passes() {
        if let Some(ind) = indicator {
            pb.set_prefix(ind.to_string());
            log::info!(target: STAGE, "indicator {ind}");
        }
        let records = fetch_all_pages(transport, &req, 1, None, pb)?;
        log::info!(
            target: STAGE,
            "{}: {} records",
            indicator.unwrap_or("(no indicator)"),
            fmt_num(records.len())
        );
        summary
            .per_indicator
            .push((indicator.map(str::to_string), records.len()));
        summary.records.extend(records);
    }

    if summary.records.is_empty() {
        let request = template
            .passes()
            .first()
            .map(|(_, r)| r.to_string())
            .unwrap_or_else(|| template.url.clone());
        log::error!(target: STAGE, "no records extracted: {request}");
        return Err(FetchError::EmptyResult { request });
    }

    log::info!(target: STAGE, "extracted {} records", fmt_num(summary.records.len()));
    Ok(summary)
}
