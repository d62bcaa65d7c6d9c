//! Statline Extract - paginated indicator extraction
//!
//! Turns validated settings into endpoint requests and walks every page of
//! every requested indicator, one request at a time.
//!
//! # Example
//!
//! ```no_run
//! use indicatif::ProgressBar;
//! use statline_extract::{ExtractConfig, HttpTransport, RequestTemplate, extract};
//!
//! let template = RequestTemplate::from_config(&ExtractConfig::default());
//! let summary = extract(&template, &HttpTransport, &ProgressBar::hidden())
//!     .expect("extraction failed");
//! println!("{} records", summary.len());
//! ```

pub mod error;
pub mod fetch;
pub mod request;
pub mod transport;

// Re-exports for convenience
pub use error::{AttemptFailure, FetchError};
pub use fetch::{ExtractSummary, PageResponse, extract, fetch_all_pages, fetch_page};
pub use request::{DEFAULT_BASE_URL, ExtractConfig, PageRequest, RequestTemplate};
pub use transport::{HttpReply, HttpTransport, Transport, TransportError};
