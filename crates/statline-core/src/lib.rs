//! Statline Core - Common infrastructure for statistical indicator pipelines
//!
//! This crate provides the pieces shared by extraction, normalization
//! and loading: the flat table model, the fixed-interval retry loop,
//! the shared blocking HTTP runtime, logging and progress display.

pub mod http;
pub mod logging;
pub mod progress;
pub mod retry;
pub mod table;

// Re-exports for convenience
pub use http::{SHARED_RUNTIME, http_client};
pub use logging::{StageLogger, init_logging};
pub use progress::{ProgressContext, fmt_num};
pub use retry::{AttemptError, RetryFailure, RetryPolicy, retry_fixed};
pub use table::{ColumnType, FlatTable, Value};
