//! Statline Transform - nested records to relational tables
//!
//! Flattens raw API records into dot-path columns, then projects them into
//! the fact table or deduplicated reference tables with canonical
//! snake_case column names.

pub mod flatten;
pub mod naming;
pub mod normalize;

// Re-exports for convenience
pub use flatten::flatten_records;
pub use naming::to_snake;
pub use normalize::{
    FACT_COLUMNS, SENTINEL, SchemaMismatch, WHITELISTED_PREFIXES, normalize, select_reference,
};
