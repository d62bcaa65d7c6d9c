//! Statline Load - schema-inferring upserts into SQL stores
//!
//! Tables are created on first load from the shape of the data: column
//! types from cell values, the primary key and foreign keys from column
//! names. Later loads upsert by primary key and never alter the schema.
//!
//! ```no_run
//! use statline_core::FlatTable;
//! use statline_load::{DuckDbStore, Loader};
//!
//! # fn main() -> Result<(), statline_load::LoadError> {
//! let mut loader = Loader::new(DuckDbStore::open_in_memory("main")?);
//! let table = FlatTable::from_rows(
//!     vec!["id".into(), "name".into()],
//!     vec![vec!["CHN".into(), "China".into()]],
//! );
//! loader.upsert("country", &table)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod loader;
pub mod relations;
pub mod schema;
pub mod sql;
pub mod store;

// Re-exports for convenience
pub use config::{Backend, StoreConfig};
pub use error::{BackendError, LoadError};
pub use loader::{LoadReport, Loader};
pub use relations::{NamingConventionPolicy, Reference, RelationshipPolicy};
pub use schema::{Catalog, ColumnDef, ForeignKey, PrimaryKey, TableSchema, infer_schema};
pub use store::{DuckDbStore, PostgresStore, Store, UpsertBatch, open_store};
