//! Store backends
//!
//! A [`Store`] is one long-lived connection used serially for catalog
//! reads, DDL and upserts. Every call commits on its own.

mod duck;
mod postgres;

pub use self::duck::DuckDbStore;
pub use self::postgres::PostgresStore;

use statline_core::{ColumnType, Value};

use crate::config::{Backend, StoreConfig};
use crate::error::LoadError;
use crate::schema::Catalog;
use crate::sql::Dialect;

/// Rows to upsert into one existing table.
#[derive(Debug, Clone, Copy)]
pub struct UpsertBatch<'a> {
    pub table: &'a str,
    pub columns: &'a [String],
    /// Bind type per column, parallel to `columns`
    pub types: &'a [ColumnType],
    pub primary_key: &'a str,
    pub rows: &'a [Vec<Value>],
}

pub trait Store {
    fn dialect(&self) -> Dialect;

    /// Schema tables are looked up and created in.
    fn schema(&self) -> &str;

    /// Base tables in the schema and their primary key column.
    fn catalog(&mut self) -> Result<Catalog, LoadError>;

    /// Run DDL statements in order.
    fn execute(&mut self, statements: &[String]) -> Result<(), LoadError>;

    /// Insert or update `batch.rows`; returns rows affected.
    fn upsert(&mut self, batch: &UpsertBatch<'_>) -> Result<u64, LoadError>;
}

impl<S: Store + ?Sized> Store for Box<S> {
    fn dialect(&self) -> Dialect {
        (**self).dialect()
    }

    fn schema(&self) -> &str {
        (**self).schema()
    }

    fn catalog(&mut self) -> Result<Catalog, LoadError> {
        (**self).catalog()
    }

    fn execute(&mut self, statements: &[String]) -> Result<(), LoadError> {
        (**self).execute(statements)
    }

    fn upsert(&mut self, batch: &UpsertBatch<'_>) -> Result<u64, LoadError> {
        (**self).upsert(batch)
    }
}

/// Open the backend selected by `cfg`.
pub fn open_store(cfg: &StoreConfig) -> Result<Box<dyn Store>, LoadError> {
    log::info!(target: "load", "connecting to {}", cfg.target());
    Ok(match cfg.backend {
        Backend::Postgres => Box::new(PostgresStore::connect(cfg)?),
        Backend::DuckDb => Box::new(DuckDbStore::open(&cfg.duckdb_path, &cfg.schema)?),
    })
}

/// A cell converted to its column's bind type.
#[derive(Debug, Clone, PartialEq)]
pub enum Param {
    Int(Option<i64>),
    Float(Option<f64>),
    Bool(Option<bool>),
    Text(Option<String>),
}

impl Param {
    pub fn new(value: &Value, ty: ColumnType) -> Self {
        match ty {
            ColumnType::Integer => Self::Int(match value {
                Value::Int(i) => Some(*i),
                _ => None,
            }),
            ColumnType::Float => Self::Float(match value {
                Value::Int(i) => Some(*i as f64),
                Value::Float(f) => Some(*f),
                _ => None,
            }),
            ColumnType::Boolean => Self::Bool(match value {
                Value::Bool(b) => Some(*b),
                _ => None,
            }),
            ColumnType::Text => Self::Text(match value {
                Value::Null => None,
                Value::Text(s) => Some(s.clone()),
                other => Some(other.to_string()),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ints_widen_in_float_columns() {
        assert_eq!(
            Param::new(&Value::Int(3), ColumnType::Float),
            Param::Float(Some(3.0))
        );
    }

    #[test]
    fn text_columns_stringify() {
        assert_eq!(
            Param::new(&Value::Float(1.5), ColumnType::Text),
            Param::Text(Some("1.5".into()))
        );
        assert_eq!(
            Param::new(&Value::Bool(true), ColumnType::Text),
            Param::Text(Some("true".into()))
        );
    }

    #[test]
    fn nulls_stay_typed() {
        assert_eq!(Param::new(&Value::Null, ColumnType::Integer), Param::Int(None));
        assert_eq!(Param::new(&Value::Null, ColumnType::Text), Param::Text(None));
    }
}
