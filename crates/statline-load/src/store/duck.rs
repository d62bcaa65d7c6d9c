//! DuckDB backend, for local files and in-memory runs

use std::path::Path;

use duckdb::types::Value as DuckValue;
use duckdb::{Connection, params_from_iter};

use super::{Param, Store, UpsertBatch};
use crate::error::{LoadError, StoreContext};
use crate::schema::Catalog;
use crate::sql::{self, Dialect};

const CATALOG_QUERY: &str = "\
SELECT table_name, constraint_column_names[1]
FROM duckdb_constraints()
WHERE schema_name = ? AND constraint_type = 'PRIMARY KEY'
ORDER BY table_name";

pub struct DuckDbStore {
    conn: Connection,
    schema: String,
}

impl DuckDbStore {
    pub fn open(path: &Path, schema: &str) -> Result<Self, LoadError> {
        let conn = Connection::open(path)
            .store_context(|| format!("opening DuckDB database {}", path.display()))?;
        Self::with_connection(conn, schema)
    }

    pub fn open_in_memory(schema: &str) -> Result<Self, LoadError> {
        let conn = Connection::open_in_memory()
            .store_context(|| "opening in-memory DuckDB".to_string())?;
        Self::with_connection(conn, schema)
    }

    fn with_connection(conn: Connection, schema: &str) -> Result<Self, LoadError> {
        conn.execute_batch(&format!(
            "CREATE SCHEMA IF NOT EXISTS {}",
            sql::quote_ident(schema)
        ))
        .store_context(|| format!("creating schema {schema}"))?;
        Ok(Self {
            conn,
            schema: schema.to_string(),
        })
    }

    /// Underlying connection, for ad-hoc queries.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }
}

fn to_duck(param: Param) -> DuckValue {
    match param {
        Param::Int(v) => v.map_or(DuckValue::Null, DuckValue::BigInt),
        Param::Float(v) => v.map_or(DuckValue::Null, DuckValue::Double),
        Param::Bool(v) => v.map_or(DuckValue::Null, DuckValue::Boolean),
        Param::Text(v) => v.map_or(DuckValue::Null, DuckValue::Text),
    }
}

impl Store for DuckDbStore {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    fn schema(&self) -> &str {
        &self.schema
    }

    fn catalog(&mut self) -> Result<Catalog, LoadError> {
        let context = || format!("reading catalog of schema {}", self.schema);
        let mut stmt = self.conn.prepare(CATALOG_QUERY).store_context(context)?;
        let rows = stmt
            .query_map(duckdb::params![self.schema], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })
            .store_context(context)?;

        let mut catalog = Catalog::new();
        for row in rows {
            let (table, pk) = row.store_context(context)?;
            catalog.entry(table).or_insert(pk);
        }
        Ok(catalog)
    }

    fn execute(&mut self, statements: &[String]) -> Result<(), LoadError> {
        for stmt in statements {
            self.conn
                .execute_batch(stmt)
                .store_context(|| format!("executing: {stmt}"))?;
        }
        Ok(())
    }

    fn upsert(&mut self, batch: &UpsertBatch<'_>) -> Result<u64, LoadError> {
        let statement = format!(
            "{}VALUES {}{}",
            sql::insert_head(&self.schema, batch.table, batch.columns),
            sql::row_placeholders(batch.columns.len()),
            sql::conflict_clause(batch.primary_key, batch.columns)
        );
        let context = || format!("upserting {} rows into {}", batch.rows.len(), batch.table);

        let tx = self.conn.transaction().store_context(context)?;
        let mut affected = 0u64;
        {
            let mut stmt = tx.prepare(&statement).store_context(context)?;
            for row in batch.rows {
                let params = row
                    .iter()
                    .zip(batch.types)
                    .map(|(value, ty)| to_duck(Param::new(value, *ty)));
                affected += stmt.execute(params_from_iter(params)).store_context(context)? as u64;
            }
        }
        tx.commit().store_context(context)?;
        Ok(affected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_target_schema() {
        let store = DuckDbStore::open_in_memory("wb").unwrap();
        let n: i64 = store
            .connection()
            .query_row(
                "SELECT count(*) FROM information_schema.schemata WHERE schema_name = 'wb'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(n, 1);
    }

    #[test]
    fn empty_catalog() {
        let mut store = DuckDbStore::open_in_memory("main").unwrap();
        assert!(store.catalog().unwrap().is_empty());
    }

    #[test]
    fn params_convert_to_duckdb_values() {
        assert_eq!(to_duck(Param::Int(Some(7))), DuckValue::BigInt(7));
        assert_eq!(to_duck(Param::Text(None)), DuckValue::Null);
        assert_eq!(to_duck(Param::Float(Some(0.5))), DuckValue::Double(0.5));
    }
}
