//! PostgreSQL backend over a single sqlx connection

use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{ConnectOptions, Connection, Postgres, QueryBuilder};
use statline_core::SHARED_RUNTIME;

use super::{Param, Store, UpsertBatch};
use crate::config::StoreConfig;
use crate::error::{LoadError, StoreContext};
use crate::schema::Catalog;
use crate::sql::{self, Dialect};

/// Postgres caps bind parameters per statement at u16::MAX.
const MAX_BIND_PARAMS: usize = 65_535;

const CATALOG_QUERY: &str = "\
SELECT t.table_name::text, kcu.column_name::text
FROM information_schema.tables t
JOIN information_schema.table_constraints tc
  ON tc.table_schema = t.table_schema
 AND tc.table_name = t.table_name
 AND tc.constraint_type = 'PRIMARY KEY'
JOIN information_schema.key_column_usage kcu
  ON kcu.constraint_schema = tc.constraint_schema
 AND kcu.constraint_name = tc.constraint_name
WHERE t.table_schema = $1 AND t.table_type = 'BASE TABLE'
ORDER BY t.table_name, kcu.ordinal_position";

pub struct PostgresStore {
    conn: PgConnection,
    schema: String,
}

impl PostgresStore {
    pub fn connect(cfg: &StoreConfig) -> Result<Self, LoadError> {
        let opts = PgConnectOptions::new()
            .host(&cfg.host)
            .port(cfg.port)
            .username(&cfg.user)
            .password(&cfg.password)
            .database(&cfg.dbname);
        let conn = SHARED_RUNTIME
            .handle()
            .block_on(opts.connect())
            .store_context(|| format!("connecting to {}", cfg.target()))?;
        Ok(Self {
            conn,
            schema: cfg.schema.clone(),
        })
    }

    /// Connect from a `postgres://` URL.
    pub fn connect_url(url: &str, schema: &str) -> Result<Self, LoadError> {
        let conn = SHARED_RUNTIME
            .handle()
            .block_on(PgConnection::connect(url))
            .store_context(|| "connecting to postgres".to_string())?;
        Ok(Self {
            conn,
            schema: schema.to_string(),
        })
    }
}

impl Store for PostgresStore {
    fn dialect(&self) -> Dialect {
        Dialect::Postgres
    }

    fn schema(&self) -> &str {
        &self.schema
    }

    fn catalog(&mut self) -> Result<Catalog, LoadError> {
        let rows: Vec<(String, String)> = SHARED_RUNTIME
            .handle()
            .block_on(
                sqlx::query_as::<_, (String, String)>(CATALOG_QUERY)
                    .bind(&self.schema)
                    .fetch_all(&mut self.conn),
            )
            .store_context(|| format!("reading catalog of schema {}", self.schema))?;

        let mut catalog = Catalog::new();
        for (table, pk) in rows {
            // Composite keys: keep the leading column
            catalog.entry(table).or_insert(pk);
        }
        Ok(catalog)
    }

    fn execute(&mut self, statements: &[String]) -> Result<(), LoadError> {
        for stmt in statements {
            SHARED_RUNTIME
                .handle()
                .block_on(sqlx::raw_sql(stmt).execute(&mut self.conn))
                .store_context(|| format!("executing: {stmt}"))?;
        }
        Ok(())
    }

    fn upsert(&mut self, batch: &UpsertBatch<'_>) -> Result<u64, LoadError> {
        let width = batch.columns.len().max(1);
        let chunk_rows = (MAX_BIND_PARAMS / width).max(1);
        let head = sql::insert_head(&self.schema, batch.table, batch.columns);
        let tail = sql::conflict_clause(batch.primary_key, batch.columns);

        let mut affected = 0;
        for chunk in batch.rows.chunks(chunk_rows) {
            let mut qb: QueryBuilder<Postgres> = QueryBuilder::new(&head);
            qb.push_values(chunk, |mut b, row| {
                for (value, ty) in row.iter().zip(batch.types) {
                    match Param::new(value, *ty) {
                        Param::Int(v) => b.push_bind(v),
                        Param::Float(v) => b.push_bind(v),
                        Param::Bool(v) => b.push_bind(v),
                        Param::Text(v) => b.push_bind(v),
                    };
                }
            });
            qb.push(&tail);

            let result = SHARED_RUNTIME
                .handle()
                .block_on(qb.build().execute(&mut self.conn))
                .store_context(|| format!("upserting {} rows into {}", chunk.len(), batch.table))?;
            affected += result.rows_affected();
        }
        Ok(affected)
    }
}
