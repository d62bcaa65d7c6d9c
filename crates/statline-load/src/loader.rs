//! Schema-inferring loader
//!
//! Creates a table from the shape of the first data it sees, then upserts
//! by primary key. Existing tables are never altered.

use std::collections::HashMap;

use statline_core::{FlatTable, Value, fmt_num};

use crate::error::LoadError;
use crate::relations::{NamingConventionPolicy, RelationshipPolicy};
use crate::schema::{Catalog, PrimaryKey, infer_schema};
use crate::sql;
use crate::store::{Store, UpsertBatch};

const STAGE: &str = "load";

/// Outcome of loading one table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadReport {
    pub table: String,
    /// Whether this call created the table
    pub created: bool,
    /// Rows sent after primary-key deduplication
    pub rows: usize,
    /// Rows the store reported as inserted or updated
    pub affected: u64,
}

pub struct Loader<S> {
    store: S,
    policy: Box<dyn RelationshipPolicy>,
}

impl<S: Store> Loader<S> {
    /// Loader with the naming-convention key policy.
    pub fn new(store: S) -> Self {
        Self::with_policy(store, Box::new(NamingConventionPolicy))
    }

    pub fn with_policy(store: S, policy: Box<dyn RelationshipPolicy>) -> Self {
        Self { store, policy }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Base tables in the target schema with their primary key column.
    pub fn list_existing_tables(&mut self) -> Result<Catalog, LoadError> {
        let catalog = self.store.catalog()?;
        log::debug!(
            target: STAGE,
            "schema {} has {} tables: {:?}",
            self.store.schema(),
            catalog.len(),
            catalog
        );
        Ok(catalog)
    }

    /// Create `name` from the shape of `table` unless it already exists.
    /// Returns whether a table was created.
    pub fn ensure_table(&mut self, name: &str, table: &FlatTable) -> Result<bool, LoadError> {
        if table.columns().is_empty() {
            return Err(LoadError::EmptyTable {
                table: name.to_string(),
            });
        }

        let catalog = self.list_existing_tables()?;
        if catalog.contains_key(name) {
            log::debug!(target: STAGE, "table {name} exists, leaving schema unchanged");
            return Ok(false);
        }

        let schema = infer_schema(name, table, &catalog, self.policy.as_ref());
        match &schema.primary_key {
            PrimaryKey::Natural(pk) => log::info!(target: STAGE, "{name}: primary key {pk}"),
            PrimaryKey::Surrogate => {
                log::info!(target: STAGE, "{name}: no natural key, adding surrogate id")
            }
        }
        for fk in &schema.foreign_keys {
            log::info!(
                target: STAGE,
                "{name}.{} references {}.{}",
                fk.column,
                fk.references.table,
                fk.references.column
            );
        }

        let statements = sql::create_table(self.store.dialect(), self.store.schema(), &schema);
        self.store.execute(&statements)?;
        log::info!(target: STAGE, "created table {name}");
        Ok(true)
    }

    /// Insert new rows and update existing ones by primary key, creating
    /// the table first if needed.
    pub fn upsert(&mut self, name: &str, table: &FlatTable) -> Result<LoadReport, LoadError> {
        let created = self.ensure_table(name, table)?;
        let catalog = self.list_existing_tables()?;
        let pk = catalog
            .get(name)
            .cloned()
            .ok_or_else(|| LoadError::MissingPrimaryKey {
                table: name.to_string(),
            })?;

        let rows = match table.column_index(&pk) {
            Some(idx) => dedup_by_key(table.rows(), idx),
            None => table.rows().iter().collect(),
        };
        if rows.len() < table.len() {
            log::debug!(
                target: STAGE,
                "{name}: {} rows share a primary key with a later row",
                table.len() - rows.len()
            );
        }
        let rows: Vec<Vec<Value>> = rows.into_iter().cloned().collect();
        let types = table.column_types();

        let affected = if rows.is_empty() {
            0
        } else {
            self.store.upsert(&UpsertBatch {
                table: name,
                columns: table.columns(),
                types: &types,
                primary_key: &pk,
                rows: &rows,
            })?
        };

        log::info!(
            target: STAGE,
            "{name}: upserted {} rows ({} affected)",
            fmt_num(rows.len()),
            fmt_num(affected as usize)
        );
        Ok(LoadReport {
            table: name.to_string(),
            created,
            rows: rows.len(),
            affected,
        })
    }
}

/// Keep the last row for each key value, in order of that last occurrence.
fn dedup_by_key(rows: &[Vec<Value>], key: usize) -> Vec<&Vec<Value>> {
    let mut last: HashMap<&Value, usize> = HashMap::with_capacity(rows.len());
    for (i, row) in rows.iter().enumerate() {
        last.insert(&row[key], i);
    }
    rows.iter()
        .enumerate()
        .filter(|(i, row)| last.get(&row[key]) == Some(i))
        .map(|(_, row)| row)
        .collect()
}
