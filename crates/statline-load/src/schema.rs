//! Table schema inference

use std::collections::BTreeMap;

use statline_core::{ColumnType, FlatTable};

use crate::relations::{Reference, RelationshipPolicy};

/// Existing base tables → primary key column, sorted by table name.
pub type Catalog = BTreeMap<String, String>;

/// Name of the synthesized primary key column.
pub const SURROGATE_KEY: &str = "id";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: String,
    pub ty: ColumnType,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrimaryKey {
    /// One of the table's own columns
    Natural(String),
    /// Auto-incrementing integer `id`, prepended to the columns
    Surrogate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKey {
    pub column: String,
    pub references: Reference,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub primary_key: PrimaryKey,
    pub foreign_keys: Vec<ForeignKey>,
}

impl TableSchema {
    pub fn primary_key_column(&self) -> &str {
        match &self.primary_key {
            PrimaryKey::Natural(c) => c,
            PrimaryKey::Surrogate => SURROGATE_KEY,
        }
    }
}

/// Derive a schema for `table` from its cells and the current catalog.
pub fn infer_schema(
    name: &str,
    table: &FlatTable,
    catalog: &Catalog,
    policy: &dyn RelationshipPolicy,
) -> TableSchema {
    let columns: Vec<ColumnDef> = table
        .columns()
        .iter()
        .zip(table.column_types())
        .map(|(c, ty)| ColumnDef {
            name: c.clone(),
            ty,
        })
        .collect();

    let primary_key = match policy.primary_key(name, table.columns()) {
        Some(pk) => PrimaryKey::Natural(pk.to_string()),
        None => PrimaryKey::Surrogate,
    };

    let foreign_keys = columns
        .iter()
        .filter(|c| !matches!(&primary_key, PrimaryKey::Natural(pk) if *pk == c.name))
        .filter_map(|c| {
            policy
                .reference(name, &c.name, catalog)
                .map(|references| ForeignKey {
                    column: c.name.clone(),
                    references,
                })
        })
        .collect();

    TableSchema {
        name: name.to_string(),
        columns,
        primary_key,
        foreign_keys,
    }
}
