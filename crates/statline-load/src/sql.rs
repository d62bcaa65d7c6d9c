//! SQL text for DDL and upserts
//!
//! Every identifier goes through [`quote_ident`]; values are always bound
//! as parameters by the store backends.

use statline_core::ColumnType;

use crate::schema::{PrimaryKey, SURROGATE_KEY, TableSchema};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dialect {
    Postgres,
    DuckDb,
}

impl Dialect {
    pub fn column_type(self, ty: ColumnType) -> &'static str {
        match (self, ty) {
            (_, ColumnType::Integer) => "BIGINT",
            (Self::Postgres, ColumnType::Float) => "NUMERIC",
            (Self::DuckDb, ColumnType::Float) => "DOUBLE",
            (_, ColumnType::Boolean) => "BOOLEAN",
            (Self::Postgres, ColumnType::Text) => "TEXT",
            (Self::DuckDb, ColumnType::Text) => "VARCHAR",
        }
    }
}

/// Double-quote an identifier, doubling embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// `"schema"."table"`
pub fn qualified(schema: &str, table: &str) -> String {
    format!("{}.{}", quote_ident(schema), quote_ident(table))
}

fn surrogate_sequence(table: &str) -> String {
    format!("{table}_{SURROGATE_KEY}_seq")
}

/// Statements creating `table` if absent, in execution order.
pub fn create_table(dialect: Dialect, schema: &str, table: &TableSchema) -> Vec<String> {
    let mut statements = Vec::new();
    let mut defs = Vec::with_capacity(table.columns.len() + table.foreign_keys.len() + 2);

    if table.primary_key == PrimaryKey::Surrogate {
        match dialect {
            Dialect::Postgres => {
                defs.push(format!("{} SERIAL PRIMARY KEY", quote_ident(SURROGATE_KEY)));
            }
            Dialect::DuckDb => {
                let seq = qualified(schema, &surrogate_sequence(&table.name));
                statements.push(format!("CREATE SEQUENCE IF NOT EXISTS {seq}"));
                defs.push(format!(
                    "{} BIGINT PRIMARY KEY DEFAULT nextval('{}')",
                    quote_ident(SURROGATE_KEY),
                    seq.replace('\'', "''")
                ));
            }
        }
    }

    for col in &table.columns {
        defs.push(format!(
            "{} {}",
            quote_ident(&col.name),
            dialect.column_type(col.ty)
        ));
    }

    if let PrimaryKey::Natural(pk) = &table.primary_key {
        defs.push(format!("PRIMARY KEY ({})", quote_ident(pk)));
    }

    for fk in &table.foreign_keys {
        defs.push(format!(
            "FOREIGN KEY ({}) REFERENCES {} ({})",
            quote_ident(&fk.column),
            qualified(schema, &fk.references.table),
            quote_ident(&fk.references.column)
        ));
    }

    statements.push(format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        qualified(schema, &table.name),
        defs.join(", ")
    ));
    statements
}

/// `INSERT INTO "s"."t" ("a", "b") `; the caller appends the VALUES list.
pub fn insert_head(schema: &str, table: &str, columns: &[String]) -> String {
    let cols: Vec<String> = columns.iter().map(|c| quote_ident(c)).collect();
    format!(
        "INSERT INTO {} ({}) ",
        qualified(schema, table),
        cols.join(", ")
    )
}

/// ` ON CONFLICT ("pk") DO UPDATE SET "a" = EXCLUDED."a", ...`, or
/// `DO NOTHING` when every column is the key.
pub fn conflict_clause(pk: &str, columns: &[String]) -> String {
    let updates: Vec<String> = columns
        .iter()
        .filter(|c| c.as_str() != pk)
        .map(|c| {
            let q = quote_ident(c);
            format!("{q} = EXCLUDED.{q}")
        })
        .collect();
    if updates.is_empty() {
        format!(" ON CONFLICT ({}) DO NOTHING", quote_ident(pk))
    } else {
        format!(
            " ON CONFLICT ({}) DO UPDATE SET {}",
            quote_ident(pk),
            updates.join(", ")
        )
    }
}

/// `(?, ?, ...)` positional placeholders for one row.
pub fn row_placeholders(width: usize) -> String {
    format!("({})", vec!["?"; width].join(", "))
}
