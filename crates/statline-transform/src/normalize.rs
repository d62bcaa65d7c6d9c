//! Fact and reference table projection
//!
//! `normalize(raw, None)` produces the fact table; `normalize(raw, Some(p))`
//! produces the reference table for entity `p`. Reference tables are
//! deduplicated, renamed to snake_case, and have missing cells replaced by
//! [`SENTINEL`]. The fact table keeps its nulls.

use statline_core::{FlatTable, Value};

use crate::naming::to_snake;

const STAGE: &str = "transform";

/// Marker stored in reference-table cells whose source value was missing.
pub const SENTINEL: &str = "N/F";

/// Prefixes whose reference table is the entity's own top-level columns.
pub const WHITELISTED_PREFIXES: &[&str] = &["country", "indicator"];

/// Columns never carried into whitelisted reference tables.
const EXCLUDED_COLUMNS: &[&str] = &["topics"];

/// Fact table columns, as raw paths, in output order.
pub const FACT_COLUMNS: &[&str] = &[
    "country.id",
    "indicator.id",
    "date",
    "value",
    "obs_status",
    "unit",
];

const ISO3_COLUMN: &str = "countryiso3code";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("no columns match key prefix '{prefix}'")]
pub struct SchemaMismatch {
    pub prefix: String,
}

/// Project a flattened table into the fact table (`None`) or a reference
/// table keyed by `prefix`.
pub fn normalize(raw: &FlatTable, prefix: Option<&str>) -> Result<FlatTable, SchemaMismatch> {
    let table = match prefix {
        None => fact_table(raw)?,
        Some(p) if WHITELISTED_PREFIXES.contains(&p) => {
            let columns: Vec<&str> = raw
                .columns()
                .iter()
                .map(String::as_str)
                .filter(|c| keeps_entity_column(c, p))
                .collect();
            reference_table(raw, &columns, p)?
        }
        Some(p) => {
            let dotted = format!("{p}.");
            let columns: Vec<&str> = raw
                .columns()
                .iter()
                .map(String::as_str)
                .filter(|c| c.starts_with(&dotted))
                .collect();
            reference_table(raw, &columns, p)?
        }
    };

    log::debug!(
        target: STAGE,
        "{}: {} rows, columns {:?}",
        prefix.unwrap_or("fact"),
        table.len(),
        table.columns()
    );
    Ok(table)
}

/// Reference table from an explicit column list. Listed columns absent
/// from `raw` are ignored; if none are present this is a schema mismatch.
pub fn select_reference(raw: &FlatTable, columns: &[&str]) -> Result<FlatTable, SchemaMismatch> {
    let present: Vec<&str> = columns
        .iter()
        .copied()
        .filter(|c| raw.column_index(c).is_some())
        .collect();
    reference_table(raw, &present, &columns.join(","))
}

/// Top-level scalars, `X.id` identifiers of nested entities, and the
/// prefix's own direct fields. Deeper paths and excluded columns drop.
fn keeps_entity_column(column: &str, prefix: &str) -> bool {
    if EXCLUDED_COLUMNS.contains(&column) {
        return false;
    }
    match column.split_once('.') {
        None => true,
        Some((head, rest)) if head == prefix => !rest.contains('.'),
        Some((_, rest)) => rest == "id",
    }
}

fn reference_table(
    raw: &FlatTable,
    columns: &[&str],
    label: &str,
) -> Result<FlatTable, SchemaMismatch> {
    if columns.is_empty() {
        return Err(SchemaMismatch {
            prefix: label.to_string(),
        });
    }
    let mut table = raw.select(columns);
    table.dedup();
    table.rename_columns(to_snake);
    table.map_values(|v| {
        if v.is_missing() {
            Value::from(SENTINEL)
        } else {
            v
        }
    });
    Ok(table)
}

fn fact_table(raw: &FlatTable) -> Result<FlatTable, SchemaMismatch> {
    if !FACT_COLUMNS.iter().any(|c| raw.column_index(c).is_some()) {
        return Err(SchemaMismatch {
            prefix: "<fact>".to_string(),
        });
    }

    let mut table = raw.select(FACT_COLUMNS);
    // The API's `country.id` is ISO2; prefer the record's ISO3 code when
    // it carries one so the fact joins the country table on its key.
    if let Some(iso3) = raw.column_index(ISO3_COLUMN) {
        let (columns, mut rows) = table.into_parts();
        for (row, source) in rows.iter_mut().zip(raw.rows()) {
            let code = &source[iso3];
            if !code.is_null() {
                row[0] = code.clone();
            }
        }
        table = FlatTable::from_rows(columns, rows);
    }

    table.dedup();
    table.rename_columns(to_snake);
    Ok(table)
}
