//! Nested JSON records → dot-path columns

use std::collections::HashMap;

use serde_json::{Map, Value as Json};
use statline_core::{FlatTable, Value};

/// Flatten records into one table.
///
/// Nested objects become dot-joined paths (`country.id`), arrays stay as
/// their JSON text, and columns appear in first-seen order. Records that
/// are not objects are skipped.
pub fn flatten_records(records: &[Json]) -> FlatTable {
    let mut columns: Vec<String> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(records.len());
    let mut skipped = 0usize;

    for record in records {
        let Json::Object(obj) = record else {
            skipped += 1;
            continue;
        };
        let mut cells = Vec::new();
        flatten_object(obj, "", &mut cells);

        let mut row = vec![Value::Null; columns.len()];
        for (path, value) in cells {
            let idx = *index.entry(path).or_insert_with_key(|k| {
                columns.push(k.clone());
                columns.len() - 1
            });
            if idx >= row.len() {
                row.resize(idx + 1, Value::Null);
            }
            row[idx] = value;
        }
        rows.push(row);
    }

    if skipped > 0 {
        log::warn!(target: "transform", "skipped {skipped} non-object records");
    }
    FlatTable::from_rows(columns, rows)
}

fn flatten_object(obj: &Map<String, Json>, prefix: &str, out: &mut Vec<(String, Value)>) {
    for (key, value) in obj {
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}.{key}")
        };
        match value {
            Json::Object(inner) if !inner.is_empty() => flatten_object(inner, &path, out),
            Json::Object(_) => out.push((path, Value::Null)),
            other => out.push((path, Value::from_json(other))),
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn nested_keys_become_dot_paths() {
        let t = flatten_records(&[json!({
            "indicator": {"id": "NY.GDP.PCAP.CD", "value": "GDP per capita"},
            "country": {"id": "CN", "value": "China"},
            "countryiso3code": "CHN",
            "date": "2022",
            "value": 12720.2
        })]);
        assert_eq!(
            t.columns(),
            &[
                "indicator.id",
                "indicator.value",
                "country.id",
                "country.value",
                "countryiso3code",
                "date",
                "value"
            ]
        );
        assert_eq!(t.get(0, "value"), Some(&Value::Float(12720.2)));
    }

    #[test]
    fn columns_union_in_first_seen_order() {
        let t = flatten_records(&[json!({"a": 1}), json!({"b": 2, "a": 3})]);
        assert_eq!(t.columns(), &["a", "b"]);
        assert_eq!(t.rows()[0], vec![Value::Int(1), Value::Null]);
        assert_eq!(t.rows()[1], vec![Value::Int(3), Value::Int(2)]);
    }

    #[test]
    fn deep_nesting() {
        let t = flatten_records(&[json!({"country": {"region": {"id": "EAS"}}})]);
        assert_eq!(t.columns(), &["country.region.id"]);
    }

    #[test]
    fn arrays_kept_as_json_text() {
        let t = flatten_records(&[json!({"topics": [{"id": "3", "value": "Economy"}]})]);
        assert_eq!(
            t.get(0, "topics"),
            Some(&Value::from(r#"[{"id":"3","value":"Economy"}]"#))
        );
    }

    #[test]
    fn non_object_records_skipped() {
        let t = flatten_records(&[json!(1), json!({"a": "x"}), json!(null)]);
        assert_eq!(t.len(), 1);
    }

    #[test]
    fn empty_input() {
        let t = flatten_records(&[]);
        assert!(t.is_empty());
        assert!(t.columns().is_empty());
    }
}
