//! Flat relational table model
//!
//! A [`FlatTable`] is an ordered list of named columns plus row-major
//! scalar cells. It is produced by the normalizer from nested JSON records
//! and consumed by the loader, which infers storage types from the cells.

use std::collections::HashSet;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A scalar cell value.
#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl Value {
    /// Convert a JSON value into a cell.
    ///
    /// Arrays and objects that reach this point (e.g. multi-valued fields)
    /// are kept as their compact JSON text.
    pub fn from_json(v: &serde_json::Value) -> Self {
        match v {
            serde_json::Value::Null => Self::Null,
            serde_json::Value::Bool(b) => Self::Bool(*b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Self::Int(i),
                None => n.as_f64().map_or(Self::Null, Self::Float),
            },
            serde_json::Value::String(s) => Self::Text(s.clone()),
            other => Self::Text(other.to_string()),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Null or empty string.
    pub fn is_missing(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Runtime type of a non-null cell.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Self::Null => None,
            Self::Bool(_) => Some(ColumnType::Boolean),
            Self::Int(_) => Some(ColumnType::Integer),
            Self::Float(_) => Some(ColumnType::Float),
            Self::Text(_) => Some(ColumnType::Text),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Null, Self::Null) => true,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Int(a), Self::Int(b)) => a == b,
            // Bitwise so that Eq and Hash agree (NaN == NaN here)
            (Self::Float(a), Self::Float(b)) => a.to_bits() == b.to_bits(),
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Value {}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Self::Null => {}
            Self::Bool(b) => b.hash(state),
            Self::Int(i) => i.hash(state),
            Self::Float(f) => f.to_bits().hash(state),
            Self::Text(s) => s.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s}"),
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<f64> for Value {
    fn from(x: f64) -> Self {
        Self::Float(x)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

/// Inferred scalar type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnType {
    Integer,
    Float,
    Boolean,
    Text,
}

impl ColumnType {
    /// Widen two observed types into one that holds both.
    ///
    /// Integer + Float = Float; any other mix = Text.
    pub fn merge(self, other: Self) -> Self {
        use ColumnType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Integer, Float) | (Float, Integer) => Float,
            _ => Text,
        }
    }

    /// Infer the type of a column from its cells. All-null columns are Text.
    pub fn infer<'a>(values: impl IntoIterator<Item = &'a Value>) -> Self {
        values
            .into_iter()
            .filter_map(Value::column_type)
            .reduce(Self::merge)
            .unwrap_or(Self::Text)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Boolean => write!(f, "boolean"),
            Self::Text => write!(f, "text"),
        }
    }
}

/// Named columns plus row-ordered cells. Every row has one cell per column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlatTable {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl FlatTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Build a table from columns and rows, padding short rows with nulls
    /// and truncating long ones.
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        let mut table = Self::new(columns);
        for row in rows {
            table.push_row(row);
        }
        table
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn into_parts(self) -> (Vec<String>, Vec<Vec<Value>>) {
        (self.columns, self.rows)
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Null);
        self.rows.push(row);
    }

    /// Cell lookup by row index and column name.
    pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.rows.get(row).map(|r| &r[idx])
    }

    /// Cells of one column, in row order.
    pub fn column_values(&self, idx: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |r| &r[idx])
    }

    /// Inferred type of the column at `idx`.
    pub fn column_type(&self, idx: usize) -> ColumnType {
        ColumnType::infer(self.column_values(idx))
    }

    /// Inferred types of all columns, in column order.
    pub fn column_types(&self) -> Vec<ColumnType> {
        (0..self.columns.len()).map(|i| self.column_type(i)).collect()
    }

    /// Project onto `columns`. Columns absent from this table become all-null.
    pub fn select<S: AsRef<str>>(&self, columns: &[S]) -> Self {
        let indices: Vec<Option<usize>> = columns
            .iter()
            .map(|c| self.column_index(c.as_ref()))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|idx| idx.map_or(Value::Null, |i| row[i].clone()))
                    .collect()
            })
            .collect();
        Self {
            columns: columns.iter().map(|c| c.as_ref().to_string()).collect(),
            rows,
        }
    }

    /// Keep rows whose cell in `column` satisfies `keep`.
    /// A missing column is treated as all-null.
    pub fn filter_rows(&self, column: &str, keep: impl Fn(&Value) -> bool) -> Self {
        let idx = self.column_index(column);
        let rows = self
            .rows
            .iter()
            .filter(|row| match idx {
                Some(i) => keep(&row[i]),
                None => keep(&Value::Null),
            })
            .cloned()
            .collect();
        Self {
            columns: self.columns.clone(),
            rows,
        }
    }

    /// Drop repeated rows, keeping the first occurrence of each.
    pub fn dedup(&mut self) {
        let mut seen: HashSet<Vec<Value>> = HashSet::with_capacity(self.rows.len());
        self.rows.retain(|row| seen.insert(row.clone()));
    }

    pub fn rename_columns(&mut self, rename: impl Fn(&str) -> String) {
        for col in &mut self.columns {
            *col = rename(col);
        }
    }

    /// Replace every cell in place.
    pub fn map_values(&mut self, f: impl Fn(Value) -> Value) {
        for row in &mut self.rows {
            for cell in row.iter_mut() {
                *cell = f(std::mem::replace(cell, Value::Null));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> FlatTable {
        FlatTable::from_rows(
            vec!["id".into(), "name".into(), "score".into()],
            vec![
                vec!["a".into(), "Alpha".into(), Value::Int(1)],
                vec!["b".into(), "".into(), Value::Float(2.5)],
                vec!["a".into(), "Alpha".into(), Value::Int(1)],
            ],
        )
    }

    #[test]
    fn from_json_scalars() {
        assert_eq!(Value::from_json(&serde_json::json!(null)), Value::Null);
        assert_eq!(Value::from_json(&serde_json::json!(3)), Value::Int(3));
        assert_eq!(Value::from_json(&serde_json::json!(3.5)), Value::Float(3.5));
        assert_eq!(Value::from_json(&serde_json::json!(true)), Value::Bool(true));
        assert_eq!(Value::from_json(&serde_json::json!("x")), Value::from("x"));
    }

    #[test]
    fn from_json_array_kept_as_text() {
        let v = Value::from_json(&serde_json::json!([{"id": "1"}]));
        assert_eq!(v, Value::from(r#"[{"id":"1"}]"#));
    }

    #[test]
    fn missing_includes_empty_string() {
        assert!(Value::Null.is_missing());
        assert!(Value::from("").is_missing());
        assert!(!Value::from("N/F").is_missing());
        assert!(!Value::Int(0).is_missing());
    }

    #[test]
    fn infer_widening() {
        use ColumnType::*;
        assert_eq!(ColumnType::infer(&[Value::Int(1), Value::Null]), Integer);
        assert_eq!(ColumnType::infer(&[Value::Int(1), Value::Float(1.5)]), Float);
        assert_eq!(ColumnType::infer(&[Value::Bool(true)]), Boolean);
        assert_eq!(ColumnType::infer(&[Value::Int(1), Value::from("x")]), Text);
        assert_eq!(ColumnType::infer(&[Value::Null, Value::Null]), Text);
        assert_eq!(ColumnType::infer(std::iter::empty()), Text);
    }

    #[test]
    fn column_types_of_table() {
        use ColumnType::*;
        assert_eq!(table().column_types(), vec![Text, Text, Float]);
    }

    #[test]
    fn push_row_pads_short_rows() {
        let mut t = FlatTable::new(vec!["a".into(), "b".into()]);
        t.push_row(vec![Value::Int(1)]);
        assert_eq!(t.rows()[0], vec![Value::Int(1), Value::Null]);
    }

    #[test]
    fn select_fills_absent_columns_with_null() {
        let t = table().select(&["name", "unit"]);
        assert_eq!(t.columns(), &["name".to_string(), "unit".to_string()]);
        assert_eq!(t.rows()[0], vec![Value::from("Alpha"), Value::Null]);
    }

    #[test]
    fn dedup_keeps_first_occurrence() {
        let mut t = table();
        t.dedup();
        assert_eq!(t.len(), 2);
        assert_eq!(t.get(0, "id"), Some(&Value::from("a")));
        assert_eq!(t.get(1, "id"), Some(&Value::from("b")));
    }

    #[test]
    fn filter_rows_by_predicate() {
        let t = table().filter_rows("name", |v| !v.is_missing());
        assert_eq!(t.len(), 2);
        let none = table().filter_rows("absent", |v| !v.is_null());
        assert!(none.is_empty());
    }

    #[test]
    fn map_values_replaces_cells() {
        let mut t = table();
        t.map_values(|v| if v.is_missing() { "N/F".into() } else { v });
        assert_eq!(t.get(1, "name"), Some(&Value::from("N/F")));
    }

    #[test]
    fn float_equality_is_bitwise() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_ne!(Value::Float(1.0), Value::Int(1));
    }
}
