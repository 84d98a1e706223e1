//! Tabular item storage shared by all rounds of a workflow
//!
//! A [`Dataset`] is an ordered list of rows plus an ordered list of column
//! names. Row identity is the row's position. Workflows only ever append
//! columns; rows are added by the caller before a run and never removed.

use crate::error::{Error, Result};
use crate::types::RowIndex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One item under review: column name to value
pub type Row = Map<String, Value>;

/// Table of items with a growing set of named columns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Row>,
}

impl Dataset {
    /// Create an empty dataset with the given original columns
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut dataset = Self::default();
        for column in columns {
            dataset.register_column(column.into());
        }
        dataset
    }

    /// Build a dataset from JSON records.
    ///
    /// Columns are ordered by the row that first introduces them. Keys within
    /// one record follow `serde_json::Map` order, which is alphabetical.
    pub fn from_records(records: impl IntoIterator<Item = Row>) -> Self {
        let mut dataset = Self::default();
        for record in records {
            dataset.push_row(record);
        }
        dataset
    }

    /// Parse a JSON array of objects
    pub fn from_json(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        let Value::Array(items) = value else {
            return Err(Error::config("dataset JSON must be an array of objects"));
        };

        let mut records = Vec::with_capacity(items.len());
        for (index, item) in items.into_iter().enumerate() {
            match item {
                Value::Object(map) => records.push(map),
                other => {
                    return Err(Error::config(format!(
                        "dataset record {} is not an object: {}",
                        index, other
                    )))
                }
            }
        }
        Ok(Self::from_records(records))
    }

    /// Append a row, registering any columns it introduces
    pub fn push_row(&mut self, row: Row) -> RowIndex {
        for key in row.keys() {
            if !self.has_column(key) {
                self.columns.push(key.clone());
            }
        }
        self.rows.push(row);
        self.rows.len() - 1
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the dataset has no rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Column names in registration order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Whether a column is registered
    pub fn has_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Read-only view of one row
    pub fn row(&self, index: RowIndex) -> Option<RowView<'_>> {
        self.rows.get(index).map(|row| RowView { index, row })
    }

    /// Iterate over all rows as read-only views
    pub fn iter(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows
            .iter()
            .enumerate()
            .map(|(index, row)| RowView { index, row })
    }

    /// Value of one cell, `None` when the row or the cell is absent
    pub fn get(&self, index: RowIndex, column: &str) -> Option<&Value> {
        self.rows.get(index).and_then(|row| row.get(column))
    }

    /// All cells of one column, `None` for rows that never received a value
    pub fn column_values(&self, column: &str) -> Vec<Option<&Value>> {
        self.rows.iter().map(|row| row.get(column)).collect()
    }

    /// Register a column without writing any cell. Idempotent.
    pub(crate) fn register_column(&mut self, column: String) {
        if !self.has_column(&column) {
            self.columns.push(column);
        }
    }

    /// Write one cell, overwriting any previous value
    pub(crate) fn set(&mut self, index: RowIndex, column: &str, value: Value) {
        if let Some(row) = self.rows.get_mut(index) {
            row.insert(column.to_string(), value);
        }
    }

    /// Drop the named columns, cells included. Returns the number of columns removed.
    pub(crate) fn remove_columns(&mut self, names: &[String]) -> usize {
        let before = self.columns.len();
        self.columns.retain(|c| !names.contains(c));
        let removed = before - self.columns.len();
        if removed > 0 {
            for row in &mut self.rows {
                row.retain(|key, _| !names.contains(key));
            }
        }
        removed
    }

    /// Export rows as JSON records
    pub fn to_records(&self) -> Vec<Row> {
        self.rows.clone()
    }

    /// Serialize rows as a JSON array, keys ordered as in the row maps
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.rows)?)
    }
}

/// Read-only view over one row, handed to filters and payload builders
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    index: RowIndex,
    row: &'a Row,
}

impl<'a> RowView<'a> {
    /// Stable index of this row
    pub fn index(&self) -> RowIndex {
        self.index
    }

    /// Raw value of a column; absent cells and explicit nulls both read as `None`
    pub fn get(&self, column: &str) -> Option<&'a Value> {
        self.row.get(column).filter(|v| !v.is_null())
    }

    /// Whether the row carries a cell for the column (possibly null)
    pub fn contains(&self, column: &str) -> bool {
        self.row.contains_key(column)
    }

    /// Column as a string slice
    pub fn get_str(&self, column: &str) -> Option<&'a str> {
        self.get(column).and_then(Value::as_str)
    }

    /// Column as a float. Numeric strings are accepted.
    pub fn get_f64(&self, column: &str) -> Option<f64> {
        match self.get(column)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Column as an integer
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(Value::as_i64)
    }

    /// Column as a boolean
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(Value::as_bool)
    }

    /// The underlying map
    pub fn as_map(&self) -> &'a Row {
        self.row
    }
}

/// Render a cell for inclusion in prompt text
pub(crate) fn render_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items
            .iter()
            .map(render_value)
            .collect::<Vec<_>>()
            .join("; "),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Dataset {
        Dataset::from_json(
            r#"[
                {"title": "Deep learning for triage", "abstract": "We study...", "year": 2021},
                {"title": "Sepsis prediction", "abstract": "A cohort...", "keywords": ["icu", "ml"]}
            ]"#,
        )
        .unwrap()
    }

    #[test]
    fn test_columns_in_first_seen_order() {
        let ds = sample();
        assert_eq!(ds.len(), 2);
        let cols: Vec<_> = ds.columns().iter().map(String::as_str).collect();
        assert!(cols.contains(&"title"));
        assert!(cols.contains(&"keywords"));
        assert_eq!(cols.last(), Some(&"keywords"));
    }

    #[test]
    fn test_from_json_rejects_non_objects() {
        assert!(Dataset::from_json(r#"[1, 2]"#).is_err());
        assert!(Dataset::from_json(r#"{"title": "x"}"#).is_err());
    }

    #[test]
    fn test_row_view_accessors() {
        let mut ds = sample();
        ds.register_column("score".into());
        ds.set(0, "score", json!("4"));
        ds.set(1, "score", Value::Null);

        let row = ds.row(0).unwrap();
        assert_eq!(row.get_str("title"), Some("Deep learning for triage"));
        assert_eq!(row.get_i64("year"), Some(2021));
        assert_eq!(row.get_f64("score"), Some(4.0));

        let row = ds.row(1).unwrap();
        assert!(row.contains("score"));
        assert!(row.get("score").is_none());
        assert!(!row.contains("year"));
    }

    #[test]
    fn test_remove_columns() {
        let mut ds = sample();
        for col in ["round-A_X_score", "round-A_X_output", "round-A_notes"] {
            ds.register_column(col.into());
            ds.set(0, col, json!(1));
        }

        let removed = ds.remove_columns(&[
            "round-A_X_score".to_string(),
            "round-A_X_output".to_string(),
            "round-A_Y_score".to_string(),
        ]);
        assert_eq!(removed, 2);
        assert!(!ds.has_column("round-A_X_score"));
        assert!(ds.get(0, "round-A_X_output").is_none());
        assert!(ds.has_column("round-A_notes"));
        assert_eq!(ds.get(0, "round-A_notes"), Some(&json!(1)));
    }

    #[test]
    fn test_render_value() {
        assert_eq!(render_value(&json!(["a", "b"])), "a; b");
        assert_eq!(render_value(&json!(3)), "3");
        assert_eq!(render_value(&Value::Null), "");
    }
}
