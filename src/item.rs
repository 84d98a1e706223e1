//! Items handed to agents

use crate::dataset::{render_value, Row, RowView};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One item prepared for evaluation: the projected inputs plus the full row
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewItem {
    /// Projected input fields in declared order
    pub inputs: Vec<(String, Value)>,
    /// Image references
    #[serde(default)]
    pub images: Vec<String>,
    /// The complete row, available to context resolvers
    #[serde(default)]
    pub row: Row,
}

impl ReviewItem {
    /// Create an item from input pairs
    pub fn new<I, K>(inputs: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        let inputs: Vec<(String, Value)> = inputs.into_iter().map(|(k, v)| (k.into(), v)).collect();
        let row = inputs.iter().cloned().collect();
        Self {
            inputs,
            images: Vec::new(),
            row,
        }
    }

    /// Project a dataset row onto input and image columns.
    ///
    /// Absent cells project to null. Image cells may hold a string or a list of strings.
    pub fn from_row(row: &RowView<'_>, inputs: &[String], image_inputs: &[String]) -> Self {
        let map = row.as_map();
        let inputs = inputs
            .iter()
            .map(|column| (column.clone(), map.get(column).cloned().unwrap_or(Value::Null)))
            .collect();

        let mut images = Vec::new();
        for column in image_inputs {
            match map.get(column) {
                Some(Value::String(s)) if !s.is_empty() => images.push(s.clone()),
                Some(Value::Array(items)) => images.extend(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .map(str::to_string),
                ),
                _ => {}
            }
        }

        Self {
            inputs,
            images,
            row: map.clone(),
        }
    }

    /// Attach image references
    pub fn with_images(mut self, images: Vec<String>) -> Self {
        self.images = images;
        self
    }

    /// Inputs rendered as `column: value` lines
    pub fn text(&self) -> String {
        self.inputs
            .iter()
            .map(|(column, value)| format!("{}: {}", column, render_value(value)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}
