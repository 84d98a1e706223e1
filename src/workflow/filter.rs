//! Row eligibility predicates

use crate::dataset::RowView;
use crate::shape::values_equal;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Decides whether a row takes part in a round
pub trait RowFilter: Send + Sync {
    /// Whether the row is eligible
    fn eligible(&self, row: &RowView<'_>) -> bool;

    /// Columns the predicate reads, when known. Used for schema validation.
    fn columns(&self) -> Vec<String> {
        Vec::new()
    }
}

impl<F> RowFilter for F
where
    F: Fn(&RowView<'_>) -> bool + Send + Sync,
{
    fn eligible(&self, row: &RowView<'_>) -> bool {
        self(row)
    }
}

/// Declarative filters usable from workflow files
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterConfig {
    /// Every row
    All,
    /// Column equals a value
    ColumnEquals {
        /// Column read
        column: String,
        /// Expected value
        value: Value,
    },
    /// Column differs from a value
    ColumnNotEquals {
        /// Column read
        column: String,
        /// Rejected value
        value: Value,
    },
    /// Two columns hold different values
    ColumnsDiffer {
        /// First column
        left: String,
        /// Second column
        right: String,
    },
    /// Numeric column is at least `threshold`
    ColumnAtLeast {
        /// Column read
        column: String,
        /// Inclusive lower bound
        threshold: f64,
    },
    /// Numeric column is at most `threshold`
    ColumnAtMost {
        /// Column read
        column: String,
        /// Inclusive upper bound
        threshold: f64,
    },
    /// Column holds a non-null value
    NotNull {
        /// Column read
        column: String,
    },
    /// Every nested filter matches
    AllOf {
        /// Nested filters
        filters: Vec<FilterConfig>,
    },
    /// At least one nested filter matches
    AnyOf {
        /// Nested filters
        filters: Vec<FilterConfig>,
    },
}

fn same(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => values_equal(a, b),
        (None, None) => true,
        _ => false,
    }
}

impl RowFilter for FilterConfig {
    fn eligible(&self, row: &RowView<'_>) -> bool {
        match self {
            FilterConfig::All => true,
            FilterConfig::ColumnEquals { column, value } => same(row.get(column), Some(value)),
            FilterConfig::ColumnNotEquals { column, value } => !same(row.get(column), Some(value)),
            FilterConfig::ColumnsDiffer { left, right } => !same(row.get(left), row.get(right)),
            FilterConfig::ColumnAtLeast { column, threshold } => {
                row.get_f64(column).is_some_and(|v| v >= *threshold)
            }
            FilterConfig::ColumnAtMost { column, threshold } => {
                row.get_f64(column).is_some_and(|v| v <= *threshold)
            }
            FilterConfig::NotNull { column } => row.get(column).is_some(),
            FilterConfig::AllOf { filters } => filters.iter().all(|f| f.eligible(row)),
            FilterConfig::AnyOf { filters } => filters.iter().any(|f| f.eligible(row)),
        }
    }

    fn columns(&self) -> Vec<String> {
        match self {
            FilterConfig::All => Vec::new(),
            FilterConfig::ColumnEquals { column, .. }
            | FilterConfig::ColumnNotEquals { column, .. }
            | FilterConfig::ColumnAtLeast { column, .. }
            | FilterConfig::ColumnAtMost { column, .. }
            | FilterConfig::NotNull { column } => vec![column.clone()],
            FilterConfig::ColumnsDiffer { left, right } => vec![left.clone(), right.clone()],
            FilterConfig::AllOf { filters } | FilterConfig::AnyOf { filters } => {
                filters.iter().flat_map(|f| f.columns()).collect()
            }
        }
    }
}
