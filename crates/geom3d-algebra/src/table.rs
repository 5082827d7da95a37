//! Labelled tabular export of batched values.

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, Result};

/// A row-major table with labelled columns, used to hand batched values to
/// data-frame style consumers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Table {
    /// Column labels.
    pub columns: Vec<String>,
    /// Rows, each holding one value per column.
    pub rows: Vec<Vec<f64>>,
}

impl Table {
    /// Create an empty table with the given column labels.
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Create a table whose labels are `{prefix}{name}{suffix}` for each name.
    pub fn with_labels(names: &[&str], prefix: &str, suffix: &str) -> Self {
        Self::new(
            names
                .iter()
                .map(|name| format!("{prefix}{name}{suffix}"))
                .collect(),
        )
    }

    /// Append a row, which must hold exactly one value per column.
    pub fn push_row(&mut self, row: Vec<f64>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(GeometryError::ShapeMismatch {
                expected: self.columns.len(),
                actual: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// All values of the column with the given label.
    ///
    /// Returns `None` if the label is unknown or a row is too short to hold the column.
    pub fn column(&self, label: &str) -> Option<Vec<f64>> {
        let idx = self.columns.iter().position(|c| c == label)?;
        self.rows.iter().map(|row| row.get(idx).copied()).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}
