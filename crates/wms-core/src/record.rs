//! # Records
//!
//! A report row paired with its column labels, ready to be written.
//!
//! ## Cell Normalization
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  CSV cell            FieldValue                                         │
//! │  ─────────────       ─────────────                                      │
//! │  "PAL-0042"     ──►  Text("PAL-0042")                                   │
//! │  ""  /  "   "   ──►  Null                                               │
//! │  computed f64   ──►  Real(72.0)     (e.g. base-unit quantity)           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};

/// A single column value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Text(String),
    Real(f64),
}

impl FieldValue {
    /// Whitespace-only cells become `Null`; everything else is kept verbatim.
    pub fn from_cell(cell: impl Into<String>) -> Self {
        let cell = cell.into();
        if cell.trim().is_empty() {
            FieldValue::Null
        } else {
            FieldValue::Text(cell)
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null)
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        FieldValue::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::from_cell(value)
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::from_cell(value)
    }
}

/// Ordered `(column, value)` pairs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Record {
    columns: Vec<String>,
    values: Vec<FieldValue>,
}

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zips labels with cells. Missing cells become `Null`, extra cells are
    /// dropped.
    pub fn from_row<S: AsRef<str>>(labels: &[S], row: Vec<String>) -> Self {
        let mut cells = row.into_iter();
        let mut record = Record::new();
        for label in labels {
            let value = cells
                .next()
                .map(FieldValue::from_cell)
                .unwrap_or(FieldValue::Null);
            record.push(label.as_ref(), value);
        }
        record
    }

    /// Appends a column, or replaces the value if the column already exists.
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<FieldValue>) {
        let column = column.into();
        let value = value.into();
        match self.columns.iter().position(|c| *c == column) {
            Some(idx) => self.values[idx] = value,
            None => {
                self.columns.push(column);
                self.values.push(value);
            }
        }
    }

    pub fn get(&self, column: &str) -> Option<&FieldValue> {
        self.columns
            .iter()
            .position(|c| c == column)
            .map(|idx| &self.values[idx])
    }

    /// Text value of `column`, if present and not null.
    pub fn text(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(FieldValue::as_text)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[FieldValue] {
        &self.values
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_row_pads_and_truncates() {
        let labels = ["Item code", "Pallet number", "Cases"];
        let record = Record::from_row(&labels, vec!["W1".into(), "  ".into()]);
        assert_eq!(record.len(), 3);
        assert_eq!(record.text("Item code"), Some("W1"));
        assert!(record.get("Pallet number").unwrap().is_null());
        assert!(record.get("Cases").unwrap().is_null());

        let record = Record::from_row(&labels[..1], vec!["W1".into(), "extra".into()]);
        assert_eq!(record.len(), 1);
    }

    #[test]
    fn test_push_replaces_existing_column() {
        let mut record = Record::new();
        record.push("Qty", "3");
        record.push("Base qty", 72.0);
        record.push("Qty", "4");
        assert_eq!(record.columns(), &["Qty".to_string(), "Base qty".to_string()]);
        assert_eq!(record.text("Qty"), Some("4"));
        assert_eq!(record.get("Base qty"), Some(&FieldValue::Real(72.0)));
    }
}
