//! # Frame
//!
//! An ordered column list plus rows of cells aligned to it.
//!
//! Frames hold stored tables, query results, projections and union views.
//! Row order is never changed by any operation in this crate.

use crate::schema::ID_FIELD;
use crate::{RowId, SensorNetError, Value};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Tabular rows with named columns.
///
/// Serializes as `{"columns": [...], "data": [[...], ...]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    columns: Vec<String>,
    data: Vec<Vec<Value>>,
}

impl Frame {
    /// Create an empty frame with the given columns.
    #[must_use]
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            data: Vec::new(),
        }
    }

    /// Create a frame from columns and rows, checking row widths.
    pub fn with_rows<S: Into<String>>(
        columns: impl IntoIterator<Item = S>,
        rows: Vec<Vec<Value>>,
    ) -> Result<Self, SensorNetError> {
        let mut frame = Self::new(columns);
        for row in rows {
            frame.push_row(row)?;
        }
        Ok(frame)
    }

    /// Column names in order.
    #[must_use]
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// All rows in order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.data
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the frame has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Position of a column.
    #[must_use]
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Check if a column exists.
    #[must_use]
    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Append a row. Its width must equal the column count.
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<(), SensorNetError> {
        if row.len() != self.columns.len() {
            return Err(SensorNetError::SerializationError(format!(
                "Row has {} cells, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        self.data.push(row);
        Ok(())
    }

    /// Cell at `row` in column `column`.
    #[must_use]
    pub fn value(&self, row: usize, column: &str) -> Option<&Value> {
        let idx = self.column_index(column)?;
        self.data.get(row).and_then(|r| r.get(idx))
    }

    /// Id of the row at `row`, if the frame has an `id` column.
    #[must_use]
    pub fn row_id(&self, row: usize) -> Option<RowId> {
        self.value(row, ID_FIELD).and_then(Value::as_row_id)
    }

    /// Ids of all rows, in order. Rows without a valid id are skipped.
    #[must_use]
    pub fn ids(&self) -> Vec<RowId> {
        let Some(idx) = self.column_index(ID_FIELD) else {
            return Vec::new();
        };
        self.data
            .iter()
            .filter_map(|r| r.get(idx).and_then(Value::as_row_id))
            .collect()
    }

    /// Index of the row whose id is `id`.
    #[must_use]
    pub fn position_of(&self, id: RowId) -> Option<usize> {
        let idx = self.column_index(ID_FIELD)?;
        self.data
            .iter()
            .position(|r| r.get(idx).and_then(Value::as_row_id) == Some(id))
    }

    /// Overwrite a single cell. Out-of-range coordinates are ignored.
    pub(crate) fn set(&mut self, row: usize, column: usize, value: Value) {
        if let Some(cell) = self.data.get_mut(row).and_then(|r| r.get_mut(column)) {
            *cell = value;
        }
    }

    /// Keep only rows for which `keep` returns true.
    pub(crate) fn retain_rows(&mut self, mut keep: impl FnMut(&[Value]) -> bool) {
        self.data.retain(|r| keep(r.as_slice()));
    }

    /// Copy of the frame holding only rows for which `keep` returns true.
    #[must_use]
    pub fn filter_rows(&self, mut keep: impl FnMut(&[Value]) -> bool) -> Self {
        Self {
            columns: self.columns.clone(),
            data: self.data.iter().filter(|r| keep(r.as_slice())).cloned().collect(),
        }
    }

    /// Rows as field-name to value maps.
    #[must_use]
    pub fn to_records(&self) -> Vec<BTreeMap<String, Value>> {
        self.data
            .iter()
            .map(|row| {
                self.columns
                    .iter()
                    .cloned()
                    .zip(row.iter().cloned())
                    .collect()
            })
            .collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Frame {
        Frame::with_rows(
            ["id", "name"],
            vec![
                vec![Value::Integer(0), Value::from("north")],
                vec![Value::Integer(4), Value::from("south")],
            ],
        )
        .expect("frame")
    }

    #[test]
    fn push_row_rejects_wrong_width() {
        let mut frame = Frame::new(["id", "name"]);
        let result = frame.push_row(vec![Value::Integer(0)]);
        assert!(matches!(result, Err(SensorNetError::SerializationError(_))));
        assert!(frame.is_empty());
    }

    #[test]
    fn ids_and_positions() {
        let frame = sample();
        assert_eq!(frame.ids(), vec![RowId(0), RowId(4)]);
        assert_eq!(frame.position_of(RowId(4)), Some(1));
        assert_eq!(frame.position_of(RowId(1)), None);
        assert_eq!(frame.row_id(0), Some(RowId(0)));
    }

    #[test]
    fn value_lookup_by_column_name() {
        let frame = sample();
        assert_eq!(frame.value(1, "name"), Some(&Value::from("south")));
        assert_eq!(frame.value(1, "region"), None);
        assert_eq!(frame.value(9, "name"), None);
    }

    #[test]
    fn filter_rows_keeps_order() {
        let frame = sample();
        let kept = frame.filter_rows(|_| true);
        assert_eq!(kept, frame);
        let none = frame.filter_rows(|_| false);
        assert!(none.is_empty());
        assert_eq!(none.columns(), frame.columns());
    }

    #[test]
    fn records_map_columns_to_cells() {
        let records = sample().to_records();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0]["name"], Value::from("north"));
        assert_eq!(records[1]["id"], Value::Integer(4));
    }

    #[test]
    fn serializes_split_layout() {
        let json = serde_json::to_value(sample()).expect("serialize");
        assert_eq!(json["columns"], serde_json::json!(["id", "name"]));
        assert_eq!(json["data"][1], serde_json::json!([4, "south"]));
    }
}
