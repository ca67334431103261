//! # Table Store
//!
//! One in-memory [`Frame`] per level of the hierarchy, indexed by
//! [`Table::position`]. The store holds data and nothing else: validation
//! lives in the integrity and query engines.

use crate::frame::Frame;
use crate::schema::Table;
use crate::{RowId, SensorNetError, Value};

/// The four tables of the hierarchy.
///
/// The store is owned by the [`Engine`](crate::Engine) and passed by
/// reference to every component that reads or mutates it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableStore {
    tables: [Frame; 4],
}

impl Default for TableStore {
    fn default() -> Self {
        Self {
            tables: Table::ALL.map(|t| Frame::new(t.fields().iter().copied())),
        }
    }
}

impl TableStore {
    /// Create a store with four empty tables.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// All rows of a table, in stored order.
    #[must_use]
    pub fn get_all(&self, table: Table) -> &Frame {
        &self.tables[table.position()]
    }

    pub(crate) fn get_all_mut(&mut self, table: Table) -> &mut Frame {
        &mut self.tables[table.position()]
    }

    /// Check if a row with `id` is present.
    #[must_use]
    pub fn contains_id(&self, table: Table, id: RowId) -> bool {
        self.get_all(table).position_of(id).is_some()
    }

    /// Largest id currently present. `None` for an empty table.
    #[must_use]
    pub fn max_id(&self, table: Table) -> Option<RowId> {
        self.get_all(table).ids().into_iter().max()
    }

    /// Id the next insert will receive: current maximum plus one, or zero.
    ///
    /// Deleting the row holding the maximum makes its id available again.
    #[must_use]
    pub fn next_id(&self, table: Table) -> RowId {
        self.max_id(table).map_or(RowId::FIRST, RowId::next)
    }

    /// Append a row laid out in the table's field order.
    pub fn append(&mut self, table: Table, row: Vec<Value>) -> Result<(), SensorNetError> {
        self.get_all_mut(table).push_row(row)
    }

    /// Replace every row of a table.
    ///
    /// The frame's columns must equal the table's field list.
    pub fn replace_rows(&mut self, table: Table, rows: Frame) -> Result<(), SensorNetError> {
        if rows.columns().iter().map(String::as_str).ne(table.fields().iter().copied()) {
            return Err(SensorNetError::SerializationError(format!(
                "Columns [{}] do not match table {}",
                rows.columns().join(", "),
                table
            )));
        }
        self.tables[table.position()] = rows;
        Ok(())
    }

    /// Number of rows in a table.
    #[must_use]
    pub fn row_count(&self, table: Table) -> usize {
        self.get_all(table).len()
    }
}

// =============================================================================
// TESTS
// =============================================================================
