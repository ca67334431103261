//! # Integrity Engine
//!
//! Referential checks across the hierarchy.
//!
//! - A foreign key is checked when it is written, never afterwards
//! - A delete is blocked while the immediate child table references the row
//! - The delete check is one level deep; grandchildren are not inspected
//! - A delete batch is all-or-nothing

use crate::schema::{ID_FIELD, Table};
use crate::store::TableStore;
use crate::{Fields, RowId, SensorNetError, Value};
use std::collections::BTreeSet;

/// Foreign-key validation and guarded deletes.
pub struct IntegrityEngine;

impl IntegrityEngine {
    /// Check the foreign key carried by `candidate` against the parent table.
    ///
    /// Always valid for the root. Otherwise the foreign-key field must hold
    /// the id of a row currently in the immediate parent table; a missing
    /// field or `Null` never does.
    pub fn validate_foreign_key(
        store: &TableStore,
        table: Table,
        candidate: &Fields,
    ) -> Result<(), SensorNetError> {
        let (Some(parent), Some(fk)) = (table.parent(), table.foreign_key()) else {
            return Ok(());
        };

        let foreign_id = candidate.get(fk).cloned().unwrap_or_default();
        let found = foreign_id
            .as_row_id()
            .is_some_and(|id| store.contains_id(parent, id));

        if found {
            Ok(())
        } else {
            Err(SensorNetError::ForeignKeyNotFound {
                table,
                parent_table: parent,
                foreign_id,
            })
        }
    }

    /// Rows of the immediate child table that reference `id`.
    ///
    /// Returns the child table (none for the leaf) and the referencing ids
    /// in child table order.
    #[must_use]
    pub fn check_deletable(
        store: &TableStore,
        table: Table,
        id: RowId,
    ) -> (Option<Table>, Vec<RowId>) {
        let Some(child) = table.child() else {
            return (None, Vec::new());
        };
        let Some(fk) = child.foreign_key() else {
            return (Some(child), Vec::new());
        };

        let target = Value::from(id);
        let frame = store.get_all(child);
        let referencing = (0..frame.len())
            .filter(|&row| frame.value(row, fk).is_some_and(|v| v.matches(&target)))
            .filter_map(|row| frame.row_id(row))
            .collect();

        (Some(child), referencing)
    }

    /// Remove `ids` from `table` if none of them is referenced.
    ///
    /// Ids absent from the table are skipped. The first blocked id aborts
    /// the batch before any row is removed. Returns the number of rows
    /// removed.
    pub fn delete(
        store: &mut TableStore,
        table: Table,
        ids: &[RowId],
    ) -> Result<usize, SensorNetError> {
        let mut doomed = BTreeSet::new();
        for &id in ids {
            if !store.contains_id(table, id) {
                continue;
            }
            let (child, referencing_ids) = Self::check_deletable(store, table, id);
            match child {
                Some(child_table) if !referencing_ids.is_empty() => {
                    return Err(SensorNetError::DeleteBlocked {
                        table,
                        id,
                        child_table,
                        referencing_ids,
                    });
                }
                _ => {}
            }
            doomed.insert(id);
        }

        let frame = store.get_all_mut(table);
        let before = frame.len();
        let id_col = frame.column_index(ID_FIELD);
        frame.retain_rows(|row| {
            let id = id_col.and_then(|i| row.get(i)).and_then(Value::as_row_id);
            !id.is_some_and(|id| doomed.contains(&id))
        });
        Ok(before - frame.len())
    }
}

// =============================================================================
// TESTS
// =============================================================================
