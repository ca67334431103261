//! # Mutation Engine
//!
//! Insert and update of single rows. Deletes go through
//! [`IntegrityEngine::delete`] because they are guarded by the child table.
//!
//! All mutations:
//! - validate everything before touching the store
//! - leave the store unchanged when any check fails
//! - never persist; the [`Engine`](crate::Engine) flushes afterwards

use crate::integrity::IntegrityEngine;
use crate::schema::{ID_FIELD, Table};
use crate::store::TableStore;
use crate::{Fields, RowId, SensorNetError, Value};

/// Applies row-level writes to a [`TableStore`].
pub struct MutationEngine;

impl MutationEngine {
    /// Bring every value to the form it takes after a flush and reload.
    fn canonicalize(fields: Fields) -> Fields {
        fields
            .into_iter()
            .map(|(name, value)| (name, value.canonical()))
            .collect()
    }

    fn check_field_names(table: Table, fields: &Fields) -> Result<(), SensorNetError> {
        match fields.keys().find(|name| !table.has_field(name)) {
            Some(unknown) => Err(SensorNetError::FieldNotFound {
                table,
                field: unknown.clone(),
            }),
            None => Ok(()),
        }
    }

    /// Append a row to `table` and return the id it was given.
    ///
    /// The id is `max(id) + 1`, or `0` for an empty table; a caller-supplied
    /// `id` is ignored. Fields not supplied are stored as `Null`. Values are
    /// stored in canonical form, so numeric-looking text is kept as a number.
    pub fn insert(
        store: &mut TableStore,
        table: Table,
        fields: Fields,
    ) -> Result<RowId, SensorNetError> {
        Self::check_field_names(table, &fields)?;
        let mut fields = Self::canonicalize(fields);
        IntegrityEngine::validate_foreign_key(store, table, &fields)?;

        let id = store.next_id(table);
        let row = table
            .fields()
            .iter()
            .map(|&name| {
                if name == ID_FIELD {
                    Value::from(id)
                } else {
                    fields.remove(name).unwrap_or_default()
                }
            })
            .collect();
        store.append(table, row)?;

        tracing::debug!(table = %table, id = %id, "Row inserted");
        Ok(id)
    }

    /// Overwrite the supplied fields of row `id`.
    ///
    /// Checks run in order: the id exists, every field is known and
    /// mutable, then the foreign key if it is among the supplied fields.
    pub fn update(
        store: &mut TableStore,
        table: Table,
        id: RowId,
        fields: Fields,
    ) -> Result<(), SensorNetError> {
        let row = store
            .get_all(table)
            .position_of(id)
            .ok_or(SensorNetError::IndexNotFound { table, id })?;

        Self::check_field_names(table, &fields)?;
        let fields = Self::canonicalize(fields);
        if fields.contains_key(ID_FIELD) {
            return Err(SensorNetError::ImmutableField {
                table,
                field: ID_FIELD.to_string(),
            });
        }
        if table.foreign_key().is_some_and(|fk| fields.contains_key(fk)) {
            IntegrityEngine::validate_foreign_key(store, table, &fields)?;
        }

        let frame = store.get_all_mut(table);
        let mut touched = Vec::with_capacity(fields.len());
        for (name, value) in fields {
            if let Some(col) = frame.column_index(&name) {
                frame.set(row, col, value);
                touched.push(name);
            }
        }

        tracing::debug!(table = %table, id = %id, fields = ?touched, "Row updated");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
