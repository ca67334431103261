//! # Join Engine
//!
//! Denormalized "union" views: a table left-joined with every ancestor,
//! immediate parent first, up to the root.
//!
//! At each step the view's link column (the foreign key of the level just
//! joined) is matched against the ancestor's `id`. The ancestor's `id`
//! column is dropped since the foreign key already carries it. Rows whose
//! key does not resolve keep `Null` for every ancestor column.

use crate::frame::Frame;
use crate::query::{Predicates, QueryEngine};
use crate::schema::{ID_FIELD, Table};
use crate::store::TableStore;
use crate::{RowId, SensorNetError, Value};
use std::collections::BTreeMap;

/// Builds and filters union views.
pub struct JoinEngine;

impl JoinEngine {
    /// Column name an ancestor field takes in a view that already has `existing`.
    ///
    /// Names are kept unless taken; then they are qualified with the
    /// ancestor's table name (`station_status`).
    fn merged_name(ancestor: Table, field: &str, existing: &Frame) -> String {
        if existing.has_column(field) {
            format!("{}_{}", ancestor.name(), field)
        } else {
            field.to_string()
        }
    }

    /// One row per row of `table`, carrying its own fields plus every
    /// ancestor's fields except their ids.
    pub fn union_view(store: &TableStore, table: Table) -> Result<Frame, SensorNetError> {
        let mut view = store.get_all(table).clone();
        let mut current = table;
        // Name the current level's foreign key has inside the view.
        let mut link = table.foreign_key().map(str::to_string);

        for ancestor in table.ancestors() {
            let Some(link_column) = link.as_deref().and_then(|l| view.column_index(l)) else {
                break;
            };

            let parent = store.get_all(ancestor);
            let by_id: BTreeMap<RowId, &[Value]> = (0..parent.len())
                .filter_map(|i| Some((parent.row_id(i)?, parent.rows()[i].as_slice())))
                .collect();

            let carried: Vec<(usize, String)> = parent
                .columns()
                .iter()
                .enumerate()
                .filter(|(_, name)| name.as_str() != ID_FIELD)
                .map(|(i, name)| (i, Self::merged_name(ancestor, name, &view)))
                .collect();

            let columns: Vec<String> = view
                .columns()
                .iter()
                .cloned()
                .chain(carried.iter().map(|(_, name)| name.clone()))
                .collect();

            let rows = view
                .rows()
                .iter()
                .map(|row| {
                    let matched = row
                        .get(link_column)
                        .and_then(Value::as_row_id)
                        .and_then(|id| by_id.get(&id));
                    let mut merged = row.clone();
                    merged.extend(carried.iter().map(|(i, _)| {
                        matched
                            .and_then(|cells| cells.get(*i))
                            .cloned()
                            .unwrap_or_default()
                    }));
                    merged
                })
                .collect();

            let next_link = ancestor.foreign_key().and_then(|fk| {
                carried
                    .iter()
                    .find(|(i, _)| parent.columns()[*i] == fk)
                    .map(|(_, name)| name.clone())
            });

            view = Frame::with_rows(columns, rows)?;
            link = next_link;
            current = ancestor;
        }

        tracing::trace!(
            table = %table,
            joined_up_to = %current,
            rows = view.len(),
            columns = view.columns().len(),
            "union view built"
        );
        Ok(view)
    }

    /// Build the union view of `table` and filter it.
    ///
    /// Predicates may name fields of `table` or of any ancestor, using the
    /// view's column names.
    pub fn union_query(
        store: &TableStore,
        table: Table,
        predicates: &Predicates,
    ) -> Result<Frame, SensorNetError> {
        let view = Self::union_view(store, table)?;
        QueryEngine::filter(&view, table, predicates)
    }
}

// =============================================================================
// TESTS
// =============================================================================
