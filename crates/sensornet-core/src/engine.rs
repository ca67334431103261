//! # Engine Module
//!
//! The public facade over the four tables.
//!
//! An [`Engine`] owns a [`TableStore`] and a [`StorageBackend`]. Reads go
//! straight to the store. Every successful mutation is followed by a flush
//! of all four tables when the backend is file-backed.
//!
//! ## Storage Backends
//!
//! - `InMemory`: nothing is persisted
//! - `Csv`: one delimited file per table in a data directory
//!
//! ## Concurrency
//!
//! The engine performs no locking. Hosts that share it across threads must
//! serialize writers against each other and against readers.

use crate::integrity::IntegrityEngine;
use crate::join::JoinEngine;
use crate::mutation::MutationEngine;
use crate::query::{Predicates, Query, QueryEngine};
use crate::schema::Table;
use crate::storage::CsvDirectory;
use crate::store::TableStore;
use crate::{Fields, Frame, RowId, SensorNetError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Where mutations are persisted.
#[derive(Debug, Clone, Default)]
pub enum StorageBackend {
    /// No persistence.
    #[default]
    InMemory,
    /// A directory of delimited text files.
    Csv(CsvDirectory),
}

/// Row count of every table, in hierarchy order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreStatus {
    pub stations: usize,
    pub places: usize,
    pub sensors: usize,
    pub records: usize,
}

impl StoreStatus {
    /// Sum over all four tables.
    #[must_use]
    pub const fn total(&self) -> usize {
        self.stations + self.places + self.sensors + self.records
    }
}

/// Tables plus the backend their mutations are flushed to.
#[derive(Debug, Default)]
pub struct Engine {
    store: TableStore,
    backend: StorageBackend,
}

impl Engine {
    /// Create an empty in-memory engine.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing store without persistence.
    #[must_use]
    pub fn with_store(store: TableStore) -> Self {
        Self {
            store,
            backend: StorageBackend::InMemory,
        }
    }

    /// Open a data directory, repairing its files as needed.
    pub fn open(root: impl AsRef<Path>, delimiter: u8) -> Result<Self, SensorNetError> {
        Self::with_csv(CsvDirectory::with_delimiter(root.as_ref(), delimiter))
    }

    /// Load from an already configured directory.
    pub fn with_csv(dir: CsvDirectory) -> Result<Self, SensorNetError> {
        let store = dir.load()?;
        Ok(Self {
            store,
            backend: StorageBackend::Csv(dir),
        })
    }

    /// The tables.
    #[must_use]
    pub fn store(&self) -> &TableStore {
        &self.store
    }

    #[must_use]
    pub fn backend(&self) -> &StorageBackend {
        &self.backend
    }

    /// Whether mutations are written to disk.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StorageBackend::Csv(_))
    }

    /// Field names of `table`, in column order.
    #[must_use]
    pub fn fields(&self, table: Table) -> &'static [&'static str] {
        table.fields()
    }

    /// Column names of the union view of `table`.
    pub fn union_fields(&self, table: Table) -> Result<Vec<String>, SensorNetError> {
        JoinEngine::union_view(&self.store, table).map(|view| view.columns().to_vec())
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Filter `table`, then project to `fields` if given.
    pub fn query<S: AsRef<str>>(
        &self,
        table: Table,
        predicates: &Predicates,
        fields: Option<&[S]>,
    ) -> Result<Frame, SensorNetError> {
        let matched = QueryEngine::filter(self.store.get_all(table), table, predicates)?;
        Self::finish(matched, table, fields)
    }

    /// Filter the union view of `table`, then project to `fields` if given.
    pub fn union_query<S: AsRef<str>>(
        &self,
        table: Table,
        predicates: &Predicates,
        fields: Option<&[S]>,
    ) -> Result<Frame, SensorNetError> {
        let matched = JoinEngine::union_query(&self.store, table, predicates)?;
        Self::finish(matched, table, fields)
    }

    /// Run a [`Query`] description.
    pub fn execute(&self, query: &Query) -> Result<Frame, SensorNetError> {
        let fields = query.fields.as_deref();
        if query.union {
            self.union_query(query.table, &query.predicates, fields)
        } else {
            self.query(query.table, &query.predicates, fields)
        }
    }

    fn finish<S: AsRef<str>>(
        matched: Frame,
        table: Table,
        fields: Option<&[S]>,
    ) -> Result<Frame, SensorNetError> {
        match fields {
            Some(fields) => QueryEngine::project(&matched, table, fields),
            None => Ok(matched),
        }
    }

    /// Row counts per table.
    #[must_use]
    pub fn status(&self) -> StoreStatus {
        StoreStatus {
            stations: self.store.row_count(Table::Station),
            places: self.store.row_count(Table::Place),
            sensors: self.store.row_count(Table::Sensor),
            records: self.store.row_count(Table::Record),
        }
    }

    // =========================================================================
    // MUTATIONS
    // =========================================================================

    /// Insert a row and persist. Returns the assigned id.
    pub fn insert(&mut self, table: Table, fields: Fields) -> Result<RowId, SensorNetError> {
        let id = MutationEngine::insert(&mut self.store, table, fields)?;
        self.flush()?;
        Ok(id)
    }

    /// Update fields of row `id` and persist.
    pub fn update(
        &mut self,
        table: Table,
        id: RowId,
        fields: Fields,
    ) -> Result<(), SensorNetError> {
        MutationEngine::update(&mut self.store, table, id, fields)?;
        self.flush()
    }

    /// Delete a batch of ids and persist. Returns how many rows were removed.
    ///
    /// The whole batch is refused if any present id is still referenced.
    pub fn delete(&mut self, table: Table, ids: &[RowId]) -> Result<usize, SensorNetError> {
        let removed = IntegrityEngine::delete(&mut self.store, table, ids)?;
        tracing::debug!(table = %table, requested = ids.len(), removed, "Rows deleted");
        self.flush()?;
        Ok(removed)
    }

    /// Write all four tables to the backend.
    pub fn flush(&self) -> Result<(), SensorNetError> {
        match &self.backend {
            StorageBackend::InMemory => Ok(()),
            StorageBackend::Csv(dir) => dir.flush(&self.store),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
