//! # CSV Directory Storage
//!
//! Backing files for the four tables, one delimited text file each, in a
//! single data directory.
//!
//! ## Repair Policy
//!
//! Loading never fails because of file contents. A file that is missing,
//! empty, or malformed is replaced by a header-only file and the table
//! starts empty. Only genuine I/O failures (permissions, unreadable
//! directory) are reported.
//!
//! ## Flush Policy
//!
//! [`CsvDirectory::flush`] rewrites all four files in hierarchy order. The
//! writes are independent: a crash between two of them leaves tables from
//! different points in time.

use crate::formats::{DecodeError, header_bytes, table_from_bytes, table_to_bytes};
use crate::frame::Frame;
use crate::primitives::{DEFAULT_DELIMITER, MAX_TABLE_FILE_SIZE};
use crate::schema::Table;
use crate::store::TableStore;
use crate::SensorNetError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Why a backing file was replaced at load time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Repair {
    /// The file did not exist.
    Created,
    /// The file held no header row.
    Empty,
    /// The file could not be decoded.
    Malformed(String),
}

/// A data directory holding `station.csv`, `place.csv`, `sensor.csv`
/// and `record.csv`.
#[derive(Debug, Clone)]
pub struct CsvDirectory {
    root: PathBuf,
    delimiter: u8,
}

impl CsvDirectory {
    /// Use `root` with the default delimiter.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self::with_delimiter(root, DEFAULT_DELIMITER)
    }

    /// Use `root` with a custom single-byte delimiter.
    #[must_use]
    pub fn with_delimiter(root: impl Into<PathBuf>, delimiter: u8) -> Self {
        Self {
            root: root.into(),
            delimiter,
        }
    }

    /// The data directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The field delimiter.
    #[must_use]
    pub const fn delimiter(&self) -> u8 {
        self.delimiter
    }

    /// Path of `table`'s backing file.
    #[must_use]
    pub fn path_for(&self, table: Table) -> PathBuf {
        self.root.join(table.file_name())
    }

    /// Load all four tables, repairing files as needed.
    pub fn load(&self) -> Result<TableStore, SensorNetError> {
        self.load_with_report().map(|(store, _)| store)
    }

    /// Load all four tables and report which files were replaced.
    pub fn load_with_report(&self) -> Result<(TableStore, Vec<(Table, Repair)>), SensorNetError> {
        std::fs::create_dir_all(&self.root).map_err(|e| {
            SensorNetError::IoError(format!(
                "Cannot create data directory {}: {}",
                self.root.display(),
                e
            ))
        })?;

        let mut store = TableStore::new();
        let mut repairs = Vec::new();
        for table in Table::ALL {
            let frame = match self.read_table(table)? {
                Ok(frame) => frame,
                Err(repair) => {
                    match &repair {
                        Repair::Created => tracing::info!(
                            table = %table,
                            path = %self.path_for(table).display(),
                            "Creating missing table file"
                        ),
                        Repair::Empty => tracing::warn!(
                            table = %table,
                            "Table file is empty, rewriting header"
                        ),
                        Repair::Malformed(reason) => tracing::warn!(
                            table = %table,
                            reason = %reason,
                            "Table file is malformed, discarding contents"
                        ),
                    }
                    self.write_header_only(table)?;
                    repairs.push((table, repair));
                    Frame::new(table.fields().iter().copied())
                }
            };
            store.replace_rows(table, frame)?;
        }

        tracing::info!(
            root = %self.root.display(),
            stations = store.row_count(Table::Station),
            places = store.row_count(Table::Place),
            sensors = store.row_count(Table::Sensor),
            records = store.row_count(Table::Record),
            "Tables loaded"
        );
        Ok((store, repairs))
    }

    /// Read one table. The inner `Err` names the repair the file needs.
    fn read_table(&self, table: Table) -> Result<Result<Frame, Repair>, SensorNetError> {
        let path = self.path_for(table);

        let metadata = match std::fs::metadata(&path) {
            Ok(m) => m,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Err(Repair::Created)),
            Err(e) => {
                return Err(SensorNetError::IoError(format!(
                    "Cannot stat {}: {}",
                    path.display(),
                    e
                )));
            }
        };
        if metadata.len() > MAX_TABLE_FILE_SIZE {
            return Ok(Err(Repair::Malformed(format!(
                "file size {} bytes exceeds maximum {} bytes",
                metadata.len(),
                MAX_TABLE_FILE_SIZE
            ))));
        }

        let bytes = std::fs::read(&path).map_err(|e| {
            SensorNetError::IoError(format!("Cannot read {}: {}", path.display(), e))
        })?;

        Ok(match table_from_bytes(table, &bytes, self.delimiter) {
            Ok(frame) => Ok(frame),
            Err(DecodeError::Empty) => Err(Repair::Empty),
            Err(DecodeError::Malformed(reason)) => Err(Repair::Malformed(reason)),
        })
    }

    fn write_header_only(&self, table: Table) -> Result<(), SensorNetError> {
        let bytes = header_bytes(table, self.delimiter)?;
        self.write_file(table, &bytes)
    }

    fn write_file(&self, table: Table, bytes: &[u8]) -> Result<(), SensorNetError> {
        let path = self.path_for(table);
        std::fs::write(&path, bytes)
            .map_err(|e| SensorNetError::IoError(format!("Cannot write {}: {}", path.display(), e)))
    }

    /// Rewrite all four files from `store`, in hierarchy order.
    pub fn flush(&self, store: &TableStore) -> Result<(), SensorNetError> {
        for table in Table::ALL {
            let bytes = table_to_bytes(store.get_all(table), self.delimiter)?;
            self.write_file(table, &bytes)?;
        }
        tracing::debug!(root = %self.root.display(), "Flushed all tables");
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================
