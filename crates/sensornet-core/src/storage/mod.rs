//! # Storage
//!
//! File-backed persistence for the table store.

pub mod csv_dir;

pub use csv_dir::{CsvDirectory, Repair};
