//! # Formats
//!
//! Pure encoders and decoders for the backing files. No file I/O.

pub mod persistence;

pub use persistence::{DecodeError, header_bytes, table_from_bytes, table_to_bytes};
