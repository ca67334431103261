//! # Persistence Format
//!
//! Delimited text encoding of a single table.
//!
//! File I/O lives in [`crate::storage`]; this module is pure transformation.
//!
//! Format: one header row naming the table's fields in schema order, then
//! one row per record. Cells are written with [`Value::to_cell`] and read
//! back with [`Value::parse`]; an empty cell is `Null`.
//!
//! Decoding distinguishes two failure shapes because the loader repairs
//! them differently in its log output:
//! - `Empty`: no bytes, or whitespace only
//! - `Malformed`: anything else that is not a valid table

use crate::frame::Frame;
use crate::schema::{ID_FIELD, Table};
use crate::{SensorNetError, Value};
use std::collections::BTreeSet;
use thiserror::Error;

/// Why a table payload could not be decoded.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload holds no header row.
    #[error("empty payload")]
    Empty,
    /// The payload is not a valid table.
    #[error("malformed payload: {0}")]
    Malformed(String),
}

fn writer(delimiter: u8) -> csv::Writer<Vec<u8>> {
    csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(Vec::new())
}

/// Bytes of a header-only file for `table`.
pub fn header_bytes(table: Table, delimiter: u8) -> Result<Vec<u8>, SensorNetError> {
    table_to_bytes(&Frame::new(table.fields().iter().copied()), delimiter)
}

/// Encode a frame (header + rows).
pub fn table_to_bytes(frame: &Frame, delimiter: u8) -> Result<Vec<u8>, SensorNetError> {
    let mut w = writer(delimiter);
    w.write_record(frame.columns())
        .map_err(|e| SensorNetError::SerializationError(e.to_string()))?;
    for row in frame.rows() {
        w.write_record(row.iter().map(Value::to_cell))
            .map_err(|e| SensorNetError::SerializationError(e.to_string()))?;
    }
    w.into_inner()
        .map_err(|e| SensorNetError::SerializationError(e.to_string()))
}

/// Decode the payload of `table`'s backing file.
///
/// The header must equal the table's field list, every row must have the
/// same width, and every `id` must be a distinct non-negative integer.
pub fn table_from_bytes(table: Table, bytes: &[u8], delimiter: u8) -> Result<Frame, DecodeError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Err(DecodeError::Empty);
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(bytes);

    let header = reader
        .headers()
        .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if header.iter().ne(table.fields().iter().copied()) {
        return Err(DecodeError::Malformed(format!(
            "header [{}] does not match {} fields",
            header.iter().collect::<Vec<_>>().join(", "),
            table
        )));
    }

    let mut frame = Frame::new(table.fields().iter().copied());
    let mut seen = BTreeSet::new();
    for (line, record) in reader.records().enumerate() {
        let record = record.map_err(|e| DecodeError::Malformed(e.to_string()))?;
        let row: Vec<Value> = record.iter().map(Value::parse).collect();

        let id = row
            .first()
            .and_then(|v| match v {
                Value::Integer(_) => v.as_row_id(),
                _ => None,
            })
            .ok_or_else(|| {
                DecodeError::Malformed(format!("row {}: {} is not a valid id", line + 1, ID_FIELD))
            })?;
        if !seen.insert(id) {
            return Err(DecodeError::Malformed(format!(
                "row {}: duplicate id {}",
                line + 1,
                id
            )));
        }

        frame
            .push_row(row)
            .map_err(|e| DecodeError::Malformed(e.to_string()))?;
    }

    Ok(frame)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RowId;

    const COMMA: u8 = b',';

    #[test]
    fn header_only_file() {
        let bytes = header_bytes(Table::Station, COMMA).expect("header");
        assert_eq!(bytes, b"id,name,region,status\n");

        let frame = table_from_bytes(Table::Station, &bytes, COMMA).expect("decode");
        assert!(frame.is_empty());
        assert_eq!(frame.columns(), Table::Station.fields());
    }

    #[test]
    fn bytes_roundtrip_bit_exact() {
        let frame = Frame::with_rows(
            Table::Record.fields().iter().copied(),
            vec![
                vec![0.into(), "2024-05-01 10:00".into(), 12.0.into(), 3.into()],
                vec![4.into(), "2024-05-01 11:00".into(), 12.75.into(), 3.into()],
                vec![5.into(), Value::Null, Value::Null, 4.into()],
            ],
        )
        .expect("frame");

        let bytes1 = table_to_bytes(&frame, COMMA).expect("first encode");
        let restored = table_from_bytes(Table::Record, &bytes1, COMMA).expect("decode");
        let bytes2 = table_to_bytes(&restored, COMMA).expect("second encode");

        assert_eq!(restored, frame);
        assert_eq!(bytes1, bytes2, "save -> load -> save must produce identical bytes");
    }

    #[test]
    fn delimiter_inside_value_is_quoted() {
        let frame = Frame::with_rows(
            Table::Station.fields().iter().copied(),
            vec![vec![0.into(), "Summit, East".into(), "Alpine".into(), 1.into()]],
        )
        .expect("frame");

        let bytes = table_to_bytes(&frame, COMMA).expect("encode");
        let restored = table_from_bytes(Table::Station, &bytes, COMMA).expect("decode");
        assert_eq!(restored.value(0, "name"), Some(&Value::from("Summit, East")));
    }

    #[test]
    fn custom_delimiter() {
        let bytes = b"id;name;region;status\n3;a;b;1\n";
        let frame = table_from_bytes(Table::Station, bytes, b';').expect("decode");
        assert_eq!(frame.ids(), vec![RowId(3)]);
    }

    #[test]
    fn whitespace_is_empty() {
        assert_eq!(table_from_bytes(Table::Place, b"", COMMA), Err(DecodeError::Empty));
        assert_eq!(table_from_bytes(Table::Place, b" \n\n", COMMA), Err(DecodeError::Empty));
    }

    #[test]
    fn ragged_rows_are_malformed() {
        let bytes = b"id,name,region,status\n0,a,b\n";
        assert!(matches!(
            table_from_bytes(Table::Station, bytes, COMMA),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn wrong_header_is_malformed() {
        let bytes = b"id,timestamp,measured_value,sensor_id\n";
        assert!(matches!(
            table_from_bytes(Table::Station, bytes, COMMA),
            Err(DecodeError::Malformed(_))
        ));
    }

    #[test]
    fn bad_or_duplicate_ids_are_malformed() {
        let not_int = b"id,name,region,status\nx,a,b,1\n";
        assert!(table_from_bytes(Table::Station, not_int, COMMA).is_err());

        let negative = b"id,name,region,status\n-1,a,b,1\n";
        assert!(table_from_bytes(Table::Station, negative, COMMA).is_err());

        let dup = b"id,name,region,status\n1,a,b,1\n1,c,d,1\n";
        assert!(table_from_bytes(Table::Station, dup, COMMA).is_err());
    }
}
