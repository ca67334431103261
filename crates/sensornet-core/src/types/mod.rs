//! # Core Type Definitions
//!
//! This module contains the value-level types shared by every engine:
//! - Row identifiers (`RowId`)
//! - Cell values (`Value`) and their comparison rules
//! - Field maps used for inserts and updates (`Fields`)
//! - Error types (`SensorNetError`)
//!
//! ## Comparison Rules
//!
//! Values loaded from text carry no declared column type, so comparisons
//! are defined on the runtime variant:
//! - `Integer` and `Float` compare numerically with each other
//! - `Text` compares lexicographically with `Text`
//! - `Null` is never equal to anything, itself included
//! - Every other pairing is incomparable

use crate::schema::Table;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

// =============================================================================
// ROW IDENTIFIER
// =============================================================================

/// Table-scoped identifier of a row.
///
/// Ids are unique within one table at any instant. They are assigned by the
/// engine as `max + 1` (or `0` for an empty table), so an id freed by deleting
/// the current maximum is handed out again by the next insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RowId(pub u64);

impl RowId {
    /// The id handed to the first row of an empty table.
    pub const FIRST: Self = Self(0);

    /// The id that follows this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Get the raw id value.
    #[must_use]
    pub const fn value(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for RowId {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

// =============================================================================
// VALUE
// =============================================================================

/// A single cell.
///
/// Serialized untagged, so JSON sees `null`, a number, or a string.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    /// Missing value (an empty cell on disk).
    #[default]
    Null,
    /// Whole number.
    Integer(i64),
    /// Finite floating point number.
    Float(f64),
    /// Anything that does not parse as a number.
    Text(String),
}

impl Value {
    /// Parse a raw text cell.
    ///
    /// Tries integer, then finite float, then keeps the text. An empty cell
    /// becomes `Null`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        if raw.is_empty() {
            return Self::Null;
        }
        if let Ok(n) = raw.parse::<i64>() {
            return Self::Integer(n);
        }
        match raw.parse::<f64>() {
            Ok(f) if f.is_finite() => Self::Float(f),
            _ => Self::Text(raw.to_string()),
        }
    }

    /// Render the value as a text cell.
    ///
    /// Floats use the shortest round-trip form, which always carries a `.0`
    /// or an exponent, so they parse back as floats.
    #[must_use]
    pub fn to_cell(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Integer(n) => n.to_string(),
            Self::Float(f) => format!("{:?}", f),
            Self::Text(s) => s.clone(),
        }
    }

    /// The value a write and re-read of its cell yields.
    ///
    /// Numeric-looking text becomes a number and empty text becomes `Null`;
    /// non-finite floats become text.
    #[must_use]
    pub fn canonical(self) -> Self {
        match self {
            Self::Text(s) => Self::parse(&s),
            Self::Float(f) if !f.is_finite() => Self::Text(format!("{:?}", f)),
            other => other,
        }
    }

    /// Check if the value is `Null`.
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Predicate equality: numeric across integer and float, never true for `Null`.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.compare(other) == Some(Ordering::Equal)
    }

    /// Ordering used by range predicates.
    ///
    /// Returns `None` for incomparable pairs, which fail every bound.
    #[must_use]
    pub fn compare(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Integer(a), Self::Integer(b)) => Some(a.cmp(b)),
            (Self::Integer(a), Self::Float(b)) => (*a as f64).partial_cmp(b),
            (Self::Float(a), Self::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Self::Float(a), Self::Float(b)) => a.partial_cmp(b),
            (Self::Text(a), Self::Text(b)) => Some(a.cmp(b)),
            _ => None,
        }
    }

    /// Interpret the value as a row id.
    ///
    /// Accepts non-negative integers and non-negative integral floats.
    #[must_use]
    pub fn as_row_id(&self) -> Option<RowId> {
        match self {
            Self::Integer(n) => u64::try_from(*n).ok().map(RowId),
            Self::Float(f) if *f >= 0.0 && f.fract() == 0.0 && *f < 1.8e19 => {
                Some(RowId(*f as u64))
            }
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            other => write!(f, "{}", other.to_cell()),
        }
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Integer(value as i64)
    }
}

impl From<u64> for Value {
    fn from(value: u64) -> Self {
        i64::try_from(value).map_or(Self::Float(value as f64), Self::Integer)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<RowId> for Value {
    fn from(value: RowId) -> Self {
        Self::from(value.0)
    }
}

// =============================================================================
// FIELDS
// =============================================================================

/// Field name to value map used by insert and update.
///
/// BTreeMap keeps iteration order deterministic.
pub type Fields = BTreeMap<String, Value>;

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the sensor network engine.
///
/// - No silent failures, except unknown ids in a delete batch
/// - Use `Result<T, SensorNetError>` for fallible operations
/// - Nothing is retried internally
#[derive(Debug, Error)]
pub enum SensorNetError {
    /// Insert or update supplied a foreign key with no matching parent row.
    #[error(
        "Foreign key not found: {} references {} id {}, which does not exist",
        .table, .parent_table, .foreign_id
    )]
    ForeignKeyNotFound {
        table: Table,
        parent_table: Table,
        foreign_id: Value,
    },

    /// Delete would orphan rows of the immediate child table.
    #[error(
        "Delete blocked: {} id {} is referenced by {} ids [{}]",
        .table, .id, .child_table, join_ids(.referencing_ids)
    )]
    DeleteBlocked {
        table: Table,
        id: RowId,
        child_table: Table,
        referencing_ids: Vec<RowId>,
    },

    /// Update targets an id absent from the table.
    #[error("Index not found: {} has no row with id {}", .table, .id)]
    IndexNotFound { table: Table, id: RowId },

    /// A query, projection or write references an unknown column.
    #[error("Field not found: {} has no field \"{}\"", .table, .field)]
    FieldNotFound { table: Table, field: String },

    /// An update tried to change a field the engine owns.
    #[error("Field \"{}\" of {} cannot be updated", .field, .table)]
    ImmutableField { table: Table, field: String },

    /// A table name did not match any level of the hierarchy.
    #[error("Unknown table: {0}")]
    UnknownTable(String),

    /// A predicate could not be built from its textual form.
    #[error("Invalid predicate: {0}")]
    InvalidPredicate(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

fn join_ids(ids: &[RowId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_prefers_integer_then_float_then_text() {
        assert_eq!(Value::parse("42"), Value::Integer(42));
        assert_eq!(Value::parse("-3"), Value::Integer(-3));
        assert_eq!(Value::parse("2.5"), Value::Float(2.5));
        assert_eq!(Value::parse("north"), Value::Text("north".to_string()));
        assert_eq!(Value::parse(""), Value::Null);
    }

    #[test]
    fn parse_keeps_non_finite_words_as_text() {
        assert_eq!(Value::parse("inf"), Value::Text("inf".to_string()));
        assert_eq!(Value::parse("NaN"), Value::Text("NaN".to_string()));
    }

    #[test]
    fn integral_float_keeps_decimal_point() {
        assert_eq!(Value::Float(1.0).to_cell(), "1.0");
        assert_eq!(Value::parse(&Value::Float(1.0).to_cell()), Value::Float(1.0));
        assert_eq!(Value::Float(0.25).to_cell(), "0.25");
        assert_eq!(Value::parse(&Value::Float(1e15).to_cell()), Value::Float(1e15));
        assert_eq!(Value::parse(&Value::Float(-4e18).to_cell()), Value::Float(-4e18));
    }

    #[test]
    fn canonical_matches_reread_cell() {
        for value in [
            Value::from("0012"),
            Value::from(""),
            Value::from(" 7"),
            Value::from("1e3"),
            Value::from("north"),
            Value::Float(f64::INFINITY),
            Value::Float(2.5),
            Value::Integer(-9),
            Value::Null,
        ] {
            let reread = Value::parse(&value.to_cell());
            assert_eq!(value.canonical(), reread);
        }
        assert_eq!(Value::from("0012").canonical(), Value::Integer(12));
        assert_eq!(Value::from("").canonical(), Value::Null);
    }

    #[test]
    fn numeric_equality_crosses_variants() {
        assert!(Value::Integer(1).matches(&Value::Float(1.0)));
        assert!(!Value::Integer(1).matches(&Value::Text("1".to_string())));
    }

    #[test]
    fn null_matches_nothing() {
        assert!(!Value::Null.matches(&Value::Null));
        assert!(!Value::Null.matches(&Value::Integer(0)));
        assert_eq!(Value::Null.compare(&Value::Integer(0)), None);
    }

    #[test]
    fn text_orders_lexicographically() {
        let a = Value::from("Alpha");
        let m = Value::from("M");
        assert_eq!(a.compare(&m), Some(Ordering::Less));
    }

    #[test]
    fn row_id_from_values() {
        assert_eq!(Value::Integer(3).as_row_id(), Some(RowId(3)));
        assert_eq!(Value::Float(3.0).as_row_id(), Some(RowId(3)));
        assert_eq!(Value::Float(3.5).as_row_id(), None);
        assert_eq!(Value::Integer(-1).as_row_id(), None);
        assert_eq!(Value::from("3").as_row_id(), None);
    }

    #[test]
    fn value_json_is_untagged() {
        let json = serde_json::to_string(&vec![
            Value::Null,
            Value::Integer(1),
            Value::Float(1.5),
            Value::from("x"),
        ])
        .expect("serialize");
        assert_eq!(json, r#"[null,1,1.5,"x"]"#);

        let back: Vec<Value> = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back[1], Value::Integer(1));
        assert_eq!(back[2], Value::Float(1.5));
    }

    #[test]
    fn delete_blocked_message_lists_ids() {
        let err = SensorNetError::DeleteBlocked {
            table: Table::Station,
            id: RowId(0),
            child_table: Table::Place,
            referencing_ids: vec![RowId(0), RowId(2)],
        };
        assert_eq!(
            err.to_string(),
            "Delete blocked: station id 0 is referenced by place ids [0, 2]"
        );
    }
}
