//! # Query Module
//!
//! Predicate filtering and column projection over a [`Frame`].
//!
//! - One predicate per field: exact match, inclusive range, or set membership
//! - Predicates on different fields combine with logical AND
//! - Values in a set combine with logical OR
//! - Row order of the input is preserved

use crate::frame::Frame;
use crate::schema::Table;
use crate::{SensorNetError, Value};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

// =============================================================================
// PREDICATES
// =============================================================================

/// One side of a range.
///
/// Serialized as the bound value, or `null` when unbounded.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "Option<Value>", into = "Option<Value>")]
pub enum Bound {
    /// No limit on this side.
    #[default]
    Unbounded,
    /// Inclusive limit.
    Included(Value),
}

impl From<Option<Value>> for Bound {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Self::Unbounded, Self::Included)
    }
}

impl From<Bound> for Option<Value> {
    fn from(bound: Bound) -> Self {
        match bound {
            Bound::Unbounded => None,
            Bound::Included(v) => Some(v),
        }
    }
}

/// Condition applied to a single field.
///
/// JSON form: `{"exact": v}`, `{"range": [low, high]}`, `{"any": [v, ...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Predicate {
    /// Field equals the value.
    Exact(Value),
    /// Field lies between the bounds, inclusive.
    Range(Bound, Bound),
    /// Field equals any of the values.
    Any(Vec<Value>),
}

impl Predicate {
    /// Exact match helper.
    #[must_use]
    pub fn exact(value: impl Into<Value>) -> Self {
        Self::Exact(value.into())
    }

    /// Inclusive range helper with both bounds set.
    #[must_use]
    pub fn range(low: impl Into<Value>, high: impl Into<Value>) -> Self {
        Self::Range(Bound::Included(low.into()), Bound::Included(high.into()))
    }

    /// `field >= low` helper.
    #[must_use]
    pub fn at_least(low: impl Into<Value>) -> Self {
        Self::Range(Bound::Included(low.into()), Bound::Unbounded)
    }

    /// `field <= high` helper.
    #[must_use]
    pub fn at_most(high: impl Into<Value>) -> Self {
        Self::Range(Bound::Unbounded, Bound::Included(high.into()))
    }

    /// Set membership helper.
    #[must_use]
    pub fn any<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Self {
        Self::Any(values.into_iter().map(Into::into).collect())
    }

    /// A range with both sides unbounded filters nothing.
    #[must_use]
    pub fn is_noop(&self) -> bool {
        matches!(self, Self::Range(Bound::Unbounded, Bound::Unbounded))
    }

    /// The predicate with every operand in the form stored cells take.
    ///
    /// A bound that is empty text or `Null` becomes [`Bound::Unbounded`].
    #[must_use]
    pub fn canonical(&self) -> Self {
        let bound = |b: &Bound| match b {
            Bound::Unbounded => Bound::Unbounded,
            Bound::Included(v) => match v.clone().canonical() {
                Value::Null => Bound::Unbounded,
                v => Bound::Included(v),
            },
        };
        match self {
            Self::Exact(v) => Self::Exact(v.clone().canonical()),
            Self::Range(low, high) => Self::Range(bound(low), bound(high)),
            Self::Any(set) => Self::Any(set.iter().cloned().map(Value::canonical).collect()),
        }
    }

    /// Check a single cell against the predicate.
    #[must_use]
    pub fn matches(&self, value: &Value) -> bool {
        match self {
            Self::Exact(target) => value.matches(target),
            Self::Range(low, high) => {
                let above = match low {
                    Bound::Unbounded => true,
                    Bound::Included(l) => {
                        matches!(value.compare(l), Some(Ordering::Greater | Ordering::Equal))
                    }
                };
                let below = match high {
                    Bound::Unbounded => true,
                    Bound::Included(h) => {
                        matches!(value.compare(h), Some(Ordering::Less | Ordering::Equal))
                    }
                };
                above && below
            }
            Self::Any(set) => set.iter().any(|candidate| value.matches(candidate)),
        }
    }
}

/// Field name to predicate map. All entries must hold for a row to match.
pub type Predicates = BTreeMap<String, Predicate>;

// =============================================================================
// QUERY
// =============================================================================

/// A structured query against one table or its union view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    /// Table the rows come from.
    pub table: Table,
    /// Filters, combined with AND.
    #[serde(default)]
    pub predicates: Predicates,
    /// Columns to keep, in order. `None` keeps every column.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
    /// Query the table joined with all of its ancestors.
    #[serde(default)]
    pub union: bool,
}

impl Query {
    /// Query every row of `table`.
    #[must_use]
    pub fn new(table: Table) -> Self {
        Self {
            table,
            predicates: Predicates::new(),
            fields: None,
            union: false,
        }
    }

    /// Query the union view of `table`.
    #[must_use]
    pub fn union(table: Table) -> Self {
        Self {
            union: true,
            ..Self::new(table)
        }
    }

    /// Add a predicate on `field`, replacing any previous one.
    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, predicate: Predicate) -> Self {
        self.predicates.insert(field.into(), predicate);
        self
    }

    /// Restrict the result to `fields`.
    #[must_use]
    pub fn select<S: Into<String>>(mut self, fields: impl IntoIterator<Item = S>) -> Self {
        self.fields = Some(fields.into_iter().map(Into::into).collect());
        self
    }
}

// =============================================================================
// QUERY ENGINE
// =============================================================================

/// Evaluates predicates and projections over frames.
///
/// `table` names the source in error messages; for union views it is the
/// table the view was built from.
pub struct QueryEngine;

impl QueryEngine {
    /// Rows of `frame` that satisfy every predicate, in original order.
    ///
    /// Operands are compared in canonical form, so `"0012"` finds a stored
    /// `12`.
    pub fn filter(
        frame: &Frame,
        table: Table,
        predicates: &Predicates,
    ) -> Result<Frame, SensorNetError> {
        let mut checks = Vec::with_capacity(predicates.len());
        for (field, predicate) in predicates {
            let idx = frame
                .column_index(field)
                .ok_or_else(|| SensorNetError::FieldNotFound {
                    table,
                    field: field.clone(),
                })?;
            let predicate = predicate.canonical();
            if !predicate.is_noop() {
                checks.push((idx, predicate));
            }
        }

        if checks.is_empty() {
            return Ok(frame.clone());
        }

        Ok(frame.filter_rows(|row| {
            checks
                .iter()
                .all(|(idx, predicate)| row.get(*idx).is_some_and(|v| predicate.matches(v)))
        }))
    }

    /// Rows of `frame` restricted to `fields`, in the requested order.
    ///
    /// Fails without producing anything if any field is unknown.
    pub fn project<S: AsRef<str>>(
        frame: &Frame,
        table: Table,
        fields: &[S],
    ) -> Result<Frame, SensorNetError> {
        let indices = fields
            .iter()
            .map(|f| {
                let name = f.as_ref();
                frame
                    .column_index(name)
                    .ok_or_else(|| SensorNetError::FieldNotFound {
                        table,
                        field: name.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let rows = frame
            .rows()
            .iter()
            .map(|row| {
                indices
                    .iter()
                    .map(|&i| row.get(i).cloned().unwrap_or_default())
                    .collect()
            })
            .collect();

        Frame::with_rows(fields.iter().map(|f| f.as_ref().to_string()), rows)
    }
}

// =============================================================================
// TESTS
// =============================================================================
