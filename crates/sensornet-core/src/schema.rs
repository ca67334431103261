//! # Hierarchy Schema
//!
//! Static description of the four tables and the parent chain
//! `station -> place -> sensor -> record`.
//!
//! Table identity is a closed enum; per-table logic indexes by
//! [`Table::position`] instead of dispatching on entity types. The foreign
//! key of the table at position `i > 0` is named after the table at `i - 1`
//! (`<parent>_id`).

use crate::types::SensorNetError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name of the primary key column shared by every table.
pub const ID_FIELD: &str = "id";

/// Station columns, in file order.
pub const STATION_FIELDS: &[&str] = &["id", "name", "region", "status"];

/// Place columns, in file order.
pub const PLACE_FIELDS: &[&str] = &[
    "id",
    "place_code",
    "longitude",
    "latitude",
    "altitude",
    "status",
    "station_id",
];

/// Sensor columns, in file order.
pub const SENSOR_FIELDS: &[&str] = &[
    "id",
    "sensor_type",
    "unit",
    "sensor_code",
    "online_since",
    "online_until",
    "status",
    "place_id",
];

/// Record columns, in file order.
pub const RECORD_FIELDS: &[&str] = &["id", "timestamp", "measured_value", "sensor_id"];

/// One level of the hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Table {
    Station,
    Place,
    Sensor,
    Record,
}

impl Table {
    /// All tables in hierarchy order, root first.
    ///
    /// This is also the flush order of the backing files.
    pub const ALL: [Self; 4] = [Self::Station, Self::Place, Self::Sensor, Self::Record];

    /// Position in the hierarchy (root = 0).
    #[must_use]
    pub const fn position(self) -> usize {
        match self {
            Self::Station => 0,
            Self::Place => 1,
            Self::Sensor => 2,
            Self::Record => 3,
        }
    }

    /// Lowercase table name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Station => "station",
            Self::Place => "place",
            Self::Sensor => "sensor",
            Self::Record => "record",
        }
    }

    /// Ordered field list, `id` first.
    #[must_use]
    pub const fn fields(self) -> &'static [&'static str] {
        match self {
            Self::Station => STATION_FIELDS,
            Self::Place => PLACE_FIELDS,
            Self::Sensor => SENSOR_FIELDS,
            Self::Record => RECORD_FIELDS,
        }
    }

    /// Immediate parent table. `None` for the root.
    #[must_use]
    pub const fn parent(self) -> Option<Self> {
        match self {
            Self::Station => None,
            Self::Place => Some(Self::Station),
            Self::Sensor => Some(Self::Place),
            Self::Record => Some(Self::Sensor),
        }
    }

    /// Immediate child table. `None` for the leaf.
    #[must_use]
    pub const fn child(self) -> Option<Self> {
        match self {
            Self::Station => Some(Self::Place),
            Self::Place => Some(Self::Sensor),
            Self::Sensor => Some(Self::Record),
            Self::Record => None,
        }
    }

    /// Field holding the parent's id. `None` for the root.
    #[must_use]
    pub const fn foreign_key(self) -> Option<&'static str> {
        match self {
            Self::Station => None,
            Self::Place => Some("station_id"),
            Self::Sensor => Some("place_id"),
            Self::Record => Some("sensor_id"),
        }
    }

    /// Ancestors from the immediate parent up to the root.
    pub fn ancestors(self) -> impl Iterator<Item = Self> {
        std::iter::successors(self.parent(), |t| t.parent())
    }

    /// Check if `field` is one of this table's columns.
    #[must_use]
    pub fn has_field(self, field: &str) -> bool {
        self.fields().contains(&field)
    }

    /// Backing file name inside the data directory.
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Station => "station.csv",
            Self::Place => "place.csv",
            Self::Sensor => "sensor.csv",
            Self::Record => "record.csv",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Table {
    type Err = SensorNetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|t| t.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| SensorNetError::UnknownTable(s.to_string()))
    }
}

// =============================================================================
// TESTS
// =============================================================================
