//! # sensornet-core
//!
//! The table engine for a four-level sensor network hierarchy.
//!
//! ```text
//! Station -> Place -> Sensor -> Record
//! ```
//!
//! Each level is a table keyed by an integer `id`; every non-root table
//! carries a foreign key to its immediate parent. The engine provides:
//! - in-memory tables with engine-assigned ids (`store`, `mutation`)
//! - foreign-key checks on write and guarded deletes (`integrity`)
//! - predicate filtering and projection (`query`)
//! - denormalized ancestor views (`join`)
//! - delimited text persistence with load-time repair (`formats`, `storage`)
//!
//! ## Architectural Constraints
//!
//! - Synchronous, no async, no network dependencies
//! - No internal locking: a host shared across threads serializes writers
//! - Every successful mutation rewrites all four backing files

// =============================================================================
// MODULES
// =============================================================================

pub mod engine;
pub mod formats;
pub mod frame;
pub mod integrity;
pub mod join;
pub mod mutation;
pub mod primitives;
pub mod query;
pub mod schema;
pub mod storage;
pub mod store;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types
// =============================================================================

pub use frame::Frame;
pub use schema::Table;
pub use types::{Fields, RowId, SensorNetError, Value};

// =============================================================================
// RE-EXPORTS: Engines
// =============================================================================

pub use engine::{Engine, StorageBackend, StoreStatus};
pub use integrity::IntegrityEngine;
pub use join::JoinEngine;
pub use mutation::MutationEngine;
pub use query::{Bound, Predicate, Predicates, Query, QueryEngine};
pub use store::TableStore;

// =============================================================================
// RE-EXPORTS: Persistence
// =============================================================================

pub use formats::{DecodeError, table_from_bytes, table_to_bytes};
pub use storage::{CsvDirectory, Repair};
