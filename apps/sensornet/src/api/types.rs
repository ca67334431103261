//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use sensornet_core::{
    Bound, Fields, Frame, Predicate, Predicates, RowId, SensorNetError, StoreStatus, Table, Value,
    primitives::{MAX_DELETE_BATCH, MAX_SET_VALUES, MAX_VALUE_LENGTH},
};
use serde::{Deserialize, Serialize};

// =============================================================================
// HEALTH RESPONSE
// =============================================================================

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "ok".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

// =============================================================================
// STATUS RESPONSE
// =============================================================================

/// Row counts per table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub persistent: bool,
    pub stations: usize,
    pub places: usize,
    pub sensors: usize,
    pub records: usize,
    pub total: usize,
}

impl StatusResponse {
    #[must_use]
    pub fn new(status: StoreStatus, persistent: bool) -> Self {
        Self {
            persistent,
            stations: status.stations,
            places: status.places,
            sensors: status.sensors,
            records: status.records,
            total: status.total(),
        }
    }
}

// =============================================================================
// FIELDS RESPONSE
// =============================================================================

/// Columns of a table and of its union view.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldsResponse {
    pub table: Table,
    pub fields: Vec<String>,
    pub union_fields: Vec<String>,
}

// =============================================================================
// QUERY REQUEST/RESPONSE
// =============================================================================

/// Body of `/tables/{table}/query` and `/tables/{table}/union`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Field to predicate map; all must hold.
    #[serde(default)]
    pub predicates: Predicates,
    /// Projection, in output order. All columns when absent.
    #[serde(default)]
    pub fields: Option<Vec<String>>,
}

impl QueryRequest {
    /// Reject oversized predicates before they reach the engine.
    pub fn validate(&self) -> Result<(), SensorNetError> {
        for (field, predicate) in &self.predicates {
            let values: Vec<&Value> = match predicate {
                Predicate::Exact(v) => vec![v],
                Predicate::Range(low, high) => [low, high]
                    .into_iter()
                    .filter_map(|b| match b {
                        Bound::Included(v) => Some(v),
                        Bound::Unbounded => None,
                    })
                    .collect(),
                Predicate::Any(set) => {
                    if set.len() > MAX_SET_VALUES {
                        return Err(SensorNetError::InvalidPredicate(format!(
                            "{}: set of {} values exceeds maximum {}",
                            field,
                            set.len(),
                            MAX_SET_VALUES
                        )));
                    }
                    set.iter().collect()
                }
            };
            validate_values(values)?;
        }
        Ok(())
    }
}

/// Matching rows in column order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub table: Table,
    pub count: usize,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl QueryResponse {
    #[must_use]
    pub fn from_frame(table: Table, frame: &Frame) -> Self {
        Self {
            table,
            count: frame.len(),
            columns: frame.columns().to_vec(),
            rows: frame.rows().to_vec(),
        }
    }
}

// =============================================================================
// MUTATION REQUESTS/RESPONSES
// =============================================================================

/// Body of insert and update requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowRequest {
    pub fields: Fields,
}

impl RowRequest {
    /// Reject oversized text values.
    pub fn validate(&self) -> Result<(), SensorNetError> {
        validate_values(self.fields.values())
    }
}

/// Result of an insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InsertResponse {
    pub table: Table,
    pub id: RowId,
}

/// Result of an update.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdateResponse {
    pub table: Table,
    pub id: RowId,
    pub updated: Vec<String>,
}

/// Body of a batch delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteRequest {
    pub ids: Vec<RowId>,
}

impl DeleteRequest {
    /// Bound the batch size.
    pub fn validate(&self) -> Result<(), SensorNetError> {
        if self.ids.len() > MAX_DELETE_BATCH {
            return Err(SensorNetError::SerializationError(format!(
                "Delete batch of {} ids exceeds maximum {}",
                self.ids.len(),
                MAX_DELETE_BATCH
            )));
        }
        Ok(())
    }
}

/// Result of a batch delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteResponse {
    pub table: Table,
    pub removed: usize,
}

fn validate_values<'a>(values: impl IntoIterator<Item = &'a Value>) -> Result<(), SensorNetError> {
    for value in values {
        match value {
            Value::Text(text) if text.len() > MAX_VALUE_LENGTH => {
                return Err(SensorNetError::SerializationError(format!(
                    "Value length {} exceeds maximum {} bytes",
                    text.len(),
                    MAX_VALUE_LENGTH
                )));
            }
            _ => {}
        }
    }
    Ok(())
}

// =============================================================================
// ERRORS
// =============================================================================

/// JSON error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub kind: String,
}

/// Engine error carried out of a handler.
#[derive(Debug)]
pub struct ApiError(pub SensorNetError);

impl From<SensorNetError> for ApiError {
    fn from(err: SensorNetError) -> Self {
        Self(err)
    }
}

impl ApiError {
    /// HTTP status for the wrapped error.
    #[must_use]
    pub fn status(&self) -> StatusCode {
        match self.0 {
            SensorNetError::IndexNotFound { .. } => StatusCode::NOT_FOUND,
            SensorNetError::ForeignKeyNotFound { .. } | SensorNetError::DeleteBlocked { .. } => {
                StatusCode::CONFLICT
            }
            SensorNetError::FieldNotFound { .. }
            | SensorNetError::ImmutableField { .. }
            | SensorNetError::UnknownTable(_)
            | SensorNetError::InvalidPredicate(_)
            | SensorNetError::SerializationError(_) => StatusCode::BAD_REQUEST,
            SensorNetError::IoError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self.0 {
            SensorNetError::ForeignKeyNotFound { .. } => "foreign_key_not_found",
            SensorNetError::DeleteBlocked { .. } => "delete_blocked",
            SensorNetError::IndexNotFound { .. } => "index_not_found",
            SensorNetError::FieldNotFound { .. } => "field_not_found",
            SensorNetError::ImmutableField { .. } => "immutable_field",
            SensorNetError::UnknownTable(_) => "unknown_table",
            SensorNetError::InvalidPredicate(_) => "invalid_predicate",
            SensorNetError::SerializationError(_) => "invalid_request",
            SensorNetError::IoError(_) => "io_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self.0, "Request failed");
        }
        let body = ErrorResponse {
            error: self.0.to_string(),
            kind: self.kind().to_string(),
        };
        (status, Json(body)).into_response()
    }
}

// =============================================================================
// TESTS
// =============================================================================
