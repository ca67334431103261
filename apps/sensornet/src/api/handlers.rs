//! # API Endpoint Handlers
//!
//! Reads take the engine's read lock; mutations take the write lock, so
//! writers never overlap each other or a reader.

use super::{
    AppState,
    types::{
        ApiError, DeleteRequest, DeleteResponse, FieldsResponse, HealthResponse, InsertResponse,
        QueryRequest, QueryResponse, RowRequest, StatusResponse, UpdateResponse,
    },
};
use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use sensornet_core::{RowId, Table};

fn parse_table(raw: &str) -> Result<Table, ApiError> {
    raw.parse::<Table>().map_err(ApiError::from)
}

// =============================================================================
// HEALTH / STATUS
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

/// Row counts per table.
pub async fn status_handler(State(state): State<AppState>) -> impl IntoResponse {
    let engine = state.engine.read().await;
    let response = StatusResponse::new(engine.status(), engine.is_persistent());
    (StatusCode::OK, Json(response))
}

/// Columns of a table and of its union view.
pub async fn fields_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
) -> Result<Json<FieldsResponse>, ApiError> {
    let table = parse_table(&table)?;
    let engine = state.engine.read().await;
    let response = FieldsResponse {
        table,
        fields: engine.fields(table).iter().map(ToString::to_string).collect(),
        union_fields: engine.union_fields(table)?,
    };
    Ok(Json(response))
}

// =============================================================================
// QUERY HANDLERS
// =============================================================================

/// Filter and project a single table.
pub async fn query_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let table = parse_table(&table)?;
    request.validate()?;

    let engine = state.engine.read().await;
    let frame = engine.query(table, &request.predicates, request.fields.as_deref())?;
    Ok(Json(QueryResponse::from_frame(table, &frame)))
}

/// Filter and project the union view of a table.
pub async fn union_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(request): Json<QueryRequest>,
) -> Result<Json<QueryResponse>, ApiError> {
    let table = parse_table(&table)?;
    request.validate()?;

    let engine = state.engine.read().await;
    let frame = engine.union_query(table, &request.predicates, request.fields.as_deref())?;
    Ok(Json(QueryResponse::from_frame(table, &frame)))
}

// =============================================================================
// MUTATION HANDLERS
// =============================================================================

/// Insert a row. Responds 201 with the assigned id.
pub async fn insert_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(request): Json<RowRequest>,
) -> Result<(StatusCode, Json<InsertResponse>), ApiError> {
    let table = parse_table(&table)?;
    request.validate()?;

    let mut engine = state.engine.write().await;
    let id = engine.insert(table, request.fields)?;
    tracing::info!(table = %table, id = %id, "Row inserted via API");
    Ok((StatusCode::CREATED, Json(InsertResponse { table, id })))
}

/// Update some fields of a row.
pub async fn update_handler(
    State(state): State<AppState>,
    Path((table, id)): Path<(String, u64)>,
    Json(request): Json<RowRequest>,
) -> Result<Json<UpdateResponse>, ApiError> {
    let table = parse_table(&table)?;
    request.validate()?;

    let id = RowId(id);
    let updated: Vec<String> = request.fields.keys().cloned().collect();
    let mut engine = state.engine.write().await;
    engine.update(table, id, request.fields)?;
    Ok(Json(UpdateResponse { table, id, updated }))
}

/// Delete a batch of ids; all or nothing.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(table): Path<String>,
    Json(request): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let table = parse_table(&table)?;
    request.validate()?;

    let mut engine = state.engine.write().await;
    let removed = engine.delete(table, &request.ids)?;
    tracing::info!(table = %table, removed, "Rows deleted via API");
    Ok(Json(DeleteResponse { table, removed }))
}
