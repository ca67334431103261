//! # Sensornet HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /health` - Health check
//! - `GET /status` - Row counts per table
//! - `GET /tables/{table}/fields` - Columns of a table and its union view
//! - `POST /tables/{table}/query` - Filter and project a table
//! - `POST /tables/{table}/union` - Filter and project the union view
//! - `POST /tables/{table}/rows` - Insert a row
//! - `PATCH /tables/{table}/rows/{id}` - Update a row
//! - `POST /tables/{table}/delete` - Delete a batch of ids
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `SENSORNET_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*"
//!   for all (default: localhost only)
//! - `SENSORNET_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `SENSORNET_API_KEY`: If set, requires Bearer token authentication

mod auth;
mod handlers;
mod middleware;
mod types;

pub use auth::{API_KEY_ENV, get_api_key_from_env};
pub use handlers::{
    delete_handler, fields_handler, health_handler, insert_handler, query_handler,
    status_handler, union_handler, update_handler,
};
pub use middleware::{RATE_LIMIT_ENV, create_rate_limiter, get_rate_limit_from_env};
pub use types::{
    ApiError, DeleteRequest, DeleteResponse, ErrorResponse, FieldsResponse, HealthResponse,
    InsertResponse, QueryRequest, QueryResponse, RowRequest, StatusResponse, UpdateResponse,
};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::{get, patch, post},
};
use sensornet_core::{Engine, SensorNetError};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Environment variable holding the allowed CORS origins.
pub const CORS_ORIGINS_ENV: &str = "SENSORNET_CORS_ORIGINS";

/// Maximum request body size (2 MiB).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state containing the engine.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RwLock<Engine>>,
}

impl AppState {
    #[must_use]
    pub fn new(engine: Engine) -> Self {
        Self {
            engine: Arc::new(RwLock::new(engine)),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

const CORS_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PATCH, Method::OPTIONS];

const LOCALHOST_ORIGINS: [&str; 4] = [
    "http://localhost:3000",
    "http://localhost:8080",
    "http://127.0.0.1:3000",
    "http://127.0.0.1:8080",
];

/// Resolve the `SENSORNET_CORS_ORIGINS` setting.
///
/// `*` allows any origin (`None`). Unset, or a list with no valid origin,
/// falls back to localhost. Invalid entries are skipped.
fn allowed_origins(setting: Option<&str>) -> Option<Vec<HeaderValue>> {
    if setting.map(str::trim) == Some("*") {
        return None;
    }
    let listed: Vec<HeaderValue> = setting
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|origin| {
            origin
                .parse::<HeaderValue>()
                .inspect_err(|e| tracing::warn!("CORS: Invalid origin '{}': {}", origin, e))
                .ok()
        })
        .collect();

    if listed.is_empty() {
        tracing::info!("CORS: No origins in {}, allowing localhost only", CORS_ORIGINS_ENV);
        return Some(
            LOCALHOST_ORIGINS
                .into_iter()
                .filter_map(|o| o.parse().ok())
                .collect(),
        );
    }
    Some(listed)
}

fn build_cors_layer(origins: Option<Vec<HeaderValue>>) -> CorsLayer {
    match origins {
        None => {
            tracing::warn!(
                "CORS: Allowing ALL origins ({}=*). This is insecure for production!",
                CORS_ORIGINS_ENV
            );
            CorsLayer::permissive()
        }
        Some(origins) => CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(CORS_METHODS)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]),
    }
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Body limit
/// 4. Rate Limiting (if enabled)
/// 5. Authentication (if configured)
pub fn create_router(state: AppState) -> Router {
    let rate_limit = get_rate_limit_from_env();
    let rate_limiter = if rate_limit > 0 {
        tracing::info!("Rate limiting enabled: {} requests/second", rate_limit);
        Some(create_rate_limiter(rate_limit))
    } else {
        tracing::info!("Rate limiting disabled");
        None
    };

    let has_auth = get_api_key_from_env().is_some();
    if has_auth {
        tracing::info!("API key authentication enabled");
    } else {
        tracing::warn!(
            "API key authentication DISABLED - all endpoints are publicly accessible! \
             Set {} to enable authentication.",
            API_KEY_ENV
        );
    }

    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/tables/{table}/fields", get(handlers::fields_handler))
        .route("/tables/{table}/query", post(handlers::query_handler))
        .route("/tables/{table}/union", post(handlers::union_handler))
        .route("/tables/{table}/rows", post(handlers::insert_handler))
        .route("/tables/{table}/rows/{id}", patch(handlers::update_handler))
        .route("/tables/{table}/delete", post(handlers::delete_handler));

    if has_auth {
        router = router.layer(axum_middleware::from_fn(auth::api_key_auth_middleware));
    }

    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    router
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(build_cors_layer(allowed_origins(
                    std::env::var(CORS_ORIGINS_ENV).ok().as_deref(),
                )))
                .layer(axum::extract::DefaultBodyLimit::max(MAX_BODY_BYTES)),
        )
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Bind `addr` and serve until the process is stopped.
pub async fn run_server(addr: &str, engine: Engine) -> Result<(), SensorNetError> {
    let router = create_router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| SensorNetError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Sensornet HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| SensorNetError::IoError(format!("Server error: {}", e)))
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_allows_any_origin() {
        assert!(allowed_origins(Some("*")).is_none());
        assert!(allowed_origins(Some(" * ")).is_none());
    }

    #[test]
    fn unset_falls_back_to_localhost() {
        let origins = allowed_origins(None).expect("list");
        assert_eq!(origins.len(), LOCALHOST_ORIGINS.len());
        assert_eq!(origins[0], "http://localhost:3000");
    }

    #[test]
    fn listed_origins_are_trimmed() {
        let origins =
            allowed_origins(Some("https://a.example, https://b.example,")).expect("list");
        assert_eq!(origins, vec!["https://a.example", "https://b.example"]);
    }

    #[test]
    fn only_invalid_origins_fall_back_to_localhost() {
        let origins = allowed_origins(Some("bad\norigin")).expect("list");
        assert_eq!(origins.len(), LOCALHOST_ORIGINS.len());
    }
}
