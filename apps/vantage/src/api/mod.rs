//! # Vantage HTTP API Module
//!
//! This module implements the HTTP REST API server using axum.
//!
//! ## Endpoints
//!
//! - `GET /project-health` - Run the delivery health report (JSON page or export download)
//! - `GET /status` - Get store record counts
//! - `GET /health` - Health check (no authentication)
//!
//! ## Security Configuration (Environment Variables)
//!
//! - `VANTAGE_API_KEYS`: Comma-separated `token:user_id` pairs granting access
//! - `VANTAGE_TOKENS_FILE`: TOML token file, consulted when `VANTAGE_API_KEYS` is unset
//! - `VANTAGE_CORS_ORIGINS`: Comma-separated list of allowed origins, or "*" for all (default: localhost only)
//! - `VANTAGE_RATE_LIMIT`: Requests per second (default: 100, 0 to disable)
//! - `VANTAGE_CACHE_TTL`: Report cache TTL in seconds (default: 600, 0 to disable)

mod auth;
mod cache;
mod handlers;
mod middleware;
mod types;

// Re-exports for external use
pub use auth::TokenTable;
pub use cache::{ResponseCache, cache_ttl_from_env};
pub use middleware::rate_limiter_from_env;
// Re-export handlers and types for integration tests (via `vantage::api::*`)
#[allow(unused_imports)]
pub use auth::Requester;
#[allow(unused_imports)]
pub use handlers::{health_handler, report_handler, status_handler};
#[allow(unused_imports)]
pub use types::{ErrorBody, HealthResponse, StatusResponse};

use axum::{
    Router,
    http::{HeaderValue, Method, header},
    middleware as axum_middleware,
    routing::get,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use vantage_core::{VantageError, Workspace};

// =============================================================================
// SERVER STATE
// =============================================================================

/// Shared server state: the workspace plus the report response cache.
#[derive(Clone)]
pub struct AppState {
    /// The workspace containing the entity store.
    pub workspace: Arc<RwLock<Workspace>>,
    /// TTL cache for rendered report pages.
    pub cache: Arc<ResponseCache>,
}

impl AppState {
    /// Create new app state around a workspace.
    #[must_use]
    pub fn new(workspace: Workspace) -> Self {
        Self {
            workspace: Arc::new(RwLock::new(workspace)),
            cache: Arc::new(ResponseCache::new(cache_ttl_from_env())),
        }
    }
}

// =============================================================================
// CORS CONFIGURATION
// =============================================================================

/// Build CORS layer from environment configuration.
///
/// Reads `VANTAGE_CORS_ORIGINS` environment variable:
/// - If "*": allows all origins (development mode - use with caution!)
/// - If not set: defaults to localhost only (restrictive default)
/// - Otherwise: parses comma-separated list of allowed origins
fn build_cors_layer() -> CorsLayer {
    let origins_env = std::env::var("VANTAGE_CORS_ORIGINS").ok();

    match origins_env.as_deref() {
        Some("*") => {
            // Explicit wildcard - warn about security implications
            tracing::warn!(
                "CORS: Allowing ALL origins (VANTAGE_CORS_ORIGINS=*). This is insecure for production!"
            );
            CorsLayer::permissive()
        }
        Some(origins) => {
            // Parse comma-separated origins
            let allowed_origins: Vec<HeaderValue> = origins
                .split(',')
                .filter_map(|s| {
                    let trimmed = s.trim();
                    match trimmed.parse::<HeaderValue>() {
                        Ok(hv) => {
                            tracing::info!("CORS: Allowing origin: {}", trimmed);
                            Some(hv)
                        }
                        Err(e) => {
                            tracing::warn!("CORS: Invalid origin '{}': {}", trimmed, e);
                            None
                        }
                    }
                })
                .collect();

            if allowed_origins.is_empty() {
                tracing::warn!(
                    "CORS: No valid origins in VANTAGE_CORS_ORIGINS, defaulting to localhost only"
                );
                build_localhost_cors()
            } else {
                CorsLayer::new()
                    .allow_origin(allowed_origins)
                    .allow_methods([Method::GET, Method::OPTIONS])
                    .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
            }
        }
        None => {
            // No configuration - default to localhost only (restrictive)
            tracing::info!("CORS: No VANTAGE_CORS_ORIGINS set, defaulting to localhost only");
            build_localhost_cors()
        }
    }
}

/// Build a restrictive CORS layer that only allows localhost origins.
fn build_localhost_cors() -> CorsLayer {
    let localhost_origins = vec![
        "http://localhost:3000".parse::<HeaderValue>().ok(),
        "http://localhost:8080".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:3000".parse::<HeaderValue>().ok(),
        "http://127.0.0.1:8080".parse::<HeaderValue>().ok(),
    ];
    let origins: Vec<HeaderValue> = localhost_origins.into_iter().flatten().collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_methods([Method::GET, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

// =============================================================================
// ROUTER CREATION
// =============================================================================

/// Create the axum router with all endpoints and middleware.
///
/// Middleware stack (outer to inner):
/// 1. Tracing - logs all requests
/// 2. CORS - handles preflight requests
/// 3. Rate Limiting - protects against DoS (if enabled)
/// 4. Authentication - resolves the bearer token to a requester
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer();

    let rate_limiter = rate_limiter_from_env();

    // Authentication is never optional here: the report is scoped to the
    // requester, so every data endpoint needs a resolved identity.
    let tokens = Arc::new(TokenTable::from_env());
    if tokens.is_empty() {
        tracing::warn!(
            "No API tokens configured - every data endpoint will reject with 401. \
             Set VANTAGE_API_KEYS or VANTAGE_TOKENS_FILE to grant access."
        );
    } else {
        tracing::info!("Bearer token auth: {} tokens loaded", tokens.len());
    }

    // Build base router with routes
    let mut router = Router::new()
        .route("/health", get(handlers::health_handler))
        .route("/status", get(handlers::status_handler))
        .route("/project-health", get(handlers::report_handler));

    // Apply authentication middleware (innermost - runs last on request)
    router = router.layer(axum_middleware::from_fn_with_state(
        tokens,
        auth::bearer_auth_middleware,
    ));

    // Apply rate limiting middleware
    if let Some(limiter) = rate_limiter {
        router = router.layer(axum_middleware::from_fn_with_state(
            limiter,
            middleware::rate_limit_middleware,
        ));
    }

    // Apply CORS and tracing (outermost layers)
    router
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// =============================================================================
// SERVER STARTUP
// =============================================================================

/// Start the HTTP server.
pub async fn run_server(addr: &str, workspace: Workspace) -> Result<(), VantageError> {
    let state = AppState::new(workspace);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| VantageError::IoError(format!("Bind failed: {}", e)))?;

    tracing::info!("Vantage HTTP server listening on {}", addr);

    axum::serve(listener, router)
        .await
        .map_err(|e| VantageError::IoError(format!("Server error: {}", e)))
}
