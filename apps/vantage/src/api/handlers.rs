//! # API Endpoint Handlers
//!
//! This module implements the actual HTTP endpoint handlers.

use super::{
    AppState,
    auth::Requester,
    types::{ErrorBody, HealthResponse, StatusResponse},
};
use axum::{
    Extension, Json,
    extract::{Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use chrono::Local;
use vantage_core::{
    ExportFormat, PageEnvelope, ReportPage, ReportRequest, VantageError, to_csv, to_xlsx,
};

// =============================================================================
// HEALTH HANDLER
// =============================================================================

/// Health check endpoint.
pub async fn health_handler() -> impl IntoResponse {
    Json(HealthResponse::default())
}

// =============================================================================
// STATUS HANDLER
// =============================================================================

/// Get store status.
pub async fn status_handler(State(state): State<AppState>) -> Response {
    let workspace = state.workspace.read().await;
    let persistent = workspace.is_persistent();

    match workspace.counts() {
        Ok(counts) => {
            (StatusCode::OK, Json(StatusResponse::new(counts, persistent))).into_response()
        }
        Err(e) => error_response(&e),
    }
}

// =============================================================================
// REPORT HANDLER
// =============================================================================

/// Project health report for the authenticated requester.
///
/// Plain requests return a JSON page envelope, served from the response
/// cache when a fresh entry exists. `export=csv` and `export=excel`
/// render the page as an attachment download and bypass the cache.
pub async fn report_handler(
    State(state): State<AppState>,
    Extension(Requester(user_id)): Extension<Requester>,
    Query(request): Query<ReportRequest>,
) -> Response {
    let workspace = state.workspace.read().await;

    // The token resolved to an id; the store must still know the user.
    let user = match workspace.store().user(user_id) {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(ErrorBody::new("Unknown requester")),
            )
                .into_response();
        }
        Err(e) => return error_response(&e),
    };

    let query = match request.parse() {
        Ok(query) => query,
        Err(e) => return error_response(&e),
    };

    let today = Local::now().date_naive();

    // Export downloads bypass the cache
    if let Some(format) = query.export {
        return match workspace.report(&user, &query, today) {
            Ok(page) => export_download(&page, format),
            Err(e) => error_response(&e),
        };
    }

    let cache_key = format!("{}|{}", user.id.0, query.cache_key());
    if let Some(envelope) = state.cache.get(&cache_key) {
        return (StatusCode::OK, Json(envelope)).into_response();
    }

    match workspace.report(&user, &query, today) {
        Ok(page) => {
            let envelope = PageEnvelope::from(page);
            state.cache.insert(cache_key, envelope.clone());
            (StatusCode::OK, Json(envelope)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Render one page as an attachment download.
fn export_download(page: &ReportPage, format: ExportFormat) -> Response {
    let encoded = match format {
        ExportFormat::Csv => to_csv(page),
        ExportFormat::Excel => to_xlsx(page),
    };

    match encoded {
        Ok(bytes) => {
            let disposition = format!("attachment; filename=\"{}\"", format.file_name());
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, format.content_type().to_string()),
                    (header::CONTENT_DISPOSITION, disposition),
                ],
                bytes,
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// Map a core error onto the right status code with a JSON body.
///
/// `PageOutOfRange` is 404, the remaining request errors are 400, and
/// anything else is a 500 logged at error level.
fn error_response(err: &VantageError) -> Response {
    let status = match err {
        VantageError::PageOutOfRange(_) => StatusCode::NOT_FOUND,
        e if e.is_request_error() => StatusCode::BAD_REQUEST,
        _ => {
            tracing::error!(error = %err, "Report request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        }
    };
    (status, Json(ErrorBody::new(err.to_string()))).into_response()
}
