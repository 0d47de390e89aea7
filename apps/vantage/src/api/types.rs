//! # API Request/Response Types
//!
//! This module defines the JSON structures for the HTTP API. The report
//! endpoint itself deserializes straight into [`vantage_core::ReportRequest`]
//! and serializes [`vantage_core::PageEnvelope`], so only the surrounding
//! envelope types live here.

use serde::{Deserialize, Serialize};
use vantage_core::StoreCounts;

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

/// Store status response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub users: u64,
    pub teams: u64,
    pub clients: u64,
    pub projects: u64,
    pub tasks: u64,
    pub persistent: bool,
}

impl StatusResponse {
    pub fn new(counts: StoreCounts, persistent: bool) -> Self {
        Self {
            users: counts.users,
            teams: counts.teams,
            clients: counts.clients,
            projects: counts.projects,
            tasks: counts.tasks,
            persistent,
        }
    }
}

// =============================================================================
// ERROR BODY
// =============================================================================

/// Error payload returned by every non-2xx data endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { error: msg.into() }
    }
}
