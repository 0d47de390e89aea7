//! # Authentication Module
//!
//! Bearer token authentication for the Vantage HTTP API. Every token maps
//! to a user id, so the report handler always knows who is asking.
//!
//! ## Configuration
//!
//! Tokens come from one of two sources, checked in order:
//! - `VANTAGE_API_KEYS`: comma-separated `token:user_id` pairs
//! - `VANTAGE_TOKENS_FILE`: path to a TOML file with a `[tokens]` table
//!   mapping each token to a user id
//!
//! With no tokens configured, every data endpoint rejects with 401.
//!
//! ## Usage
//!
//! Send the token in the Authorization header:
//! ```text
//! Authorization: Bearer <your-token>
//! ```

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use vantage_core::UserId;

// =============================================================================
// TOKEN TABLE
// =============================================================================

/// TOML shape of `VANTAGE_TOKENS_FILE`: a `[tokens]` table of token to
/// user id.
#[derive(Debug, Deserialize)]
struct TokenFile {
    tokens: BTreeMap<String, u64>,
}

/// Configured bearer tokens and the user each one authenticates as.
#[derive(Debug, Clone)]
pub struct TokenTable {
    entries: Vec<(String, UserId)>,
}

impl TokenTable {
    /// Load the token table from the environment.
    ///
    /// `VANTAGE_API_KEYS` takes precedence over `VANTAGE_TOKENS_FILE`.
    /// Malformed entries are skipped with a warning; an unreadable or
    /// unparseable file yields an empty table.
    pub fn from_env() -> Self {
        if let Ok(raw) = std::env::var("VANTAGE_API_KEYS") {
            if !raw.trim().is_empty() {
                return Self {
                    entries: parse_pairs(&raw),
                };
            }
        }
        if let Ok(path) = std::env::var("VANTAGE_TOKENS_FILE") {
            if !path.trim().is_empty() {
                return Self {
                    entries: load_token_file(&path),
                };
            }
        }
        Self {
            entries: Vec::new(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Resolve a presented token to a user id.
    ///
    /// Every configured entry is compared in constant time, and the scan
    /// never breaks early, so the response time does not reveal which
    /// entry (if any) matched. Both sides are padded to the same length
    /// so `ct_eq` always runs over the same number of bytes, preventing
    /// length-leaking side channels.
    pub fn lookup(&self, provided: &str) -> Option<UserId> {
        let provided_bytes = provided.as_bytes();
        let mut matched = None;
        for (token, user) in &self.entries {
            let expected_bytes = token.as_bytes();

            let max_len = provided_bytes.len().max(expected_bytes.len());
            let mut padded_provided = vec![0u8; max_len];
            let mut padded_expected = vec![0u8; max_len];
            padded_provided[..provided_bytes.len()].copy_from_slice(provided_bytes);
            padded_expected[..expected_bytes.len()].copy_from_slice(expected_bytes);

            let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
            if bytes_match && provided_bytes.len() == expected_bytes.len() && matched.is_none() {
                matched = Some(*user);
            }
        }
        matched
    }
}

/// Parse comma-separated `token:user_id` pairs.
///
/// Malformed entries are skipped with a warning. The warnings never echo
/// the entry itself, since it may contain a partial secret.
fn parse_pairs(raw: &str) -> Vec<(String, UserId)> {
    let mut entries = Vec::new();
    for pair in raw.split(',') {
        let pair = pair.trim();
        if pair.is_empty() {
            continue;
        }
        let Some((token, id)) = pair.split_once(':') else {
            tracing::warn!("Skipping VANTAGE_API_KEYS entry without a ':' separator");
            continue;
        };
        let token = token.trim();
        if token.is_empty() {
            tracing::warn!("Skipping VANTAGE_API_KEYS entry with an empty token");
            continue;
        }
        match id.trim().parse::<u64>() {
            Ok(id) => entries.push((token.to_string(), UserId(id))),
            Err(_) => {
                tracing::warn!("Skipping VANTAGE_API_KEYS entry with a non-numeric user id");
            }
        }
    }
    entries
}

/// Read and parse a `VANTAGE_TOKENS_FILE` TOML file.
fn load_token_file(path: &str) -> Vec<(String, UserId)> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) => {
            tracing::warn!(error = %e, path, "Failed to read token file");
            return Vec::new();
        }
    };
    match toml::from_str::<TokenFile>(&raw) {
        Ok(file) => file
            .tokens
            .into_iter()
            .map(|(token, id)| (token, UserId(id)))
            .collect(),
        Err(e) => {
            tracing::warn!(error = %e, path, "Failed to parse token file");
            Vec::new()
        }
    }
}

// =============================================================================
// BEARER TOKEN AUTHENTICATION
// =============================================================================

/// Identity attached to a request once its bearer token resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Requester(pub UserId);

/// Bearer token authentication middleware.
///
/// - `/health` is always allowed (for load balancer health checks)
/// - All other endpoints require `Authorization: Bearer <token>` (the raw
///   token without the `Bearer ` prefix is also accepted)
/// - A recognized token inserts a [`Requester`] extension for handlers
pub async fn bearer_auth_middleware(
    State(tokens): State<Arc<TokenTable>>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    // Always allow health endpoint (for load balancer checks)
    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    // Extract token from Authorization header
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(header_value) => {
            // Support both "Bearer <token>" and raw "<token>" formats
            let provided = header_value.strip_prefix("Bearer ").unwrap_or(header_value);

            match tokens.lookup(provided) {
                Some(user) => {
                    request.extensions_mut().insert(Requester(user));
                    Ok(next.run(request).await)
                }
                None => {
                    tracing::warn!(
                        event = "auth_failure",
                        reason = "invalid_token",
                        "Authentication failed: unrecognized bearer token"
                    );
                    Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
                }
            }
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
