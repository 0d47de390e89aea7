//! # Core Type Definitions
//!
//! This module contains all core types for the Vantage reporting engine:
//! - Entity identifiers (`ClientId`, `TeamId`, `ProjectId`, `TaskId`, `UserId`)
//! - Entity records (`Client`, `Team`, `Project`, `Task`, `User`)
//! - Derived summary records (`ProjectSummary`, `ClientSummary`)
//! - Error types (`VantageError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types implement `Ord` for deterministic ordering in
//! `BTreeMap`/`BTreeSet`. Summary records are derived per request and
//! never persisted; entity records are owned by the store.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Unique identifier for a client (the billing entity that owns projects).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ClientId(pub u64);

/// Unique identifier for a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TeamId(pub u64);

/// Unique identifier for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ProjectId(pub u64);

/// Unique identifier for a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TaskId(pub u64);

/// Unique identifier for a user (manager, developer, or admin).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub u64);

// =============================================================================
// ROLES & STATUS
// =============================================================================

/// Role of a requesting user. Admins see every client in scope;
/// managers see only the clients they manage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Manager,
}

impl Role {
    /// Whether this role has the elevated (all clients) report scope.
    #[must_use]
    pub const fn is_admin(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Lifecycle status of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Active,
    Completed,
    Overdue,
}

impl ProjectStatus {
    /// Canonical wire label, as stored and as matched by the status filter.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::Overdue => "overdue",
        }
    }
}

/// Delivery-health classification of a client, derived from the on-time
/// ratio of its completed projects over ALL of its projects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryHealth {
    NoProjects,
    OnTrack,
    AtRisk,
    Delayed,
}

impl DeliveryHealth {
    /// Canonical wire label. Also the sort key for `ordering=delivery_health`,
    /// which compares labels lexicographically.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NoProjects => "no_projects",
            Self::OnTrack => "on_track",
            Self::AtRisk => "at_risk",
            Self::Delayed => "delayed",
        }
    }
}

// =============================================================================
// ENTITY RECORDS
// =============================================================================

/// A reporting user. `role` drives the report scope filter; managers own
/// clients via `Client::manager`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub role: Role,
}

/// The billing/engagement entity that owns projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// Managing user, if assigned. Managers only see their own clients.
    pub manager: Option<UserId>,
}

/// A delivery team. Teams are a shared cross-reference between projects,
/// not part of the Client -> Project -> Task tree. Team velocity lives in
/// the velocity cache, not on this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Member set; BTreeSet for deterministic iteration.
    pub members: BTreeSet<UserId>,
}

/// A unit of delivery work with a budget, dates, status, and tasks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub client: ClientId,
    /// Assigned team, if any. Projects without a team report velocity 0.
    pub team: Option<TeamId>,
    pub name: String,
    pub status: ProjectStatus,
    pub budget: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
}

/// A billable unit of work within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project: ProjectId,
    pub assignee: Option<UserId>,
    pub completed: bool,
    /// Present iff completion was meaningfully recorded. A task may be
    /// flagged `completed` without a recorded date; such tasks are excluded
    /// from delay metrics.
    pub completed_at: Option<NaiveDate>,
    pub due_date: NaiveDate,
    /// Set at creation, never mutated.
    pub created_at: NaiveDate,
    pub billable_hours: f64,
}

impl Task {
    /// Days between recorded completion and due date, sign preserved.
    /// `None` unless the task is completed with a recorded date.
    #[must_use]
    pub fn completion_delay_days(&self) -> Option<i64> {
        if !self.completed {
            return None;
        }
        self.completed_at
            .map(|done| done.signed_duration_since(self.due_date).num_days())
    }

    /// Whether this task was completed strictly after its due date.
    /// Tasks without a recorded completion date are never late.
    #[must_use]
    pub fn completed_late(&self) -> bool {
        self.completion_delay_days().is_some_and(|days| days > 0)
    }
}

// =============================================================================
// SUMMARY RECORDS (derived, never persisted)
// =============================================================================

/// Derived per-project reporting view. Built fresh per request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectSummary {
    pub name: String,
    pub status: ProjectStatus,
    pub budget: f64,
    pub amount_spent: f64,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub tasks_completed_percent: f64,
    pub avg_task_delay: f64,
    /// Name of the assignee with the most tasks; absent when no task is
    /// assigned to a known user.
    pub lead_developer: Option<String>,
    pub team_velocity: f64,
}

/// Derived per-client reporting view with nested project summaries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientSummary {
    pub name: String,
    pub total_projects: u64,
    pub total_budget: f64,
    /// Computed from store aggregates; agrees with the sum of the child
    /// summaries' `amount_spent` by invariant.
    pub total_spent: f64,
    pub delivery_health: DeliveryHealth,
    pub overdue_projects: u64,
    /// Up to three team names, descending cached velocity.
    pub top_teams: Vec<String>,
    pub projects: Vec<ProjectSummary>,
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors that can occur in the Vantage reporting engine.
///
/// - Request-shaped errors (`InvalidParam`, `PageOutOfRange`,
///   `UnknownExportFormat`) are caller mistakes and map to client errors
///   at the transport layer.
/// - Store and codec errors are service faults; the whole request fails,
///   no partial summaries are returned.
#[derive(Debug, Error)]
pub enum VantageError {
    /// A query parameter failed validation (bad number, bad date, zero page).
    #[error("Invalid parameter: {0}")]
    InvalidParam(String),

    /// The requested page lies beyond the last page of the result set.
    #[error("Invalid page: {0}")]
    PageOutOfRange(u64),

    /// The `export` parameter named a format other than csv or excel.
    #[error("Unknown export format: {0}")]
    UnknownExportFormat(String),

    /// A serialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A deserialization error occurred.
    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),
}

impl VantageError {
    /// Whether this error was caused by the request rather than the service.
    #[must_use]
    pub const fn is_request_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParam(_) | Self::PageOutOfRange(_) | Self::UnknownExportFormat(_)
        )
    }
}

// =============================================================================
// TESTS
// =============================================================================
