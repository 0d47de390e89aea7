//! # vantage-core
//!
//! The deterministic reporting engine for Vantage - THE LOGIC.
//!
//! This crate turns raw client engagement records (clients, teams,
//! projects, tasks) into delivery-health report pages: it derives the
//! metrics, assembles the summaries, then filters, sorts, paginates,
//! and encodes the result.
//!
//! ## Pipeline
//!
//! - `metrics` - pure per-project and per-client derivations
//! - `summary` - assembles project and client summary records
//! - `report` - scope/attribute filters, stable sort, pagination
//! - `render` - structured envelope, CSV, and workbook encodings
//!
//! ## Architectural Constraints
//!
//! The CORE:
//! - Is deterministic: identical store contents and query yield an
//!   identical page
//! - Builds summaries fresh per request; nothing derived is persisted
//! - Holds exactly one piece of shared mutable state, the per-team
//!   velocity cache
//! - Has NO async, NO network dependencies (pure Rust)

// =============================================================================
// MODULES
// =============================================================================

pub mod metrics;
pub mod render;
pub mod report;
pub mod store;
pub mod summary;
pub mod types;
pub mod velocity;
pub mod workspace;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    Client, ClientId, ClientSummary, DeliveryHealth, Project, ProjectId, ProjectStatus,
    ProjectSummary, Role, Task, TaskId, Team, TeamId, User, UserId, VantageError,
};

// =============================================================================
// RE-EXPORTS: Reporting Engine
// =============================================================================

pub use render::{EXPORT_COLUMNS, PageEnvelope, SHEET_NAME, to_csv, to_xlsx};
pub use report::{
    DEFAULT_PAGE_SIZE, ExportFormat, MAX_PAGE_SIZE, REPORT_RECENCY_DAYS, ReportPage, ReportQuery,
    ReportRequest, SortKey, SortSpec, run_report,
};
pub use velocity::{VelocityCache, recompute_team_velocities};

// =============================================================================
// RE-EXPORTS: Storage
// =============================================================================

pub use store::{EntityStore, MemoryStore, RedbStore, StoreCounts};
pub use workspace::{Snapshot, StoreBackend, Workspace};
