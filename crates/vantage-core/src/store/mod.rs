//! # Entity Store
//!
//! Storage collaborator for the reporting pipeline. The pipeline never
//! touches tables directly; it issues retrieval and aggregate requests
//! through the `EntityStore` trait.
//!
//! ## Storage Backends
//!
//! Two implementations are provided:
//! - `MemoryStore`: in-memory `BTreeMap` tables (fast, volatile)
//! - `RedbStore`: disk-backed redb tables with postcard-encoded values
//!
//! ## Ordering Contract
//!
//! All listing methods return records in ascending id order. Tie-breaks
//! elsewhere in the engine (lead developer, top teams) lean on this order
//! being deterministic.

pub mod memory;
pub mod redb_store;

pub use memory::MemoryStore;
pub use redb_store::RedbStore;

use crate::types::{
    Client, ClientId, Project, ProjectId, Task, Team, TeamId, User, UserId, VantageError,
};
use serde::{Deserialize, Serialize};

// =============================================================================
// ENTITYSTORE TRAIT
// =============================================================================

/// The EntityStore trait defines the retrieval and aggregation interface
/// the reporting pipeline runs against.
///
/// All fallible operations return `Result<T, VantageError>` so in-memory
/// and persistent backends behave uniformly. A store failure is fatal for
/// the enclosing report request; the pipeline never retries.
pub trait EntityStore {
    /// All clients, ascending id.
    fn clients(&self) -> Result<Vec<Client>, VantageError>;

    /// Lookup a single client.
    fn client(&self, id: ClientId) -> Result<Option<Client>, VantageError>;

    /// All teams, ascending id.
    fn teams(&self) -> Result<Vec<Team>, VantageError>;

    /// Lookup a single team.
    fn team(&self, id: TeamId) -> Result<Option<Team>, VantageError>;

    /// Lookup a single user.
    fn user(&self, id: UserId) -> Result<Option<User>, VantageError>;

    /// All projects belonging to a client, ascending id.
    fn projects_of(&self, client: ClientId) -> Result<Vec<Project>, VantageError>;

    /// All tasks belonging to a project, ascending id.
    fn tasks_of(&self, project: ProjectId) -> Result<Vec<Task>, VantageError>;

    /// Every task in the store, ascending id. Used by the velocity
    /// recompute job, which aggregates across projects.
    fn tasks(&self) -> Result<Vec<Task>, VantageError>;

    /// Aggregate: number of projects owned by a client.
    fn project_count(&self, client: ClientId) -> Result<u64, VantageError>;

    /// Aggregate: sum of project budgets for a client. 0 when none.
    fn budget_total(&self, client: ClientId) -> Result<f64, VantageError>;

    /// Aggregate: sum of billable hours across every task of every project
    /// of a client. 0 when none.
    fn billable_hours_total(&self, client: ClientId) -> Result<f64, VantageError>;

    /// Insert or replace a user record.
    fn put_user(&mut self, user: User) -> Result<(), VantageError>;

    /// Insert or replace a team record.
    fn put_team(&mut self, team: Team) -> Result<(), VantageError>;

    /// Insert or replace a client record.
    fn put_client(&mut self, client: Client) -> Result<(), VantageError>;

    /// Insert or replace a project record.
    fn put_project(&mut self, project: Project) -> Result<(), VantageError>;

    /// Insert or replace a task record.
    fn put_task(&mut self, task: Task) -> Result<(), VantageError>;

    /// Per-entity record counts.
    fn counts(&self) -> Result<StoreCounts, VantageError>;
}

// =============================================================================
// STORE COUNTS
// =============================================================================

/// Record counts per entity table, for status reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreCounts {
    pub users: u64,
    pub teams: u64,
    pub clients: u64,
    pub projects: u64,
    pub tasks: u64,
}
