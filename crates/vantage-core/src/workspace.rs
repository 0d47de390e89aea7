//! # Workspace Module
//!
//! A workspace combines an entity store with the velocity cache and is
//! the single entry point the app layer talks to.
//!
//! ## Storage Backends
//!
//! - `InMemory`: volatile [`MemoryStore`], for tests and ad-hoc runs
//! - `Persistent`: disk-backed [`RedbStore`]; velocity writes go through
//!   to disk and are loaded back into the cache on open

use crate::report::{self, ReportPage, ReportQuery};
use crate::store::{EntityStore, MemoryStore, RedbStore, StoreCounts};
use crate::types::{Client, Project, Task, Team, TeamId, User, VantageError};
use crate::velocity::{self, VelocityCache};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Storage backend for a workspace.
#[derive(Debug)]
pub enum StoreBackend {
    /// In-memory store (fast, volatile).
    InMemory(MemoryStore),
    /// Disk-backed store using redb (ACID, persistent).
    Persistent(RedbStore),
}

impl Default for StoreBackend {
    fn default() -> Self {
        Self::InMemory(MemoryStore::new())
    }
}

// NOTE: StoreBackend does NOT implement Clone.
// RedbStore (database handle) cannot be safely cloned.

/// Full entity snapshot, the import/export wire format.
///
/// Every section is optional in the serialized form; a fixture may carry
/// only the entities it needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub teams: Vec<Team>,
    #[serde(default)]
    pub clients: Vec<Client>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub tasks: Vec<Task>,
}

/// An entity store plus the team velocity cache.
#[derive(Debug, Default)]
pub struct Workspace {
    backend: StoreBackend,
    velocities: VelocityCache,
}

impl Workspace {
    /// Create an empty workspace with in-memory storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a workspace over an existing in-memory store.
    #[must_use]
    pub fn with_store(store: MemoryStore) -> Self {
        Self {
            backend: StoreBackend::InMemory(store),
            velocities: VelocityCache::new(),
        }
    }

    /// Create a workspace with persistent redb storage.
    ///
    /// Opens or creates a database at the given path and loads the
    /// persisted velocity entries into the cache.
    pub fn with_redb(path: impl AsRef<Path>) -> Result<Self, VantageError> {
        let store = RedbStore::open(path)?;
        let velocities = VelocityCache::from_pairs(store.velocities()?);
        Ok(Self {
            backend: StoreBackend::Persistent(store),
            velocities,
        })
    }

    /// Check if using persistent storage.
    #[must_use]
    pub fn is_persistent(&self) -> bool {
        matches!(self.backend, StoreBackend::Persistent(_))
    }

    /// The entity store, backend-agnostic.
    #[must_use]
    pub fn store(&self) -> &dyn EntityStore {
        match &self.backend {
            StoreBackend::InMemory(store) => store,
            StoreBackend::Persistent(store) => store,
        }
    }

    #[must_use]
    pub fn store_mut(&mut self) -> &mut dyn EntityStore {
        match &mut self.backend {
            StoreBackend::InMemory(store) => store,
            StoreBackend::Persistent(store) => store,
        }
    }

    /// Read view of the velocity cache.
    #[must_use]
    pub fn velocities(&self) -> &VelocityCache {
        &self.velocities
    }

    // =========================================================================
    // VELOCITY WRITES
    // =========================================================================

    /// Write one velocity entry, through to disk when persistent.
    pub fn set_velocity(&mut self, team: TeamId, value: f64) -> Result<(), VantageError> {
        if let StoreBackend::Persistent(store) = &mut self.backend {
            store.put_velocity(team, value)?;
        }
        self.velocities.set(team, value);
        Ok(())
    }

    /// Recompute every team's velocity from the task history and apply
    /// the results. Returns the applied (team, velocity) pairs.
    pub fn recompute_velocities(
        &mut self,
        today: NaiveDate,
    ) -> Result<Vec<(TeamId, f64)>, VantageError> {
        let results = velocity::recompute_team_velocities(self.store(), today)?;
        for (team, value) in &results {
            self.set_velocity(*team, *value)?;
        }
        Ok(results)
    }

    // =========================================================================
    // REPORTING
    // =========================================================================

    /// Run the report pipeline against this workspace.
    pub fn report(
        &self,
        requester: &User,
        query: &ReportQuery,
        today: NaiveDate,
    ) -> Result<ReportPage, VantageError> {
        report::run_report(self.store(), requester, query, &self.velocities, today)
    }

    // =========================================================================
    // IMPORT & MAINTENANCE
    // =========================================================================

    /// Load a snapshot into the store. Existing records with matching ids
    /// are replaced. Returns the counts of the imported snapshot.
    pub fn import(&mut self, snapshot: Snapshot) -> Result<StoreCounts, VantageError> {
        let counts = StoreCounts {
            users: snapshot.users.len() as u64,
            teams: snapshot.teams.len() as u64,
            clients: snapshot.clients.len() as u64,
            projects: snapshot.projects.len() as u64,
            tasks: snapshot.tasks.len() as u64,
        };

        let store = self.store_mut();
        for user in snapshot.users {
            store.put_user(user)?;
        }
        for team in snapshot.teams {
            store.put_team(team)?;
        }
        for client in snapshot.clients {
            store.put_client(client)?;
        }
        for project in snapshot.projects {
            store.put_project(project)?;
        }
        for task in snapshot.tasks {
            store.put_task(task)?;
        }
        Ok(counts)
    }

    /// Entity counts for the status surface.
    pub fn counts(&self) -> Result<StoreCounts, VantageError> {
        self.store().counts()
    }
}

// =============================================================================
// TESTS
// =============================================================================
