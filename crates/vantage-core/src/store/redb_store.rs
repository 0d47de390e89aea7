//! # redb-backed Entity Store
//!
//! A disk-backed entity store using the redb embedded database, providing:
//! - ACID transactions
//! - Crash safety (copy-on-write B-trees)
//! - MVCC (concurrent readers, single writer)
//! - Zero configuration
//!
//! One table per entity type, keyed by the entity's u64 id with
//! postcard-encoded record bytes as values. Velocity values live in their
//! own table so the cache survives restarts.

use crate::store::{EntityStore, StoreCounts};
use crate::types::{
    Client, ClientId, Project, ProjectId, Task, Team, TeamId, User, UserId, VantageError,
};
use redb::{Database, ReadableDatabase, ReadableTable, ReadableTableMetadata, TableDefinition};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeSet;
use std::path::Path;

/// Table for users: UserId(u64) -> serialized User bytes
const USERS: TableDefinition<u64, &[u8]> = TableDefinition::new("users");

/// Table for teams: TeamId(u64) -> serialized Team bytes
const TEAMS: TableDefinition<u64, &[u8]> = TableDefinition::new("teams");

/// Table for clients: ClientId(u64) -> serialized Client bytes
const CLIENTS: TableDefinition<u64, &[u8]> = TableDefinition::new("clients");

/// Table for projects: ProjectId(u64) -> serialized Project bytes
const PROJECTS: TableDefinition<u64, &[u8]> = TableDefinition::new("projects");

/// Table for tasks: TaskId(u64) -> serialized Task bytes
const TASKS: TableDefinition<u64, &[u8]> = TableDefinition::new("tasks");

/// Table for cached team velocities: TeamId(u64) -> velocity
const VELOCITIES: TableDefinition<u64, f64> = TableDefinition::new("velocities");

// =============================================================================
// REDBSTORE IMPLEMENTATION
// =============================================================================

/// A disk-backed entity store using redb.
///
/// Listing methods iterate the B-tree in key order, which satisfies the
/// ascending-id ordering contract of `EntityStore`.
pub struct RedbStore {
    /// The redb database handle.
    db: Database,
}

impl std::fmt::Debug for RedbStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbStore").finish_non_exhaustive()
    }
}

impl RedbStore {
    /// Open or create an entity database at the given path.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VantageError> {
        let db =
            Database::create(path.as_ref()).map_err(|e| VantageError::IoError(e.to_string()))?;

        // Initialize tables if they don't exist
        {
            let write_txn = db
                .begin_write()
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(USERS)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(TEAMS)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(CLIENTS)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(PROJECTS)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(TASKS)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            let _ = write_txn
                .open_table(VELOCITIES)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            write_txn
                .commit()
                .map_err(|e| VantageError::IoError(e.to_string()))?;
        }

        Ok(Self { db })
    }

    /// Compact the database (optional optimization).
    pub fn compact(&mut self) -> Result<(), VantageError> {
        self.db
            .compact()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        Ok(())
    }

    /// All cached team velocities, ascending team id.
    pub fn velocities(&self) -> Result<Vec<(TeamId, f64)>, VantageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(VELOCITIES)
            .map_err(|e| VantageError::IoError(e.to_string()))?;

        let mut velocities = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| VantageError::IoError(e.to_string()))?
        {
            let (key, value) = entry.map_err(|e| VantageError::IoError(e.to_string()))?;
            velocities.push((TeamId(key.value()), value.value()));
        }
        Ok(velocities)
    }

    /// Persist a cached team velocity.
    pub fn put_velocity(&mut self, team: TeamId, value: f64) -> Result<(), VantageError> {
        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(VELOCITIES)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            table
                .insert(team.0, value)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Read every record of a table in key order.
    fn scan<T: DeserializeOwned>(
        &self,
        table: TableDefinition<'static, u64, &'static [u8]>,
    ) -> Result<Vec<T>, VantageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(table)
            .map_err(|e| VantageError::IoError(e.to_string()))?;

        let mut records = Vec::new();
        for entry in table
            .iter()
            .map_err(|e| VantageError::IoError(e.to_string()))?
        {
            let (_, value) = entry.map_err(|e| VantageError::IoError(e.to_string()))?;
            let record: T = postcard::from_bytes(value.value())
                .map_err(|e| VantageError::DeserializationError(e.to_string()))?;
            records.push(record);
        }
        Ok(records)
    }

    /// Read one record by key.
    fn fetch<T: DeserializeOwned>(
        &self,
        table: TableDefinition<'static, u64, &'static [u8]>,
        key: u64,
    ) -> Result<Option<T>, VantageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(table)
            .map_err(|e| VantageError::IoError(e.to_string()))?;

        match table
            .get(key)
            .map_err(|e| VantageError::IoError(e.to_string()))?
        {
            Some(data) => {
                let record: T = postcard::from_bytes(data.value())
                    .map_err(|e| VantageError::DeserializationError(e.to_string()))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// Insert or replace one record in a single transaction.
    fn store_record<T: Serialize>(
        &mut self,
        table: TableDefinition<'static, u64, &'static [u8]>,
        key: u64,
        record: &T,
    ) -> Result<(), VantageError> {
        let bytes = postcard::to_allocvec(record)
            .map_err(|e| VantageError::SerializationError(e.to_string()))?;

        let write_txn = self
            .db
            .begin_write()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        {
            let mut table = write_txn
                .open_table(table)
                .map_err(|e| VantageError::IoError(e.to_string()))?;
            table
                .insert(key, bytes.as_slice())
                .map_err(|e| VantageError::IoError(e.to_string()))?;
        }
        write_txn
            .commit()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        Ok(())
    }

    /// Number of records in a table.
    fn table_len(
        &self,
        table: TableDefinition<'static, u64, &'static [u8]>,
    ) -> Result<u64, VantageError> {
        let read_txn = self
            .db
            .begin_read()
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        let table = read_txn
            .open_table(table)
            .map_err(|e| VantageError::IoError(e.to_string()))?;
        table
            .len()
            .map_err(|e| VantageError::IoError(e.to_string()))
    }
}

// =============================================================================
// ENTITYSTORE TRAIT IMPLEMENTATION
// =============================================================================

impl EntityStore for RedbStore {
    fn clients(&self) -> Result<Vec<Client>, VantageError> {
        self.scan(CLIENTS)
    }

    fn client(&self, id: ClientId) -> Result<Option<Client>, VantageError> {
        self.fetch(CLIENTS, id.0)
    }

    fn teams(&self) -> Result<Vec<Team>, VantageError> {
        self.scan(TEAMS)
    }

    fn team(&self, id: TeamId) -> Result<Option<Team>, VantageError> {
        self.fetch(TEAMS, id.0)
    }

    fn user(&self, id: UserId) -> Result<Option<User>, VantageError> {
        self.fetch(USERS, id.0)
    }

    fn projects_of(&self, client: ClientId) -> Result<Vec<Project>, VantageError> {
        let projects: Vec<Project> = self.scan(PROJECTS)?;
        Ok(projects.into_iter().filter(|p| p.client == client).collect())
    }

    fn tasks_of(&self, project: ProjectId) -> Result<Vec<Task>, VantageError> {
        let tasks: Vec<Task> = self.scan(TASKS)?;
        Ok(tasks.into_iter().filter(|t| t.project == project).collect())
    }

    fn tasks(&self) -> Result<Vec<Task>, VantageError> {
        self.scan(TASKS)
    }

    fn project_count(&self, client: ClientId) -> Result<u64, VantageError> {
        Ok(self.projects_of(client)?.len() as u64)
    }

    fn budget_total(&self, client: ClientId) -> Result<f64, VantageError> {
        Ok(self.projects_of(client)?.iter().map(|p| p.budget).sum())
    }

    fn billable_hours_total(&self, client: ClientId) -> Result<f64, VantageError> {
        let owned: BTreeSet<ProjectId> =
            self.projects_of(client)?.into_iter().map(|p| p.id).collect();
        let tasks: Vec<Task> = self.scan(TASKS)?;
        Ok(tasks
            .iter()
            .filter(|t| owned.contains(&t.project))
            .map(|t| t.billable_hours)
            .sum())
    }

    fn put_user(&mut self, user: User) -> Result<(), VantageError> {
        self.store_record(USERS, user.id.0, &user)
    }

    fn put_team(&mut self, team: Team) -> Result<(), VantageError> {
        self.store_record(TEAMS, team.id.0, &team)
    }

    fn put_client(&mut self, client: Client) -> Result<(), VantageError> {
        self.store_record(CLIENTS, client.id.0, &client)
    }

    fn put_project(&mut self, project: Project) -> Result<(), VantageError> {
        self.store_record(PROJECTS, project.id.0, &project)
    }

    fn put_task(&mut self, task: Task) -> Result<(), VantageError> {
        self.store_record(TASKS, task.id.0, &task)
    }

    fn counts(&self) -> Result<StoreCounts, VantageError> {
        Ok(StoreCounts {
            users: self.table_len(USERS)?,
            teams: self.table_len(TEAMS)?,
            clients: self.table_len(CLIENTS)?,
            projects: self.table_len(PROJECTS)?,
            tasks: self.table_len(TASKS)?,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
