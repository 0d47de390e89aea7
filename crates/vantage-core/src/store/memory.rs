//! # In-Memory Entity Store
//!
//! `BTreeMap`-backed implementation of the `EntityStore` trait.
//! All data structures use `BTreeMap` for deterministic ordering; listing
//! methods iterate in ascending id order by construction.

use crate::store::{EntityStore, StoreCounts};
use crate::types::{
    Client, ClientId, Project, ProjectId, Task, TaskId, Team, TeamId, User, UserId, VantageError,
};
use std::collections::BTreeMap;

// =============================================================================
// MEMORYSTORE IMPLEMENTATION
// =============================================================================

/// The in-memory entity store.
///
/// Volatile: contents are lost when dropped unless seeded again from a
/// fixture. Suited to tests and one-shot CLI reports.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    users: BTreeMap<UserId, User>,
    teams: BTreeMap<TeamId, Team>,
    clients: BTreeMap<ClientId, Client>,
    projects: BTreeMap<ProjectId, Project>,
    tasks: BTreeMap<TaskId, Task>,
}

impl MemoryStore {
    /// Create a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl EntityStore for MemoryStore {
    fn clients(&self) -> Result<Vec<Client>, VantageError> {
        Ok(self.clients.values().cloned().collect())
    }

    fn client(&self, id: ClientId) -> Result<Option<Client>, VantageError> {
        Ok(self.clients.get(&id).cloned())
    }

    fn teams(&self) -> Result<Vec<Team>, VantageError> {
        Ok(self.teams.values().cloned().collect())
    }

    fn team(&self, id: TeamId) -> Result<Option<Team>, VantageError> {
        Ok(self.teams.get(&id).cloned())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, VantageError> {
        Ok(self.users.get(&id).cloned())
    }

    fn projects_of(&self, client: ClientId) -> Result<Vec<Project>, VantageError> {
        Ok(self
            .projects
            .values()
            .filter(|p| p.client == client)
            .cloned()
            .collect())
    }

    fn tasks_of(&self, project: ProjectId) -> Result<Vec<Task>, VantageError> {
        Ok(self
            .tasks
            .values()
            .filter(|t| t.project == project)
            .cloned()
            .collect())
    }

    fn tasks(&self) -> Result<Vec<Task>, VantageError> {
        Ok(self.tasks.values().cloned().collect())
    }

    fn project_count(&self, client: ClientId) -> Result<u64, VantageError> {
        Ok(self.projects.values().filter(|p| p.client == client).count() as u64)
    }

    fn budget_total(&self, client: ClientId) -> Result<f64, VantageError> {
        Ok(self
            .projects
            .values()
            .filter(|p| p.client == client)
            .map(|p| p.budget)
            .sum())
    }

    fn billable_hours_total(&self, client: ClientId) -> Result<f64, VantageError> {
        Ok(self
            .tasks
            .values()
            .filter(|t| {
                self.projects
                    .get(&t.project)
                    .is_some_and(|p| p.client == client)
            })
            .map(|t| t.billable_hours)
            .sum())
    }

    fn put_user(&mut self, user: User) -> Result<(), VantageError> {
        self.users.insert(user.id, user);
        Ok(())
    }

    fn put_team(&mut self, team: Team) -> Result<(), VantageError> {
        self.teams.insert(team.id, team);
        Ok(())
    }

    fn put_client(&mut self, client: Client) -> Result<(), VantageError> {
        self.clients.insert(client.id, client);
        Ok(())
    }

    fn put_project(&mut self, project: Project) -> Result<(), VantageError> {
        self.projects.insert(project.id, project);
        Ok(())
    }

    fn put_task(&mut self, task: Task) -> Result<(), VantageError> {
        self.tasks.insert(task.id, task);
        Ok(())
    }

    fn counts(&self) -> Result<StoreCounts, VantageError> {
        Ok(StoreCounts {
            users: self.users.len() as u64,
            teams: self.teams.len() as u64,
            clients: self.clients.len() as u64,
            projects: self.projects.len() as u64,
            tasks: self.tasks.len() as u64,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ProjectStatus;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn project(id: u64, client: u64, budget: f64) -> Project {
        Project {
            id: ProjectId(id),
            client: ClientId(client),
            team: None,
            name: format!("project-{id}"),
            status: ProjectStatus::Active,
            budget,
            start_date: date(2025, 1, 1),
            end_date: None,
        }
    }

    fn task(id: u64, project: u64, hours: f64) -> Task {
        Task {
            id: TaskId(id),
            project: ProjectId(project),
            assignee: None,
            completed: false,
            completed_at: None,
            due_date: date(2025, 2, 1),
            created_at: date(2025, 1, 1),
            billable_hours: hours,
        }
    }

    #[test]
    fn projects_listed_in_ascending_id_order() {
        let mut store = MemoryStore::new();
        store.put_project(project(3, 1, 0.0)).expect("put");
        store.put_project(project(1, 1, 0.0)).expect("put");
        store.put_project(project(2, 2, 0.0)).expect("put");

        let listed = store.projects_of(ClientId(1)).expect("projects");
        let ids: Vec<_> = listed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![ProjectId(1), ProjectId(3)]);
    }

    #[test]
    fn aggregates_scope_to_one_client() {
        let mut store = MemoryStore::new();
        store.put_project(project(1, 1, 100.0)).expect("put");
        store.put_project(project(2, 1, 250.0)).expect("put");
        store.put_project(project(3, 2, 999.0)).expect("put");
        store.put_task(task(1, 1, 4.5)).expect("put");
        store.put_task(task(2, 2, 3.0)).expect("put");
        store.put_task(task(3, 3, 100.0)).expect("put");

        assert_eq!(store.project_count(ClientId(1)).expect("count"), 2);
        assert!((store.budget_total(ClientId(1)).expect("budget") - 350.0).abs() < f64::EPSILON);
        assert!(
            (store.billable_hours_total(ClientId(1)).expect("hours") - 7.5).abs() < f64::EPSILON
        );
    }

    #[test]
    fn aggregates_are_zero_for_empty_client() {
        let store = MemoryStore::new();
        assert_eq!(store.project_count(ClientId(9)).expect("count"), 0);
        assert_eq!(store.budget_total(ClientId(9)).expect("budget"), 0.0);
        assert_eq!(store.billable_hours_total(ClientId(9)).expect("hours"), 0.0);
    }

    #[test]
    fn put_replaces_existing_record() {
        let mut store = MemoryStore::new();
        store.put_project(project(1, 1, 100.0)).expect("put");
        store.put_project(project(1, 1, 700.0)).expect("put");

        assert_eq!(store.project_count(ClientId(1)).expect("count"), 1);
        assert!((store.budget_total(ClientId(1)).expect("budget") - 700.0).abs() < f64::EPSILON);
    }
}
