//! # Summary Builder
//!
//! Assembles the derived reporting records. A [`ProjectSummary`] is built
//! from one project and its task list; a [`ClientSummary`] is built from
//! client-level metrics plus one nested summary per project.
//!
//! Summaries are constructed fresh per request and never persisted.

use crate::metrics;
use crate::store::EntityStore;
use crate::types::{Client, ClientSummary, Project, ProjectSummary, Task, VantageError};
use crate::velocity::VelocityCache;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Build the derived view of one project.
///
/// The lead developer resolves to the assignee's stored name; an assignee
/// id with no user record renders as absent rather than failing the
/// request.
pub fn project_summary(
    store: &dyn EntityStore,
    project: &Project,
    tasks: &[Task],
    velocities: &VelocityCache,
    today: NaiveDate,
) -> Result<ProjectSummary, VantageError> {
    let cached = match project.team {
        Some(team) => velocities.get(team),
        None => 0.0,
    };

    let lead_developer = match metrics::lead_developer(tasks) {
        Some(user) => store.user(user)?.map(|u| u.name),
        None => None,
    };

    Ok(ProjectSummary {
        name: project.name.clone(),
        status: project.status,
        budget: project.budget,
        amount_spent: metrics::amount_spent(tasks),
        start_date: project.start_date,
        end_date: project.end_date,
        tasks_completed_percent: metrics::tasks_completed_percent(tasks),
        avg_task_delay: metrics::avg_task_delay(tasks),
        lead_developer,
        team_velocity: metrics::team_velocity(project, tasks, cached, today),
    })
}

/// Build the derived view of one client, nested project summaries
/// included.
///
/// The three totals (`total_projects`, `total_budget`, `total_spent`)
/// come from store aggregates, not from folding the nested summaries;
/// the two paths must agree for consistent data.
pub fn client_summary(
    store: &dyn EntityStore,
    client: &Client,
    velocities: &VelocityCache,
    today: NaiveDate,
) -> Result<ClientSummary, VantageError> {
    let portfolio = load_portfolio(store, client)?;

    let mut projects = Vec::with_capacity(portfolio.len());
    for (project, tasks) in &portfolio {
        projects.push(project_summary(store, project, tasks, velocities, today)?);
    }

    Ok(ClientSummary {
        name: client.name.clone(),
        total_projects: store.project_count(client.id)?,
        total_budget: store.budget_total(client.id)?,
        total_spent: store.billable_hours_total(client.id)?,
        delivery_health: metrics::delivery_health(&portfolio),
        overdue_projects: metrics::overdue_projects(&portfolio),
        top_teams: metrics::top_teams(&team_candidates(store, &portfolio, velocities)?),
        projects,
    })
}

/// Each of the client's projects paired with its task list, in ascending
/// project-id order.
fn load_portfolio(
    store: &dyn EntityStore,
    client: &Client,
) -> Result<Vec<(Project, Vec<Task>)>, VantageError> {
    let mut rows = Vec::new();
    for project in store.projects_of(client.id)? {
        let tasks = store.tasks_of(project.id)?;
        rows.push((project, tasks));
    }
    Ok(rows)
}

/// One (name, cached velocity) pair per distinct team referenced by the
/// portfolio, ascending team id. Dangling team references are skipped.
fn team_candidates(
    store: &dyn EntityStore,
    portfolio: &[(Project, Vec<Task>)],
    velocities: &VelocityCache,
) -> Result<Vec<(String, f64)>, VantageError> {
    let mut seen = BTreeMap::new();
    for (project, _) in portfolio {
        if let Some(team_id) = project.team {
            if seen.contains_key(&team_id) {
                continue;
            }
            if let Some(team) = store.team(team_id)? {
                seen.insert(team_id, (team.name, velocities.get(team_id)));
            }
        }
    }
    Ok(seen.into_values().collect())
}

// =============================================================================
// TESTS
// =============================================================================
