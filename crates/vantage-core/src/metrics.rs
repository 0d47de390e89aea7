//! # Metric Functions
//!
//! Pure derivations over entity records. Each reportable field maps to one
//! named function with a fixed signature; no reflection, no store access.
//!
//! - Empty collections and missing relations resolve to 0 / absent,
//!   never to an error
//! - All functions are deterministic for identical inputs
//! - Date windows are computed against an explicit `today`, supplied by
//!   the caller

use crate::types::{DeliveryHealth, Project, ProjectStatus, Task, UserId};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// Trailing window for the fallback velocity computation, in days.
pub const VELOCITY_WINDOW_DAYS: i64 = 30;

/// On-time ratio at or above this classifies a client as on track.
pub const ON_TRACK_THRESHOLD: f64 = 0.80;

/// On-time ratio at or above this (but below on-track) is at risk.
pub const AT_RISK_THRESHOLD: f64 = 0.50;

/// Maximum number of team names reported per client.
pub const TOP_TEAMS_LIMIT: usize = 3;

/// Round to two decimal places, half away from zero.
#[must_use]
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// =============================================================================
// PROJECT-LEVEL METRICS
// =============================================================================

/// Sum of billable hours across a project's tasks. 0 for an empty task set.
#[must_use]
pub fn amount_spent(tasks: &[Task]) -> f64 {
    tasks.iter().map(|t| t.billable_hours).sum()
}

/// Share of completed tasks as a percentage in [0, 100].
/// 0 when the project has no tasks.
#[must_use]
pub fn tasks_completed_percent(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let completed = tasks.iter().filter(|t| t.completed).count();
    completed as f64 / tasks.len() as f64 * 100.0
}

/// Mean completion delay in days over tasks that are completed AND have a
/// recorded completion date. 0 when no such tasks exist. Sign is
/// preserved: a negative mean indicates early completion.
#[must_use]
pub fn avg_task_delay(tasks: &[Task]) -> f64 {
    let delays: Vec<i64> = tasks.iter().filter_map(Task::completion_delay_days).collect();
    if delays.is_empty() {
        return 0.0;
    }
    delays.iter().sum::<i64>() as f64 / delays.len() as f64
}

/// The assignee with the highest task count among the project's tasks.
///
/// Ties resolve to the smallest user id: assignees are visited in
/// ascending id order and replaced only on a strictly greater count.
/// `None` when no task has an assignee.
#[must_use]
pub fn lead_developer(tasks: &[Task]) -> Option<UserId> {
    let mut counts: BTreeMap<UserId, usize> = BTreeMap::new();
    for task in tasks {
        if let Some(user) = task.assignee {
            *counts.entry(user).or_insert(0) += 1;
        }
    }

    let mut best: Option<(UserId, usize)> = None;
    for (user, count) in counts {
        if best.is_none_or(|(_, best_count)| count > best_count) {
            best = Some((user, count));
        }
    }
    best.map(|(user, _)| user)
}

/// Velocity reported for a project.
///
/// - 0 when the project has no team
/// - the team's cached velocity, rounded to 2 decimals, when non-zero
/// - otherwise a transient fallback: the count of the *project's own*
///   completed tasks with a completion date inside the trailing
///   `VELOCITY_WINDOW_DAYS`, divided by the window length, rounded to
///   2 decimals
///
/// The cached value is team-wide while the fallback is project-scoped;
/// the mismatch is preserved from the observed reporting behavior.
#[must_use]
pub fn team_velocity(project: &Project, tasks: &[Task], cached: f64, today: NaiveDate) -> f64 {
    if project.team.is_none() {
        return 0.0;
    }
    if cached != 0.0 {
        return round2(cached);
    }

    let cutoff = today - Duration::days(VELOCITY_WINDOW_DAYS);
    let recent = tasks
        .iter()
        .filter(|t| t.completed && t.completed_at.is_some_and(|done| done >= cutoff))
        .count();
    round2(recent as f64 / VELOCITY_WINDOW_DAYS as f64)
}

// =============================================================================
// CLIENT-LEVEL METRICS
// =============================================================================

/// Delivery-health classification for a client's project portfolio.
///
/// A completed project is on time iff none of its tasks was completed
/// strictly after its due date. The ratio divides on-time completed
/// projects by ALL of the client's projects, so active and overdue
/// projects drag the ratio down.
#[must_use]
pub fn delivery_health(projects: &[(Project, Vec<Task>)]) -> DeliveryHealth {
    if projects.is_empty() {
        return DeliveryHealth::NoProjects;
    }

    let on_time = projects
        .iter()
        .filter(|(project, tasks)| {
            project.status == ProjectStatus::Completed
                && !tasks.iter().any(|t| t.completed_late())
        })
        .count();

    let ratio = on_time as f64 / projects.len() as f64;
    if ratio >= ON_TRACK_THRESHOLD {
        DeliveryHealth::OnTrack
    } else if ratio >= AT_RISK_THRESHOLD {
        DeliveryHealth::AtRisk
    } else {
        DeliveryHealth::Delayed
    }
}

/// Number of projects currently in overdue status.
#[must_use]
pub fn overdue_projects(projects: &[(Project, Vec<Task>)]) -> u64 {
    projects
        .iter()
        .filter(|(project, _)| project.status == ProjectStatus::Overdue)
        .count() as u64
}

/// Up to `TOP_TEAMS_LIMIT` team names, descending cached velocity.
///
/// `candidates` holds one (name, velocity) pair per distinct team
/// referenced by the client's projects, in ascending team-id order; the
/// sort is stable, so velocity ties keep that order.
#[must_use]
pub fn top_teams(candidates: &[(String, f64)]) -> Vec<String> {
    let mut ordered: Vec<&(String, f64)> = candidates.iter().collect();
    ordered.sort_by(|a, b| b.1.total_cmp(&a.1));
    ordered
        .into_iter()
        .take(TOP_TEAMS_LIMIT)
        .map(|(name, _)| name.clone())
        .collect()
}

// =============================================================================
// TESTS
// =============================================================================
