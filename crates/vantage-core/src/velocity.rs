//! # Velocity Cache
//!
//! Per-team cached rolling-window velocity, read by the metric functions
//! and written by the periodic recompute job.
//!
//! ## Unset Policy
//!
//! A team with no entry reads as 0. The reporting path treats 0 as
//! "unset or stale" and falls back to a transient computation, so writing
//! an explicit 0 is equivalent to clearing the entry.

use crate::metrics::{VELOCITY_WINDOW_DAYS, round2};
use crate::store::EntityStore;
use crate::types::{TeamId, VantageError};
use chrono::{Duration, NaiveDate};
use std::collections::BTreeMap;

/// In-memory map of team id to cached velocity.
///
/// The reporting path only reads; writes come from the recompute job or
/// from loading a persisted snapshot at startup.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VelocityCache {
    entries: BTreeMap<TeamId, f64>,
}

impl VelocityCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cache from persisted (team, velocity) pairs.
    #[must_use]
    pub fn from_pairs(pairs: impl IntoIterator<Item = (TeamId, f64)>) -> Self {
        Self {
            entries: pairs.into_iter().collect(),
        }
    }

    /// Cached velocity for a team, 0 when unset.
    #[must_use]
    pub fn get(&self, team: TeamId) -> f64 {
        self.entries.get(&team).copied().unwrap_or(0.0)
    }

    pub fn set(&mut self, team: TeamId, value: f64) {
        self.entries.insert(team, value);
    }

    /// All entries in ascending team-id order.
    pub fn entries(&self) -> impl Iterator<Item = (TeamId, f64)> + '_ {
        self.entries.iter().map(|(team, value)| (*team, *value))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

// =============================================================================
// RECOMPUTE JOB
// =============================================================================

/// Recompute every team's velocity from the task history.
///
/// A team's velocity is the count of completed tasks with a completion
/// date inside the trailing `VELOCITY_WINDOW_DAYS`, assigned to any team
/// member, divided by the window length and rounded to 2 decimals.
///
/// Returns one (team, velocity) pair per stored team in ascending id
/// order; the caller applies them to the cache (and to persistent
/// storage when configured).
pub fn recompute_team_velocities(
    store: &dyn EntityStore,
    today: NaiveDate,
) -> Result<Vec<(TeamId, f64)>, VantageError> {
    let cutoff = today - Duration::days(VELOCITY_WINDOW_DAYS);
    let tasks = store.tasks()?;

    let mut results = Vec::new();
    for team in store.teams()? {
        let recent = tasks
            .iter()
            .filter(|t| {
                t.completed
                    && t.completed_at.is_some_and(|done| done >= cutoff)
                    && t.assignee.is_some_and(|user| team.members.contains(&user))
            })
            .count();
        results.push((team.id, round2(recent as f64 / VELOCITY_WINDOW_DAYS as f64)));
    }
    Ok(results)
}

// =============================================================================
// TESTS
// =============================================================================
