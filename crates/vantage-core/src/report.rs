//! # Report Pipeline
//!
//! Turns a requester plus raw query parameters into one page of client
//! summaries. Stages run in a fixed order:
//!
//! 1. Scope filter: recency window, restricted to managed clients for
//!    non-admin requesters
//! 2. Attribute filters: conjunctive, each satisfied by at least one of
//!    a client's projects
//! 3. Summary construction for every surviving client
//! 4. Stable in-memory sort on a derived field
//! 5. Pagination over the sorted list
//!
//! The sort MUST stay in memory: the sortable fields exist only on the
//! built summaries, never in the store.

use crate::store::EntityStore;
use crate::summary;
use crate::types::{Client, ClientSummary, Project, User, VantageError};
use crate::velocity::VelocityCache;
use chrono::{Duration, NaiveDate};
use serde::Deserialize;

/// Only clients with a project started inside this window are reported.
pub const REPORT_RECENCY_DAYS: i64 = 90;

/// Page size when the request does not override it.
pub const DEFAULT_PAGE_SIZE: u64 = 10;

/// Upper bound for a requested page size; larger values clamp.
pub const MAX_PAGE_SIZE: u64 = 100;

/// Accepted format for the `start_after` parameter.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

// =============================================================================
// REQUEST PARSING
// =============================================================================

/// Raw query parameters as they arrive from the transport layer.
///
/// Everything is an optional string so that validation happens here, in
/// one place, with uniform request errors. Empty strings count as
/// absent.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct ReportRequest {
    pub status: Option<String>,
    pub min_budget: Option<String>,
    pub start_after: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub export: Option<String>,
}

impl ReportRequest {
    /// Validate and convert into a typed [`ReportQuery`].
    ///
    /// An unrecognized `ordering` value is a no-op, not an error; an
    /// unrecognized `export` value is rejected.
    pub fn parse(&self) -> Result<ReportQuery, VantageError> {
        let min_budget = match non_empty(&self.min_budget) {
            Some(raw) => Some(raw.parse::<f64>().map_err(|_| {
                VantageError::InvalidParam(format!("min_budget must be numeric, got {raw:?}"))
            })?),
            None => None,
        };

        let start_after = match non_empty(&self.start_after) {
            Some(raw) => Some(NaiveDate::parse_from_str(raw, DATE_FORMAT).map_err(|_| {
                VantageError::InvalidParam(format!(
                    "start_after must be a {DATE_FORMAT} date, got {raw:?}"
                ))
            })?),
            None => None,
        };

        let page = match non_empty(&self.page) {
            Some(raw) => raw.parse::<u64>().map_err(|_| {
                VantageError::InvalidParam(format!("page must be an integer, got {raw:?}"))
            })?,
            None => 1,
        };

        let page_size = match non_empty(&self.page_size) {
            Some(raw) => {
                let parsed = raw.parse::<u64>().map_err(|_| {
                    VantageError::InvalidParam(format!(
                        "page_size must be an integer, got {raw:?}"
                    ))
                })?;
                if parsed == 0 {
                    return Err(VantageError::InvalidParam(
                        "page_size must be at least 1".to_string(),
                    ));
                }
                parsed.min(MAX_PAGE_SIZE)
            }
            None => DEFAULT_PAGE_SIZE,
        };

        let export = match non_empty(&self.export) {
            Some("csv") => Some(ExportFormat::Csv),
            Some("excel") => Some(ExportFormat::Excel),
            Some(other) => return Err(VantageError::UnknownExportFormat(other.to_string())),
            None => None,
        };

        Ok(ReportQuery {
            status: non_empty(&self.status).map(str::to_string),
            min_budget,
            start_after,
            sort: non_empty(&self.ordering).and_then(SortSpec::parse),
            page,
            page_size,
            export,
        })
    }
}

fn non_empty(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().filter(|s| !s.is_empty())
}

/// Validated query. A `status` value outside the known set is kept
/// verbatim and simply matches no project.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportQuery {
    pub status: Option<String>,
    pub min_budget: Option<f64>,
    pub start_after: Option<NaiveDate>,
    pub sort: Option<SortSpec>,
    pub page: u64,
    pub page_size: u64,
    pub export: Option<ExportFormat>,
}

impl ReportQuery {
    /// Canonical key for response caching: identical semantics yield an
    /// identical key even when the raw strings differed.
    #[must_use]
    pub fn cache_key(&self) -> String {
        format!(
            "status={}|min_budget={}|start_after={}|ordering={}|page={}|page_size={}",
            self.status.as_deref().unwrap_or(""),
            self.min_budget.map(|v| v.to_string()).unwrap_or_default(),
            self.start_after.map(|d| d.to_string()).unwrap_or_default(),
            self.sort.map(|s| s.render()).unwrap_or_default(),
            self.page,
            self.page_size,
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortKey {
    TotalSpent,
    DeliveryHealth,
    OverdueProjects,
}

impl SortKey {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TotalSpent => "total_spent",
            Self::DeliveryHealth => "delivery_health",
            Self::OverdueProjects => "overdue_projects",
        }
    }
}

/// A sort key with direction; `-` prefixes the key for descending.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub key: SortKey,
    pub descending: bool,
}

impl SortSpec {
    /// `None` for values outside the sortable whitelist.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let (name, descending) = match raw.strip_prefix('-') {
            Some(rest) => (rest, true),
            None => (raw, false),
        };
        let key = match name {
            "total_spent" => SortKey::TotalSpent,
            "delivery_health" => SortKey::DeliveryHealth,
            "overdue_projects" => SortKey::OverdueProjects,
            _ => return None,
        };
        Some(Self { key, descending })
    }

    #[must_use]
    pub fn render(self) -> String {
        let prefix = if self.descending { "-" } else { "" };
        format!("{prefix}{}", self.key.as_str())
    }
}

/// Requested download encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Excel,
}

impl ExportFormat {
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Csv => "project_health.csv",
            Self::Excel => "project_health.xlsx",
        }
    }

    #[must_use]
    pub const fn content_type(self) -> &'static str {
        match self {
            Self::Csv => "text/csv",
            Self::Excel => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
        }
    }
}

// =============================================================================
// PIPELINE
// =============================================================================

/// One page of the filtered, sorted result set.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportPage {
    /// Total summaries across ALL pages, after filtering.
    pub count: u64,
    pub page: u64,
    pub page_size: u64,
    /// Total page count; at least 1 even for an empty result set.
    pub pages: u64,
    pub results: Vec<ClientSummary>,
}

impl ReportPage {
    #[must_use]
    pub fn next_page(&self) -> Option<u64> {
        (self.page < self.pages).then_some(self.page + 1)
    }

    #[must_use]
    pub fn previous_page(&self) -> Option<u64> {
        (self.page > 1).then_some(self.page - 1)
    }
}

/// Run the full pipeline for one requester and query.
///
/// Store failures abort the whole request; a page is either fully
/// computed or not produced at all.
pub fn run_report(
    store: &dyn EntityStore,
    requester: &User,
    query: &ReportQuery,
    velocities: &VelocityCache,
    today: NaiveDate,
) -> Result<ReportPage, VantageError> {
    let scoped = scoped_clients(store, requester, today)?;
    let filtered = apply_filters(scoped, query);

    let mut summaries = Vec::with_capacity(filtered.len());
    for (client, _) in &filtered {
        summaries.push(summary::client_summary(store, client, velocities, today)?);
    }

    sort_summaries(&mut summaries, query.sort);
    paginate(summaries, query.page, query.page_size)
}

/// Clients visible to the requester: at least one project started inside
/// the recency window, and for non-admin requesters only clients they
/// manage. Each client appears once.
fn scoped_clients(
    store: &dyn EntityStore,
    requester: &User,
    today: NaiveDate,
) -> Result<Vec<(Client, Vec<Project>)>, VantageError> {
    let cutoff = today - Duration::days(REPORT_RECENCY_DAYS);

    let mut rows = Vec::new();
    for client in store.clients()? {
        if !requester.role.is_admin() && client.manager != Some(requester.id) {
            continue;
        }
        let projects = store.projects_of(client.id)?;
        if projects.iter().any(|p| p.start_date >= cutoff) {
            rows.push((client, projects));
        }
    }
    Ok(rows)
}

/// Conjunctive attribute filters. Each criterion is satisfied when ANY
/// of the client's projects matches it; different projects may satisfy
/// different criteria.
fn apply_filters(
    rows: Vec<(Client, Vec<Project>)>,
    query: &ReportQuery,
) -> Vec<(Client, Vec<Project>)> {
    rows.into_iter()
        .filter(|(_, projects)| {
            query
                .status
                .as_deref()
                .is_none_or(|wanted| projects.iter().any(|p| p.status.as_str() == wanted))
                && query
                    .min_budget
                    .is_none_or(|min| projects.iter().any(|p| p.budget >= min))
                && query
                    .start_after
                    .is_none_or(|date| projects.iter().any(|p| p.start_date >= date))
        })
        .collect()
}

/// Stable sort on one derived field. `None` leaves the scope order
/// (ascending client id) untouched.
fn sort_summaries(summaries: &mut [ClientSummary], sort: Option<SortSpec>) {
    let Some(spec) = sort else {
        return;
    };
    summaries.sort_by(|a, b| {
        let ord = match spec.key {
            SortKey::TotalSpent => a.total_spent.total_cmp(&b.total_spent),
            SortKey::DeliveryHealth => {
                a.delivery_health.as_str().cmp(b.delivery_health.as_str())
            }
            SortKey::OverdueProjects => a.overdue_projects.cmp(&b.overdue_projects),
        };
        if spec.descending { ord.reverse() } else { ord }
    });
}

/// Slice out one 1-indexed page. Page 1 is always valid; anything past
/// the last page (or page 0) is out of range. An empty result set still
/// has one page.
fn paginate(
    summaries: Vec<ClientSummary>,
    page: u64,
    page_size: u64,
) -> Result<ReportPage, VantageError> {
    let count = summaries.len() as u64;
    let pages = count.div_ceil(page_size).max(1);
    if page == 0 || page > pages {
        return Err(VantageError::PageOutOfRange(page));
    }

    let start = ((page - 1) * page_size) as usize;
    let results: Vec<ClientSummary> = summaries
        .into_iter()
        .skip(start)
        .take(page_size as usize)
        .collect();

    Ok(ReportPage {
        count,
        page,
        page_size,
        pages,
        results,
    })
}

// =============================================================================
// TESTS
// =============================================================================
