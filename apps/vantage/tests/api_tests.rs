//! Integration tests for the Vantage HTTP API.
//!
//! Uses axum-test to exercise the full router (auth middleware, report
//! pipeline, export downloads) without binding a real socket.

// Allow unwrap and panic in tests - these are standard for test code.
// Allow holding a MutexGuard across await - tests are serialized
// intentionally to avoid env var conflicts.
#![allow(clippy::unwrap_used, clippy::panic, clippy::await_holding_lock)]

use axum::http::{HeaderValue, header};
use axum_test::TestServer;
use chrono::{Duration, Local, NaiveDate};
use std::collections::BTreeSet;
use std::sync::Mutex;
use vantage::api::{AppState, ErrorBody, HealthResponse, StatusResponse, create_router};
use vantage_core::{
    Client, ClientId, DeliveryHealth, PageEnvelope, Project, ProjectId, ProjectStatus, Role, Task,
    TaskId, Team, TeamId, User, UserId, Workspace,
};

/// Mutex to serialize tests since they modify process-wide env vars.
static ENV_TEST_MUTEX: Mutex<()> = Mutex::new(());

const ADMIN_TOKEN: &str = "admin-token-1111";
const MANAGER_TOKEN: &str = "manager-token-2222";
const GHOST_TOKEN: &str = "ghost-token-9999";

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Guard that holds the env mutex and scrubs the token vars on drop.
struct TestGuard {
    _guard: std::sync::MutexGuard<'static, ()>,
}

impl TestGuard {
    /// Lock the env mutex and start from a clean environment.
    fn acquire() -> Self {
        // A poisoned mutex only means an earlier test panicked; the lock
        // itself is still usable.
        let guard = ENV_TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
        // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no
        // concurrent env access.
        unsafe {
            std::env::remove_var("VANTAGE_API_KEYS");
            std::env::remove_var("VANTAGE_TOKENS_FILE");
        }
        Self { _guard: guard }
    }
}

impl Drop for TestGuard {
    fn drop(&mut self) {
        // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no
        // concurrent env access.
        unsafe {
            std::env::remove_var("VANTAGE_API_KEYS");
            std::env::remove_var("VANTAGE_TOKENS_FILE");
        }
    }
}

fn days_ago(days: i64) -> NaiveDate {
    Local::now().date_naive() - Duration::days(days)
}

/// Workspace fixture with three clients and one team. Dates are relative
/// so the recency window behaves the same on any day the suite runs.
///
/// - acme (manager casey): one recent completed project on team Falcons,
///   one task three days late and one two days early, 20.5 hours spent
/// - globex (manager dana): one recent active project, no team, a single
///   open 40-hour task
/// - initech (manager casey): only a stale project, outside the window
fn seed_workspace() -> Workspace {
    let mut workspace = Workspace::new();
    {
        let store = workspace.store_mut();
        store
            .put_user(User {
                id: UserId(1),
                name: "root".to_string(),
                role: Role::Admin,
            })
            .unwrap();
        store
            .put_user(User {
                id: UserId(2),
                name: "casey".to_string(),
                role: Role::Manager,
            })
            .unwrap();
        store
            .put_user(User {
                id: UserId(3),
                name: "dana".to_string(),
                role: Role::Manager,
            })
            .unwrap();

        store
            .put_team(Team {
                id: TeamId(1),
                name: "Falcons".to_string(),
                members: BTreeSet::from([UserId(3)]),
            })
            .unwrap();

        store
            .put_client(Client {
                id: ClientId(1),
                name: "acme".to_string(),
                manager: Some(UserId(2)),
            })
            .unwrap();
        store
            .put_client(Client {
                id: ClientId(2),
                name: "globex".to_string(),
                manager: Some(UserId(3)),
            })
            .unwrap();
        store
            .put_client(Client {
                id: ClientId(3),
                name: "initech".to_string(),
                manager: Some(UserId(2)),
            })
            .unwrap();

        store
            .put_project(Project {
                id: ProjectId(10),
                client: ClientId(1),
                team: Some(TeamId(1)),
                name: "Rollout".to_string(),
                status: ProjectStatus::Completed,
                budget: 5000.0,
                start_date: days_ago(10),
                end_date: None,
            })
            .unwrap();
        store
            .put_project(Project {
                id: ProjectId(20),
                client: ClientId(2),
                team: None,
                name: "Migration".to_string(),
                status: ProjectStatus::Active,
                budget: 12000.0,
                start_date: days_ago(20),
                end_date: None,
            })
            .unwrap();
        store
            .put_project(Project {
                id: ProjectId(30),
                client: ClientId(3),
                team: None,
                name: "Archive".to_string(),
                status: ProjectStatus::Completed,
                budget: 7000.0,
                start_date: days_ago(200),
                end_date: None,
            })
            .unwrap();

        store
            .put_task(Task {
                id: TaskId(100),
                project: ProjectId(10),
                assignee: Some(UserId(3)),
                completed: true,
                completed_at: Some(days_ago(4)),
                due_date: days_ago(7),
                created_at: days_ago(10),
                billable_hours: 12.0,
            })
            .unwrap();
        store
            .put_task(Task {
                id: TaskId(101),
                project: ProjectId(10),
                assignee: Some(UserId(3)),
                completed: true,
                completed_at: Some(days_ago(9)),
                due_date: days_ago(7),
                created_at: days_ago(10),
                billable_hours: 8.5,
            })
            .unwrap();
        store
            .put_task(Task {
                id: TaskId(200),
                project: ProjectId(20),
                assignee: None,
                completed: false,
                completed_at: None,
                due_date: days_ago(-10),
                created_at: days_ago(20),
                billable_hours: 40.0,
            })
            .unwrap();
    }
    workspace.set_velocity(TeamId(1), 1.5).unwrap();
    workspace
}

/// Seeded state with the standard token table in the environment.
fn create_test_state() -> (AppState, TestGuard) {
    let guard = TestGuard::acquire();
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no
    // concurrent env access.
    unsafe {
        std::env::set_var(
            "VANTAGE_API_KEYS",
            format!("{ADMIN_TOKEN}:1,{MANAGER_TOKEN}:2,{GHOST_TOKEN}:999"),
        );
    }
    (AppState::new(seed_workspace()), guard)
}

fn create_test_server() -> (TestServer, TestGuard) {
    let (state, guard) = create_test_state();
    let server = TestServer::new(create_router(state)).unwrap();
    (server, guard)
}

fn bearer(token: &str) -> HeaderValue {
    format!("Bearer {token}").parse::<HeaderValue>().unwrap()
}

// =============================================================================
// HEALTH & STATUS
// =============================================================================

#[tokio::test]
async fn test_health_endpoint_requires_no_token() {
    let (server, _guard) = create_test_server();

    let response = server.get("/health").await;

    response.assert_status_ok();
    let health: HealthResponse = response.json();
    assert_eq!(health.status, "ok");
    assert_eq!(health.version, env!("CARGO_PKG_VERSION"));
}

#[tokio::test]
async fn test_status_reports_store_counts() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.users, 3);
    assert_eq!(status.teams, 1);
    assert_eq!(status.clients, 3);
    assert_eq!(status.projects, 3);
    assert_eq!(status.tasks, 3);
    assert!(!status.persistent);
}

#[tokio::test]
async fn test_status_with_persistent_backend() {
    let guard = TestGuard::acquire();
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no
    // concurrent env access.
    unsafe { std::env::set_var("VANTAGE_API_KEYS", format!("{ADMIN_TOKEN}:1")) };

    let dir = tempfile::tempdir().unwrap();
    let mut workspace = Workspace::with_redb(dir.path().join("vantage.db")).unwrap();
    workspace
        .store_mut()
        .put_user(User {
            id: UserId(1),
            name: "root".to_string(),
            role: Role::Admin,
        })
        .unwrap();
    let server = TestServer::new(create_router(AppState::new(workspace))).unwrap();

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert!(status.persistent);
    assert_eq!(status.users, 1);
    assert_eq!(status.clients, 0);
    drop(guard);
}

// =============================================================================
// AUTHENTICATION
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_rejected() {
    let (server, _guard) = create_test_server();

    let response = server.get("/project-health").await;

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Should return 401 without Authorization header"
    );
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_header(header::AUTHORIZATION, bearer("wrong-token"))
        .await;

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Should return 401 for an unrecognized token"
    );
}

#[tokio::test]
async fn test_raw_token_without_scheme_is_accepted() {
    let (server, _guard) = create_test_server();

    // The raw token without the "Bearer " prefix is also accepted.
    let response = server
        .get("/status")
        .add_header(
            header::AUTHORIZATION,
            ADMIN_TOKEN.parse::<HeaderValue>().unwrap(),
        )
        .await;

    response.assert_status_ok();
}

#[tokio::test]
async fn test_empty_bearer_token_is_rejected() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_header(
            header::AUTHORIZATION,
            "Bearer ".parse::<HeaderValue>().unwrap(),
        )
        .await;

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Should return 401 for an empty bearer token"
    );
}

#[tokio::test]
async fn test_token_for_unknown_user_is_rejected() {
    let (server, _guard) = create_test_server();

    // The ghost token resolves to user id 999, which the store does not know.
    let response = server
        .get("/project-health")
        .add_header(header::AUTHORIZATION, bearer(GHOST_TOKEN))
        .await;

    assert_eq!(
        response.status_code().as_u16(),
        401,
        "Should return 401 when the token maps to no stored user"
    );
    let body: ErrorBody = response.json();
    assert_eq!(body.error, "Unknown requester");
}

#[tokio::test]
async fn test_unconfigured_server_rejects_data_endpoints() {
    let guard = TestGuard::acquire();

    // No token env vars at all: the table is empty and nothing matches.
    let server = TestServer::new(create_router(AppState::new(seed_workspace()))).unwrap();

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;
    assert_eq!(
        response.status_code().as_u16(),
        401,
        "An unconfigured server should reject every data endpoint"
    );

    // The health endpoint stays reachable for load balancer checks.
    let response = server.get("/health").await;
    response.assert_status_ok();
    drop(guard);
}

#[tokio::test]
async fn test_tokens_file_grants_access() {
    let guard = TestGuard::acquire();

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tokens.toml");
    std::fs::write(&path, "[tokens]\nfiletoken-abc = 1\n").unwrap();
    // SAFETY: Tests run sequentially under ENV_TEST_MUTEX, so no
    // concurrent env access.
    unsafe { std::env::set_var("VANTAGE_TOKENS_FILE", &path) };

    let server = TestServer::new(create_router(AppState::new(seed_workspace()))).unwrap();

    let response = server
        .get("/status")
        .add_header(header::AUTHORIZATION, bearer("filetoken-abc"))
        .await;

    response.assert_status_ok();
    let status: StatusResponse = response.json();
    assert_eq!(status.users, 3);
    drop(guard);
}

// =============================================================================
// REPORT SCOPE
// =============================================================================

#[tokio::test]
async fn test_admin_sees_all_recent_clients() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_ok();
    let envelope: PageEnvelope = response.json();

    // initech only has a stale project and never enters the window.
    assert_eq!(envelope.count, 2);
    assert_eq!(envelope.next, None);
    assert_eq!(envelope.previous, None);
    let names: Vec<&str> = envelope.results.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["acme", "globex"]);

    let acme = &envelope.results[0];
    assert_eq!(acme.total_projects, 1);
    assert!((acme.total_budget - 5000.0).abs() < 1e-9);
    assert!((acme.total_spent - 20.5).abs() < 1e-9);
    assert_eq!(acme.delivery_health, DeliveryHealth::Delayed);
    assert_eq!(acme.overdue_projects, 0);
    assert_eq!(acme.top_teams, vec!["Falcons"]);
    assert_eq!(acme.projects.len(), 1);
    assert_eq!(acme.projects[0].lead_developer.as_deref(), Some("dana"));
    assert!((acme.projects[0].team_velocity - 1.5).abs() < 1e-9);

    let globex = &envelope.results[1];
    assert!((globex.total_spent - 40.0).abs() < 1e-9);
    assert!(globex.top_teams.is_empty());
}

#[tokio::test]
async fn test_manager_sees_only_managed_clients() {
    let (server, _guard) = create_test_server();

    // casey manages acme and initech, but initech is out of the window.
    let response = server
        .get("/project-health")
        .add_header(header::AUTHORIZATION, bearer(MANAGER_TOKEN))
        .await;

    response.assert_status_ok();
    let envelope: PageEnvelope = response.json();
    assert_eq!(envelope.count, 1);
    assert_eq!(envelope.results[0].name, "acme");
}

// =============================================================================
// FILTERS, ORDERING, PAGINATION
// =============================================================================

#[tokio::test]
async fn test_ordering_by_total_spent_descending() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("ordering", "-total_spent")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_ok();
    let envelope: PageEnvelope = response.json();
    let names: Vec<&str> = envelope.results.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["globex", "acme"]);
}

#[tokio::test]
async fn test_status_filter_needs_one_matching_project() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("status", "active")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;
    response.assert_status_ok();
    let envelope: PageEnvelope = response.json();
    assert_eq!(envelope.count, 1);
    assert_eq!(envelope.results[0].name, "globex");

    let response = server
        .get("/project-health")
        .add_query_param("status", "completed")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;
    response.assert_status_ok();
    let envelope: PageEnvelope = response.json();
    assert_eq!(envelope.count, 1);
    assert_eq!(envelope.results[0].name, "acme");
}

#[tokio::test]
async fn test_min_budget_filters_clients() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("min_budget", "6000")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_ok();
    let envelope: PageEnvelope = response.json();
    assert_eq!(envelope.count, 1);
    assert_eq!(envelope.results[0].name, "globex");
}

#[tokio::test]
async fn test_invalid_min_budget_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("min_budget", "lots")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_bad_request();
    let body: ErrorBody = response.json();
    assert!(body.error.contains("min_budget"), "{}", body.error);
}

#[tokio::test]
async fn test_pagination_envelope_links() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("page_size", "1")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;
    response.assert_status_ok();
    let page1: PageEnvelope = response.json();
    assert_eq!(page1.count, 2);
    assert_eq!(page1.results[0].name, "acme");
    assert_eq!(page1.next, Some(2));
    assert_eq!(page1.previous, None);

    let response = server
        .get("/project-health")
        .add_query_param("page", "2")
        .add_query_param("page_size", "1")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;
    response.assert_status_ok();
    let page2: PageEnvelope = response.json();
    assert_eq!(page2.count, 2);
    assert_eq!(page2.results[0].name, "globex");
    assert_eq!(page2.next, None);
    assert_eq!(page2.previous, Some(1));
}

#[tokio::test]
async fn test_page_out_of_range_is_not_found() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("page", "99")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_not_found();
    let body: ErrorBody = response.json();
    assert_eq!(body.error, "Invalid page: 99");
}

#[tokio::test]
async fn test_zero_page_size_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("page_size", "0")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_bad_request();
}

// =============================================================================
// EXPORT DOWNLOADS
// =============================================================================

#[tokio::test]
async fn test_csv_export_downloads_attachment() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("export", "csv")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_ok();
    assert_eq!(response.header("content-type"), "text/csv");
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"project_health.csv\""
    );

    let text = response.text();
    assert!(text.starts_with(
        "Client Name,Total Projects,Total Budget,Total Spent,\
         Delivery Health,Overdue Projects,Top Teams"
    ));
    assert!(text.contains("acme,1,5000,20.5,delayed,0,Falcons"), "{text}");
    assert!(text.contains("globex"), "{text}");
}

#[tokio::test]
async fn test_excel_export_is_a_workbook() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("export", "excel")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_ok();
    assert_eq!(
        response.header("content-type"),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    assert_eq!(
        response.header("content-disposition"),
        "attachment; filename=\"project_health.xlsx\""
    );
    // xlsx is a zip archive
    assert!(response.as_bytes().starts_with(b"PK"));
}

#[tokio::test]
async fn test_unknown_export_format_is_bad_request() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/project-health")
        .add_query_param("export", "pdf")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_bad_request();
    let body: ErrorBody = response.json();
    assert_eq!(body.error, "Unknown export format: pdf");
}

// =============================================================================
// RESPONSE CACHE
// =============================================================================

#[tokio::test]
async fn test_cached_page_survives_store_mutation() {
    let (state, _guard) = create_test_state();
    let server = TestServer::new(create_router(state.clone())).unwrap();

    let response = server
        .get("/project-health")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;
    response.assert_status_ok();
    let first: PageEnvelope = response.json();
    assert_eq!(first.count, 2);

    // Add a fourth client with a recent project behind the cache's back.
    {
        let mut workspace = state.workspace.write().await;
        let store = workspace.store_mut();
        store
            .put_client(Client {
                id: ClientId(4),
                name: "hooli".to_string(),
                manager: None,
            })
            .unwrap();
        store
            .put_project(Project {
                id: ProjectId(40),
                client: ClientId(4),
                team: None,
                name: "Box".to_string(),
                status: ProjectStatus::Active,
                budget: 100.0,
                start_date: days_ago(1),
                end_date: None,
            })
            .unwrap();
    }

    // The identical query is served from the cache and still sees 2.
    let response = server
        .get("/project-health")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;
    response.assert_status_ok();
    let cached: PageEnvelope = response.json();
    assert_eq!(cached.count, 2);

    // A different query misses the cache and sees the new client.
    let response = server
        .get("/project-health")
        .add_query_param("ordering", "-total_spent")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;
    response.assert_status_ok();
    let fresh: PageEnvelope = response.json();
    assert_eq!(fresh.count, 3);
}

// =============================================================================
// ERROR HANDLING
// =============================================================================

#[tokio::test]
async fn test_404_on_unknown_endpoint() {
    let (server, _guard) = create_test_server();

    let response = server
        .get("/nonexistent")
        .add_header(header::AUTHORIZATION, bearer(ADMIN_TOKEN))
        .await;

    response.assert_status_not_found();
}

#[tokio::test]
async fn test_method_not_allowed() {
    let (server, _guard) = create_test_server();

    // axum returns 405 Method Not Allowed for a wrong-method request
    let response = server.post("/health").await;

    assert_eq!(response.status_code().as_u16(), 405);
}
