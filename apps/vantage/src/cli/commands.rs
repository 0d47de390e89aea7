//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::api;
use chrono::Local;
use std::path::{Path, PathBuf};
use vantage_core::{
    ExportFormat, PageEnvelope, ReportRequest, Snapshot, UserId, VantageError, Workspace, to_csv,
    to_xlsx,
};

// =============================================================================
// FILE LIMITS AND PATH VALIDATION
// =============================================================================

/// Maximum file size for snapshot import (100 MB).
///
/// This prevents memory exhaustion from malicious or accidental large files.
const MAX_IMPORT_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Validate file size before reading.
fn validate_file_size(path: &Path, max_size: u64) -> Result<(), VantageError> {
    let metadata = std::fs::metadata(path)
        .map_err(|e| VantageError::IoError(format!("Cannot read file metadata: {}", e)))?;

    if metadata.len() > max_size {
        return Err(VantageError::IoError(format!(
            "File size {} bytes exceeds maximum allowed {} bytes",
            metadata.len(),
            max_size
        )));
    }
    Ok(())
}

/// Validate an input file path.
///
/// Canonicalizes the path to resolve symlinks and "..", confirms it
/// exists, and confirms it is a regular file.
fn validate_file_path(path: &Path) -> Result<PathBuf, VantageError> {
    let canonical = path.canonicalize().map_err(|e| {
        VantageError::IoError(format!("Invalid file path '{}': {}", path.display(), e))
    })?;

    if !canonical.is_file() {
        return Err(VantageError::IoError(format!(
            "Path '{}' is not a regular file",
            path.display()
        )));
    }

    Ok(canonical)
}

/// Validate an output file path: the parent directory must exist.
///
/// `parent()` returns `Some("")` for a bare filename and canonicalize
/// rejects the empty path, so that case falls back to the current
/// directory.
fn validate_output_path(path: &Path) -> Result<PathBuf, VantageError> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let canonical_parent = parent.canonicalize().map_err(|e| {
        VantageError::IoError(format!(
            "Invalid output directory '{}': {}",
            parent.display(),
            e
        ))
    })?;

    if !canonical_parent.is_dir() {
        return Err(VantageError::IoError(format!(
            "Output directory '{}' is not a valid directory",
            parent.display()
        )));
    }

    let filename = path
        .file_name()
        .ok_or_else(|| VantageError::IoError("Output path has no filename".to_string()))?;

    Ok(canonical_parent.join(filename))
}

// =============================================================================
// SERVER COMMAND
// =============================================================================

/// Start the HTTP server.
pub async fn cmd_server(
    db_path: &PathBuf,
    backend: &str,
    host: &str,
    port: u16,
) -> Result<(), VantageError> {
    let workspace = load_or_create_workspace(db_path, backend)?;

    println!("Vantage Client Delivery Health Server Starting...");
    println!();
    println!("Configuration:");
    println!("  Host:     {}", host);
    println!("  Port:     {}", port);
    println!("  Backend:  {}", backend);
    println!("  Database: {:?}", db_path);
    println!();
    println!("Endpoints:");
    println!("  GET /project-health - Delivery health report");
    println!("  GET /status         - Store record counts");
    println!("  GET /health         - Health check");
    println!();
    println!("Press Ctrl+C to stop");
    println!();

    let addr = format!("{}:{}", host, port);
    api::run_server(&addr, workspace).await
}

// =============================================================================
// STATUS COMMAND
// =============================================================================

/// Show store record counts.
pub fn cmd_status(db_path: &PathBuf, backend: &str, json_mode: bool) -> Result<(), VantageError> {
    let workspace = load_or_create_workspace(db_path, backend)?;
    let counts = workspace.counts()?;

    if json_mode {
        let output = serde_json::json!({
            "database": db_path.to_string_lossy(),
            "backend": backend,
            "users": counts.users,
            "teams": counts.teams,
            "clients": counts.clients,
            "projects": counts.projects,
            "tasks": counts.tasks,
            "persistent": workspace.is_persistent()
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Vantage Store Status");
    println!("====================");
    println!("Database: {:?}", db_path);
    println!("Backend:  {}", backend);
    println!();
    println!("Users:    {}", counts.users);
    println!("Teams:    {}", counts.teams);
    println!("Clients:  {}", counts.clients);
    println!("Projects: {}", counts.projects);
    println!("Tasks:    {}", counts.tasks);

    Ok(())
}

// =============================================================================
// IMPORT COMMAND
// =============================================================================

/// Import an entity snapshot from a JSON file.
///
/// Records with ids already in the store are replaced. With the memory
/// backend the import lasts only for this process, so the command is
/// mostly useful through the redb backend.
pub fn cmd_import(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    input: &Path,
) -> Result<(), VantageError> {
    let validated_path = validate_file_path(input)?;
    validate_file_size(&validated_path, MAX_IMPORT_FILE_SIZE)?;

    let contents = std::fs::read(&validated_path)
        .map_err(|e| VantageError::IoError(format!("Read file: {}", e)))?;

    let snapshot: Snapshot = serde_json::from_slice(&contents)
        .map_err(|e| VantageError::DeserializationError(format!("Parse snapshot: {}", e)))?;

    let mut workspace = load_or_create_workspace(db_path, backend)?;
    let counts = workspace.import(snapshot)?;

    if json_mode {
        let output = serde_json::json!({
            "users": counts.users,
            "teams": counts.teams,
            "clients": counts.clients,
            "projects": counts.projects,
            "tasks": counts.tasks
        });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!(
        "Imported {} users, {} teams, {} clients, {} projects, {} tasks",
        counts.users, counts.teams, counts.clients, counts.projects, counts.tasks
    );

    Ok(())
}

// =============================================================================
// REPORT COMMAND
// =============================================================================

/// Arguments for the report command.
pub struct ReportArgs {
    pub requester: u64,
    pub status: Option<String>,
    pub min_budget: Option<String>,
    pub start_after: Option<String>,
    pub ordering: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub export: Option<String>,
    pub output: Option<PathBuf>,
}

/// Run the delivery health report for a requester.
///
/// Filter, ordering, and paging values go through the same validation
/// as the HTTP endpoint, so invalid input fails with the same messages.
pub fn cmd_report(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
    args: ReportArgs,
) -> Result<(), VantageError> {
    let workspace = load_or_create_workspace(db_path, backend)?;

    let requester = workspace
        .store()
        .user(UserId(args.requester))?
        .ok_or_else(|| {
            VantageError::InvalidParam(format!("Unknown requester id {}", args.requester))
        })?;

    let request = ReportRequest {
        status: args.status,
        min_budget: args.min_budget,
        start_after: args.start_after,
        ordering: args.ordering,
        page: args.page,
        page_size: args.page_size,
        export: args.export,
    };
    let query = request.parse()?;

    let today = Local::now().date_naive();
    let page = workspace.report(&requester, &query, today)?;

    // Export formats write a file instead of printing
    if let Some(format) = query.export {
        let data = match format {
            ExportFormat::Csv => to_csv(&page)?,
            ExportFormat::Excel => to_xlsx(&page)?,
        };
        let output = args
            .output
            .unwrap_or_else(|| PathBuf::from(format.file_name()));
        let validated_output = validate_output_path(&output)?;
        std::fs::write(&validated_output, &data)
            .map_err(|e| VantageError::IoError(format!("Write file: {}", e)))?;

        println!("Exported {} bytes to {:?}", data.len(), validated_output);
        return Ok(());
    }

    let envelope = PageEnvelope::from(page);

    if json_mode {
        println!(
            "{}",
            serde_json::to_string_pretty(&envelope).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Delivery Health Report (requester: {})", requester.name);
    println!("Matching clients: {}", envelope.count);
    println!();
    for summary in &envelope.results {
        println!("{}", summary.name);
        println!("  Projects:        {}", summary.total_projects);
        println!("  Budget:          {:.2}", summary.total_budget);
        println!("  Spent:           {:.2}", summary.total_spent);
        println!("  Delivery Health: {}", summary.delivery_health.as_str());
        println!("  Overdue:         {}", summary.overdue_projects);
        if !summary.top_teams.is_empty() {
            println!("  Top Teams:       {}", summary.top_teams.join(", "));
        }
        println!();
    }
    if let Some(next) = envelope.next {
        println!("More results: --page {}", next);
    }

    Ok(())
}

// =============================================================================
// RECOMPUTE VELOCITIES COMMAND
// =============================================================================

/// Refresh every team's cached velocity from the task history.
pub fn cmd_recompute_velocities(
    db_path: &PathBuf,
    backend: &str,
    json_mode: bool,
) -> Result<(), VantageError> {
    let mut workspace = load_or_create_workspace(db_path, backend)?;

    let today = Local::now().date_naive();
    let results = workspace.recompute_velocities(today)?;

    if json_mode {
        let teams: Vec<serde_json::Value> = results
            .iter()
            .map(|(team, velocity)| serde_json::json!({ "team": team.0, "velocity": velocity }))
            .collect();
        let output = serde_json::json!({ "updated": results.len(), "teams": teams });
        println!(
            "{}",
            serde_json::to_string_pretty(&output).unwrap_or_default()
        );
        return Ok(());
    }

    println!("Updated {} team velocities", results.len());
    for (team, velocity) in &results {
        println!("  Team {}: {:.2}", team.0, velocity);
    }

    Ok(())
}

// =============================================================================
// INIT COMMAND
// =============================================================================

/// Initialize a new empty database.
pub fn cmd_init(db_path: &PathBuf, backend: &str, force: bool) -> Result<(), VantageError> {
    if db_path.exists() && !force {
        return Err(VantageError::IoError(
            "Database already exists. Use --force to overwrite.".to_string(),
        ));
    }

    match backend {
        "redb" => {
            if force && db_path.exists() {
                std::fs::remove_file(db_path)
                    .map_err(|e| VantageError::IoError(format!("Remove database: {}", e)))?;
            }
            let _workspace = Workspace::with_redb(db_path)?;
            println!("Initialized new redb database at {:?}", db_path);
            Ok(())
        }
        _ => Err(VantageError::InvalidParam(
            "Init requires the redb backend".to_string(),
        )),
    }
}

// =============================================================================
// HELPER FUNCTIONS
// =============================================================================

/// Load or create a workspace from a database path with specified backend.
pub fn load_or_create_workspace(
    db_path: &PathBuf,
    backend: &str,
) -> Result<Workspace, VantageError> {
    match backend {
        "redb" => Workspace::with_redb(db_path),
        "memory" => Ok(Workspace::new()),
        _ => Err(VantageError::InvalidParam(format!(
            "Unknown backend: {}. Use: redb, memory",
            backend
        ))),
    }
}

// =============================================================================
// TESTS
// =============================================================================
