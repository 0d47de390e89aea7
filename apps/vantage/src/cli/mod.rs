//! # Vantage CLI Module
//!
//! This module implements the CLI interface for Vantage.
//!
//! ## Available Commands
//!
//! - `server` - Start the HTTP server
//! - `status` - Show store record counts
//! - `import` - Import an entity snapshot from a JSON file
//! - `report` - Run the delivery health report for a requester
//! - `recompute-velocities` - Refresh every team's cached velocity
//! - `init` - Initialize a new database

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use vantage_core::VantageError;

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// Vantage - Client Delivery Health
///
/// Derives delivery metrics for client projects and serves them as a
/// filterable, sortable, exportable report.
#[derive(Parser, Debug)]
#[command(name = "vantage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress banner output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Path to the entity database
    #[arg(short = 'D', long, global = true, default_value = "vantage.db")]
    pub database: PathBuf,

    /// Storage backend: "redb" (ACID database) or "memory" (volatile)
    #[arg(short = 'B', long, global = true, default_value = "redb")]
    pub backend: String,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start HTTP server
    Server {
        /// Host to bind to
        #[arg(short = 'H', long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8080")]
        port: u16,
    },

    /// Show store record counts
    Status,

    /// Import an entity snapshot from a JSON file
    Import {
        /// Path to the snapshot file
        #[arg(short, long)]
        input: PathBuf,
    },

    /// Run the delivery health report for a requester
    Report {
        /// User id the report runs as
        #[arg(short, long)]
        requester: u64,

        /// Keep clients with at least one project in this status
        #[arg(long)]
        status: Option<String>,

        /// Keep clients with at least one project at or above this budget
        #[arg(long)]
        min_budget: Option<String>,

        /// Keep clients with at least one project started after this date (YYYY-MM-DD)
        #[arg(long)]
        start_after: Option<String>,

        /// Sort field, "-" prefix for descending (total_spent, delivery_health, overdue_projects)
        #[arg(short, long)]
        ordering: Option<String>,

        /// Page number (1-based)
        #[arg(short, long)]
        page: Option<String>,

        /// Results per page (max 100)
        #[arg(long)]
        page_size: Option<String>,

        /// Write the page as a download instead: "csv" or "excel"
        #[arg(short, long)]
        export: Option<String>,

        /// Output file for --export (defaults to the format's file name)
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Refresh every team's cached velocity
    RecomputeVelocities,

    /// Initialize a new empty database
    Init {
        /// Force initialization even if database exists
        #[arg(short, long)]
        force: bool,
    },
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), VantageError> {
    let backend = cli.backend.as_str();
    let json_mode = cli.json_mode;

    match cli.command {
        Some(Commands::Server { host, port }) => {
            cmd_server(&cli.database, backend, &host, port).await
        }
        Some(Commands::Status) => cmd_status(&cli.database, backend, json_mode),
        Some(Commands::Import { input }) => cmd_import(&cli.database, backend, json_mode, &input),
        Some(Commands::Report {
            requester,
            status,
            min_budget,
            start_after,
            ordering,
            page,
            page_size,
            export,
            output,
        }) => cmd_report(
            &cli.database,
            backend,
            json_mode,
            ReportArgs {
                requester,
                status,
                min_budget,
                start_after,
                ordering,
                page,
                page_size,
                export,
                output,
            },
        ),
        Some(Commands::RecomputeVelocities) => {
            cmd_recompute_velocities(&cli.database, backend, json_mode)
        }
        Some(Commands::Init { force }) => cmd_init(&cli.database, backend, force),
        None => {
            // No subcommand - show status by default
            cmd_status(&cli.database, backend, json_mode)
        }
    }
}
