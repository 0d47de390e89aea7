//! # Vantage - Client Delivery Health Server
//!
//! The main binary for the Vantage delivery-health reporting engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for imports and reports
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────┐
//! │              apps/vantage (THE BINARY)            │
//! │                                                   │
//! │   ┌─────────────┐         ┌─────────────┐         │
//! │   │    CLI      │         │  HTTP API   │         │
//! │   │   (clap)    │         │   (axum)    │         │
//! │   └──────┬──────┘         └──────┬──────┘         │
//! │          │                       │                │
//! │          └───────────┬───────────┘                │
//! │                      ▼                            │
//! │             ┌────────────────┐                    │
//! │             │  vantage-core  │                    │
//! │             │  (THE LOGIC)   │                    │
//! │             └────────────────┘                    │
//! └───────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! vantage server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! vantage status
//! vantage import -i snapshot.json
//! vantage report -r 1 -o -total_spent
//! ```

mod api;
mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments first so --verbose can widen the default log filter.
    let cli = cli::Cli::parse();

    // Initialize tracing — VANTAGE_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var("VANTAGE_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let default_filter = if cli.verbose {
        "vantage=debug,tower_http=debug"
    } else {
        "vantage=info,tower_http=debug"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }

    // Display startup banner
    if !cli.quiet {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the Vantage startup banner.
fn print_banner() {
    println!(
        r#"
  ██╗   ██╗ █████╗ ███╗   ██╗████████╗ █████╗  ██████╗ ███████╗
  ██║   ██║██╔══██╗████╗  ██║╚══██╔══╝██╔══██╗██╔════╝ ██╔════╝
  ██║   ██║███████║██╔██╗ ██║   ██║   ███████║██║  ███╗█████╗
  ╚██╗ ██╔╝██╔══██║██║╚██╗██║   ██║   ██╔══██║██║   ██║██╔══╝
   ╚████╔╝ ██║  ██║██║ ╚████║   ██║   ██║  ██║╚██████╔╝███████╗
    ╚═══╝  ╚═╝  ╚═╝╚═╝  ╚═══╝   ╚═╝   ╚═╝  ╚═╝ ╚═════╝ ╚══════╝

  Client Delivery Health v{}

  Deterministic • Auditable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
