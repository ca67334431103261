//! # Sensornet - Sensor Network Data Server
//!
//! The main binary for the sensornet table engine.
//!
//! This application provides:
//! - HTTP REST API server (axum-based)
//! - CLI interface for queries and mutations
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │            apps/sensornet (THE BINARY)        │
//! │                                               │
//! │   ┌─────────────┐        ┌─────────────┐      │
//! │   │     CLI     │        │  HTTP API   │      │
//! │   │   (clap)    │        │   (axum)    │      │
//! │   └──────┬──────┘        └──────┬──────┘      │
//! │          └───────────┬──────────┘             │
//! │                      ▼                        │
//! │             ┌────────────────┐                │
//! │             │ sensornet-core │                │
//! │             │  (THE ENGINE)  │                │
//! │             └────────────────┘                │
//! └───────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Start the HTTP server
//! sensornet server --host 0.0.0.0 --port 8080
//!
//! # CLI operations
//! sensornet init
//! sensornet insert station --set name=Summit --set region=Alpine
//! sensornet union record --eq station_id=0 --fields timestamp,measured_value,name
//! ```

use clap::Parser;
use sensornet::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Environment variable selecting the log format (`json` or text).
const LOG_FORMAT_ENV: &str = "SENSORNET_LOG_FORMAT";

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // SENSORNET_LOG_FORMAT=json enables machine-parseable output.
    let log_format = std::env::var(LOG_FORMAT_ENV).unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "sensornet=info,sensornet_core=info,tower_http=debug".into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    let cli = cli::Cli::parse();

    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the one-line startup banner.
fn print_banner() {
    eprintln!("sensornet v{}", env!("CARGO_PKG_VERSION"));
}
