//! # Attestor - Forensic Evidence Pipeline
//!
//! The main binary for the attestor analysis pipeline.
//!
//! This application provides:
//! - CLI interface for running analyses and inspecting sealed reports
//! - Report and audit-trail storage (redb-backed)
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                 apps/attestor (THE BINARY)                 │
//! │                                                            │
//! │  ┌─────────────┐    ┌──────────────┐    ┌──────────────┐  │
//! │  │   CLI       │    │ Report Store │    │ JSON Export  │  │
//! │  │  (clap)     │    │   (redb)     │    │ (serde_json) │  │
//! │  └──────┬──────┘    └──────┬───────┘    └──────┬───────┘  │
//! │         │                  │                   │          │
//! │         └──────────────────┼───────────────────┘          │
//! │                            ▼                              │
//! │                    ┌───────────────┐                      │
//! │                    │ attestor-core │                      │
//! │                    │  (THE LOGIC)  │                      │
//! │                    └───────────────┘                      │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Run a full analysis over evidence files
//! attestor analyze -f scene.jpg -f statement.txt -i case-001
//!
//! # Verify a sealed report and its evidence files
//! attestor verify case-001
//!
//! # Inspect stored reports and audit trails
//! attestor report --list
//! attestor audit case-001
//! ```

mod cli;

use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // ATTESTOR_LOG_FORMAT=json switches to machine-parseable log output.
    let log_format = std::env::var("ATTESTOR_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "attestor=info,attestor_core=info".into());

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

    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Display startup banner
    if !cli.quiet && !cli.json_mode {
        print_banner();
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}

/// Print the attestor startup banner.
fn print_banner() {
    println!(
        r#"
   █████╗ ████████╗████████╗███████╗███████╗████████╗ ██████╗ ██████╗
  ██╔══██╗╚══██╔══╝╚══██╔══╝██╔════╝██╔════╝╚══██╔══╝██╔═══██╗██╔══██╗
  ███████║   ██║      ██║   █████╗  ███████╗   ██║   ██║   ██║██████╔╝
  ██╔══██║   ██║      ██║   ██╔══╝  ╚════██║   ██║   ██║   ██║██╔══██╗
  ██║  ██║   ██║      ██║   ███████╗███████║   ██║   ╚██████╔╝██║  ██║
  ╚═╝  ╚═╝   ╚═╝      ╚═╝   ╚══════╝╚══════╝   ╚═╝    ╚═════╝ ╚═╝  ╚═╝

  Forensic Evidence Pipeline v{}

  Independent • Sealed • Verifiable
"#,
        env!("CARGO_PKG_VERSION")
    );
}
