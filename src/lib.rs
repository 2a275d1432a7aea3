//! # github-backup
//!
//! Backs up GitHub accounts through the user migrations API.
//!
//! For every configured account the crate lists the account's repositories,
//! asks GitHub to start a migration (an asynchronous export job), polls the
//! migration until it is `exported` or `failed`, and streams the finished
//! archive to a path built from a template. Accounts are independent: each
//! one is watched by its own task and a failure in one never affects another.
//!
//! ## Quick Start
//!
//! ```no_run
//! use github_backup::{Config, Orchestrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_toml(
//!         r#"
//!         [global]
//!         check_time = 60
//!         outfile = "backups/{username}_{datetime:%Y%m%d}_{id}.tar.gz"
//!
//!         [[users]]
//!         token = "ghp_example"
//!         "#,
//!     )?;
//!
//!     let cancel = CancellationToken::new();
//!     github_backup::cancel_on_signal(cancel.clone());
//!
//!     let summary = Orchestrator::new(config)?.run(cancel).await?;
//!     println!("{} of {} accounts failed", summary.failed(), summary.accounts.len());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP client adapter for the GitHub REST API
pub mod client;
/// Configuration types and loading
pub mod config;
/// Error types
pub mod error;
/// Log subscriber setup for the binary
pub mod logging;
/// Runs every configured account
pub mod orchestrator;
/// Per-account migration lifecycle
pub mod session;
/// Output path templates
pub mod template;
/// Wire and domain types
pub mod types;

// Re-export commonly used types
pub use client::ApiClient;
pub use config::{AccountConfig, AccountOptions, Config};
pub use error::{Error, Result};
pub use orchestrator::{AccountReport, AccountStatus, Orchestrator, RunSummary};
pub use session::AccountSession;
pub use types::{JobState, MigrationId, WatchOutcome};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal
///
/// Spawns a task that waits for the signal in the background.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
pub fn cancel_on_signal(token: CancellationToken) {
    tokio::spawn(async move {
        tokio::select! {
            _ = wait_for_signal() => {
                tracing::info!("Stopping all watchers");
                token.cancel();
            }
            _ = token.cancelled() => {}
        }
    });
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration can fail in restricted environments (containers, tests)
    match (signal(SignalKind::terminate()), signal(SignalKind::interrupt())) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => tracing::info!("Received SIGTERM"),
                _ = sigint.recv() => tracing::info!("Received SIGINT"),
            }
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::info!("Received SIGTERM");
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::info!("Received SIGINT");
        }
        (Err(e), Err(_)) => {
            tracing::error!(error = %e, "Could not register signal handlers, using ctrl_c fallback");
            tokio::signal::ctrl_c().await.ok();
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("Received Ctrl+C"),
        Err(e) => tracing::error!(error = %e, "Failed to listen for Ctrl+C"),
    }
}
