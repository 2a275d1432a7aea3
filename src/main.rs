//! `github-backup` command line entry point

use clap::Parser;
use github_backup::config::DEFAULT_CONFIG_FILE;
use github_backup::{Config, Orchestrator};
use std::path::PathBuf;
use std::process::ExitCode;
use tokio_util::sync::CancellationToken;

/// Back up GitHub accounts through the migrations API
#[derive(Debug, Parser)]
#[command(name = "github-backup", version, about)]
struct Args {
    /// Path to the TOML (or `.json`) config file
    #[arg(default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Log filter, overrides `logging.level` (RUST_LOG still wins)
    #[arg(long, value_name = "FILTER")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Tokens are usually referenced as ${VAR} from a .env file
    dotenvy::dotenv().ok();

    let config = match Config::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("github-backup: {}: {}", args.config.display(), e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = github_backup::logging::init_tracing(&config.logging, args.log_level.as_deref())
    {
        eprintln!("github-backup: {}", e);
        return ExitCode::FAILURE;
    }

    let cancel = CancellationToken::new();
    github_backup::cancel_on_signal(cancel.clone());

    let orchestrator = match Orchestrator::new(config) {
        Ok(orchestrator) => orchestrator,
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "Failed to build HTTP client");
            return ExitCode::FAILURE;
        }
    };

    match orchestrator.run(cancel).await {
        Ok(summary) => {
            if summary.failed() > 0 {
                tracing::warn!(
                    failed = summary.failed(),
                    accounts = summary.accounts.len(),
                    "Some backups did not complete"
                );
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, code = e.error_code(), "Backup run failed");
            ExitCode::FAILURE
        }
    }
}
