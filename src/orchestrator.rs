//! Running every configured account
//!
//! [`Orchestrator::run`] starts one migration per account, one after the
//! other, then watches every migration whose poll interval is positive in its
//! own task. It returns once all watchers have finished. Accounts never share
//! state: a failure in one is logged, recorded in the [`RunSummary`], and has
//! no effect on the rest.

use crate::client::ApiClient;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::session::AccountSession;
use crate::types::{MigrationId, WatchOutcome};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// What happened to one account during a run
#[derive(Debug)]
pub enum AccountStatus {
    /// The account's settings were invalid or its migration could not be started
    NotStarted(Error),
    /// The migration was started but polling is disabled for the account
    Unwatched,
    /// The watcher ran to completion
    Finished(Result<WatchOutcome>),
    /// The watcher task ended without reporting (it panicked or was aborted)
    Lost,
}

/// Per-account entry of a [`RunSummary`]
#[derive(Debug)]
pub struct AccountReport {
    /// Position of the account in the `users` list
    pub index: usize,
    /// Account login, once the migration was started
    pub login: Option<String>,
    /// Migration id, once the migration was started
    pub migration_id: Option<MigrationId>,
    /// Final status
    pub status: AccountStatus,
}

impl AccountReport {
    /// Whether the account ended without an error
    ///
    /// A watcher that gave up after `max_wait` is a failure: its archive was
    /// never saved. A cancelled watcher is not, since it stopped on request.
    pub fn is_success(&self) -> bool {
        matches!(
            self.status,
            AccountStatus::Unwatched
                | AccountStatus::Finished(Ok(
                    WatchOutcome::Exported { .. } | WatchOutcome::Cancelled
                ))
        )
    }
}

/// Result of [`Orchestrator::run`], one report per configured account
#[derive(Debug, Default)]
pub struct RunSummary {
    /// Reports in `users` order
    pub accounts: Vec<AccountReport>,
}

impl RunSummary {
    /// Number of accounts whose migration was started
    pub fn started(&self) -> usize {
        self.accounts
            .iter()
            .filter(|a| !matches!(a.status, AccountStatus::NotStarted(_)))
            .count()
    }

    /// Number of accounts that ended with an error
    pub fn failed(&self) -> usize {
        self.accounts.iter().filter(|a| !a.is_success()).count()
    }
}

/// Drives the migrations of every configured account
pub struct Orchestrator {
    config: Config,
    client: ApiClient,
}

impl Orchestrator {
    /// Create an orchestrator with its own HTTP client
    pub fn new(config: Config) -> Result<Self> {
        Ok(Self::with_client(config, ApiClient::new()?))
    }

    /// Create an orchestrator that uses `client` for every account
    pub fn with_client(config: Config, client: ApiClient) -> Self {
        Self { config, client }
    }

    /// Start every account's migration and wait for all watchers
    ///
    /// Migrations are started sequentially in `users` order; watchers then run
    /// concurrently, one task per account. Cancelling `cancel` stops all
    /// watchers, each ending with [`WatchOutcome::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoAccounts`] when no account could start a migration.
    /// Every other failure is account-local and reported in the summary.
    pub async fn run(&self, cancel: CancellationToken) -> Result<RunSummary> {
        let mut summary = RunSummary::default();
        let mut watchers = JoinSet::new();

        for (index, account) in self.config.accounts().enumerate() {
            let span = tracing::info_span!(
                "account",
                index,
                login = tracing::field::Empty,
                migration_id = tracing::field::Empty,
            );

            let started = match account {
                Ok(account) => {
                    AccountSession::start(self.client.clone(), account)
                        .instrument(span.clone())
                        .await
                }
                Err(e) => Err(e),
            };

            let session = match started {
                Ok(session) => session,
                Err(e) => {
                    span.in_scope(|| {
                        tracing::error!(error = %e, code = e.error_code(), "Could not start backup");
                    });
                    summary.accounts.push(AccountReport {
                        index,
                        login: None,
                        migration_id: None,
                        status: AccountStatus::NotStarted(e),
                    });
                    continue;
                }
            };

            span.record("login", session.login());
            span.record("migration_id", session.id().get());
            let mut report = AccountReport {
                index,
                login: Some(session.login().to_string()),
                migration_id: Some(session.id()),
                status: AccountStatus::Unwatched,
            };

            if session.config().polls() {
                report.status = AccountStatus::Lost;
                let cancel = cancel.child_token();
                watchers.spawn(
                    async move {
                        let result = session.watch(cancel).await;
                        match &result {
                            Ok(outcome) => tracing::info!(?outcome, "Watcher finished"),
                            Err(e) => {
                                tracing::error!(error = %e, code = e.error_code(), "Watcher failed")
                            }
                        }
                        (index, result)
                    }
                    .instrument(span),
                );
            } else {
                span.in_scope(|| {
                    tracing::info!("Polling disabled, not waiting for the migration");
                });
            }
            summary.accounts.push(report);
        }

        if summary.started() == 0 {
            tracing::error!(
                accounts = summary.accounts.len(),
                "No account could start a migration"
            );
            return Err(Error::NoAccounts);
        }

        tracing::debug!(watchers = watchers.len(), "Waiting for watchers");
        while let Some(joined) = watchers.join_next().await {
            match joined {
                Ok((index, result)) => {
                    if let Some(report) = summary.accounts.iter_mut().find(|r| r.index == index) {
                        report.status = AccountStatus::Finished(result);
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Watcher task ended abnormally");
                }
            }
        }

        tracing::info!(
            accounts = summary.accounts.len(),
            started = summary.started(),
            failed = summary.failed(),
            "All backups finished"
        );
        Ok(summary)
    }
}
