//! Polling a migration until it reaches a terminal state.

use crate::error::{Error, Result};
use crate::template::parse_timestamp;
use crate::types::{JobState, MigrationStatus, WatchOutcome};
use tokio::time::{Instant, sleep};
use tokio_util::sync::CancellationToken;

use super::AccountSession;

impl AccountSession {
    /// Fetch the current state of the migration
    pub async fn status(&self) -> Result<MigrationStatus> {
        let status: MigrationStatus = self
            .client
            .get(
                &self.url(&format!("/user/migrations/{}", self.id)),
                &[],
                &self.headers,
            )
            .await?;
        tracing::debug!(state = %status.state, "Got state");
        Ok(status)
    }

    /// Poll the migration every `check_time` seconds until it is terminal
    ///
    /// The session is consumed: it cannot be watched twice. States:
    ///
    /// - `exported`: download the archive when `outfile` is configured, then
    ///   return [`WatchOutcome::Exported`]
    /// - `failed`: return [`Error::ExportFailed`]; nothing is downloaded
    /// - anything else: sleep and poll again
    ///
    /// A failed status request is logged and retried at the next interval.
    /// `cancel` stops the loop (including a running download) with
    /// [`WatchOutcome::Cancelled`]; `max_wait` bounds the total time spent
    /// polling with [`WatchOutcome::TimedOut`].
    pub async fn watch(self, cancel: CancellationToken) -> Result<WatchOutcome> {
        let Some(interval) = self.config.poll_interval else {
            return Err(Error::config(
                "check_time",
                "polling is disabled for this account",
            ));
        };
        let deadline = self.config.max_wait.map(|max| Instant::now() + max);

        tracing::info!(
            interval = ?interval,
            "Waiting for {}'s backup to complete",
            self.login
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => return Ok(self.cancelled()),
                _ = sleep(interval) => {}
            }

            let status = tokio::select! {
                _ = cancel.cancelled() => return Ok(self.cancelled()),
                status = self.status() => status,
            };

            match status {
                Ok(MigrationStatus {
                    state: JobState::Exported,
                    updated_at,
                }) => {
                    tracing::info!("Backup for {} created", self.login);
                    return self.finish(updated_at.as_deref(), &cancel).await;
                }
                Ok(MigrationStatus {
                    state: JobState::Failed,
                    ..
                }) => {
                    tracing::error!("Backup for {} failed", self.login);
                    return Err(Error::ExportFailed {
                        id: self.id,
                        login: self.login,
                    });
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        "Could not check migration state, retrying at next interval"
                    );
                }
            }

            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                tracing::error!(
                    max_wait = ?self.config.max_wait,
                    "Gave up waiting for {}'s backup",
                    self.login
                );
                return Ok(WatchOutcome::TimedOut);
            }
        }
    }

    /// Handle the `exported` state
    async fn finish(
        &self,
        updated_at: Option<&str>,
        cancel: &CancellationToken,
    ) -> Result<WatchOutcome> {
        let Some(template) = self.config.outfile.as_deref() else {
            return Ok(WatchOutcome::Exported { archive: None });
        };

        let timestamp = match updated_at.and_then(parse_timestamp) {
            Some(timestamp) => timestamp,
            None => {
                tracing::warn!(
                    updated_at,
                    "Missing or unparseable updated_at, using the current time"
                );
                chrono::Utc::now().fixed_offset()
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Ok(self.cancelled()),
            archive = self.download(template, timestamp) => Ok(WatchOutcome::Exported {
                archive: Some(archive?),
            }),
        }
    }

    fn cancelled(&self) -> WatchOutcome {
        tracing::info!("Stopped watching {}'s backup", self.login);
        WatchOutcome::Cancelled
    }
}
