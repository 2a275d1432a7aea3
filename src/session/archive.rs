//! Saving the exported archive to disk.

use crate::error::{Error, Result};
use crate::template::{self, TemplateValues};
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};

use super::AccountSession;

impl AccountSession {
    /// Download the archive to the path rendered from `template`
    ///
    /// `timestamp` fills `{datetime}`. Missing parent directories are
    /// created. The archive endpoint redirects to a storage host; the
    /// account's headers are only sent to GitHub. An existing file at the
    /// destination is only replaced once the new archive is complete.
    pub async fn download(
        &self,
        template: &str,
        timestamp: DateTime<FixedOffset>,
    ) -> Result<PathBuf> {
        let destination = self.destination(template, timestamp).inspect_err(|e| {
            tracing::error!(error = %e, "Cannot build archive path");
        })?;

        if let Some(dir) = non_empty_parent(&destination)
            && !dir.is_dir()
        {
            tracing::debug!(path = %dir.display(), "Creating path");
            tokio::fs::create_dir_all(dir).await.map_err(|e| {
                tracing::error!(path = %dir.display(), error = %e, "Cannot create archive directory");
                Error::Download {
                    path: destination.clone(),
                    reason: format!("failed to create {}: {}", dir.display(), e),
                }
            })?;
        }

        tracing::debug!(
            path = %destination.display(),
            "Downloading {}'s backup",
            self.login
        );
        let bytes = self
            .client
            .download(
                &self.url(&format!("/user/migrations/{}/archive", self.id)),
                &self.headers,
                &destination,
            )
            .await?;

        tracing::info!(
            path = %destination.display(),
            bytes,
            "Saved backup for {}",
            self.login
        );
        Ok(destination)
    }

    fn destination(&self, template: &str, timestamp: DateTime<FixedOffset>) -> Result<PathBuf> {
        template::render(
            template,
            &TemplateValues {
                username: &self.login,
                datetime: timestamp,
                id: self.id,
            },
        )
    }
}

fn non_empty_parent(path: &Path) -> Option<&Path> {
    path.parent().filter(|p| !p.as_os_str().is_empty())
}
