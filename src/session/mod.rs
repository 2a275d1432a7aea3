//! Per-account migration lifecycle (decomposed into focused submodules)
//!
//! An [`AccountSession`] is created by [`AccountSession::start`], which lists
//! the account's repositories and asks GitHub to start a migration. The
//! session is then either dropped (polling disabled) or consumed by
//! [`AccountSession::watch`], which polls until the migration reaches a
//! terminal state and downloads the archive when an output template is
//! configured.
//!
//! - `watch`: polling state machine
//! - `archive`: archive download

mod archive;
mod watch;

use crate::client::{ApiClient, github_headers};
use crate::config::AccountConfig;
use crate::error::Result;
use crate::types::{Migration, MigrationId, Repository, StartMigration};
use reqwest::header::HeaderMap;
use std::collections::BTreeSet;

/// Page size used when listing repositories (the API maximum)
const REPOS_PER_PAGE: usize = 100;

/// One account's migration, from creation to archive
pub struct AccountSession {
    client: ApiClient,
    config: AccountConfig,
    /// Built once from the token, sent with every request
    headers: HeaderMap,
    repositories: BTreeSet<String>,
    id: MigrationId,
    login: String,
}

impl std::fmt::Debug for AccountSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountSession")
            .field("login", &self.login)
            .field("id", &self.id)
            .field("repositories", &self.repositories.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AccountSession {
    /// List repositories and start a migration for one account
    ///
    /// Repository listing is skipped for `org_metadata_only` accounts. Any
    /// failure (listing or creation) fails this account only; the error has
    /// already been logged by the client.
    pub async fn start(client: ApiClient, config: AccountConfig) -> Result<Self> {
        let headers = github_headers(&config.token)?;

        let repositories = if config.org_metadata_only {
            BTreeSet::new()
        } else {
            list_repositories(&client, &config, &headers).await?
        };
        tracing::debug!(count = repositories.len(), "Got repository info");

        let body = StartMigration {
            repositories: repositories.iter().cloned().collect(),
            lock_repositories: config.lock_repositories,
            exclude_metadata: config.exclude_metadata,
            exclude_git_data: config.exclude_git_data,
            exclude_attachments: config.exclude_attachments,
            exclude_releases: config.exclude_releases,
            exclude_owner_projects: config.exclude_owner_projects,
            org_metadata_only: config.org_metadata_only.then_some(true),
        };
        let migration: Migration = client
            .post(&api_url(&config, "/user/migrations"), &headers, &body)
            .await?;

        tracing::info!(
            migration_id = %migration.id,
            login = %migration.owner.login,
            repositories = repositories.len(),
            "Started backup {} for user {}",
            migration.id,
            migration.owner.login
        );

        Ok(Self {
            client,
            config,
            headers,
            repositories,
            id: migration.id,
            login: migration.owner.login,
        })
    }

    /// Migration id assigned by GitHub
    pub fn id(&self) -> MigrationId {
        self.id
    }

    /// Canonical account name returned with the migration
    pub fn login(&self) -> &str {
        &self.login
    }

    /// Repositories included in the migration
    pub fn repositories(&self) -> &BTreeSet<String> {
        &self.repositories
    }

    /// Resolved account settings
    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    fn url(&self, path: &str) -> String {
        api_url(&self.config, path)
    }
}

fn api_url(config: &AccountConfig, path: &str) -> String {
    format!("{}{}", config.api_url, path)
}

/// `GET /user/repos`, all pages, filtered by the account settings
///
/// Exclusions are matched case-insensitively, as GitHub treats repository
/// names.
async fn list_repositories(
    client: &ApiClient,
    config: &AccountConfig,
    headers: &HeaderMap,
) -> Result<BTreeSet<String>> {
    let url = api_url(config, "/user/repos");
    let mut names = BTreeSet::new();

    for page in 1u32.. {
        let repos: Vec<Repository> = client
            .get(
                &url,
                &[
                    ("affiliation", config.affiliation.as_query().to_string()),
                    ("visibility", config.visibility.as_query().to_string()),
                    ("per_page", REPOS_PER_PAGE.to_string()),
                    ("page", page.to_string()),
                ],
                headers,
            )
            .await?;
        let page_len = repos.len();

        names.extend(
            repos
                .into_iter()
                .filter(|r| config.forks.admits(r.fork))
                .filter(|r| config.disabled_repos.admits(r.disabled))
                .filter(|r| !config.exclude_repos.contains(&r.full_name.to_lowercase()))
                .map(|r| r.full_name),
        );

        if page_len < REPOS_PER_PAGE {
            break;
        }
    }

    Ok(names)
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
