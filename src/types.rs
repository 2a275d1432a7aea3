//! Core types for github-backup
//!
//! Wire types for the handful of GitHub REST endpoints the crate talks to,
//! plus the small domain types shared by the session and the orchestrator.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Identifier GitHub assigns to a user migration
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MigrationId(pub u64);

impl MigrationId {
    /// Get the inner value
    pub fn get(&self) -> u64 {
        self.0
    }
}

impl From<u64> for MigrationId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::fmt::Display for MigrationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// State of a migration as reported by `GET /user/migrations/{id}`
///
/// Only `exported` and `failed` are terminal. Intermediate states are kept
/// verbatim so new values from the service pass through untouched.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum JobState {
    /// Accepted but not started
    Pending,
    /// Archive is being built
    Exporting,
    /// Archive is ready for download
    Exported,
    /// The service gave up on the export
    Failed,
    /// Any other state string
    Other(String),
}

impl JobState {
    /// Whether no further transition can happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobState::Exported | JobState::Failed)
    }

    /// The state string as the service spells it
    pub fn as_str(&self) -> &str {
        match self {
            JobState::Pending => "pending",
            JobState::Exporting => "exporting",
            JobState::Exported => "exported",
            JobState::Failed => "failed",
            JobState::Other(s) => s,
        }
    }
}

impl From<String> for JobState {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => JobState::Pending,
            "exporting" => JobState::Exporting,
            "exported" => JobState::Exported,
            "failed" => JobState::Failed,
            _ => JobState::Other(s),
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Entry of `GET /user/repos`
#[derive(Clone, Debug, Deserialize)]
pub struct Repository {
    /// `owner/name`
    pub full_name: String,
    /// Whether the repository is a fork
    #[serde(default)]
    pub fork: bool,
    /// Whether the repository is disabled
    #[serde(default)]
    pub disabled: bool,
}

/// Body of `POST /user/migrations`
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StartMigration {
    /// Full names of the repositories to export
    pub repositories: Vec<String>,
    /// Lock the repositories while the export runs
    pub lock_repositories: bool,
    /// Skip issues, pull requests and other metadata
    pub exclude_metadata: bool,
    /// Skip the git repositories themselves
    pub exclude_git_data: bool,
    /// Skip attachments
    pub exclude_attachments: bool,
    /// Skip release assets
    pub exclude_releases: bool,
    /// Skip projects owned by the account
    pub exclude_owner_projects: bool,
    /// Only export organization metadata
    #[serde(skip_serializing_if = "Option::is_none")]
    pub org_metadata_only: Option<bool>,
}

/// Owner object embedded in a migration
#[derive(Clone, Debug, Deserialize)]
pub struct Owner {
    /// Canonical account name
    pub login: String,
}

/// Response of `POST /user/migrations`
#[derive(Clone, Debug, Deserialize)]
pub struct Migration {
    /// Migration id
    pub id: MigrationId,
    /// Account that owns the migration
    pub owner: Owner,
}

/// Response of `GET /user/migrations/{id}`
#[derive(Clone, Debug, Deserialize)]
pub struct MigrationStatus {
    /// Current state
    pub state: JobState,
    /// Last update, e.g. `2024-01-01T00:00:00.000000+00:00`
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// How a watcher finished when it did not fail
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WatchOutcome {
    /// The service finished the export
    Exported {
        /// Where the archive was written, if an output template is configured
        archive: Option<PathBuf>,
    },
    /// The watcher was asked to stop before a terminal state
    Cancelled,
    /// The configured maximum wait elapsed before a terminal state
    TimedOut,
}
