//! Configuration types for github-backup
//!
//! The file has three sections: `global` holds default account options,
//! `users` lists one option table per account, and `logging` configures the
//! subscriber installed by the binary. Account options are merged into one
//! [`AccountConfig`] per account by [`AccountConfig::resolve`]; nothing else
//! in the crate looks at the raw option tables.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::time::Duration;

/// GitHub REST API root used when `api_url` is not configured
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Config file used when no path is given on the command line
pub const DEFAULT_CONFIG_FILE: &str = "config.toml";

/// Top-level configuration file
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Defaults applied to every account
    #[serde(default)]
    pub global: AccountOptions,

    /// One entry per account, in file order
    #[serde(default)]
    pub users: Vec<AccountOptions>,

    /// Log level and format for the binary
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load a config file, choosing the format from the extension
    ///
    /// `.json` files are parsed as JSON, everything else as TOML. `${VAR}`
    /// references in string options are expanded from the environment.
    /// A file that cannot be read is [`Error::Io`].
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;

        let mut config = match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Self::from_json(&content)?,
            _ => Self::from_toml(&content)?,
        };
        config.expand_env()?;

        tracing::debug!(
            path = %path.display(),
            accounts = config.users.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Parse a TOML document
    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content).map_err(|e| Error::Config {
            message: format!("invalid TOML: {}", e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content).map_err(|e| Error::Config {
            message: format!("invalid JSON: {}", e),
            key: None,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.users.is_empty() {
            return Err(Error::config("users", "at least one user must be configured"));
        }
        Ok(())
    }

    /// Expand environment variables in every string option
    pub fn expand_env(&mut self) -> Result<()> {
        self.global.expand_env()?;
        for user in &mut self.users {
            user.expand_env()?;
        }
        Ok(())
    }

    /// Resolve every account, in file order
    ///
    /// Each account resolves independently: one invalid entry does not affect
    /// the others.
    pub fn accounts(&self) -> impl Iterator<Item = Result<AccountConfig>> + '_ {
        self.users
            .iter()
            .map(|user| AccountConfig::resolve(&self.global, user))
    }
}

/// Which repositories `GET /user/repos` returns
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affiliation {
    /// Repositories owned by the account
    #[default]
    Owner,
    /// Repositories the account collaborates on
    Collaborator,
    /// Repositories of organizations the account belongs to
    OrganizationMember,
    /// All of the above
    All,
}

impl Affiliation {
    /// Value of the `affiliation` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Affiliation::Owner => "owner",
            Affiliation::Collaborator => "collaborator",
            Affiliation::OrganizationMember => "organization_member",
            Affiliation::All => "owner,collaborator,organization_member",
        }
    }
}

/// Repository visibility filter for `GET /user/repos`
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Visibility {
    /// Public and private
    #[default]
    All,
    /// Public only
    Public,
    /// Private only
    Private,
}

impl Visibility {
    /// Value of the `visibility` query parameter
    pub fn as_query(&self) -> &'static str {
        match self {
            Visibility::All => "all",
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }
}

/// Include/exclude/only filter applied to a boolean repository flag
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RepoFilter {
    /// Keep repositories regardless of the flag
    Include,
    /// Drop repositories that have the flag set
    Exclude,
    /// Keep only repositories that have the flag set
    Only,
}

impl RepoFilter {
    /// Whether a repository with this flag value passes the filter
    pub fn admits(&self, flag: bool) -> bool {
        match self {
            RepoFilter::Include => true,
            RepoFilter::Exclude => !flag,
            RepoFilter::Only => flag,
        }
    }
}

/// `exclude_repos` accepts a single name or a list
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RepoList {
    /// `exclude_repos = "me/repo"`
    One(String),
    /// `exclude_repos = ["me/a", "me/b"]`
    Many(Vec<String>),
}

impl RepoList {
    fn names(&self) -> impl Iterator<Item = &str> {
        let names: &[String] = match self {
            RepoList::One(name) => std::slice::from_ref(name),
            RepoList::Many(names) => names,
        };
        names.iter().map(String::as_str)
    }
}

/// Options for one account, as written in the file
///
/// Every field is optional so the same table serves `global` and each
/// `users` entry. See [`AccountConfig`] for defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AccountOptions {
    /// Personal access token (only read from `users` entries)
    #[serde(default)]
    pub token: Option<String>,

    /// Output path template, e.g. `backups/{username}_{id}.tar.gz`
    #[serde(default)]
    pub outfile: Option<String>,

    /// Seconds between status checks; zero or negative disables polling
    #[serde(default)]
    pub check_time: Option<f64>,

    /// Repository affiliation filter
    #[serde(default)]
    pub affiliation: Option<Affiliation>,

    /// Repository visibility filter
    #[serde(default)]
    pub visibility: Option<Visibility>,

    /// Repositories to leave out of the migration (`owner/name`)
    #[serde(default)]
    pub exclude_repos: Option<RepoList>,

    /// Lock repositories while they are exported
    #[serde(default)]
    pub lock_repositories: Option<bool>,

    /// Skip issues, pull requests and other metadata
    #[serde(default)]
    pub exclude_metadata: Option<bool>,

    /// Skip git data
    #[serde(default)]
    pub exclude_git_data: Option<bool>,

    /// Skip attachments
    #[serde(default)]
    pub exclude_attachments: Option<bool>,

    /// Skip release assets
    #[serde(default)]
    pub exclude_releases: Option<bool>,

    /// Skip projects owned by the account
    #[serde(default)]
    pub exclude_owner_projects: Option<bool>,

    /// Export organization metadata only (no repositories)
    #[serde(default)]
    pub org_metadata_only: Option<bool>,

    /// What to do with forks
    #[serde(default)]
    pub forks: Option<RepoFilter>,

    /// What to do with disabled repositories
    #[serde(default)]
    pub disabled_repos: Option<RepoFilter>,

    /// API root, for GitHub Enterprise Server or tests
    #[serde(default)]
    pub api_url: Option<String>,

    /// Give up waiting for a migration after this many seconds
    #[serde(default)]
    pub max_wait: Option<f64>,
}

impl AccountOptions {
    fn expand_env(&mut self) -> Result<()> {
        for (key, value) in [
            ("token", &mut self.token),
            ("outfile", &mut self.outfile),
            ("api_url", &mut self.api_url),
        ] {
            if let Some(raw) = value.as_mut() {
                let expanded = shellexpand::env(raw.as_str())
                    .map_err(|e| Error::config(key, e.to_string()))?;
                *raw = expanded.into_owned();
            }
        }
        Ok(())
    }
}

/// Fully resolved settings for one account
#[derive(Clone)]
pub struct AccountConfig {
    /// Personal access token, never empty
    pub token: String,
    /// Output path template; no download when `None`
    pub outfile: Option<String>,
    /// Delay between status checks; `None` means the job is never polled
    pub poll_interval: Option<Duration>,
    /// Repository affiliation filter
    pub affiliation: Affiliation,
    /// Repository visibility filter
    pub visibility: Visibility,
    /// Excluded repository names, lowercased
    pub exclude_repos: BTreeSet<String>,
    /// Lock repositories during the export
    pub lock_repositories: bool,
    /// Skip metadata
    pub exclude_metadata: bool,
    /// Skip git data
    pub exclude_git_data: bool,
    /// Skip attachments
    pub exclude_attachments: bool,
    /// Skip releases
    pub exclude_releases: bool,
    /// Skip owner projects
    pub exclude_owner_projects: bool,
    /// Only export organization metadata
    pub org_metadata_only: bool,
    /// Fork filter
    pub forks: RepoFilter,
    /// Disabled repository filter
    pub disabled_repos: RepoFilter,
    /// API root without a trailing slash
    pub api_url: String,
    /// Upper bound on the time spent polling
    pub max_wait: Option<Duration>,
}

impl std::fmt::Debug for AccountConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountConfig")
            .field("token", &"<redacted>")
            .field("outfile", &self.outfile)
            .field("poll_interval", &self.poll_interval)
            .field("affiliation", &self.affiliation)
            .field("visibility", &self.visibility)
            .field("exclude_repos", &self.exclude_repos)
            .field("org_metadata_only", &self.org_metadata_only)
            .field("api_url", &self.api_url)
            .field("max_wait", &self.max_wait)
            .finish_non_exhaustive()
    }
}

/// Per-account value, then global value, then the default
fn pick<T: Clone>(user: &Option<T>, global: &Option<T>, default: T) -> T {
    user.as_ref().or(global.as_ref()).cloned().unwrap_or(default)
}

/// Positive, finite seconds as a duration; anything else is `None`
fn positive_seconds(key: &str, secs: f64) -> Result<Option<Duration>> {
    if secs.is_nan() || secs <= 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|e| Error::config(key, format!("{} is not a valid duration: {}", secs, e)))
}

impl AccountConfig {
    /// Merge one `users` entry over the `global` table
    pub fn resolve(global: &AccountOptions, user: &AccountOptions) -> Result<Self> {
        let token = user
            .token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| Error::config("token", "token is required"))?
            .to_string();

        let check_time = pick(&user.check_time, &global.check_time, default_check_time());
        let max_wait = match user.max_wait.or(global.max_wait) {
            Some(secs) => positive_seconds("max_wait", secs)?,
            None => None,
        };

        let exclude_repos = user
            .exclude_repos
            .as_ref()
            .or(global.exclude_repos.as_ref())
            .map(|list| list.names().map(str::to_lowercase).collect())
            .unwrap_or_default();

        let api_url = pick(&user.api_url, &global.api_url, DEFAULT_API_URL.to_string());
        let parsed = url::Url::parse(&api_url)
            .map_err(|e| Error::config("api_url", format!("invalid URL {:?}: {}", api_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::config(
                "api_url",
                format!("unsupported scheme {:?}", parsed.scheme()),
            ));
        }

        Ok(Self {
            token,
            outfile: user.outfile.clone().or_else(|| global.outfile.clone()),
            poll_interval: positive_seconds("check_time", check_time)?,
            affiliation: pick(&user.affiliation, &global.affiliation, Affiliation::default()),
            visibility: pick(&user.visibility, &global.visibility, Visibility::default()),
            exclude_repos,
            lock_repositories: pick(&user.lock_repositories, &global.lock_repositories, false),
            exclude_metadata: pick(&user.exclude_metadata, &global.exclude_metadata, false),
            exclude_git_data: pick(&user.exclude_git_data, &global.exclude_git_data, false),
            exclude_attachments: pick(
                &user.exclude_attachments,
                &global.exclude_attachments,
                false,
            ),
            exclude_releases: pick(&user.exclude_releases, &global.exclude_releases, false),
            exclude_owner_projects: pick(
                &user.exclude_owner_projects,
                &global.exclude_owner_projects,
                false,
            ),
            org_metadata_only: pick(&user.org_metadata_only, &global.org_metadata_only, false),
            forks: pick(&user.forks, &global.forks, RepoFilter::Exclude),
            disabled_repos: pick(&user.disabled_repos, &global.disabled_repos, RepoFilter::Include),
            api_url: api_url.trim_end_matches('/').to_string(),
            max_wait,
        })
    }

    /// Whether the migration is watched after it is created
    pub fn polls(&self) -> bool {
        self.poll_interval.is_some()
    }
}

/// Output format of the log subscriber
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human readable output
    #[default]
    Pretty,
    /// Single-line human readable output
    Compact,
    /// One JSON object per line
    Json,
}

/// `[logging]` section
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `EnvFilter` directive, e.g. `info` or `github_backup=debug` (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_check_time() -> f64 {
    30.0
}

fn default_log_level() -> String {
    "info".to_string()
}
