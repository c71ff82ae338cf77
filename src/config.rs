//! Run configuration
//!
//! Layered the same way on every run:
//! - Built-in defaults
//! - Config file (explicit `--config`, else the first of `ticket-trend.toml`,
//!   `.ticket-trend.toml`, `<config dir>/ticket-trend/config.toml`)
//! - Environment variable overrides
//! - Command line flags (applied by the binary)
//!
//! The loaded [`Config`] is passed explicitly to whoever needs it.

use crate::error::{Result as TrendResult, TrendError};
use crate::fetcher::MAX_PAGE_SIZE;
use crate::resolver::{CommitSelection, ResolverPolicy};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub logging: LoggingConfig,
    pub tracker: TrackerConfig,
    pub repository: RepositoryConfig,
    pub resolver: ResolverConfig,
    pub output: OutputConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
    pub output: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    pub base_url: String,
    pub project: String,
    pub resolution: String,
    pub page_size: usize,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositoryConfig {
    /// Local working copy; defaults to `./<PROJECT>Repo`
    pub path: Option<PathBuf>,
    /// Cloned into `path` when the working copy is missing
    pub remote_url: Option<String>,
    /// Substring a commit's first subject token must contain; defaults to the project
    pub issue_prefix: Option<String>,
    pub git_binary: String,
    pub timeout_secs: u64,
    pub clone_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub policy: ResolverPolicy,
    pub selection: CommitSelection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    pub log_directory: PathBuf,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            format: "pretty".to_string(),
            output: "console".to_string(),
        }
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://issues.apache.org/jira".to_string(),
            project: "FALCON".to_string(),
            resolution: "fixed".to_string(),
            page_size: MAX_PAGE_SIZE,
            timeout_secs: 60,
        }
    }
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            path: None,
            remote_url: None,
            issue_prefix: None,
            git_binary: "git".to_string(),
            timeout_secs: 300,
            clone_timeout_secs: 1800,
        }
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            policy: ResolverPolicy::BulkIndex,
            selection: CommitSelection::Latest,
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("out.csv"),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            log_directory: PathBuf::from("logs"),
        }
    }
}

impl RepositoryConfig {
    pub fn working_copy(&self, project: &str) -> PathBuf {
        self.path
            .clone()
            .unwrap_or_else(|| PathBuf::from(format!("./{}Repo", project)))
    }

    pub fn issue_prefix<'a>(&'a self, project: &'a str) -> &'a str {
        self.issue_prefix.as_deref().unwrap_or(project)
    }
}

impl Config {
    /// Load configuration from file (explicit or discovered), then environment
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::load_from_file(path)?,
            None => Self::discover()?,
        };

        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn discover() -> Result<Self> {
        let config_paths = [
            PathBuf::from("ticket-trend.toml"),
            PathBuf::from(".ticket-trend.toml"),
            dirs::config_dir()
                .map(|d| d.join("ticket-trend").join("config.toml"))
                .unwrap_or_default(),
        ];

        for path in &config_paths {
            if !path.as_os_str().is_empty() && path.exists() {
                return Self::load_from_file(path);
            }
        }
        Ok(Self::default())
    }

    pub fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = env::var("LOG_LEVEL") {
            self.logging.level = val;
        }
        if let Ok(val) = env::var("LOG_FORMAT") {
            self.logging.format = val;
        }
        if let Ok(val) = env::var("LOG_OUTPUT") {
            self.logging.output = val;
        }

        if let Ok(val) = env::var("TICKET_TREND_PROJECT") {
            self.tracker.project = val;
        }
        if let Ok(val) = env::var("TICKET_TREND_TRACKER_URL") {
            self.tracker.base_url = val;
        }
        if let Ok(val) = env::var("TICKET_TREND_PAGE_SIZE") {
            self.tracker.page_size = val.parse().context("Invalid TICKET_TREND_PAGE_SIZE")?;
        }

        if let Ok(val) = env::var("TICKET_TREND_REPO_PATH") {
            self.repository.path = Some(PathBuf::from(val));
        }
        if let Ok(val) = env::var("TICKET_TREND_POLICY") {
            self.resolver.policy = val
                .parse()
                .map_err(anyhow::Error::msg)
                .context("Invalid TICKET_TREND_POLICY")?;
        }

        if let Ok(val) = env::var("TICKET_TREND_OUTPUT") {
            self.output.path = PathBuf::from(val);
        }
        if let Ok(val) = env::var("TICKET_TREND_LOG_DIR") {
            self.paths.log_directory = PathBuf::from(val);
        }

        Ok(())
    }

    pub fn validate(&self) -> TrendResult<()> {
        if self.tracker.project.trim().is_empty() {
            return Err(TrendError::Config("Project name must not be empty".to_string()));
        }

        if self.tracker.page_size == 0 || self.tracker.page_size > MAX_PAGE_SIZE {
            return Err(TrendError::Config(format!(
                "Page size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.tracker.page_size
            )));
        }

        if self.tracker.timeout_secs == 0
            || self.repository.timeout_secs == 0
            || self.repository.clone_timeout_secs == 0
        {
            return Err(TrendError::Config("Timeouts must be greater than 0".to_string()));
        }

        if self.output.path.as_os_str().is_empty() {
            return Err(TrendError::Config("Output path must not be empty".to_string()));
        }

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}
