//! Repository commit log access
//!
//! [`CommitLog`] is the seam the resolver reads commit evidence through.
//! [`GitCli`] implements it by running `git log` in a local working copy.
//! Every invocation is bounded by a timeout and the child is killed if the
//! call is abandoned, so no git process outlives the request that started it.

use crate::config::RepositoryConfig;
use crate::error::{Result, TrendError};
use crate::models::CommitEntry;
use crate::timestamp_parser::TimestampParser;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, info, warn};

/// Separates commit date and message in `--pretty` output
const FIELD_SEPARATOR: char = '\u{1f}';

#[async_trait]
pub trait CommitLog: Send + Sync {
    /// Every commit reachable from HEAD as `(commit time, subject line)`
    async fn full_history(&self) -> Result<Vec<CommitEntry>>;

    /// Commits whose message may reference `key`, as `(commit time, full message)`.
    ///
    /// This is a coarse pre-filter; callers check the token boundary with
    /// [`references_issue`]. Order is unspecified.
    async fn search_issue(&self, key: &str) -> Result<Vec<CommitEntry>>;
}

pub struct GitCli {
    work_tree: PathBuf,
    git_binary: String,
    timeout: Duration,
    clone_timeout: Duration,
}

impl GitCli {
    pub fn new(work_tree: impl Into<PathBuf>) -> Self {
        Self {
            work_tree: work_tree.into(),
            git_binary: "git".to_string(),
            timeout: Duration::from_secs(300),
            clone_timeout: Duration::from_secs(1800),
        }
    }

    pub fn from_config(config: &RepositoryConfig, project: &str) -> Self {
        let mut git = Self::new(config.working_copy(project))
            .with_git_binary(config.git_binary.clone())
            .with_timeout(Duration::from_secs(config.timeout_secs));
        git.clone_timeout = Duration::from_secs(config.clone_timeout_secs);
        git
    }

    pub fn with_git_binary(mut self, git_binary: impl Into<String>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Make sure the working copy exists, cloning it from `remote_url` if not
    pub async fn ensure_working_copy(&self, remote_url: Option<&str>) -> Result<()> {
        if self.work_tree.exists() {
            debug!(path = %self.work_tree.display(), "Using existing working copy");
            return Ok(());
        }

        let Some(url) = remote_url else {
            return Err(TrendError::RepositoryAccess(format!(
                "working copy {} not found and no remote_url configured",
                self.work_tree.display()
            )));
        };

        info!(url, path = %self.work_tree.display(), "Working copy not found, cloning");
        let mut command = Command::new(&self.git_binary);
        command.arg("clone").arg(url).arg(&self.work_tree);
        self.run(command, "clone", self.clone_timeout).await?;
        info!("Clone complete");
        Ok(())
    }

    async fn git(&self, args: &[&str]) -> Result<String> {
        let mut command = Command::new(&self.git_binary);
        command.arg("-C").arg(&self.work_tree).args(args);
        let label = args.first().copied().unwrap_or("git");
        let stdout = self.run(command, label, self.timeout).await?;
        Ok(String::from_utf8_lossy(&stdout).into_owned())
    }

    async fn run(&self, mut command: Command, label: &str, limit: Duration) -> Result<Vec<u8>> {
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = tokio::time::timeout(limit, command.output())
            .await
            .map_err(|_| {
                TrendError::RepositoryAccess(format!(
                    "git {} timed out after {}s",
                    label,
                    limit.as_secs()
                ))
            })?
            .map_err(|e| {
                TrendError::RepositoryAccess(format!(
                    "failed to start {} {}: {}",
                    self.git_binary, label, e
                ))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            warn!(
                exit_code = output.status.code(),
                stderr = %stderr.trim(),
                "git command failed"
            );
            return Err(TrendError::RepositoryAccess(format!(
                "git {} exited with {}: {}",
                label,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

#[async_trait]
impl CommitLog for GitCli {
    async fn full_history(&self) -> Result<Vec<CommitEntry>> {
        let stdout = self.git(&["log", "--pretty=format:%ci%x1f%s"]).await?;
        let commits = parse_history(&stdout)?;
        info!(commits = commits.len(), "Read commit history");
        Ok(commits)
    }

    async fn search_issue(&self, key: &str) -> Result<Vec<CommitEntry>> {
        let grep = format!("--grep={}", key);
        let stdout = self
            .git(&["log", "-z", "--fixed-strings", &grep, "--pretty=format:%ci%x1f%B"])
            .await?;
        parse_records(&stdout, '\0')
    }
}

/// Parse newline-separated `date<US>subject` lines
pub fn parse_history(output: &str) -> Result<Vec<CommitEntry>> {
    parse_records(output, '\n')
}

fn parse_records(output: &str, terminator: char) -> Result<Vec<CommitEntry>> {
    output
        .split(terminator)
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> Result<CommitEntry> {
    let (date, message) = record.split_once(FIELD_SEPARATOR).ok_or_else(|| {
        TrendError::RepositoryAccess(format!("unexpected git log record: {:?}", record))
    })?;
    Ok(CommitEntry {
        time: TimestampParser::parse_commit(date)?,
        message: message.to_string(),
    })
}

/// Whether `message` mentions `key` as a whole token.
///
/// `FALCON-1` matches in `"FALCON-1: fix"` and `"[FALCON-1]"` but not in
/// `"FALCON-10 fix"` or `"XFALCON-1"`.
pub fn references_issue(message: &str, key: &str) -> bool {
    if key.is_empty() {
        return false;
    }
    message.match_indices(key).any(|(start, _)| {
        let before = message[..start].chars().next_back();
        let after = message[start + key.len()..].chars().next();
        let bounded_before = before.map_or(true, |c| !(c.is_alphanumeric() || c == '-' || c == '_'));
        let bounded_after = after.map_or(true, |c| !c.is_alphanumeric());
        bounded_before && bounded_after
    })
}
