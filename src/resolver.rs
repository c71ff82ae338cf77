//! Commit-date resolution
//!
//! An issue is bucketed under the time its fix landed in version control when
//! any commit references it, and under the tracker's resolution date
//! otherwise. How commits are matched is a [`ResolverPolicy`]:
//!
//! - [`ResolverPolicy::BulkIndex`] scans the whole log once into a
//!   [`CommitDateIndex`] keyed by the first token of each subject line.
//! - [`ResolverPolicy::PerIssueSearch`] searches the log for every issue,
//!   matching the key as a whole token anywhere in the message.
//! - [`ResolverPolicy::TrackerOnly`] ignores the repository.
//!
//! When several commits match, [`CommitSelection::Latest`] keeps the most
//! recent one. [`CommitSelection::Earliest`] exists for per-issue search only.

use crate::error::Result;
use crate::models::{CommitEntry, IssueRecord, ResolvedDate};
use crate::repository::{references_issue, CommitLog};
use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ResolverPolicy {
    TrackerOnly,
    BulkIndex,
    PerIssueSearch,
}

impl ResolverPolicy {
    pub fn needs_repository(&self) -> bool {
        !matches!(self, ResolverPolicy::TrackerOnly)
    }
}

impl fmt::Display for ResolverPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResolverPolicy::TrackerOnly => "tracker-only",
            ResolverPolicy::BulkIndex => "bulk-index",
            ResolverPolicy::PerIssueSearch => "per-issue-search",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ResolverPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        <Self as ValueEnum>::from_str(s, true).map_err(|_| format!("Unknown resolver policy: {}", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum CommitSelection {
    Latest,
    Earliest,
}

impl CommitSelection {
    fn pick(&self, times: impl Iterator<Item = DateTime<Utc>>) -> Option<DateTime<Utc>> {
        match self {
            CommitSelection::Latest => times.max(),
            CommitSelection::Earliest => times.min(),
        }
    }
}

/// `first subject token -> latest commit time`, built in one pass over the log
#[derive(Debug, Clone, Default)]
pub struct CommitDateIndex {
    dates: HashMap<String, DateTime<Utc>>,
}

impl CommitDateIndex {
    /// Index every commit whose first subject token contains `issue_prefix`.
    ///
    /// Surrounding punctuation is trimmed from the token, so `FALCON-12:` and
    /// `[FALCON-12]` both index under `FALCON-12`.
    pub fn build<'a>(commits: impl IntoIterator<Item = &'a CommitEntry>, issue_prefix: &str) -> Self {
        let mut index = Self::default();
        for commit in commits {
            if let Some(key) = Self::candidate_key(&commit.message) {
                if key.contains(issue_prefix) {
                    index.record(key, commit.time);
                }
            }
        }
        index
    }

    fn candidate_key(subject: &str) -> Option<&str> {
        let token = subject
            .split_whitespace()
            .next()?
            .trim_matches(|c: char| !c.is_alphanumeric());
        (!token.is_empty()).then_some(token)
    }

    /// Keep the later of the stored and the new time
    pub fn record(&mut self, key: &str, time: DateTime<Utc>) {
        self.dates
            .entry(key.to_string())
            .and_modify(|existing| {
                if *existing < time {
                    *existing = time;
                }
            })
            .or_insert(time);
    }

    pub fn get(&self, key: &str) -> Option<DateTime<Utc>> {
        self.dates.get(key).copied()
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }
}

enum Strategy<'a> {
    TrackerOnly,
    Bulk(CommitDateIndex),
    PerIssue {
        log: &'a dyn CommitLog,
        selection: CommitSelection,
    },
}

pub struct CommitDateResolver<'a> {
    strategy: Strategy<'a>,
}

impl<'a> CommitDateResolver<'a> {
    pub fn tracker_only() -> Self {
        Self {
            strategy: Strategy::TrackerOnly,
        }
    }

    pub fn from_index(index: CommitDateIndex) -> Self {
        Self {
            strategy: Strategy::Bulk(index),
        }
    }

    pub fn per_issue(log: &'a dyn CommitLog, selection: CommitSelection) -> Self {
        Self {
            strategy: Strategy::PerIssue { log, selection },
        }
    }

    /// Build a resolver for `policy`. For the bulk policy this reads the full
    /// commit history once.
    pub async fn prepare(
        policy: ResolverPolicy,
        selection: CommitSelection,
        log: &'a dyn CommitLog,
        issue_prefix: &str,
    ) -> Result<Self> {
        match policy {
            ResolverPolicy::TrackerOnly => Ok(Self::tracker_only()),
            ResolverPolicy::BulkIndex => {
                if selection != CommitSelection::Latest {
                    debug!("Bulk index always keeps the latest commit; ignoring selection");
                }
                let history = log.full_history().await?;
                let index = CommitDateIndex::build(&history, issue_prefix);
                info!(
                    commits = history.len(),
                    indexed_keys = index.len(),
                    issue_prefix,
                    "Built commit date index"
                );
                if index.is_empty() {
                    warn!(issue_prefix, "No commit subject starts with the issue prefix");
                }
                Ok(Self::from_index(index))
            }
            ResolverPolicy::PerIssueSearch => Ok(Self::per_issue(log, selection)),
        }
    }

    /// The date `issue` is bucketed under
    pub async fn resolve(&self, issue: &IssueRecord) -> Result<ResolvedDate> {
        let commit_time = match &self.strategy {
            Strategy::TrackerOnly => None,
            Strategy::Bulk(index) => index.get(&issue.key),
            Strategy::PerIssue { log, selection } => {
                let candidates = log.search_issue(&issue.key).await?;
                selection.pick(
                    candidates
                        .iter()
                        .filter(|commit| references_issue(&commit.message, &issue.key))
                        .map(|commit| commit.time),
                )
            }
        };

        let resolved = match commit_time {
            Some(time) => ResolvedDate::from_commit(time),
            None => ResolvedDate::from_tracker(issue.resolution_date),
        };
        debug!(
            key = %issue.key,
            source = ?resolved.source,
            instant = %resolved.instant,
            "Resolved issue date"
        );
        Ok(resolved)
    }
}
