#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Mutex;
use ticket_trend::error::Result;
use ticket_trend::models::{CommitEntry, RawIssue, RawIssueFields, SearchPage};
use ticket_trend::repository::CommitLog;
use ticket_trend::tracker::IssueTracker;

/// In-memory tracker serving `(key, resolutiondate)` pairs in pages
pub struct FakeTracker {
    issues: Vec<(String, String)>,
    requests: Mutex<Vec<usize>>,
}

impl FakeTracker {
    pub fn new(issues: &[(&str, &str)]) -> Self {
        Self {
            issues: issues
                .iter()
                .map(|(k, d)| (k.to_string(), d.to_string()))
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// `count` issues `PREFIX-1..=count`, resolved on day `(i % 28) + 1` of
    /// month `(i % 12) + 1` in 2019
    pub fn generated(prefix: &str, count: usize) -> Self {
        let issues = (0..count)
            .map(|i| {
                (
                    format!("{}-{}", prefix, i + 1),
                    format!(
                        "2019-{:02}-{:02}T12:00:00.000+0000",
                        (i % 12) + 1,
                        (i % 28) + 1
                    ),
                )
            })
            .collect();
        Self {
            issues,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requested_offsets(&self) -> Vec<usize> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl IssueTracker for FakeTracker {
    async fn fetch_page(&self, start_at: usize, max_results: usize) -> Result<SearchPage> {
        self.requests.lock().unwrap().push(start_at);
        let issues = self
            .issues
            .iter()
            .skip(start_at)
            .take(max_results)
            .map(|(key, date)| RawIssue {
                key: key.clone(),
                fields: RawIssueFields {
                    resolutiondate: Some(date.clone()),
                    created: None,
                },
            })
            .collect();
        Ok(SearchPage {
            total: self.issues.len(),
            start_at,
            issues,
        })
    }
}

/// In-memory commit log; `search_issue` does a plain substring pre-filter
/// like `git log --fixed-strings --grep`
pub struct FakeCommitLog {
    commits: Vec<CommitEntry>,
    searches: Mutex<usize>,
}

impl FakeCommitLog {
    pub fn new(commits: Vec<CommitEntry>) -> Self {
        Self {
            commits,
            searches: Mutex::new(0),
        }
    }

    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    pub fn searches(&self) -> usize {
        *self.searches.lock().unwrap()
    }
}

#[async_trait]
impl CommitLog for FakeCommitLog {
    async fn full_history(&self) -> Result<Vec<CommitEntry>> {
        Ok(self.commits.clone())
    }

    async fn search_issue(&self, key: &str) -> Result<Vec<CommitEntry>> {
        *self.searches.lock().unwrap() += 1;
        Ok(self
            .commits
            .iter()
            .filter(|c| c.message.contains(key))
            .cloned()
            .collect())
    }
}

pub fn commit(time: DateTime<Utc>, message: &str) -> CommitEntry {
    CommitEntry {
        time,
        message: message.to_string(),
    }
}

pub fn utc(y: i32, m: u32, d: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, 10, 0, 0).unwrap()
}

/// Search response body for `httpmock`
pub fn search_body(total: usize, start_at: usize, issues: &[(&str, &str)]) -> serde_json::Value {
    serde_json::json!({
        "startAt": start_at,
        "maxResults": 1000,
        "total": total,
        "issues": issues
            .iter()
            .map(|(key, date)| serde_json::json!({
                "key": key,
                "fields": { "resolutiondate": date, "created": date }
            }))
            .collect::<Vec<_>>()
    })
}
