//! Issue tracker client
//!
//! [`IssueTracker`] is the seam the fetcher drives: one call, one page of the
//! search result set. [`JiraClient`] implements it against the Jira REST v2
//! `/search` endpoint.

use crate::config::TrackerConfig;
use crate::error::{Result, TrendError};
use crate::models::SearchPage;
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Fields requested for every issue
pub const SEARCH_FIELDS: &str = "key,resolutiondate,versions,created";

#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Fetch up to `max_results` issues starting at absolute offset `start_at`
    async fn fetch_page(&self, start_at: usize, max_results: usize) -> Result<SearchPage>;
}

pub struct JiraClient {
    client: reqwest::Client,
    search_url: String,
    jql: String,
}

impl JiraClient {
    pub fn new(config: &TrackerConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| TrendError::Network(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            search_url: format!("{}/rest/api/2/search", config.base_url.trim_end_matches('/')),
            jql: Self::build_jql(&config.project, &config.resolution),
        })
    }

    /// `project="FALCON" AND resolution="fixed"`
    pub fn build_jql(project: &str, resolution: &str) -> String {
        format!(
            "project=\"{}\" AND resolution=\"{}\"",
            project.replace('"', "\\\""),
            resolution.replace('"', "\\\"")
        )
    }

    pub fn search_url(&self) -> &str {
        &self.search_url
    }
}

#[async_trait]
impl IssueTracker for JiraClient {
    async fn fetch_page(&self, start_at: usize, max_results: usize) -> Result<SearchPage> {
        debug!(start_at, max_results, url = %self.search_url, "Requesting tracker page");

        let start_at_param = start_at.to_string();
        let max_results_param = max_results.to_string();
        let response = self
            .client
            .get(&self.search_url)
            .query(&[
                ("jql", self.jql.as_str()),
                ("fields", SEARCH_FIELDS),
                ("startAt", start_at_param.as_str()),
                ("maxResults", max_results_param.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TrendError::Network(format!(
                "Tracker returned HTTP {} for startAt={}",
                status, start_at
            )));
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| {
            TrendError::MalformedResponse(format!("page at startAt={}: {}", start_at, e))
        })
    }
}
