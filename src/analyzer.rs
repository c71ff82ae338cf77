//! Run orchestration
//!
//! [`TicketTrendAnalyzer`] wires the pipeline together and walks the run
//! through its stages in a fixed order:
//!
//! ```text
//! FETCHING -> RESOLVING -> AGGREGATING -> GAP_FILLING -> EMITTING -> DONE
//! ```
//!
//! Fetching, resolving and aggregating repeat per issue: each record is
//! resolved and counted before the next one is pulled from the tracker. Gap
//! filling runs once, after the fetcher reports the stream exhausted, and
//! emitting runs once after that. Any failure stops the run in the stage it
//! occurred in and nothing is written.

use crate::csv_output::CsvEmitter;
use crate::error::{RunError, TrendError};
use crate::fetcher::IssueFetcher;
use crate::histogram::{DateBounds, MonthHistogram};
use crate::logging::run_span;
use crate::models::{DateSource, MonthKey};
use crate::repository::CommitLog;
use crate::resolver::{CommitDateResolver, CommitSelection, ResolverPolicy};
use crate::tracker::IssueTracker;
use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use tracing::{debug, info, trace, Instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunStage {
    Fetching,
    Resolving,
    Aggregating,
    GapFilling,
    Emitting,
    Done,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunStage::Fetching => "FETCHING",
            RunStage::Resolving => "RESOLVING",
            RunStage::Aggregating => "AGGREGATING",
            RunStage::GapFilling => "GAP_FILLING",
            RunStage::Emitting => "EMITTING",
            RunStage::Done => "DONE",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub page_size: usize,
    pub policy: ResolverPolicy,
    pub selection: CommitSelection,
    pub issue_prefix: String,
    pub output_path: PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub policy: ResolverPolicy,
    pub issues: usize,
    pub pages: usize,
    #[serde(rename = "fromCommits")]
    pub from_commits: usize,
    #[serde(rename = "fromTracker")]
    pub from_tracker: usize,
    pub months: usize,
    #[serde(rename = "gapMonths")]
    pub gap_months: usize,
    #[serde(rename = "firstMonth")]
    pub first_month: Option<MonthKey>,
    #[serde(rename = "lastMonth")]
    pub last_month: Option<MonthKey>,
    pub output: PathBuf,
    #[serde(skip)]
    pub histogram: MonthHistogram,
}

pub struct TicketTrendAnalyzer<'a> {
    tracker: &'a dyn IssueTracker,
    commit_log: &'a dyn CommitLog,
    options: RunOptions,
    stage: RunStage,
}

impl<'a> TicketTrendAnalyzer<'a> {
    pub fn new(
        tracker: &'a dyn IssueTracker,
        commit_log: &'a dyn CommitLog,
        options: RunOptions,
    ) -> Self {
        Self {
            tracker,
            commit_log,
            options,
            stage: RunStage::Fetching,
        }
    }

    pub fn stage(&self) -> RunStage {
        self.stage
    }

    /// Execute the whole run and write the CSV
    pub async fn run(&mut self) -> Result<RunSummary, RunError> {
        let span = run_span();
        async move {
            let mut summary = self.build_histogram().await?;

            self.enter(RunStage::Emitting);
            CsvEmitter::write_to(&self.options.output_path, &summary.histogram)
                .map_err(|e| self.fail(e))?;
            summary.output = self.options.output_path.clone();

            self.enter(RunStage::Done);
            info!(
                issues = summary.issues,
                months = summary.months,
                output = %summary.output.display(),
                "Run complete"
            );
            Ok(summary)
        }
        .instrument(span)
        .await
    }

    /// Every stage up to and including gap filling; nothing is written
    pub async fn build_histogram(&mut self) -> Result<RunSummary, RunError> {
        info!(policy = %self.options.policy, "Starting run");

        self.enter(RunStage::Resolving);
        let resolver = CommitDateResolver::prepare(
            self.options.policy,
            self.options.selection,
            self.commit_log,
            &self.options.issue_prefix,
        )
        .await
        .map_err(|e| self.fail(e))?;

        let mut fetcher = IssueFetcher::new(self.tracker, self.options.page_size);
        let mut histogram = MonthHistogram::new();
        let mut bounds = DateBounds::new();
        let mut from_commits = 0;
        let mut from_tracker = 0;

        loop {
            self.enter(RunStage::Fetching);
            let Some(issue) = fetcher.next_issue().await.map_err(|e| self.fail(e))? else {
                break;
            };

            self.enter(RunStage::Resolving);
            let resolved = resolver.resolve(&issue).await.map_err(|e| self.fail(e))?;

            self.enter(RunStage::Aggregating);
            bounds.observe(resolved.instant);
            histogram.increment(resolved.month());
            match resolved.source {
                DateSource::Commit => from_commits += 1,
                DateSource::Tracker => from_tracker += 1,
            }
        }

        self.enter(RunStage::GapFilling);
        let gap_months = histogram.fill_gaps(&bounds);
        info!(
            months = histogram.len(),
            gap_months,
            from_commits,
            from_tracker,
            "Done generating histogram"
        );

        Ok(RunSummary {
            policy: self.options.policy,
            issues: from_commits + from_tracker,
            pages: fetcher.pages_fetched(),
            from_commits,
            from_tracker,
            months: histogram.len(),
            gap_months,
            first_month: histogram.first_month(),
            last_month: histogram.last_month(),
            output: PathBuf::new(),
            histogram,
        })
    }

    fn enter(&mut self, stage: RunStage) {
        if stage != self.stage {
            trace!(from = %self.stage, to = %stage, "Stage transition");
        }
        if matches!(stage, RunStage::GapFilling | RunStage::Emitting | RunStage::Done) {
            debug!(stage = %stage, "Entering stage");
        }
        self.stage = stage;
    }

    fn fail(&self, source: TrendError) -> RunError {
        RunError::new(self.stage, source)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Result;
    use crate::models::{CommitEntry, RawIssue, RawIssueFields, SearchPage};
    use async_trait::async_trait;

    struct FixedTracker(Vec<(&'static str, &'static str)>);

    #[async_trait]
    impl IssueTracker for FixedTracker {
        async fn fetch_page(&self, start_at: usize, max_results: usize) -> Result<SearchPage> {
            let issues = self
                .0
                .iter()
                .skip(start_at)
                .take(max_results)
                .map(|(key, date)| RawIssue {
                    key: key.to_string(),
                    fields: RawIssueFields {
                        resolutiondate: Some(date.to_string()),
                        created: None,
                    },
                })
                .collect();
            Ok(SearchPage {
                total: self.0.len(),
                start_at,
                issues,
            })
        }
    }

    struct NoCommits;

    #[async_trait]
    impl CommitLog for NoCommits {
        async fn full_history(&self) -> Result<Vec<CommitEntry>> {
            Ok(Vec::new())
        }

        async fn search_issue(&self, _key: &str) -> Result<Vec<CommitEntry>> {
            Ok(Vec::new())
        }
    }

    struct BrokenLog;

    #[async_trait]
    impl CommitLog for BrokenLog {
        async fn full_history(&self) -> Result<Vec<CommitEntry>> {
            Err(TrendError::RepositoryAccess("git log exited with 128".to_string()))
        }

        async fn search_issue(&self, _key: &str) -> Result<Vec<CommitEntry>> {
            Err(TrendError::RepositoryAccess("git log exited with 128".to_string()))
        }
    }

    fn options(policy: ResolverPolicy) -> RunOptions {
        RunOptions {
            page_size: 1000,
            policy,
            selection: CommitSelection::Latest,
            issue_prefix: "FALCON".to_string(),
            output_path: PathBuf::from("unused.csv"),
        }
    }

    #[tokio::test]
    async fn test_two_issues_fill_middle_month() {
        let tracker = FixedTracker(vec![
            ("FALCON-1", "2020-01-15T00:00:00.000+0000"),
            ("FALCON-2", "2020-03-02T00:00:00.000+0000"),
        ]);
        let mut analyzer =
            TicketTrendAnalyzer::new(&tracker, &NoCommits, options(ResolverPolicy::BulkIndex));

        let summary = analyzer.build_histogram().await.unwrap();

        let rows: Vec<(String, u64)> = summary
            .histogram
            .iter()
            .map(|(k, v)| (k.to_string(), *v))
            .collect();
        assert_eq!(
            rows,
            vec![
                ("2020-01".to_string(), 1),
                ("2020-02".to_string(), 0),
                ("2020-03".to_string(), 1)
            ]
        );
        assert_eq!(summary.gap_months, 1);
        assert_eq!(summary.from_tracker, 2);
        assert_eq!(analyzer.stage(), RunStage::GapFilling);
    }

    #[tokio::test]
    async fn test_empty_stream_gives_empty_histogram() {
        let tracker = FixedTracker(Vec::new());
        let mut analyzer =
            TicketTrendAnalyzer::new(&tracker, &NoCommits, options(ResolverPolicy::TrackerOnly));
        let summary = analyzer.build_histogram().await.unwrap();
        assert!(summary.histogram.is_empty());
        assert_eq!(summary.pages, 1);
        assert_eq!(summary.first_month, None);
    }

    #[tokio::test]
    async fn test_repository_failure_aborts_in_resolving() {
        let tracker = FixedTracker(vec![("FALCON-1", "2020-01-15T00:00:00.000+0000")]);
        let mut analyzer =
            TicketTrendAnalyzer::new(&tracker, &BrokenLog, options(ResolverPolicy::BulkIndex));
        let err = analyzer.build_histogram().await.unwrap_err();
        assert_eq!(err.stage, RunStage::Resolving);
        assert!(matches!(err.source, TrendError::RepositoryAccess(_)));
    }

    #[tokio::test]
    async fn test_tracker_only_never_touches_repository() {
        let tracker = FixedTracker(vec![("FALCON-1", "2020-01-15T00:00:00.000+0000")]);
        let mut analyzer =
            TicketTrendAnalyzer::new(&tracker, &BrokenLog, options(ResolverPolicy::TrackerOnly));
        let summary = analyzer.build_histogram().await.unwrap();
        assert_eq!(summary.issues, 1);
    }

    #[tokio::test]
    async fn test_bad_tracker_date_aborts_in_fetching() {
        let tracker = FixedTracker(vec![("FALCON-1", "last tuesday")]);
        let mut analyzer =
            TicketTrendAnalyzer::new(&tracker, &NoCommits, options(ResolverPolicy::TrackerOnly));
        let err = analyzer.build_histogram().await.unwrap_err();
        assert_eq!(err.stage, RunStage::Fetching);
        assert!(matches!(err.source, TrendError::MalformedTimestamp { .. }));
    }

    #[test]
    fn test_stage_display() {
        assert_eq!(RunStage::GapFilling.to_string(), "GAP_FILLING");
        assert!(RunStage::Fetching < RunStage::Done);
    }
}
