//! Runs against a mocked Jira search endpoint

mod common;

use common::{commit, search_body, utc, FakeCommitLog};
use httpmock::prelude::*;
use std::fs;
use tempfile::tempdir;
use ticket_trend::analyzer::{RunOptions, RunStage, TicketTrendAnalyzer};
use ticket_trend::config::TrackerConfig;
use ticket_trend::resolver::{CommitSelection, ResolverPolicy};
use ticket_trend::tracker::JiraClient;
use ticket_trend::TrendError;

fn tracker_config(server: &MockServer, page_size: usize) -> TrackerConfig {
    TrackerConfig {
        base_url: server.base_url(),
        project: "FALCON".to_string(),
        resolution: "fixed".to_string(),
        page_size,
        timeout_secs: 5,
    }
}

fn options(page_size: usize, output: std::path::PathBuf) -> RunOptions {
    RunOptions {
        page_size,
        policy: ResolverPolicy::BulkIndex,
        selection: CommitSelection::Latest,
        issue_prefix: "FALCON".to_string(),
        output_path: output,
    }
}

#[tokio::test]
async fn test_two_pages_with_commit_evidence() {
    let server = MockServer::start_async().await;
    let first = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/api/2/search")
                .query_param("startAt", "0")
                .query_param("maxResults", "2");
            then.status(200).json_body(search_body(
                3,
                0,
                &[
                    ("FALCON-1", "2015-01-10T08:00:00.000+0000"),
                    ("FALCON-2", "2015-01-20T08:00:00.000+0000"),
                ],
            ));
        })
        .await;
    let second = server
        .mock_async(|when, then| {
            when.method(GET)
                .path("/rest/api/2/search")
                .query_param("startAt", "2")
                .query_param("maxResults", "2");
            then.status(200).json_body(search_body(
                3,
                2,
                &[("FALCON-3", "2015-02-01T08:00:00.000+0000")],
            ));
        })
        .await;

    let dir = tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let tracker = JiraClient::new(&tracker_config(&server, 2)).unwrap();
    // FALCON-2 actually landed in April
    let log = FakeCommitLog::new(vec![commit(utc(2015, 4, 2), "FALCON-2. Contributed by someone")]);

    let summary = TicketTrendAnalyzer::new(&tracker, &log, options(2, output.clone()))
        .run()
        .await
        .unwrap();

    first.assert_async().await;
    second.assert_async().await;
    assert_eq!(summary.pages, 2);
    assert_eq!(summary.from_commits, 1);
    assert_eq!(
        fs::read_to_string(&output).unwrap(),
        "Date, Fixed tickets\n2015-01, 1\n2015-02, 1\n2015-03, 0\n2015-04, 1\n"
    );
}

#[tokio::test]
async fn test_server_error_aborts_without_output() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/api/2/search");
            then.status(500).body("boom");
        })
        .await;

    let dir = tempdir().unwrap();
    let output = dir.path().join("out.csv");
    let tracker = JiraClient::new(&tracker_config(&server, 1000)).unwrap();
    let log = FakeCommitLog::empty();

    let err = TicketTrendAnalyzer::new(&tracker, &log, options(1000, output.clone()))
        .run()
        .await
        .unwrap_err();

    assert_eq!(err.stage, RunStage::Fetching);
    assert!(matches!(err.source, TrendError::Network(_)));
    assert!(!output.exists());
}

#[tokio::test]
async fn test_invalid_json_is_malformed_response() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(GET).path("/rest/api/2/search");
            then.status(200)
                .header("content-type", "application/json")
                .body("{\"total\": 1, \"issues\": [");
        })
        .await;

    let dir = tempdir().unwrap();
    let tracker = JiraClient::new(&tracker_config(&server, 1000)).unwrap();
    let log = FakeCommitLog::empty();

    let err = TicketTrendAnalyzer::new(&tracker, &log, options(1000, dir.path().join("out.csv")))
        .run()
        .await
        .unwrap_err();
    assert!(matches!(err.source, TrendError::MalformedResponse(_)));
}
