//! Ticket Trend Library
//!
//! Rebuilds a monthly "tickets fixed" time series for a project by
//! correlating the issue tracker's resolution dates with the commit history
//! of the project's repository.
//!
//! ## Core Features
//!
//! - **Commit evidence first**: an issue is dated by the latest commit that
//!   references it; the tracker's resolution date is the fallback
//! - **Selectable matching policy**: one bulk scan of the log, a search per
//!   issue, or tracker dates only
//! - **Dense output**: every month between the first and last resolution is
//!   present, zero-filled where nothing was fixed
//! - **Fail fast**: any network, parse, repository or write failure aborts the
//!   run; no partial histogram is ever written
//!
//! ## Architecture Overview
//!
//! - [`timestamp_parser`] - tracker and commit timestamp formats
//! - [`models`] - issue records, commits, month keys
//! - [`tracker`] - the paginated issue tracker client
//! - [`fetcher`] - drives the tracker page by page, one issue at a time
//! - [`repository`] - `git log` access
//! - [`resolver`] - commit-vs-tracker date precedence
//! - [`histogram`] - month buckets and gap filling
//! - [`csv_output`] - two-column CSV rendering
//! - [`analyzer`] - the run state machine
//! - [`config`] - file and environment configuration
//! - [`logging`] - structured logging setup
//!
//! ## Main Entry Point
//!
//! ```rust,no_run
//! use ticket_trend::analyzer::{RunOptions, TicketTrendAnalyzer};
//! use ticket_trend::config::Config;
//! use ticket_trend::repository::GitCli;
//! use ticket_trend::tracker::JiraClient;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::default();
//! let tracker = JiraClient::new(&config.tracker)?;
//! let git = GitCli::from_config(&config.repository, &config.tracker.project);
//! let options = RunOptions {
//!     page_size: config.tracker.page_size,
//!     policy: config.resolver.policy,
//!     selection: config.resolver.selection,
//!     issue_prefix: config.tracker.project.clone(),
//!     output_path: config.output.path.clone(),
//! };
//!
//! let summary = TicketTrendAnalyzer::new(&tracker, &git, options).run().await?;
//! println!("{} issues across {} months", summary.issues, summary.months);
//! # Ok(())
//! # }
//! ```

pub mod analyzer;
pub mod config;
pub mod csv_output;
pub mod error;
pub mod fetcher;
pub mod histogram;
pub mod logging;
pub mod models;
pub mod repository;
pub mod resolver;
pub mod timestamp_parser;
pub mod tracker;

pub use analyzer::TicketTrendAnalyzer;
pub use error::{RunError, TrendError};
pub use models::*;
