//! Core Data Models
//!
//! Data flows through these types in one direction:
//!
//! 1. **Wire**: [`SearchPage`] / [`RawIssue`] - one page of the tracker's search response
//! 2. **Record**: [`IssueRecord`] - a fetched issue with its parsed resolution date
//! 3. **Evidence**: [`CommitEntry`] - one commit from the repository log
//! 4. **Decision**: [`ResolvedDate`] - the instant an issue is bucketed under
//! 5. **Axis**: [`MonthKey`] - the calendar month bucket

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// One page of the tracker's `/search` response
#[derive(Debug, Clone, Deserialize)]
pub struct SearchPage {
    pub total: usize,
    #[serde(rename = "startAt", default)]
    pub start_at: usize,
    pub issues: Vec<RawIssue>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIssue {
    pub key: String,
    pub fields: RawIssueFields,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawIssueFields {
    pub resolutiondate: Option<String>,
    pub created: Option<String>,
}

/// A fetched issue. `index` is the absolute position in the full result set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueRecord {
    pub key: String,
    pub resolution_date: DateTime<Utc>,
    pub created_date: Option<DateTime<Utc>>,
    pub index: usize,
}

/// A commit from the repository log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitEntry {
    pub time: DateTime<Utc>,
    /// Subject line from a history scan, full body from an issue search
    pub message: String,
}

/// Where a resolved date came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DateSource {
    Commit,
    Tracker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedDate {
    pub instant: DateTime<Utc>,
    pub source: DateSource,
}

impl ResolvedDate {
    pub fn from_commit(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            source: DateSource::Commit,
        }
    }

    pub fn from_tracker(instant: DateTime<Utc>) -> Self {
        Self {
            instant,
            source: DateSource::Tracker,
        }
    }

    pub fn month(&self) -> MonthKey {
        MonthKey::from_instant(&self.instant)
    }
}

/// A calendar month in UTC, rendered as `YYYY-MM`.
///
/// Field order makes the derived `Ord` chronological, which for four-digit
/// years matches the lexicographic order of the rendered key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// `month` is 1-based. Returns `None` outside 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn from_instant(instant: &DateTime<Utc>) -> Self {
        Self {
            year: instant.year(),
            month: instant.month(),
        }
    }

    pub fn year(&self) -> i32 {
        self.year
    }

    pub fn month(&self) -> u32 {
        self.month
    }

    /// The following calendar month
    pub fn succ(&self) -> Self {
        if self.month == 12 {
            Self {
                year: self.year + 1,
                month: 1,
            }
        } else {
            Self {
                year: self.year,
                month: self.month + 1,
            }
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| format!("Invalid month key: {}", s))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(format!("Invalid month key: {}", s));
        }
        let year: i32 = year.parse().map_err(|_| format!("Invalid year in: {}", s))?;
        let month: u32 = month
            .parse()
            .map_err(|_| format!("Invalid month in: {}", s))?;
        MonthKey::new(year, month).ok_or_else(|| format!("Month out of range in: {}", s))
    }
}

impl Serialize for MonthKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
