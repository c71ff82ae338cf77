//! Pull-based consumer of the tracker's paginated search
//!
//! [`IssueFetcher::next_issue`] hands out one [`IssueRecord`] at a time and
//! requests the next page only when the current one is drained. The `total`
//! reported by the first page governs the whole pass: the fetcher keeps going
//! while `offset < total`, and page `offset` is expected to carry
//! `min(page_size, total - offset)` issues.

use crate::error::{Result, TrendError};
use crate::models::{IssueRecord, RawIssue};
use crate::timestamp_parser::TimestampParser;
use crate::tracker::IssueTracker;
use std::collections::VecDeque;
use tracing::info;

/// Largest page the tracker serves per request
pub const MAX_PAGE_SIZE: usize = 1000;

pub struct IssueFetcher<'a, T: IssueTracker + ?Sized> {
    tracker: &'a T,
    page_size: usize,
    offset: usize,
    total: Option<usize>,
    buffer: VecDeque<IssueRecord>,
    pages_fetched: usize,
}

impl<'a, T: IssueTracker + ?Sized> IssueFetcher<'a, T> {
    /// `page_size` is clamped into `1..=MAX_PAGE_SIZE`
    pub fn new(tracker: &'a T, page_size: usize) -> Self {
        Self {
            tracker,
            page_size: page_size.clamp(1, MAX_PAGE_SIZE),
            offset: 0,
            total: None,
            buffer: VecDeque::new(),
            pages_fetched: 0,
        }
    }

    /// Next issue in ascending offset order, or `None` once `offset >= total`
    pub async fn next_issue(&mut self) -> Result<Option<IssueRecord>> {
        if self.buffer.is_empty() && !self.is_exhausted() {
            self.fetch_next_page().await?;
        }
        Ok(self.buffer.pop_front())
    }

    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Total reported by the first page; `None` before any fetch
    pub fn total(&self) -> Option<usize> {
        self.total
    }

    fn is_exhausted(&self) -> bool {
        matches!(self.total, Some(total) if self.offset >= total)
    }

    async fn fetch_next_page(&mut self) -> Result<()> {
        let page = self.tracker.fetch_page(self.offset, self.page_size).await?;
        self.pages_fetched += 1;

        let total = *self.total.get_or_insert(page.total);
        if self.offset >= total {
            return Ok(());
        }

        let expected = self.page_size.min(total - self.offset);
        if page.issues.len() < expected {
            return Err(TrendError::MalformedResponse(format!(
                "page at offset {} returned {} issues, expected {} (total {})",
                self.offset,
                page.issues.len(),
                expected,
                total
            )));
        }

        for (local, raw) in page.issues.into_iter().take(expected).enumerate() {
            let record = Self::to_record(raw, self.offset + local)?;
            self.buffer.push_back(record);
        }
        self.offset += expected;

        info!(
            page = self.pages_fetched,
            fetched = self.offset,
            total,
            "Fetched tracker page"
        );
        Ok(())
    }

    fn to_record(raw: RawIssue, index: usize) -> Result<IssueRecord> {
        let resolution = raw.fields.resolutiondate.ok_or_else(|| {
            TrendError::MalformedResponse(format!("issue {} has no resolutiondate", raw.key))
        })?;
        let resolution_date = TimestampParser::parse_tracker(&resolution)?;
        let created_date = raw
            .fields
            .created
            .as_deref()
            .map(TimestampParser::parse_tracker)
            .transpose()?;

        Ok(IssueRecord {
            key: raw.key,
            resolution_date,
            created_date,
            index,
        })
    }
}
