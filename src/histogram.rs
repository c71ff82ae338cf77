//! Month-bucket histogram
//!
//! [`MonthHistogram`] is an ordered `MonthKey -> count` map. Counts are only
//! ever raised by [`MonthHistogram::increment`]; [`MonthHistogram::fill_gaps`]
//! inserts zero rows for missing months and never touches an existing count.
//!
//! [`DateBounds`] tracks the earliest and latest resolved instant seen so far
//! and is finalised once the issue stream is exhausted.

use crate::models::MonthKey;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonthHistogram {
    counts: BTreeMap<MonthKey, u64>,
}

impl MonthHistogram {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert with count 1 if absent, otherwise add one
    pub fn increment(&mut self, month: MonthKey) {
        *self.counts.entry(month).or_insert(0) += 1;
    }

    /// Ensure every month from `floor(min)` to `floor(max)` inclusive has a
    /// row. Absent months get 0. Returns the number of rows inserted.
    pub fn fill_gaps(&mut self, bounds: &DateBounds) -> usize {
        let Some((first, last)) = bounds.month_range() else {
            return 0;
        };

        let mut inserted = 0;
        let mut month = first;
        while month <= last {
            if let std::collections::btree_map::Entry::Vacant(slot) = self.counts.entry(month) {
                slot.insert(0);
                inserted += 1;
            }
            month = month.succ();
        }
        inserted
    }

    pub fn get(&self, month: &MonthKey) -> Option<u64> {
        self.counts.get(month).copied()
    }

    /// Rows in chronological order
    pub fn iter(&self) -> impl Iterator<Item = (&MonthKey, &u64)> {
        self.counts.iter()
    }

    pub fn to_rows(&self) -> Vec<(MonthKey, u64)> {
        self.counts.iter().map(|(k, v)| (*k, *v)).collect()
    }

    pub fn total(&self) -> u64 {
        self.counts.values().sum()
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn first_month(&self) -> Option<MonthKey> {
        self.counts.keys().next().copied()
    }

    pub fn last_month(&self) -> Option<MonthKey> {
        self.counts.keys().next_back().copied()
    }
}

/// Running min/max over resolved instants. Empty until the first observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateBounds {
    min: Option<DateTime<Utc>>,
    max: Option<DateTime<Utc>>,
}

impl DateBounds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Widen the bounds to include `instant`
    pub fn observe(&mut self, instant: DateTime<Utc>) {
        self.min = Some(self.min.map_or(instant, |current| current.min(instant)));
        self.max = Some(self.max.map_or(instant, |current| current.max(instant)));
    }

    pub fn min(&self) -> Option<DateTime<Utc>> {
        self.min
    }

    pub fn max(&self) -> Option<DateTime<Utc>> {
        self.max
    }

    pub fn is_empty(&self) -> bool {
        self.min.is_none()
    }

    /// First and last month covered, truncated to year-month
    pub fn month_range(&self) -> Option<(MonthKey, MonthKey)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) => {
                Some((MonthKey::from_instant(&min), MonthKey::from_instant(&max)))
            }
            _ => None,
        }
    }
}
