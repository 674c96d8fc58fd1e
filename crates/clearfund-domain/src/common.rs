//! Shared traits, reporting windows, and pagination primitives.

use std::fmt;

use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exposes a stable identifier for entities stored in a case file.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

/// Converts an entity into a user-facing display label.
pub trait Displayable {
    fn display_label(&self) -> String;
}

/// Inclusive date range used for compliance windows and report extracts.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, DateWindowError> {
        if end < start {
            return Err(DateWindowError::InvalidRange);
        }
        Ok(Self { start, end })
    }

    /// Builds the rolling window of `days` days ending at `end` inclusive.
    pub fn trailing(end: NaiveDate, days: i64) -> Self {
        let span = days.max(1) - 1;
        Self {
            start: end - Duration::days(span),
            end,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, inclusive of both endpoints.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

/// Errors that can occur when constructing [`DateWindow`] values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateWindowError {
    InvalidRange,
}

impl fmt::Display for DateWindowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateWindowError::InvalidRange => f.write_str("window end must not precede start"),
        }
    }
}

impl std::error::Error for DateWindowError {}

/// Returns `true` when `date` falls in the same calendar month as `reference`.
pub fn same_month(date: NaiveDate, reference: NaiveDate) -> bool {
    date.year() == reference.year() && date.month() == reference.month()
}

pub const DEFAULT_PAGE_SIZE: usize = 50;
pub const MAX_PAGE_SIZE: usize = 500;

/// One-based page request for listing endpoints.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    pub fn new(page: usize, page_size: usize) -> Self {
        Self { page, page_size }
    }

    /// Clamps the request into usable bounds.
    pub fn normalized(self) -> Self {
        Self {
            page: self.page.max(1),
            page_size: self.page_size.clamp(1, MAX_PAGE_SIZE),
        }
    }

    pub fn offset(self) -> usize {
        let norm = self.normalized();
        (norm.page - 1) * norm.page_size
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// One page of results plus enough metadata to iterate further.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageSlice<T> {
    pub items: Vec<T>,
    pub page: usize,
    pub page_size: usize,
    pub total: usize,
}

impl<T> PageSlice<T> {
    pub fn has_more(&self) -> bool {
        self.page * self.page_size < self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn window_allows_single_day() {
        let day = date(2025, 6, 1);
        let window = DateWindow::new(day, day).expect("single-day window");
        assert!(window.contains(day));
        assert_eq!(window.days(), 1);
    }

    #[test]
    fn window_rejects_inverted_range() {
        let err = DateWindow::new(date(2025, 6, 2), date(2025, 6, 1)).unwrap_err();
        assert_eq!(err, DateWindowError::InvalidRange);
    }

    #[test]
    fn trailing_window_spans_requested_days() {
        let window = DateWindow::trailing(date(2025, 6, 30), 30);
        assert_eq!(window.start, date(2025, 6, 1));
        assert_eq!(window.days(), 30);
    }

    #[test]
    fn page_request_normalizes_degenerate_input() {
        let req = PageRequest::new(0, 0).normalized();
        assert_eq!(req.page, 1);
        assert_eq!(req.page_size, 1);
        assert_eq!(PageRequest::new(3, 20).offset(), 40);
    }
}
