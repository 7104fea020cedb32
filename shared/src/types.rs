//! Common types used across the dashboard

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Inclusive date range for queries; either end may be open
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct DateRange {
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(start: Option<NaiveDate>, end: Option<NaiveDate>) -> Self {
        Self { start, end }
    }

    /// Undated records only fall inside a fully open range
    pub fn contains(&self, date: Option<NaiveDate>) -> bool {
        match date {
            Some(d) => {
                self.start.map_or(true, |s| d >= s) && self.end.map_or(true, |e| d <= e)
            }
            None => self.start.is_none() && self.end.is_none(),
        }
    }

    pub fn is_inverted(&self) -> bool {
        matches!((self.start, self.end), (Some(s), Some(e)) if s > e)
    }
}
