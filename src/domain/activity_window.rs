//! Activity Window
//!
//! Converts a calendar day in the venue's reference zone (US Eastern) into
//! the inclusive start/end epoch-second pair queried from the activity export.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::America::New_York;
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WindowError {
    #[error("Invalid date format '{0}'. Please use YYYY-MM-DD or 'yesterday'.")]
    InvalidDate(String),
}

/// One day of activity, bounded in epoch seconds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    /// Local (Eastern) calendar date
    pub date: NaiveDate,
    /// First second of the day, inclusive
    pub start: i64,
    /// Last second of the day, inclusive
    pub end: i64,
}

impl ActivityWindow {
    /// Window covering the given Eastern calendar date
    pub fn for_date(date: NaiveDate) -> Self {
        let next = date.succ_opt().unwrap_or(date);
        Self {
            date,
            start: local_midnight_epoch(date),
            end: local_midnight_epoch(next) - 1,
        }
    }

    /// Window for the Eastern calendar day before `now`
    pub fn yesterday(now: DateTime<Utc>) -> Self {
        let today = eastern_date(now);
        let yesterday = today.pred_opt().unwrap_or(today);
        Self::for_date(yesterday)
    }

    /// Parse "yesterday" or an explicit YYYY-MM-DD date
    pub fn parse(input: &str, now: DateTime<Utc>) -> Result<Self, WindowError> {
        let trimmed = input.trim();
        if trimmed.eq_ignore_ascii_case("yesterday") {
            return Ok(Self::yesterday(now));
        }
        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .map(Self::for_date)
            .map_err(|_| WindowError::InvalidDate(trimmed.to_string()))
    }

    /// Date label used in file names
    pub fn label(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }

    /// Window length in seconds
    pub fn duration_secs(&self) -> i64 {
        self.end - self.start + 1
    }
}

impl fmt::Display for ActivityWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}..={}]", self.label(), self.start, self.end)
    }
}

/// Eastern calendar date of a UTC instant
pub fn eastern_date(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&New_York).date_naive()
}

fn local_midnight_epoch(date: NaiveDate) -> i64 {
    let local = date.and_time(NaiveTime::MIN);
    // New York transitions happen at 02:00, so midnight always exists
    New_York
        .from_local_datetime(&local)
        .earliest()
        .map(|t| t.timestamp())
        .unwrap_or_else(|| local.and_utc().timestamp())
}
