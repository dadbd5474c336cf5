//! Analysis time periods and the calendar windows they resolve to.

use std::fmt;
use std::str::FromStr;

use chrono::{Days, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::CoreError;

/// A named analysis window.
///
/// Only a configured subset is scheduled by the pipeline; see
/// `AppConfig::stats_time_periods`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimePeriod {
    ThisWeek,
    LastWeek,
    ThisMonth,
    LastMonth,
    AllTime,
}

impl TimePeriod {
    pub const ALL: [TimePeriod; 5] = [
        TimePeriod::ThisWeek,
        TimePeriod::LastWeek,
        TimePeriod::ThisMonth,
        TimePeriod::LastMonth,
        TimePeriod::AllTime,
    ];

    /// The stable tag stored in `product_stats.time_period`.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            TimePeriod::ThisWeek => "this_week",
            TimePeriod::LastWeek => "last_week",
            TimePeriod::ThisMonth => "this_month",
            TimePeriod::LastMonth => "last_month",
            TimePeriod::AllTime => "all_time",
        }
    }

    /// Resolve this period against an explicit `today`.
    ///
    /// | period       | from           | to             |
    /// |--------------|----------------|----------------|
    /// | `this_week`  | today − 7d     | today          |
    /// | `last_week`  | today − 14d    | today − 7d     |
    /// | `this_month` | today − 1 mo   | today          |
    /// | `last_month` | today − 2 mo   | today − 1 mo   |
    /// | `all_time`   | today − 100 y  | today          |
    ///
    /// Windows are half-open, so adjacent periods share no day: `last_week`
    /// ends on the day `this_week` starts. Month arithmetic clamps to the last
    /// day of the target month, so `2026-03-31` minus one month is
    /// `2026-02-28`.
    #[must_use]
    pub fn window_ending(self, today: NaiveDate) -> DateWindow {
        let (from, to) = match self {
            TimePeriod::ThisWeek => (days_before(today, 7), today),
            TimePeriod::LastWeek => (days_before(today, 14), days_before(today, 7)),
            TimePeriod::ThisMonth => (months_before(today, 1), today),
            TimePeriod::LastMonth => (months_before(today, 2), months_before(today, 1)),
            TimePeriod::AllTime => (months_before(today, 1200), today),
        };
        DateWindow { from, to }
    }

    /// Resolve this period against the current UTC date.
    #[must_use]
    pub fn current_window(self) -> DateWindow {
        self.window_ending(Utc::now().date_naive())
    }
}

impl fmt::Display for TimePeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TimePeriod {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        TimePeriod::ALL
            .into_iter()
            .find(|p| p.as_str() == s.trim())
            .ok_or_else(|| CoreError::InvalidTimePeriod(s.to_string()))
    }
}

/// A half-open range of calendar dates: `from` is included, `to` is not.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    /// Whether `day` falls inside the window.
    #[must_use]
    pub fn contains(&self, day: NaiveDate) -> bool {
        day >= self.from && day < self.to
    }

    /// `from` as `YYYY-MM-DD`.
    #[must_use]
    pub fn from_iso(&self) -> String {
        self.from.format("%Y-%m-%d").to_string()
    }

    /// `to` as `YYYY-MM-DD`.
    #[must_use]
    pub fn to_iso(&self) -> String {
        self.to.format("%Y-%m-%d").to_string()
    }
}

impl fmt::Display for DateWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.from_iso(), self.to_iso())
    }
}

fn days_before(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_sub_days(Days::new(days))
        .unwrap_or(NaiveDate::MIN)
}

fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}
