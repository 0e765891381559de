//! Date windows used to bound report runs and table refreshes.

use chrono::{DateTime, Duration, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

use crate::report::ReportFilter;

/// Threshold format the reporting API accepts.
pub const WINDOW_FORMAT: &str = "%Y-%m-%d %H:%M";

/// How window edges are placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindowAlignment {
    /// `now - days` to `now`, to the minute.
    #[default]
    Exact,
    /// Midnight `days` ago to 23:59 today.
    WholeDays,
}

/// Inclusive `[from, to]` threshold pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportWindow {
    pub from: String,
    pub to: String,
}

impl ReportWindow {
    /// Window covering the `days` before `now`.
    ///
    /// ```rust
    /// use chrono::{TimeZone, Utc};
    /// use wms_core::window::{ReportWindow, WindowAlignment};
    ///
    /// let now = Utc.with_ymd_and_hms(2024, 3, 8, 6, 30, 0).unwrap();
    /// let window = ReportWindow::trailing_days(&now, 7, WindowAlignment::Exact);
    /// assert_eq!(window.from, "2024-03-01 06:30");
    /// assert_eq!(window.to, "2024-03-08 06:30");
    /// ```
    pub fn trailing_days<Tz>(now: &DateTime<Tz>, days: u32, alignment: WindowAlignment) -> Self
    where
        Tz: TimeZone,
        Tz::Offset: Display,
    {
        let start = now.clone() - Duration::days(i64::from(days));
        match alignment {
            WindowAlignment::Exact => ReportWindow {
                from: start.format(WINDOW_FORMAT).to_string(),
                to: now.format(WINDOW_FORMAT).to_string(),
            },
            WindowAlignment::WholeDays => ReportWindow {
                from: start.format("%Y-%m-%d 00:00").to_string(),
                to: now.format("%Y-%m-%d 23:59").to_string(),
            },
        }
    }

    /// Whole days from the earliest to the latest of `dates`. `None` when
    /// `dates` is empty.
    pub fn covering_dates<I>(dates: I) -> Option<Self>
    where
        I: IntoIterator<Item = NaiveDate>,
    {
        let mut dates = dates.into_iter();
        let first = dates.next()?;
        let (min, max) = dates.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        Some(ReportWindow {
            from: min.format("%Y-%m-%d 00:00").to_string(),
            to: max.format("%Y-%m-%d 23:59").to_string(),
        })
    }

    /// `between` filter on `column`.
    pub fn to_filter(&self, column: impl Into<String>) -> ReportFilter {
        ReportFilter::between(column, self.from.clone(), self.to.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::US::Eastern;

    #[test]
    fn test_whole_day_alignment() {
        let now = Eastern.with_ymd_and_hms(2024, 3, 8, 17, 45, 0).unwrap();
        let window = ReportWindow::trailing_days(&now, 28, WindowAlignment::WholeDays);
        assert_eq!(window.from, "2024-02-09 00:00");
        assert_eq!(window.to, "2024-03-08 23:59");
    }

    #[test]
    fn test_covering_dates() {
        let day = |d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
        let window = ReportWindow::covering_dates([day(12), day(3), day(20), day(7)]).unwrap();
        assert_eq!(window.from, "2024-03-03 00:00");
        assert_eq!(window.to, "2024-03-20 23:59");

        assert!(ReportWindow::covering_dates(Vec::new()).is_none());
    }

    #[test]
    fn test_window_filter() {
        let now = Eastern.with_ymd_and_hms(2024, 3, 8, 6, 0, 0).unwrap();
        let filter = ReportWindow::trailing_days(&now, 2, WindowAlignment::Exact)
            .to_filter("time_completed_at");
        assert_eq!(filter.from_threshold.as_deref(), Some("2024-03-06 06:00"));
        assert_eq!(filter.to_threshold.as_deref(), Some("2024-03-08 06:00"));
    }
}
