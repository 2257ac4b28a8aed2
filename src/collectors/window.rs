//! Day-window filtering for activity items.
//!
//! Windows are inclusive ranges of UTC calendar days. Membership is decided
//! by truncating a timestamp to its date and comparing dates for equality,
//! not by rolling 24/48-hour durations: an item at 23:59:59 yesterday and
//! one at 00:00:01 today both fall in a "yesterday and today" window, while
//! one from two days ago does not.

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};

/// An inclusive range of UTC calendar days.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActivityWindow {
    pub start_day: NaiveDate,
    pub end_day: NaiveDate,
}

impl ActivityWindow {
    /// Window covering yesterday and today relative to `now`.
    pub fn today_and_yesterday(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let yesterday = today.checked_sub_days(Days::new(1)).unwrap_or(today);
        Self {
            start_day: yesterday,
            end_day: today,
        }
    }

    /// Window covering a single day.
    pub fn single_day(day: NaiveDate) -> Self {
        Self {
            start_day: day,
            end_day: day,
        }
    }

    /// True when the timestamp's UTC date falls inside the window.
    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        let day = ts.date_naive();
        day >= self.start_day && day <= self.end_day
    }

    /// The earliest instant inside the window (start day at midnight UTC).
    pub fn start(&self) -> DateTime<Utc> {
        self.start_day
            .and_time(NaiveTime::MIN)
            .and_utc()
    }

    /// The first instant after the window (midnight UTC after the end day).
    pub fn end_exclusive(&self) -> DateTime<Utc> {
        let next = self
            .end_day
            .checked_add_days(Days::new(1))
            .unwrap_or(self.end_day);
        next.and_time(NaiveTime::MIN).and_utc()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn window() -> ActivityWindow {
        let now = Utc.with_ymd_and_hms(2025, 6, 2, 9, 30, 0).unwrap();
        ActivityWindow::today_and_yesterday(now)
    }

    #[test]
    fn late_yesterday_and_early_today_both_match() {
        let w = window();
        let late_yesterday = Utc.with_ymd_and_hms(2025, 6, 1, 23, 59, 59).unwrap();
        let early_today = Utc.with_ymd_and_hms(2025, 6, 2, 0, 0, 1).unwrap();
        assert!(w.contains(late_yesterday));
        assert!(w.contains(early_today));
    }

    #[test]
    fn two_days_ago_does_not_match() {
        let w = window();
        let two_days_ago = Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 59).unwrap();
        assert!(!w.contains(two_days_ago));
    }

    #[test]
    fn bounds_cover_midnight_to_midnight() {
        let w = window();
        assert_eq!(w.start(), Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        assert_eq!(
            w.end_exclusive(),
            Utc.with_ymd_and_hms(2025, 6, 3, 0, 0, 0).unwrap()
        );
    }
}
