//! Calendar arithmetic behind the "due today / tomorrow / this week" queries.
//!
//! Everything here works on calendar dates in a fixed local offset and only
//! converts to UTC at the very end, so each function can be tested without a
//! clock or a database.

use chrono::{DateTime, Datelike, Days, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Utc};

/// An open interval of expiry instants: both bounds are excluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExpiryWindow {
    after: DateTime<Utc>,
    before: DateTime<Utc>,
}

impl ExpiryWindow {
    pub fn new(after: DateTime<Utc>, before: DateTime<Utc>) -> Self {
        Self { after, before }
    }

    /// Exclusive lower bound.
    pub fn after(&self) -> DateTime<Utc> {
        self.after
    }

    /// Exclusive upper bound.
    pub fn before(&self) -> DateTime<Utc> {
        self.before
    }

    /// Returns `true` if `instant` lies strictly inside the window.
    #[cfg(test)]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.after < instant && instant < self.before
    }
}

/// Returns the Monday of the week containing `date`.
pub fn start_of_week(date: NaiveDate) -> NaiveDate {
    let days_since_monday = date.weekday().num_days_from_monday();
    date - Days::new(u64::from(days_since_monday))
}

/// Returns the Sunday of the week containing `date`.
pub fn end_of_week(date: NaiveDate) -> NaiveDate {
    start_of_week(date) + Days::new(6)
}

/// Midnight at the start of `date` in `offset`, expressed in UTC.
pub fn local_midnight(date: NaiveDate, offset: FixedOffset) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    (local - TimeDelta::seconds(i64::from(offset.local_minus_utc()))).and_utc()
}

/// Window covering the single local calendar day `day`.
pub fn day_window(day: NaiveDate, offset: FixedOffset) -> ExpiryWindow {
    ExpiryWindow::new(
        local_midnight(day, offset),
        local_midnight(day + Days::new(1), offset),
    )
}

/// Window covering Monday through Sunday of the week containing `day`.
pub fn week_window(day: NaiveDate, offset: FixedOffset) -> ExpiryWindow {
    ExpiryWindow::new(
        local_midnight(start_of_week(day), offset),
        local_midnight(end_of_week(day) + Days::new(1), offset),
    )
}
