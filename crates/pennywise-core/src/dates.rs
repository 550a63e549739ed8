//! Calendar windows relative to a reference day
//!
//! Every window is inclusive on both ends. The reference day is passed in
//! explicitly so callers (and tests) decide what "today" means; [`today`]
//! reads the local clock for the common case.

use chrono::{Datelike, Duration, Local, Months, NaiveDate};
use serde::Serialize;

/// An inclusive date range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// `start <= date <= end`
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Like [`contains`](Self::contains), but a missing date is never in range
    pub fn contains_opt(&self, date: Option<NaiveDate>) -> bool {
        date.is_some_and(|d| self.contains(d))
    }
}

/// The local calendar date right now
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.day0()))
}

fn months_before(date: NaiveDate, months: u32) -> NaiveDate {
    date.checked_sub_months(Months::new(months))
        .unwrap_or(NaiveDate::MIN)
}

/// First of the current month through today (not end of month)
pub fn current_month_range(today: NaiveDate) -> DateRange {
    DateRange::new(first_of_month(today), today)
}

/// The whole previous calendar month
pub fn previous_month_range(today: NaiveDate) -> DateRange {
    let end = first_of_month(today) - Duration::days(1);
    DateRange::new(first_of_month(end), end)
}

/// First of the month `months_back` months ago through today.
///
/// `rolling_window(today, 2)` on Oct 16 is Aug 1 ..= Oct 16: three calendar
/// months counting the current partial one.
pub fn rolling_window(today: NaiveDate, months_back: u32) -> DateRange {
    DateRange::new(months_before(first_of_month(today), months_back), today)
}

/// The `n` full months before the current month, excluding the current one.
///
/// `prior_full_months(today, 3)` in October is Jul 1 ..= Sep 30. With `n == 0`
/// the range is empty (start after end).
pub fn prior_full_months(today: NaiveDate, n: u32) -> DateRange {
    let current = first_of_month(today);
    DateRange::new(months_before(current, n), current - Duration::days(1))
}
