//! Calendar date ranges used by order filters, dashboards and reports.

use chrono::{DateTime, Datelike, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Inclusive range of calendar days, interpreted in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range, swapping the ends if they are reversed.
    #[must_use]
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    #[must_use]
    pub const fn day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    /// Monday through Sunday of the week containing `date`.
    #[must_use]
    pub fn week_of(date: NaiveDate) -> Self {
        let monday = date - Days::new(u64::from(date.weekday().num_days_from_monday()));
        Self {
            start: monday,
            end: monday + Days::new(6),
        }
    }

    /// First of the month through `date`.
    #[must_use]
    pub fn month_to_date(date: NaiveDate) -> Self {
        Self {
            start: date.with_day(1).unwrap_or(date),
            end: date,
        }
    }

    /// Half-open instant bounds: midnight of `start` up to midnight after `end`.
    #[must_use]
    pub fn bounds(&self) -> (DateTime<Utc>, DateTime<Utc>) {
        let from = self.start.and_time(chrono::NaiveTime::MIN).and_utc();
        let until = (self.end + Days::new(1))
            .and_time(chrono::NaiveTime::MIN)
            .and_utc();
        (from, until)
    }

    #[must_use]
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        let (from, until) = self.bounds();
        instant >= from && instant < until
    }
}
