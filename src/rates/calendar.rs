//! Calendar helpers: business days and the injectable "today".

use chrono::{Datelike, Local, NaiveDate, Weekday};

/// Monday through Friday. No holiday calendar.
pub fn is_business_day(date: NaiveDate) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun)
}

/// Source of the current wall-clock date.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local system date.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// A clock pinned to one date, for tests and replays.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
