use crate::error::{OptionsError, Result};
use chrono::{Days, Local, NaiveDate};

const ISO_DATE: &str = "%Y-%m-%d";

/// Converts expiration dates into whole calendar days from "today".
///
/// Dates are compared as local calendar days. The year, month and day of an
/// ISO string are taken literally and never reinterpreted as a UTC instant, so
/// the count does not shift with the observer's offset from UTC.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DayCounter {
    pinned: Option<NaiveDate>,
}

impl DayCounter {
    /// Counter that reads today's date from the local clock on every call
    pub fn local() -> Self {
        Self { pinned: None }
    }

    /// Counter whose "today" never moves
    pub fn fixed(today: NaiveDate) -> Self {
        Self {
            pinned: Some(today),
        }
    }

    pub fn today(&self) -> NaiveDate {
        self.pinned.unwrap_or_else(|| Local::now().date_naive())
    }

    /// Days from today until `iso_date`, zero for today or any past date
    pub fn days_until(&self, iso_date: &str) -> Result<u32> {
        Ok(self.days_until_date(parse_iso_date(iso_date)?))
    }

    pub fn days_until_date(&self, expiration: NaiveDate) -> u32 {
        days_between(self.today(), expiration)
    }

    /// The calendar date `days` after today
    pub fn date_after(&self, days: u32) -> NaiveDate {
        let today = self.today();
        today
            .checked_add_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MAX)
    }
}

/// Whole days from `today` to `expiration`, floored at zero
pub fn days_between(today: NaiveDate, expiration: NaiveDate) -> u32 {
    let diff = expiration.signed_duration_since(today).num_days();
    u32::try_from(diff.max(0)).unwrap_or(u32::MAX)
}

pub fn parse_iso_date(iso_date: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(iso_date.trim(), ISO_DATE).map_err(|e| {
        OptionsError::ParseError(format!("Invalid expiration date '{}': {}", iso_date, e))
    })
}
