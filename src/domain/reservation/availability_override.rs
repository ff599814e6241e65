//! Per-date availability overrides.
//!
//! Availability is normally derived from reservations alone. An override
//! pins one UTC calendar day of a subject open or closed; a closed day
//! blocks every interval that touches it, whatever the reservations say.

use chrono::{Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DateRange, Timestamp};

use super::Subject;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailabilityOverride {
    pub subject: Subject,
    pub date: NaiveDate,
    pub is_available: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AvailabilityOverride {
    pub fn new(subject: Subject, date: NaiveDate, is_available: bool, now: Timestamp) -> Self {
        Self {
            subject,
            date,
            is_available,
            created_at: now,
            updated_at: now,
        }
    }

    /// `[date 00:00, next day 00:00)` in UTC.
    pub fn day(&self) -> Option<DateRange> {
        let start = self.date.and_time(NaiveTime::MIN).and_utc();
        let end = self.date.succ_opt()?.and_time(NaiveTime::MIN).and_utc();
        DateRange::new(Timestamp::from_datetime(start), Timestamp::from_datetime(end)).ok()
    }

    /// Closed days block any interval overlapping them.
    pub fn blocks(&self, interval: &DateRange) -> bool {
        !self.is_available && self.day().is_some_and(|day| day.overlaps(interval))
    }
}

/// First and last UTC day an interval touches. The end is exclusive, so an
/// interval ending at midnight does not reach the following day.
pub fn days_touched(interval: &DateRange) -> (NaiveDate, NaiveDate) {
    let first = interval.start().as_datetime().date_naive();
    let last = (*interval.end().as_datetime() - Duration::milliseconds(1)).date_naive();
    (first, last.max(first))
}

/// Closed days among `overrides` that fall inside `interval`, in date order.
pub fn blocked_dates<'a, I>(overrides: I, interval: &DateRange) -> Vec<NaiveDate>
where
    I: IntoIterator<Item = &'a AvailabilityOverride>,
{
    let mut dates: Vec<NaiveDate> = overrides
        .into_iter()
        .filter(|o| o.blocks(interval))
        .map(|o| o.date)
        .collect();
    dates.sort();
    dates.dedup();
    dates
}
