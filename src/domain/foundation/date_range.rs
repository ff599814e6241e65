//! Half-open time interval value object.

use serde::{Deserialize, Serialize};

use super::timestamp::MILLIS_PER_HOUR;
use super::{Timestamp, ValidationError};

/// Half-open interval `[start, end)` with `start < end`.
///
/// Two ranges that merely touch (`a.end == b.start`) do not overlap, so
/// back-to-back bookings of the same subject are allowed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDateRange")]
pub struct DateRange {
    start: Timestamp,
    end: Timestamp,
}

#[derive(Deserialize)]
struct RawDateRange {
    start: Timestamp,
    end: Timestamp,
}

impl TryFrom<RawDateRange> for DateRange {
    type Error = ValidationError;

    fn try_from(raw: RawDateRange) -> Result<Self, Self::Error> {
        DateRange::new(raw.start, raw.end)
    }
}

impl DateRange {
    /// Creates a range, rejecting empty and inverted intervals.
    pub fn new(start: Timestamp, end: Timestamp) -> Result<Self, ValidationError> {
        if !start.is_before(&end) {
            return Err(ValidationError::invalid_format(
                "end_date",
                "end date must be after start date",
            ));
        }
        Ok(Self { start, end })
    }

    pub fn start(&self) -> Timestamp {
        self.start
    }

    pub fn end(&self) -> Timestamp {
        self.end
    }

    /// True when the two ranges share at least one instant.
    pub fn overlaps(&self, other: &DateRange) -> bool {
        self.start < other.end && self.end > other.start
    }

    /// Portion of `self` that falls inside `window`, if any.
    pub fn intersection(&self, window: &DateRange) -> Option<DateRange> {
        let start = self.start.max(window.start);
        let end = self.end.min(window.end);
        DateRange::new(start, end).ok()
    }

    pub fn duration_millis(&self) -> i64 {
        self.end.millis_since(&self.start)
    }

    pub fn duration_hours(&self) -> f64 {
        self.duration_millis() as f64 / MILLIS_PER_HOUR as f64
    }

    /// Same range with a different end, validated.
    pub fn with_end(&self, end: Timestamp) -> Result<Self, ValidationError> {
        DateRange::new(self.start, end)
    }
}
