//! Pricing and business rules for extending a reservation's end date.
//!
//! Only the newly added tail, the *delta window* `[current_end, new_end)`,
//! has to be free. The already-booked head is never re-checked.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{
    CurrencyCode, DateRange, ReservationId, Timestamp, UserId, MILLIS_PER_HOUR,
};

use super::{Reservation, ReservationError};

/// How many one-hour steps the suggestion search tries.
pub const MAX_EXTENSION_STEPS: i64 = 4;

/// Tariff and limits applied to extensions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionPolicy {
    /// Price per started hour, in whole currency units.
    pub hourly_rate: i64,
    pub currency: CurrencyCode,
    pub max_extension_hours: i64,
    pub max_future_days: i64,
}

impl ExtensionPolicy {
    /// Business rules independent of availability.
    ///
    /// Checked in order: ownership, status, end in the future, extension
    /// length, distance from `now`.
    pub fn validate(
        &self,
        reservation: &Reservation,
        new_end: Timestamp,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<(), ReservationError> {
        reservation.ensure_owned_by(user_id)?;
        reservation.ensure_modifiable()?;

        if !new_end.is_after(&now) {
            return Err(ReservationError::invalid_argument(
                "new_end_date",
                "new end date must be in the future",
            ));
        }

        let extension_ms = new_end.millis_since(&reservation.interval.end());
        // A limit past the i64 millisecond range cannot be exceeded
        let too_long = self
            .max_extension_hours
            .checked_mul(MILLIS_PER_HOUR)
            .is_some_and(|limit| extension_ms > limit);
        if too_long {
            return Err(ReservationError::invalid_argument(
                "new_end_date",
                format!(
                    "extension cannot exceed {} hours",
                    self.max_extension_hours
                ),
            ));
        }

        if new_end.is_after(&now.plus_days(self.max_future_days)) {
            return Err(ReservationError::invalid_argument(
                "new_end_date",
                format!(
                    "reservation cannot end more than {} days from now",
                    self.max_future_days
                ),
            ));
        }

        Ok(())
    }
}

/// The segment that an extension to `new_end` would add.
pub fn delta_window(
    reservation: &Reservation,
    new_end: Timestamp,
) -> Result<DateRange, ReservationError> {
    DateRange::new(reservation.interval.end(), new_end).map_err(|_| {
        ReservationError::invalid_argument(
            "new_end_date",
            "new end date must be after the current end date",
        )
    })
}

/// Cost of `delta` at `hourly_rate`, rounded up to the next whole unit.
///
/// Fails when the price does not fit in an `i64`.
pub fn extension_cost(delta: &DateRange, hourly_rate: i64) -> Result<i64, ReservationError> {
    delta
        .duration_millis()
        .checked_mul(hourly_rate)
        .and_then(|numerator| numerator.checked_add(MILLIS_PER_HOUR - 1))
        .map(|numerator| numerator.div_euclid(MILLIS_PER_HOUR))
        .ok_or_else(|| {
            ReservationError::invalid_argument("new_end_date", "extension cost is out of range")
        })
}

/// Price quote for extending a reservation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtensionQuote {
    pub can_extend: bool,
    pub additional_cost: i64,
    pub currency: CurrencyCode,
    pub new_end_date: Timestamp,
    pub conflicting_reservations: Vec<ReservationId>,
    /// Closed days inside the delta.
    pub blocked_dates: Vec<NaiveDate>,
    pub extended_duration_hours: f64,
}

impl ExtensionQuote {
    /// Builds the quote for `delta` given the conflicts and closed days
    /// found in it.
    ///
    /// Nothing is charged when the extension is infeasible.
    pub fn for_delta(
        delta: &DateRange,
        conflicts: Vec<ReservationId>,
        blocked_dates: Vec<NaiveDate>,
        hourly_rate: i64,
        currency: CurrencyCode,
    ) -> Result<Self, ReservationError> {
        let can_extend = conflicts.is_empty() && blocked_dates.is_empty();
        Ok(Self {
            can_extend,
            additional_cost: if can_extend {
                extension_cost(delta, hourly_rate)?
            } else {
                0
            },
            currency,
            new_end_date: delta.end(),
            conflicting_reservations: conflicts,
            blocked_dates,
            extended_duration_hours: delta.duration_hours(),
        })
    }
}

/// End dates worth probing for a suggestion search, nearest first.
pub fn suggestion_candidates(current_end: Timestamp, requested_end: Timestamp) -> Vec<Timestamp> {
    (1..=MAX_EXTENSION_STEPS)
        .map(|hours| current_end.plus_hours(hours))
        .filter(|candidate| !candidate.is_after(&requested_end))
        .collect()
}
