//! Occupancy statistics over calendar periods.

use chrono::{Datelike, FixedOffset, NaiveDate, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::{DateRange, Timestamp, ValidationError, MILLIS_PER_HOUR};

use super::{Reservation, ReservationStatus, Subject};

/// Reporting period for occupancy statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsPeriod {
    Day,
    #[default]
    Week,
    Month,
}

impl FromStr for StatsPeriod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(StatsPeriod::Day),
            "week" => Ok(StatsPeriod::Week),
            "month" => Ok(StatsPeriod::Month),
            other => Err(ValidationError::invalid_format(
                "period",
                format!("expected day, week or month, got '{}'", other),
            )),
        }
    }
}

/// Window covered by `period`, anchored at local midnight of `reference`.
///
/// `day` and `week` span 24 and 168 hours. `month` runs from the first of the
/// reference month to the first of the next month.
pub fn period_window(
    period: StatsPeriod,
    reference: Timestamp,
    offset: FixedOffset,
) -> Result<DateRange, ValidationError> {
    let local_date = reference.as_datetime().with_timezone(&offset).date_naive();

    let (first_day, next_day) = match period {
        StatsPeriod::Day => (Some(local_date), local_date.succ_opt()),
        StatsPeriod::Week => (
            Some(local_date),
            local_date.checked_add_days(chrono::Days::new(7)),
        ),
        StatsPeriod::Month => {
            let first = NaiveDate::from_ymd_opt(local_date.year(), local_date.month(), 1);
            let (year, month) = if local_date.month() == 12 {
                (local_date.year() + 1, 1)
            } else {
                (local_date.year(), local_date.month() + 1)
            };
            (first, NaiveDate::from_ymd_opt(year, month, 1))
        }
    };

    let start = first_day.and_then(|d| local_midnight(d, offset));
    let end = next_day.and_then(|d| local_midnight(d, offset));

    match (start, end) {
        (Some(start), Some(end)) => DateRange::new(start, end),
        _ => Err(ValidationError::invalid_format(
            "start_date",
            "reference date is out of range",
        )),
    }
}

fn local_midnight(date: NaiveDate, offset: FixedOffset) -> Option<Timestamp> {
    let naive = date.and_hms_opt(0, 0, 0)?;
    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| Timestamp::from_datetime(dt.with_timezone(&Utc)))
}

/// Occupancy figures for one subject over one window.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OccupancyStats {
    pub subject: Subject,
    pub period: StatsPeriod,
    pub window_start: Timestamp,
    pub window_end: Timestamp,
    /// Booked share of the window, 3 decimals.
    pub occupancy_rate: f64,
    pub total_hours: f64,
    pub booked_hours: f64,
    /// Whole currency units.
    pub revenue: i64,
    pub reservation_count: usize,
    pub average_booking_duration_hours: f64,
}

impl OccupancyStats {
    /// Aggregates the confirmed reservations among `reservations`.
    ///
    /// Reservations straddling the window boundary only count the part
    /// inside the window.
    pub fn compute(
        subject: Subject,
        period: StatsPeriod,
        window: DateRange,
        reservations: &[Reservation],
        average_hourly_rate: i64,
    ) -> Self {
        let booked: Vec<DateRange> = reservations
            .iter()
            .filter(|r| r.status == ReservationStatus::Confirmed && r.subject == subject)
            .filter_map(|r| r.interval.intersection(&window))
            .collect();

        let booked_ms: i64 = booked.iter().map(DateRange::duration_millis).sum();
        let booked_hours = booked_ms as f64 / MILLIS_PER_HOUR as f64;
        let total_hours = window.duration_hours();

        let occupancy_rate = if total_hours > 0.0 {
            booked_hours / total_hours
        } else {
            0.0
        };

        let reservation_count = booked.len();
        let average_booking_duration_hours = if reservation_count > 0 {
            booked_hours / reservation_count as f64
        } else {
            0.0
        };

        Self {
            subject,
            period,
            window_start: window.start(),
            window_end: window.end(),
            occupancy_rate: round_to(occupancy_rate, 3),
            total_hours: round_to(total_hours, 1),
            booked_hours: round_to(booked_hours, 1),
            revenue: (booked_hours * average_hourly_rate as f64).round() as i64,
            reservation_count,
            average_booking_duration_hours: round_to(average_booking_duration_hours, 1),
        }
    }
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}
