//! Conflict detection rules shared by every store implementation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DateRange, ReservationId};

use super::{Reservation, ReservationStatus, Subject};

/// Which reservation statuses hold a subject against new bookings.
///
/// Cancelled and completed reservations never block, whatever the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BlockingPolicy {
    /// Only paid reservations hold the slot; unpaid ones may be overbooked
    /// and lose the race at confirmation time.
    #[default]
    ConfirmedOnly,
    /// Pending reservations also hold the slot while payment is in flight.
    PendingAndConfirmed,
}

impl BlockingPolicy {
    pub fn blocking_statuses(&self) -> &'static [ReservationStatus] {
        match self {
            BlockingPolicy::ConfirmedOnly => &[ReservationStatus::Confirmed],
            BlockingPolicy::PendingAndConfirmed => {
                &[ReservationStatus::Pending, ReservationStatus::Confirmed]
            }
        }
    }

    pub fn blocks(&self, status: ReservationStatus) -> bool {
        self.blocking_statuses().contains(&status)
    }
}

/// Reservations among `candidates` that would collide with `interval` on `subject`.
pub fn find_conflicts<'a, I>(
    candidates: I,
    subject: &Subject,
    interval: &DateRange,
    policy: BlockingPolicy,
    exclude: Option<ReservationId>,
) -> Vec<Reservation>
where
    I: IntoIterator<Item = &'a Reservation>,
{
    candidates
        .into_iter()
        .filter(|r| Some(r.id) != exclude)
        .filter(|r| &r.subject == subject)
        .filter(|r| policy.blocks(r.status))
        .filter(|r| r.interval.overlaps(interval))
        .cloned()
        .collect()
}

/// Outcome of an availability check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AvailabilityReport {
    pub is_available: bool,
    pub conflicts: Vec<Reservation>,
    /// Days closed by an override.
    pub blocked_dates: Vec<NaiveDate>,
}

impl AvailabilityReport {
    pub fn from_conflicts(conflicts: Vec<Reservation>) -> Self {
        Self::new(conflicts, Vec::new())
    }

    pub fn new(conflicts: Vec<Reservation>, blocked_dates: Vec<NaiveDate>) -> Self {
        Self {
            is_available: conflicts.is_empty() && blocked_dates.is_empty(),
            conflicts,
            blocked_dates,
        }
    }

    pub fn conflict_ids(&self) -> Vec<ReservationId> {
        self.conflicts.iter().map(|r| r.id).collect()
    }
}
