//! Reservation aggregate entity.

use serde::{Deserialize, Serialize};

use crate::domain::foundation::{DateRange, ReservationId, StateMachine, Timestamp, UserId};

use super::{ReservationError, ReservationStatus, Subject};

/// A user's claim on a subject for a half-open interval.
///
/// Rooms and generic resources share this one model; the subject's kind
/// tells them apart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: UserId,
    pub subject: Subject,
    pub interval: DateRange,
    pub status: ReservationStatus,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Reservation {
    /// New reservations always start out pending.
    pub fn new(user_id: UserId, subject: Subject, interval: DateRange, now: Timestamp) -> Self {
        Self {
            id: ReservationId::new(),
            user_id,
            subject,
            interval,
            status: ReservationStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.user_id == user_id
    }

    pub fn ensure_owned_by(&self, user_id: &UserId) -> Result<(), ReservationError> {
        if self.is_owned_by(user_id) {
            Ok(())
        } else {
            Err(ReservationError::unauthorized(self.id))
        }
    }

    pub fn ensure_modifiable(&self) -> Result<(), ReservationError> {
        if self.status.is_modifiable() {
            Ok(())
        } else {
            Err(ReservationError::not_modifiable(self.status))
        }
    }

    /// Validates the transition without applying it.
    pub fn check_transition(&self, target: ReservationStatus) -> Result<(), ReservationError> {
        self.status
            .transition_to(target)
            .map(|_| ())
            .map_err(|_| ReservationError::invalid_transition(self.status, target))
    }

    pub fn transition_to(
        &mut self,
        target: ReservationStatus,
        now: Timestamp,
    ) -> Result<(), ReservationError> {
        self.check_transition(target)?;
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    /// Moves the reservation to a new interval on the same subject.
    pub fn reschedule(&mut self, interval: DateRange, now: Timestamp) -> Result<(), ReservationError> {
        self.ensure_modifiable()?;
        self.interval = interval;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reservation() -> Reservation {
        let start = Timestamp::now().plus_days(1);
        Reservation::new(
            UserId::new("guest-1").unwrap(),
            Subject::room("101").unwrap(),
            DateRange::new(start, start.plus_hours(3)).unwrap(),
            Timestamp::now(),
        )
    }

    #[test]
    fn new_reservation_is_pending() {
        let r = reservation();
        assert_eq!(r.status, ReservationStatus::Pending);
        assert_eq!(r.created_at, r.updated_at);
    }

    #[test]
    fn ownership_check_rejects_other_users() {
        let r = reservation();
        assert!(r.ensure_owned_by(&UserId::new("guest-1").unwrap()).is_ok());
        assert_eq!(
            r.ensure_owned_by(&UserId::new("guest-2").unwrap()),
            Err(ReservationError::unauthorized(r.id))
        );
    }

    #[test]
    fn transition_updates_status_and_timestamp() {
        let mut r = reservation();
        let later = r.updated_at.plus_hours(1);

        r.transition_to(ReservationStatus::Confirmed, later).unwrap();

        assert_eq!(r.status, ReservationStatus::Confirmed);
        assert_eq!(r.updated_at, later);
    }

    #[test]
    fn invalid_transition_leaves_reservation_untouched() {
        let mut r = reservation();
        let before = r.clone();

        let err = r
            .transition_to(ReservationStatus::Completed, Timestamp::now())
            .unwrap_err();

        assert_eq!(
            err,
            ReservationError::invalid_transition(
                ReservationStatus::Pending,
                ReservationStatus::Completed
            )
        );
        assert_eq!(r, before);
    }

    #[test]
    fn cancelled_reservation_cannot_be_rescheduled() {
        let mut r = reservation();
        r.transition_to(ReservationStatus::Cancelled, Timestamp::now())
            .unwrap();
        let new_interval = r.interval;

        assert_eq!(
            r.reschedule(new_interval, Timestamp::now()),
            Err(ReservationError::not_modifiable(ReservationStatus::Cancelled))
        );
    }
}
