//! RescheduleReservationHandler - Command handler for moving a reservation's dates.

use std::sync::Arc;

use crate::domain::foundation::{DateRange, ReservationId, Timestamp, UserId};
use crate::domain::reservation::{
    BlockingPolicy, Reservation, ReservationError, ReservationStatus,
};
use crate::ports::{AvailabilityOverrideRepository, ReservationRepository};

use super::availability::closed_days;

/// Command to change a reservation's dates. Absent fields keep their value.
#[derive(Debug, Clone)]
pub struct RescheduleReservationCommand {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub start_date: Option<Timestamp>,
    pub end_date: Option<Timestamp>,
}

pub struct RescheduleReservationHandler {
    repository: Arc<dyn ReservationRepository>,
    overrides: Option<Arc<dyn AvailabilityOverrideRepository>>,
    policy: BlockingPolicy,
}

impl RescheduleReservationHandler {
    pub fn new(repository: Arc<dyn ReservationRepository>, policy: BlockingPolicy) -> Self {
        Self {
            repository,
            overrides: None,
            policy,
        }
    }

    pub fn with_overrides(mut self, overrides: Arc<dyn AvailabilityOverrideRepository>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub async fn handle(
        &self,
        cmd: RescheduleReservationCommand,
    ) -> Result<Reservation, ReservationError> {
        let reservation = self
            .repository
            .find_by_id(&cmd.reservation_id)
            .await?
            .ok_or(ReservationError::not_found(cmd.reservation_id))?;

        reservation.ensure_owned_by(&cmd.user_id)?;
        reservation.ensure_modifiable()?;

        let interval = DateRange::new(
            cmd.start_date.unwrap_or(reservation.interval.start()),
            cmd.end_date.unwrap_or(reservation.interval.end()),
        )?;

        // A confirmed reservation must stay clear of other confirmed ones
        // whatever the creation policy says.
        let policy = if reservation.status == ReservationStatus::Confirmed {
            BlockingPolicy::ConfirmedOnly
        } else {
            self.policy
        };
        let conflicts = self
            .repository
            .check_availability(&reservation.subject, &interval, policy, Some(reservation.id))
            .await?;
        if !conflicts.is_empty() {
            return Err(ReservationError::unavailable(
                conflicts.iter().map(|r| r.id).collect(),
            ));
        }
        let closed = closed_days(self.overrides.as_ref(), &reservation.subject, &interval).await?;
        if !closed.is_empty() {
            return Err(ReservationError::dates_blocked(closed));
        }

        let previous = reservation.interval;

        let Some(updated) = self.repository.update(&reservation.id, &interval).await? else {
            // Cancelled or completed since the read
            return Err(match self.repository.find_by_id(&reservation.id).await? {
                Some(current) => ReservationError::not_modifiable(current.status),
                None => ReservationError::not_found(reservation.id),
            });
        };

        tracing::info!(
            reservation_id = %updated.id,
            from_start = %previous.start(),
            from_end = %previous.end(),
            to_start = %updated.interval.start(),
            to_end = %updated.interval.end(),
            "Reservation rescheduled"
        );

        Ok(updated)
    }
}
