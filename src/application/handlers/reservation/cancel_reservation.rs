//! CancelReservationHandler - Command handler for guest cancellations.

use crate::domain::foundation::{ReservationId, UserId};
use crate::domain::reservation::{Reservation, ReservationError, ReservationStatus};

use super::{Actor, ReservationStatusService};

/// Command to cancel a reservation.
#[derive(Debug, Clone)]
pub struct CancelReservationCommand {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub reason: Option<String>,
}

pub struct CancelReservationHandler {
    status_service: ReservationStatusService,
}

impl CancelReservationHandler {
    pub fn new(status_service: ReservationStatusService) -> Self {
        Self { status_service }
    }

    pub async fn handle(
        &self,
        cmd: CancelReservationCommand,
    ) -> Result<Reservation, ReservationError> {
        let cancelled = self
            .status_service
            .update_status(
                cmd.reservation_id,
                ReservationStatus::Cancelled,
                Actor::User(cmd.user_id),
            )
            .await?;

        tracing::info!(
            reservation_id = %cancelled.id,
            reason = cmd.reason.as_deref().unwrap_or("none given"),
            "Reservation cancelled by guest"
        );

        Ok(cancelled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryReservationRepository;
    use crate::domain::foundation::{DateRange, Timestamp};
    use crate::domain::reservation::Subject;
    use std::sync::Arc;

    async fn handler_with(status: ReservationStatus) -> (CancelReservationHandler, ReservationId) {
        let repo = InMemoryReservationRepository::new();
        let start = Timestamp::now().plus_days(1);
        let mut r = Reservation::new(
            UserId::new("guest-1").unwrap(),
            Subject::room("12").unwrap(),
            DateRange::new(start, start.plus_hours(2)).unwrap(),
            Timestamp::now(),
        );
        r.status = status;
        let id = r.id;
        repo.insert_raw(r).await;
        (
            CancelReservationHandler::new(ReservationStatusService::new(Arc::new(repo))),
            id,
        )
    }

    #[tokio::test]
    async fn confirmed_reservation_can_be_cancelled() {
        let (handler, id) = handler_with(ReservationStatus::Confirmed).await;

        let cancelled = handler
            .handle(CancelReservationCommand {
                reservation_id: id,
                user_id: UserId::new("guest-1").unwrap(),
                reason: Some("plans changed".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(cancelled.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn completed_reservation_cannot_be_cancelled() {
        let (handler, id) = handler_with(ReservationStatus::Completed).await;

        let err = handler
            .handle(CancelReservationCommand {
                reservation_id: id,
                user_id: UserId::new("guest-1").unwrap(),
                reason: None,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ReservationError::InvalidTransition { .. }));
    }
}
