//! GetReservationHandler - Query handler for a single reservation and its timeline.

use std::sync::Arc;

use crate::domain::foundation::{ReservationId, UserId};
use crate::domain::reservation::{timeline, HistoryEntry, Reservation, ReservationError};
use crate::ports::ReservationRepository;

/// Query to retrieve a reservation.
#[derive(Debug, Clone)]
pub struct GetReservationQuery {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
}

pub struct GetReservationHandler {
    repository: Arc<dyn ReservationRepository>,
}

impl GetReservationHandler {
    pub fn new(repository: Arc<dyn ReservationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(&self, query: GetReservationQuery) -> Result<Reservation, ReservationError> {
        let reservation = self
            .repository
            .find_by_id(&query.reservation_id)
            .await?
            .ok_or(ReservationError::not_found(query.reservation_id))?;

        reservation.ensure_owned_by(&query.user_id)?;
        Ok(reservation)
    }

    /// Owner-only, like `handle`.
    pub async fn history(
        &self,
        query: GetReservationQuery,
    ) -> Result<Vec<HistoryEntry>, ReservationError> {
        let reservation = self.handle(query).await?;
        Ok(timeline(&reservation))
    }
}
