//! Payment repository port.

use async_trait::async_trait;

use crate::domain::foundation::{DomainError, ReservationId};
use crate::domain::payment::{Payment, PaymentStatus};

/// Repository port for payment attempts.
#[async_trait]
pub trait PaymentRepository: Send + Sync {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError>;

    /// All attempts for a reservation, oldest first.
    async fn find_by_reservation_id(
        &self,
        reservation_id: &ReservationId,
    ) -> Result<Vec<Payment>, DomainError>;

    /// Moves every attempt of `reservation_id` currently in `from` to `to`.
    ///
    /// Returns the number of rows changed. Zero is not an error, which keeps
    /// replayed webhooks harmless.
    async fn transition_for_reservation(
        &self,
        reservation_id: &ReservationId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<u64, DomainError>;
}
