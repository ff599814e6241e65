//! CancelWithRefundHandler - refunds the guest's payment, then cancels.

use std::sync::Arc;

use crate::domain::foundation::{ReservationId, UserId};
use crate::domain::payment::PaymentStatus;
use crate::domain::reservation::{Reservation, ReservationError, ReservationStatus};
use crate::ports::{PaymentProvider, PaymentRepository, Refund, RefundRequest, ReservationRepository};

use super::{Actor, ReservationStatusService};

/// Command to cancel a reservation and refund its payment.
#[derive(Debug, Clone)]
pub struct CancelWithRefundCommand {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub reason: Option<String>,
    /// Minor units; full refund when absent.
    pub refund_amount: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct CancelWithRefundResult {
    pub reservation: Reservation,
    pub refund: Refund,
}

pub struct CancelWithRefundHandler {
    reservations: Arc<dyn ReservationRepository>,
    payments: Arc<dyn PaymentRepository>,
    provider: Arc<dyn PaymentProvider>,
    status_service: ReservationStatusService,
}

impl CancelWithRefundHandler {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        payments: Arc<dyn PaymentRepository>,
        provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            status_service: ReservationStatusService::new(reservations.clone()),
            reservations,
            payments,
            provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: CancelWithRefundCommand,
    ) -> Result<CancelWithRefundResult, ReservationError> {
        let reservation = self
            .reservations
            .find_by_id(&cmd.reservation_id)
            .await?
            .ok_or(ReservationError::not_found(cmd.reservation_id))?;

        reservation.ensure_owned_by(&cmd.user_id)?;
        reservation.check_transition(ReservationStatus::Cancelled)?;

        if let Some(amount) = cmd.refund_amount {
            if amount <= 0 {
                return Err(ReservationError::invalid_argument(
                    "refund_amount",
                    "refund amount must be positive",
                ));
            }
        }

        // Refund in the currency the guest paid in
        let attempts = self.payments.find_by_reservation_id(&reservation.id).await?;
        let charged = attempts
            .iter()
            .rev()
            .find(|p| p.status == PaymentStatus::Paid)
            .or_else(|| attempts.last())
            .ok_or_else(|| {
                ReservationError::invalid_argument(
                    "reservation_id",
                    "no payment recorded for this reservation",
                )
            })?;

        // Money first: a failed refund leaves the reservation untouched.
        let refund = self
            .provider
            .process_refund(RefundRequest {
                reservation_id: reservation.id,
                amount: cmd.refund_amount,
                currency: charged.currency.clone(),
                reason: cmd.reason.clone(),
            })
            .await?;

        let cancelled = self
            .status_service
            .update_status(reservation.id, ReservationStatus::Cancelled, Actor::System)
            .await?;

        let refunded = self
            .payments
            .transition_for_reservation(
                &reservation.id,
                PaymentStatus::Paid,
                PaymentStatus::Refunded,
            )
            .await?;

        tracing::info!(
            reservation_id = %reservation.id,
            refund_id = %refund.id,
            amount = refund.amount,
            payments_refunded = refunded,
            "Reservation cancelled with refund"
        );

        Ok(CancelWithRefundResult {
            reservation: cancelled,
            refund,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{InMemoryPaymentRepository, InMemoryReservationRepository};
    use crate::adapters::stripe::MockPaymentProvider;
    use crate::domain::foundation::{CurrencyCode, DateRange, Timestamp};
    use crate::domain::payment::Payment;
    use crate::domain::reservation::Subject;
    use crate::ports::PaymentError;

    struct Fixture {
        handler: CancelWithRefundHandler,
        reservations: InMemoryReservationRepository,
        payments: InMemoryPaymentRepository,
        provider: MockPaymentProvider,
        id: ReservationId,
    }

    fn guest() -> UserId {
        UserId::new("guest-1").unwrap()
    }

    async fn fixture(status: ReservationStatus) -> Fixture {
        let reservations = InMemoryReservationRepository::new();
        let payments = InMemoryPaymentRepository::new();
        let provider = MockPaymentProvider::new();

        let start = Timestamp::now().plus_days(1);
        let mut r = Reservation::new(
            guest(),
            Subject::room("12").unwrap(),
            DateRange::new(start, start.plus_hours(2)).unwrap(),
            Timestamp::now(),
        );
        r.status = status;
        let id = r.id;
        reservations.insert_raw(r).await;

        let mut payment = Payment::pending(
            id,
            guest(),
            5000,
            CurrencyCode::new("eur").unwrap(),
            "card",
            Timestamp::now(),
        )
        .unwrap();
        payment.status = PaymentStatus::Paid;
        payments.save(&payment).await.unwrap();

        Fixture {
            handler: CancelWithRefundHandler::new(
                Arc::new(reservations.clone()),
                Arc::new(payments.clone()),
                Arc::new(provider.clone()),
            ),
            reservations,
            payments,
            provider,
            id,
        }
    }

    fn command(id: ReservationId) -> CancelWithRefundCommand {
        CancelWithRefundCommand {
            reservation_id: id,
            user_id: guest(),
            reason: Some("flight cancelled".to_string()),
            refund_amount: Some(5000),
        }
    }

    #[tokio::test]
    async fn refunds_then_cancels() {
        let f = fixture(ReservationStatus::Confirmed).await;

        let result = f.handler.handle(command(f.id)).await.unwrap();

        assert_eq!(result.reservation.status, ReservationStatus::Cancelled);
        assert_eq!(result.refund.amount, 5000);
        assert_eq!(
            f.provider.refunds()[0].reason.as_deref(),
            Some("flight cancelled")
        );
        assert_eq!(f.payments.all().await[0].status, PaymentStatus::Refunded);
    }

    #[tokio::test]
    async fn refund_uses_the_paid_attempt_currency() {
        let f = fixture(ReservationStatus::Confirmed).await;
        let mut retry = Payment::pending(
            f.id,
            guest(),
            5000,
            CurrencyCode::new("usd").unwrap(),
            "card",
            Timestamp::now(),
        )
        .unwrap();
        retry.status = PaymentStatus::Failed;
        f.payments.save(&retry).await.unwrap();

        let result = f.handler.handle(command(f.id)).await.unwrap();

        assert_eq!(f.provider.refunds()[0].currency.as_str(), "eur");
        assert_eq!(result.refund.currency, "eur");
    }

    #[tokio::test]
    async fn reservation_without_payment_is_not_refunded() {
        let f = fixture(ReservationStatus::Confirmed).await;
        let start = Timestamp::now().plus_days(3);
        let unpaid = Reservation::new(
            guest(),
            Subject::room("13").unwrap(),
            DateRange::new(start, start.plus_hours(2)).unwrap(),
            Timestamp::now(),
        );
        let unpaid_id = unpaid.id;
        f.reservations.insert_raw(unpaid).await;

        let err = f.handler.handle(command(unpaid_id)).await.unwrap_err();

        assert!(matches!(err, ReservationError::InvalidArgument { .. }));
        assert!(!f.provider.was_called("process_refund"));
    }

    #[tokio::test]
    async fn already_cancelled_is_rejected_without_refund() {
        let f = fixture(ReservationStatus::Cancelled).await;

        let err = f.handler.handle(command(f.id)).await.unwrap_err();

        assert!(matches!(err, ReservationError::InvalidTransition { .. }));
        assert!(!f.provider.was_called("process_refund"));
    }

    #[tokio::test]
    async fn refund_failure_leaves_reservation_untouched() {
        let f = fixture(ReservationStatus::Confirmed).await;
        f.provider
            .set_method_error("process_refund", PaymentError::not_found("charge"));

        let err = f.handler.handle(command(f.id)).await.unwrap_err();

        assert!(matches!(err, ReservationError::UpstreamFailure(_)));
        let stored = f.reservations.find_by_id(&f.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Confirmed);
        assert_eq!(f.payments.all().await[0].status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn other_user_cannot_refund() {
        let f = fixture(ReservationStatus::Confirmed).await;
        let mut cmd = command(f.id);
        cmd.user_id = UserId::new("intruder").unwrap();

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert_eq!(err, ReservationError::unauthorized(f.id));
    }

    #[tokio::test]
    async fn negative_refund_amount_is_invalid() {
        let f = fixture(ReservationStatus::Confirmed).await;
        let mut cmd = command(f.id);
        cmd.refund_amount = Some(-1);

        let err = f.handler.handle(cmd).await.unwrap_err();

        assert!(matches!(err, ReservationError::InvalidArgument { .. }));
    }
}
