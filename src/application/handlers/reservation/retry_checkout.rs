//! RetryCheckoutHandler - second chance for a reservation whose payment
//! did not go through.

use std::sync::Arc;

use crate::domain::foundation::{ReservationId, Timestamp, UserId};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::domain::reservation::{ReservationError, ReservationStatus};
use crate::ports::{
    CheckoutSession, ConfirmPaymentRequest, IntentStatus, PaymentProvider, PaymentRepository,
    ReservationRepository,
};

use super::create_reservation::{checkout_request, CheckoutUrls};
use super::{ReservationStatusService, TransitionOutcome};

/// Command to retry payment for a reservation.
#[derive(Debug, Clone)]
pub struct RetryCheckoutCommand {
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    pub payment_method_id: Option<String>,
    pub use_new_payment_method: bool,
}

/// What the retry did.
#[derive(Debug, Clone)]
pub enum RetryCheckoutResult {
    /// A fresh hosted checkout page.
    CheckoutCreated {
        checkout: CheckoutSession,
        payment: Payment,
    },
    /// The outstanding intent was confirmed with the given method.
    PaymentConfirmed {
        payment_intent_id: String,
        status: IntentStatus,
        reservation_confirmed: bool,
    },
}

pub struct RetryCheckoutHandler {
    reservations: Arc<dyn ReservationRepository>,
    payments: Arc<dyn PaymentRepository>,
    provider: Arc<dyn PaymentProvider>,
    status_service: ReservationStatusService,
    urls: CheckoutUrls,
}

impl RetryCheckoutHandler {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        payments: Arc<dyn PaymentRepository>,
        provider: Arc<dyn PaymentProvider>,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            status_service: ReservationStatusService::new(reservations.clone()),
            reservations,
            payments,
            provider,
            urls,
        }
    }

    pub async fn handle(
        &self,
        cmd: RetryCheckoutCommand,
    ) -> Result<RetryCheckoutResult, ReservationError> {
        let reservation = self
            .reservations
            .find_by_id(&cmd.reservation_id)
            .await?
            .ok_or(ReservationError::not_found(cmd.reservation_id))?;

        reservation.ensure_owned_by(&cmd.user_id)?;
        // Rejects confirmed, cancelled and completed reservations alike.
        reservation.check_transition(ReservationStatus::Confirmed)?;

        match cmd.payment_method_id {
            Some(method_id) if !cmd.use_new_payment_method => {
                self.confirm_with_method(reservation.id, method_id).await
            }
            _ => {
                let attempts = self
                    .payments
                    .find_by_reservation_id(&reservation.id)
                    .await?;
                let last = attempts.last().ok_or_else(|| {
                    ReservationError::invalid_argument(
                        "reservation_id",
                        "reservation has no payment attempt to retry",
                    )
                })?;

                let request =
                    checkout_request(&reservation, last.amount, last.currency.clone(), &self.urls);
                let checkout = self.provider.create_checkout_session(request).await?;

                let payment = Payment::pending(
                    reservation.id,
                    reservation.user_id.clone(),
                    last.amount,
                    last.currency.clone(),
                    last.method.clone(),
                    Timestamp::now(),
                )?
                .with_provider_reference(checkout.id.clone());
                self.payments.save(&payment).await?;

                tracing::info!(
                    reservation_id = %reservation.id,
                    checkout_session = %checkout.id,
                    attempt = attempts.len() + 1,
                    "Checkout retried"
                );

                Ok(RetryCheckoutResult::CheckoutCreated { checkout, payment })
            }
        }
    }

    async fn confirm_with_method(
        &self,
        reservation_id: ReservationId,
        payment_method_id: String,
    ) -> Result<RetryCheckoutResult, ReservationError> {
        let confirmation = self
            .provider
            .confirm_payment(ConfirmPaymentRequest {
                reservation_id,
                payment_method_id,
            })
            .await?;

        let mut reservation_confirmed = false;
        if confirmation.status == IntentStatus::Succeeded {
            let outcome = self
                .status_service
                .confirm_for_successful_payment(reservation_id)
                .await?;
            reservation_confirmed = matches!(outcome, TransitionOutcome::Applied(_));

            self.payments
                .transition_for_reservation(&reservation_id, PaymentStatus::Pending, PaymentStatus::Paid)
                .await?;
        }

        tracing::info!(
            reservation_id = %reservation_id,
            payment_intent = %confirmation.id,
            status = ?confirmation.status,
            reservation_confirmed,
            "Payment confirmation retried"
        );

        Ok(RetryCheckoutResult::PaymentConfirmed {
            payment_intent_id: confirmation.id,
            status: confirmation.status,
            reservation_confirmed,
        })
    }
}
