//! CreateReservationHandler - Command handler for booking a subject and
//! opening its checkout session.

use std::sync::Arc;

use crate::domain::foundation::{CurrencyCode, DateRange, ReservationId, Timestamp, UserId};
use crate::domain::payment::Payment;
use crate::domain::reservation::{
    BlockingPolicy, Reservation, ReservationError, ReservationStatus, Subject,
};
use crate::ports::{
    AvailabilityOverrideRepository, BookingMetadata, CheckoutSession, CreateCheckoutRequest,
    InsertOutcome, PaymentProvider, PaymentRepository, ReservationRepository,
};

use super::availability::closed_days;

/// Placeholder substituted with the reservation id in checkout URLs.
pub const RESERVATION_ID_PLACEHOLDER: &str = "{reservation_id}";

/// Where the hosted checkout page sends the guest afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutUrls {
    pub success_url: String,
    pub cancel_url: String,
}

impl CheckoutUrls {
    pub fn new(success_url: impl Into<String>, cancel_url: impl Into<String>) -> Self {
        Self {
            success_url: success_url.into(),
            cancel_url: cancel_url.into(),
        }
    }

    /// Both URLs with `{reservation_id}` filled in.
    pub fn for_reservation(&self, id: ReservationId) -> (String, String) {
        let id = id.to_string();
        (
            self.success_url.replace(RESERVATION_ID_PLACEHOLDER, &id),
            self.cancel_url.replace(RESERVATION_ID_PLACEHOLDER, &id),
        )
    }
}

/// Builds the checkout request for one payment attempt.
pub(crate) fn checkout_request(
    reservation: &Reservation,
    amount: i64,
    currency: CurrencyCode,
    urls: &CheckoutUrls,
) -> CreateCheckoutRequest {
    let (success_url, cancel_url) = urls.for_reservation(reservation.id);
    CreateCheckoutRequest {
        amount,
        currency,
        description: format!("Reservation of {}", reservation.subject),
        metadata: BookingMetadata {
            reservation_id: reservation.id,
            user_id: reservation.user_id.clone(),
        },
        success_url,
        cancel_url,
    }
}

/// Command to create a reservation.
#[derive(Debug, Clone)]
pub struct CreateReservationCommand {
    pub user_id: UserId,
    pub subject: Subject,
    pub start_date: Timestamp,
    pub end_date: Timestamp,
    /// Minor units.
    pub amount: i64,
    pub currency: CurrencyCode,
    pub payment_method: String,
}

/// Result of successful reservation creation.
#[derive(Debug, Clone)]
pub struct CreateReservationResult {
    pub reservation: Reservation,
    pub payment: Payment,
    pub checkout: CheckoutSession,
}

/// Handler for creating reservations.
pub struct CreateReservationHandler {
    reservations: Arc<dyn ReservationRepository>,
    payments: Arc<dyn PaymentRepository>,
    provider: Arc<dyn PaymentProvider>,
    overrides: Option<Arc<dyn AvailabilityOverrideRepository>>,
    policy: BlockingPolicy,
    urls: CheckoutUrls,
}

impl CreateReservationHandler {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        payments: Arc<dyn PaymentRepository>,
        provider: Arc<dyn PaymentProvider>,
        policy: BlockingPolicy,
        urls: CheckoutUrls,
    ) -> Self {
        Self {
            reservations,
            payments,
            provider,
            overrides: None,
            policy,
            urls,
        }
    }

    /// Rejects intervals touching a day closed in `overrides`.
    pub fn with_overrides(mut self, overrides: Arc<dyn AvailabilityOverrideRepository>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub async fn handle(
        &self,
        cmd: CreateReservationCommand,
    ) -> Result<CreateReservationResult, ReservationError> {
        let now = Timestamp::now();

        // 1. Validate input before touching the store
        let interval = DateRange::new(cmd.start_date, cmd.end_date)?;
        if cmd.amount <= 0 {
            return Err(ReservationError::invalid_argument(
                "amount",
                "amount must be a positive number of minor units",
            ));
        }

        let closed = closed_days(self.overrides.as_ref(), &cmd.subject, &interval).await?;
        if !closed.is_empty() {
            tracing::info!(
                subject = %cmd.subject,
                blocked_dates = closed.len(),
                "Reservation rejected, dates closed"
            );
            return Err(ReservationError::dates_blocked(closed));
        }

        // 2. Atomic check-then-insert
        let reservation = Reservation::new(cmd.user_id.clone(), cmd.subject, interval, now);
        match self
            .reservations
            .create_if_available(&reservation, self.policy)
            .await?
        {
            InsertOutcome::Inserted => {}
            InsertOutcome::Conflicts(conflicts) => {
                tracing::info!(
                    subject = %reservation.subject,
                    conflicts = conflicts.len(),
                    "Reservation rejected, subject unavailable"
                );
                return Err(ReservationError::unavailable(
                    conflicts.iter().map(|r| r.id).collect(),
                ));
            }
        }

        // 3. Open the checkout session; release the slot if the gateway fails
        let request = checkout_request(&reservation, cmd.amount, cmd.currency.clone(), &self.urls);
        let checkout = match self.provider.create_checkout_session(request).await {
            Ok(session) => session,
            Err(err) => {
                tracing::error!(
                    reservation_id = %reservation.id,
                    error = %err,
                    "Checkout session failed, cancelling reservation"
                );
                if let Err(cancel_err) = self
                    .reservations
                    .update_status(
                        &reservation.id,
                        ReservationStatus::Pending,
                        ReservationStatus::Cancelled,
                    )
                    .await
                {
                    tracing::error!(
                        reservation_id = %reservation.id,
                        error = %cancel_err,
                        "Failed to cancel reservation after checkout failure"
                    );
                }
                return Err(err.into());
            }
        };

        // 4. Record the payment attempt
        let payment = Payment::pending(
            reservation.id,
            cmd.user_id,
            cmd.amount,
            cmd.currency,
            cmd.payment_method,
            now,
        )?
        .with_provider_reference(checkout.id.clone());
        self.payments.save(&payment).await?;

        tracing::info!(
            reservation_id = %reservation.id,
            subject = %reservation.subject,
            checkout_session = %checkout.id,
            "Reservation created"
        );

        Ok(CreateReservationResult {
            reservation,
            payment,
            checkout,
        })
    }
}
