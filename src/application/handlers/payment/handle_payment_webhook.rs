//! HandlePaymentWebhookHandler - Command handler for reconciling gateway
//! webhooks with reservation state.

use std::sync::Arc;

use crate::domain::foundation::ReservationId;
use crate::domain::payment::{PaymentStatus, WebhookEvent};
use crate::domain::reservation::ReservationError;
use crate::ports::{PaymentProvider, PaymentRepository, ReservationRepository};

use crate::application::handlers::reservation::{
    ReservationStatusService, SkipReason, TransitionOutcome,
};

/// Command to handle a payment webhook.
#[derive(Debug, Clone)]
pub struct HandlePaymentWebhookCommand {
    /// Raw webhook payload.
    pub payload: Vec<u8>,
    /// Webhook signature header.
    pub signature: String,
}

/// Result of webhook processing.
///
/// Every variant is acknowledged to the gateway; only errors trigger a
/// redelivery.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlePaymentWebhookResult {
    /// Payment succeeded, reservation confirmed.
    Confirmed { reservation_id: ReservationId },
    /// Payment failed, reservation cancelled.
    Cancelled { reservation_id: ReservationId },
    /// Reservation missing or already settled; nothing changed.
    Skipped {
        reservation_id: ReservationId,
        reason: SkipReason,
    },
    /// Payment succeeded but the slot is held by another confirmed
    /// reservation. Needs a refund by an operator.
    ConfirmationRejected {
        reservation_id: ReservationId,
        conflicts: Vec<ReservationId>,
    },
    /// Intermediate event with no booking effect.
    Acknowledged,
    /// Event without usable booking metadata.
    MissingMetadata { event_type: String },
    /// Event type we do not act on.
    Ignored { event_type: String },
}

/// Handler for processing payment provider webhooks.
pub struct HandlePaymentWebhookHandler {
    status_service: ReservationStatusService,
    payments: Arc<dyn PaymentRepository>,
    payment_provider: Arc<dyn PaymentProvider>,
}

impl HandlePaymentWebhookHandler {
    pub fn new(
        reservations: Arc<dyn ReservationRepository>,
        payments: Arc<dyn PaymentRepository>,
        payment_provider: Arc<dyn PaymentProvider>,
    ) -> Self {
        Self {
            status_service: ReservationStatusService::new(reservations),
            payments,
            payment_provider,
        }
    }

    pub async fn handle(
        &self,
        cmd: HandlePaymentWebhookCommand,
    ) -> Result<HandlePaymentWebhookResult, ReservationError> {
        // 1. Verify webhook signature and parse event
        let event = self
            .payment_provider
            .verify_webhook(&cmd.payload, &cmd.signature)
            .await
            .map_err(|e| {
                tracing::warn!(error = %e, "Webhook verification failed");
                ReservationError::webhook_rejected(e.to_string())
            })?;

        tracing::info!(
            event_id = %event.id,
            event_type = event.kind.as_str(),
            "Webhook received"
        );

        // 2. Unknown types are acknowledged so the gateway stops retrying
        if !event.kind.is_handled() {
            tracing::info!(event_type = event.kind.as_str(), "Unhandled webhook event type");
            return Ok(HandlePaymentWebhookResult::Ignored {
                event_type: event.kind.as_str().to_string(),
            });
        }

        if !event.kind.carries_metadata() {
            return Ok(HandlePaymentWebhookResult::Acknowledged);
        }

        // 3. Recover the booking references
        let metadata = match event.metadata() {
            Ok(metadata) => metadata,
            Err(err) => {
                tracing::warn!(
                    event_id = %event.id,
                    event_type = event.kind.as_str(),
                    error = %err,
                    "Webhook without booking metadata"
                );
                return Ok(HandlePaymentWebhookResult::MissingMetadata {
                    event_type: event.kind.as_str().to_string(),
                });
            }
        };

        // 4. Drive the reservation and mirror the payment status
        match event.classify() {
            PaymentStatus::Paid => self.handle_paid(&event, metadata.reservation_id).await,
            PaymentStatus::Failed => self.handle_failed(&event, metadata.reservation_id).await,
            _ => Ok(HandlePaymentWebhookResult::Acknowledged),
        }
    }

    async fn handle_paid(
        &self,
        event: &WebhookEvent,
        reservation_id: ReservationId,
    ) -> Result<HandlePaymentWebhookResult, ReservationError> {
        let result = match self
            .status_service
            .confirm_for_successful_payment(reservation_id)
            .await
        {
            Ok(TransitionOutcome::Applied(_)) => {
                HandlePaymentWebhookResult::Confirmed { reservation_id }
            }
            Ok(TransitionOutcome::Skipped(reason)) => HandlePaymentWebhookResult::Skipped {
                reservation_id,
                reason,
            },
            Err(ReservationError::Unavailable { conflicts, .. }) => {
                tracing::error!(
                    event_id = %event.id,
                    reservation_id = %reservation_id,
                    conflicts = ?conflicts,
                    "Paid reservation overlaps a confirmed one, refund required"
                );
                HandlePaymentWebhookResult::ConfirmationRejected {
                    reservation_id,
                    conflicts,
                }
            }
            Err(err) => return Err(err),
        };

        // The money arrived whatever happened to the reservation.
        self.mirror_payment(reservation_id, PaymentStatus::Pending, PaymentStatus::Paid)
            .await?;

        Ok(result)
    }

    async fn handle_failed(
        &self,
        event: &WebhookEvent,
        reservation_id: ReservationId,
    ) -> Result<HandlePaymentWebhookResult, ReservationError> {
        let result = match self
            .status_service
            .cancel_for_failed_payment(reservation_id)
            .await?
        {
            TransitionOutcome::Applied(_) => {
                HandlePaymentWebhookResult::Cancelled { reservation_id }
            }
            TransitionOutcome::Skipped(reason) => HandlePaymentWebhookResult::Skipped {
                reservation_id,
                reason,
            },
        };

        tracing::info!(
            event_id = %event.id,
            reservation_id = %reservation_id,
            event_type = event.kind.as_str(),
            "Payment failure processed"
        );

        self.mirror_payment(reservation_id, PaymentStatus::Pending, PaymentStatus::Failed)
            .await?;

        Ok(result)
    }

    async fn mirror_payment(
        &self,
        reservation_id: ReservationId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<(), ReservationError> {
        let changed = self
            .payments
            .transition_for_reservation(&reservation_id, from, to)
            .await?;
        tracing::debug!(
            reservation_id = %reservation_id,
            from = %from,
            to = %to,
            changed,
            "Payment attempts updated"
        );
        Ok(())
    }
}
