//! Application handlers.
//!
//! Command and query handlers that orchestrate domain operations.

pub mod payment;
pub mod reservation;

pub use payment::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler, HandlePaymentWebhookResult,
};
pub use reservation::{
    Actor, AvailabilityService, CancelReservationCommand, CancelReservationHandler,
    CancelWithRefundCommand, CancelWithRefundHandler, CancelWithRefundResult,
    CheckAvailabilityQuery, CheckoutUrls, CreateReservationCommand, CreateReservationHandler,
    CreateReservationResult, ExtensionCostQuery, ExtensionPricingService, GetReservationHandler,
    GetReservationQuery, ListReservationsHandler, ListReservationsQuery, OccupancyStatsHandler,
    OccupancyStatsQuery, RescheduleReservationCommand, RescheduleReservationHandler,
    ReservationList, ReservationStatusService, RetryCheckoutCommand, RetryCheckoutHandler,
    RetryCheckoutResult, SkipReason, SuggestExtensionsQuery, TransitionOutcome,
    ValidateExtensionQuery,
};
