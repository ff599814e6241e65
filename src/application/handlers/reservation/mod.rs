//! Reservation command and query handlers.

mod availability;
mod availability_overrides;
mod cancel_reservation;
mod cancel_with_refund;
mod create_reservation;
mod extension_pricing;
mod get_reservation;
mod list_reservations;
mod occupancy_stats;
mod reschedule_reservation;
mod retry_checkout;
mod status_service;

pub use availability::{AvailabilityService, CheckAvailabilityQuery, SuggestExtensionsQuery};
pub use availability_overrides::{
    AvailabilityOverrideService, ListAvailabilityQuery, SetAvailabilityCommand,
};
pub use cancel_reservation::{CancelReservationCommand, CancelReservationHandler};
pub use cancel_with_refund::{
    CancelWithRefundCommand, CancelWithRefundHandler, CancelWithRefundResult,
};
pub use create_reservation::{
    CheckoutUrls, CreateReservationCommand, CreateReservationHandler, CreateReservationResult,
    RESERVATION_ID_PLACEHOLDER,
};
pub use extension_pricing::{ExtensionCostQuery, ExtensionPricingService, ValidateExtensionQuery};
pub use get_reservation::{GetReservationHandler, GetReservationQuery};
pub use list_reservations::{
    ListReservationsHandler, ListReservationsQuery, ReservationList, MAX_PAGE_SIZE,
};
pub use occupancy_stats::{OccupancyStatsHandler, OccupancyStatsQuery};
pub use reschedule_reservation::{RescheduleReservationCommand, RescheduleReservationHandler};
pub use retry_checkout::{RetryCheckoutCommand, RetryCheckoutHandler, RetryCheckoutResult};
pub use status_service::{Actor, ReservationStatusService, SkipReason, TransitionOutcome};
