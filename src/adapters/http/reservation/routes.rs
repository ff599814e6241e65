//! Axum router configuration for reservation endpoints.

use axum::{
    routing::{get, post, put},
    Router,
};

use super::handlers::{
    cancel_reservation, cancel_with_refund, check_availability, create_reservation,
    get_availability_override, get_extension_cost, get_extension_suggestions,
    get_occupancy_stats, get_reservation, get_reservation_history, handle_stripe_webhook, health,
    list_availability_overrides, list_reservations, reschedule_reservation, retry_checkout,
    set_availability_override, update_reservation_status, ReservationAppState,
};

/// Reservation routes, mounted at `/api/reservations`.
///
/// All require the `X-User-Id` header.
pub fn reservation_routes() -> Router<ReservationAppState> {
    Router::new()
        .route("/", get(list_reservations).post(create_reservation))
        .route("/:id", get(get_reservation).put(reschedule_reservation))
        .route("/:id/status", put(update_reservation_status))
        .route("/:id/history", get(get_reservation_history))
        .route("/:id/cancel", put(cancel_reservation))
        .route("/:id/extension-cost", get(get_extension_cost))
        .route("/:id/extension-suggestions", get(get_extension_suggestions))
        .route("/:id/cancel-with-refund", post(cancel_with_refund))
        .route("/:id/retry-checkout", post(retry_checkout))
}

/// Subject-level queries and per-date overrides, mounted at `/api/subjects`.
pub fn subject_routes() -> Router<ReservationAppState> {
    Router::new()
        .route("/check-availability", post(check_availability))
        .route(
            "/:kind/:subject_id/availability",
            get(list_availability_overrides),
        )
        .route(
            "/:kind/:subject_id/availability/:date",
            get(get_availability_override).put(set_availability_override),
        )
}

/// Reporting, mounted at `/api/stats`.
pub fn stats_routes() -> Router<ReservationAppState> {
    Router::new().route("/occupancy/:kind/:subject_id", get(get_occupancy_stats))
}

/// Gateway callbacks, mounted at `/api/webhooks`.
///
/// No user header; requests are authenticated by signature.
pub fn webhook_routes() -> Router<ReservationAppState> {
    Router::new().route("/stripe", post(handle_stripe_webhook))
}

/// The complete API router.
pub fn api_router() -> Router<ReservationAppState> {
    Router::new()
        .route("/health", get(health))
        .nest("/api/reservations", reservation_routes())
        .nest("/api/subjects", subject_routes())
        .nest("/api/stats", stats_routes())
        .nest("/api/webhooks", webhook_routes())
}
