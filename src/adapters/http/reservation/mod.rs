//! HTTP adapter for the reservation API.
//!
//! - `dto` - Request/response bodies
//! - `handlers` - Axum handlers, shared state and error mapping
//! - `routes` - Router assembly

mod dto;
mod handlers;
mod routes;

pub use dto::ErrorResponse;
pub use handlers::{AuthenticatedUser, BookingSettings, ReservationApiError, ReservationAppState};
pub use routes::{api_router, reservation_routes, stats_routes, subject_routes, webhook_routes};
