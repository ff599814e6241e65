//! HTTP adapters - REST API implementations.

pub mod reservation;

pub use reservation::{api_router, BookingSettings, ReservationAppState};
