//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresReservationRepository` - reservations and overlap queries
//! - `PostgresPaymentRepository` - payment attempts
//! - `PostgresAvailabilityOverrideRepository` - per-date overrides

mod availability_override_repository;
mod payment_repository;
mod reservation_repository;

pub use availability_override_repository::PostgresAvailabilityOverrideRepository;
pub use payment_repository::PostgresPaymentRepository;
pub use reservation_repository::PostgresReservationRepository;
