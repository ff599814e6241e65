//! In-memory implementations of the persistence ports.

mod availability_override_repository;
mod payment_repository;
mod reservation_repository;

pub use availability_override_repository::InMemoryAvailabilityOverrideRepository;
pub use payment_repository::InMemoryPaymentRepository;
pub use reservation_repository::InMemoryReservationRepository;
