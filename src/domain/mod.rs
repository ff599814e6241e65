//! Domain layer containing business logic and domain types.
//!
//! # Module Organization
//!
//! - `foundation` - Shared domain primitives (value objects, IDs, errors)
//! - `reservation` - Reservation lifecycle, availability and pricing rules
//! - `payment` - Payment attempts and gateway webhook handling

pub mod foundation;
pub mod payment;
pub mod reservation;
