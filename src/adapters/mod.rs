//! Adapters - Implementations of port interfaces.
//!
//! - `http` - axum REST API
//! - `memory` - in-memory repositories for tests and local runs
//! - `postgres` - sqlx repositories
//! - `stripe` - Stripe payment gateway and its test double

pub mod http;
pub mod memory;
pub mod postgres;
pub mod stripe;
