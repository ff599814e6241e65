//! Application layer - Commands, Queries, and Handlers.
//!
//! This layer orchestrates domain operations and coordinates between ports.
//! Command handlers (write) and query handlers (read) take their ports as
//! `Arc<dyn Port>` at construction.

pub mod handlers;

pub use handlers::*;
