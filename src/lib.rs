//! Hotel Booking - reservation lifecycle and availability engine.
//!
//! Rooms and other bookable resources are reserved for time intervals,
//! paid for through a hosted checkout, and confirmed or cancelled by the
//! payment gateway's webhooks.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;
pub mod ports;
