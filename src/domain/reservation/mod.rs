//! Reservation domain module.
//!
//! Handles the reservation lifecycle, availability rules, extension pricing
//! and occupancy statistics.
//!
//! # Module Structure
//!
//! - `aggregate` - Reservation aggregate entity
//! - `status` - ReservationStatus state machine
//! - `subject` - Rooms and resources being reserved
//! - `availability` - Overlap and blocking rules
//! - `availability_override` - Per-date open/closed overrides
//! - `extension` - Extension pricing and validation
//! - `history` - Timeline derived from the aggregate's timestamps
//! - `occupancy` - Period windows and occupancy figures

mod aggregate;
mod availability;
mod availability_override;
mod errors;
mod extension;
mod history;
mod occupancy;
mod status;
mod subject;

pub use aggregate::Reservation;
pub use availability::{find_conflicts, AvailabilityReport, BlockingPolicy};
pub use availability_override::{blocked_dates, days_touched, AvailabilityOverride};
pub use errors::ReservationError;
pub use extension::{
    delta_window, extension_cost, suggestion_candidates, ExtensionPolicy, ExtensionQuote,
    MAX_EXTENSION_STEPS,
};
pub use history::{timeline, HistoryAction, HistoryEntry};
pub use occupancy::{period_window, OccupancyStats, StatsPeriod};
pub use status::ReservationStatus;
pub use subject::{Subject, SubjectKind};
