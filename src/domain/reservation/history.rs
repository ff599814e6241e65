//! Reservation timeline reconstructed from the aggregate's own timestamps.
//!
//! No audit log is kept, so the timeline has at most two entries: the
//! creation and the latest change.

use serde::Serialize;

use crate::domain::foundation::{Timestamp, UserId};

use super::{Reservation, ReservationStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryAction {
    ReservationCreated,
    StatusChanged,
    /// Dates moved while the status stayed `pending`.
    ReservationUpdated,
}

impl HistoryAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            HistoryAction::ReservationCreated => "reservation_created",
            HistoryAction::StatusChanged => "status_changed",
            HistoryAction::ReservationUpdated => "reservation_updated",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoryEntry {
    pub timestamp: Timestamp,
    pub action: HistoryAction,
    pub old_value: Option<ReservationStatus>,
    pub new_value: ReservationStatus,
    pub user_id: UserId,
}

/// Oldest entry first.
pub fn timeline(reservation: &Reservation) -> Vec<HistoryEntry> {
    let mut entries = vec![HistoryEntry {
        timestamp: reservation.created_at,
        action: HistoryAction::ReservationCreated,
        old_value: None,
        new_value: ReservationStatus::Pending,
        user_id: reservation.user_id.clone(),
    }];

    if reservation.status != ReservationStatus::Pending {
        entries.push(HistoryEntry {
            timestamp: reservation.updated_at,
            action: HistoryAction::StatusChanged,
            old_value: Some(ReservationStatus::Pending),
            new_value: reservation.status,
            user_id: reservation.user_id.clone(),
        });
    } else if reservation.updated_at != reservation.created_at {
        entries.push(HistoryEntry {
            timestamp: reservation.updated_at,
            action: HistoryAction::ReservationUpdated,
            old_value: Some(ReservationStatus::Pending),
            new_value: ReservationStatus::Pending,
            user_id: reservation.user_id.clone(),
        });
    }

    entries
}
