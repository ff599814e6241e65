//! Reservation repository port.
//!
//! Persistence contract for reservations plus the overlap queries the
//! availability engine relies on.

use async_trait::async_trait;

use crate::domain::foundation::{DateRange, DomainError, ReservationId, UserId};
use crate::domain::reservation::{BlockingPolicy, Reservation, ReservationStatus, Subject};

/// Result of an atomic check-then-insert.
#[derive(Debug, Clone, PartialEq)]
pub enum InsertOutcome {
    Inserted,
    /// Nothing was written; these reservations hold the slot.
    Conflicts(Vec<Reservation>),
}

/// One page of a user's reservations.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationPage {
    pub items: Vec<Reservation>,
    pub total: u64,
}

/// Repository port for Reservation persistence.
#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Inserts without any availability check.
    async fn create(&self, reservation: &Reservation) -> Result<(), DomainError>;

    /// Inserts only if no blocking reservation overlaps, as one atomic unit.
    ///
    /// Implementations must not allow two concurrent calls for overlapping
    /// intervals on the same subject to both succeed.
    async fn create_if_available(
        &self,
        reservation: &Reservation,
        policy: BlockingPolicy,
    ) -> Result<InsertOutcome, DomainError>;

    /// Moves a `pending` or `confirmed` reservation to `interval`.
    ///
    /// Only the dates and `updated_at` are written; the stored status is
    /// left as it is. Returns `None` when the reservation does not exist or
    /// is no longer modifiable. An interval that would overlap another
    /// confirmed reservation fails with `ErrorCode::SubjectUnavailable`.
    async fn update(
        &self,
        id: &ReservationId,
        interval: &DateRange,
    ) -> Result<Option<Reservation>, DomainError>;

    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, DomainError>;

    /// Compare-and-set of the status: writes `to` only while the stored
    /// status is still `from`, and bumps `updated_at`.
    ///
    /// Returns `None` when the reservation does not exist or its status is
    /// no longer `from`; callers re-read to tell the two apart. A write
    /// that would break the no-overlapping-confirmed invariant fails with
    /// `ErrorCode::SubjectUnavailable`.
    async fn update_status(
        &self,
        id: &ReservationId,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<Option<Reservation>, DomainError>;

    /// Newest first. `page` is 1-based.
    async fn find_by_user_id(
        &self,
        user_id: &UserId,
        page: u32,
        limit: u32,
    ) -> Result<ReservationPage, DomainError>;

    /// Blocking reservations overlapping `interval` on `subject`.
    async fn check_availability(
        &self,
        subject: &Subject,
        interval: &DateRange,
        policy: BlockingPolicy,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<Reservation>, DomainError>;

    /// Every reservation on `subject` overlapping `interval`, any status.
    async fn find_by_subject_and_range(
        &self,
        subject: &Subject,
        interval: &DateRange,
    ) -> Result<Vec<Reservation>, DomainError>;
}
