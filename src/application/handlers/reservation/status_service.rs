//! ReservationStatusService - the single path through which reservation
//! status changes are applied.
//!
//! User requests and payment reconciliation both funnel through here so the
//! state machine and the no-overlapping-confirmed rule are enforced once.

use std::sync::Arc;

use crate::domain::foundation::{ReservationId, UserId};
use crate::domain::reservation::{
    BlockingPolicy, Reservation, ReservationError, ReservationStatus,
};
use crate::ports::ReservationRepository;

/// Who is asking for a status change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Actor {
    /// An API caller; must own the reservation.
    User(UserId),
    /// Payment reconciliation and other internal flows.
    System,
}

/// Why a reconciliation transition was not applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotFound,
    /// The reservation already left `pending`.
    NotPending(ReservationStatus),
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::NotFound => f.write_str("reservation not found"),
            SkipReason::NotPending(status) => write!(f, "reservation already {}", status),
        }
    }
}

/// Outcome of an idempotent reconciliation transition.
#[derive(Debug, Clone, PartialEq)]
pub enum TransitionOutcome {
    Applied(Reservation),
    Skipped(SkipReason),
}

impl TransitionOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, TransitionOutcome::Applied(_))
    }
}

/// Applies validated status transitions.
#[derive(Clone)]
pub struct ReservationStatusService {
    repository: Arc<dyn ReservationRepository>,
}

impl ReservationStatusService {
    pub fn new(repository: Arc<dyn ReservationRepository>) -> Self {
        Self { repository }
    }

    /// Moves a reservation to `target`.
    ///
    /// Confirming re-checks the interval against other confirmed
    /// reservations; the store enforces the same rule on write. If another
    /// writer changes the status between the read and the write, the
    /// transition is refused against the status that won.
    pub async fn update_status(
        &self,
        reservation_id: ReservationId,
        target: ReservationStatus,
        actor: Actor,
    ) -> Result<Reservation, ReservationError> {
        let reservation = self
            .repository
            .find_by_id(&reservation_id)
            .await?
            .ok_or(ReservationError::not_found(reservation_id))?;

        if let Actor::User(user_id) = &actor {
            reservation.ensure_owned_by(user_id)?;
        }

        match self.apply(&reservation, target, &actor).await? {
            Some(updated) => Ok(updated),
            None => match self.current_status(reservation_id).await? {
                Some(current) => Err(ReservationError::invalid_transition(current, target)),
                None => Err(ReservationError::not_found(reservation_id)),
            },
        }
    }

    /// `pending -> confirmed` after the gateway reports success.
    ///
    /// Replays and late deliveries are skipped, not errors. A slot taken by
    /// another confirmed reservation surfaces as `Unavailable`.
    pub async fn confirm_for_successful_payment(
        &self,
        reservation_id: ReservationId,
    ) -> Result<TransitionOutcome, ReservationError> {
        self.reconcile(reservation_id, ReservationStatus::Confirmed)
            .await
    }

    /// `pending -> cancelled` after the gateway reports failure.
    pub async fn cancel_for_failed_payment(
        &self,
        reservation_id: ReservationId,
    ) -> Result<TransitionOutcome, ReservationError> {
        self.reconcile(reservation_id, ReservationStatus::Cancelled)
            .await
    }

    async fn reconcile(
        &self,
        reservation_id: ReservationId,
        target: ReservationStatus,
    ) -> Result<TransitionOutcome, ReservationError> {
        let Some(reservation) = self.repository.find_by_id(&reservation_id).await? else {
            tracing::warn!(
                reservation_id = %reservation_id,
                target = %target,
                "Payment event for unknown reservation"
            );
            return Ok(TransitionOutcome::Skipped(SkipReason::NotFound));
        };

        if reservation.status != ReservationStatus::Pending {
            tracing::info!(
                reservation_id = %reservation_id,
                status = %reservation.status,
                target = %target,
                "Reservation already settled, skipping"
            );
            return Ok(TransitionOutcome::Skipped(SkipReason::NotPending(
                reservation.status,
            )));
        }

        match self.apply(&reservation, target, &Actor::System).await? {
            Some(updated) => Ok(TransitionOutcome::Applied(updated)),
            None => {
                let reason = match self.current_status(reservation_id).await? {
                    Some(current) => SkipReason::NotPending(current),
                    None => SkipReason::NotFound,
                };
                tracing::info!(
                    reservation_id = %reservation_id,
                    target = %target,
                    reason = %reason,
                    "Reservation settled concurrently, skipping"
                );
                Ok(TransitionOutcome::Skipped(reason))
            }
        }
    }

    /// Validates and writes one transition from the status in `reservation`.
    ///
    /// `None` means the stored status no longer matches that snapshot.
    async fn apply(
        &self,
        reservation: &Reservation,
        target: ReservationStatus,
        actor: &Actor,
    ) -> Result<Option<Reservation>, ReservationError> {
        reservation.check_transition(target)?;

        if target == ReservationStatus::Confirmed {
            let conflicts = self
                .repository
                .check_availability(
                    &reservation.subject,
                    &reservation.interval,
                    BlockingPolicy::ConfirmedOnly,
                    Some(reservation.id),
                )
                .await?;
            if !conflicts.is_empty() {
                return Err(ReservationError::unavailable(
                    conflicts.iter().map(|r| r.id).collect(),
                ));
            }
        }

        let updated = self
            .repository
            .update_status(&reservation.id, reservation.status, target)
            .await?;

        if updated.is_some() {
            tracing::info!(
                reservation_id = %reservation.id,
                from = %reservation.status,
                to = %target,
                actor = ?actor,
                "Reservation status changed"
            );
        }

        Ok(updated)
    }

    async fn current_status(
        &self,
        reservation_id: ReservationId,
    ) -> Result<Option<ReservationStatus>, ReservationError> {
        Ok(self
            .repository
            .find_by_id(&reservation_id)
            .await?
            .map(|r| r.status))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryReservationRepository;
    use crate::domain::foundation::{DateRange, DomainError, Timestamp};
    use crate::domain::reservation::Subject;
    use crate::ports::{InsertOutcome, ReservationPage};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn guest() -> UserId {
        UserId::new("guest-1").unwrap()
    }

    fn reservation_at(start_hours: i64, end_hours: i64, status: ReservationStatus) -> Reservation {
        let base = Timestamp::now().plus_days(2);
        let mut r = Reservation::new(
            guest(),
            Subject::room("101").unwrap(),
            DateRange::new(base.plus_hours(start_hours), base.plus_hours(end_hours)).unwrap(),
            Timestamp::now(),
        );
        r.status = status;
        r
    }

    async fn setup(reservations: Vec<Reservation>) -> (ReservationStatusService, InMemoryReservationRepository) {
        let repo = InMemoryReservationRepository::new();
        for r in reservations {
            repo.insert_raw(r).await;
        }
        (ReservationStatusService::new(Arc::new(repo.clone())), repo)
    }

    #[tokio::test]
    async fn owner_can_cancel_pending_reservation() {
        let r = reservation_at(0, 2, ReservationStatus::Pending);
        let id = r.id;
        let (service, _) = setup(vec![r]).await;

        let updated = service
            .update_status(id, ReservationStatus::Cancelled, Actor::User(guest()))
            .await
            .unwrap();

        assert_eq!(updated.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn non_owner_is_rejected() {
        let r = reservation_at(0, 2, ReservationStatus::Pending);
        let id = r.id;
        let (service, _) = setup(vec![r]).await;

        let err = service
            .update_status(
                id,
                ReservationStatus::Cancelled,
                Actor::User(UserId::new("someone-else").unwrap()),
            )
            .await
            .unwrap_err();

        assert_eq!(err, ReservationError::unauthorized(id));
    }

    #[tokio::test]
    async fn cancelled_reservation_cannot_be_confirmed() {
        let r = reservation_at(0, 2, ReservationStatus::Cancelled);
        let id = r.id;
        let (service, _) = setup(vec![r]).await;

        let err = service
            .update_status(id, ReservationStatus::Confirmed, Actor::System)
            .await
            .unwrap_err();

        assert_eq!(
            err,
            ReservationError::invalid_transition(
                ReservationStatus::Cancelled,
                ReservationStatus::Confirmed
            )
        );
    }

    #[tokio::test]
    async fn unknown_reservation_is_not_found() {
        let (service, _) = setup(vec![]).await;
        let id = ReservationId::new();

        let err = service
            .update_status(id, ReservationStatus::Cancelled, Actor::System)
            .await
            .unwrap_err();

        assert_eq!(err, ReservationError::not_found(id));
    }

    #[tokio::test]
    async fn confirming_into_a_confirmed_slot_is_unavailable() {
        let confirmed = reservation_at(0, 4, ReservationStatus::Confirmed);
        let confirmed_id = confirmed.id;
        let pending = reservation_at(2, 6, ReservationStatus::Pending);
        let pending_id = pending.id;
        let (service, repo) = setup(vec![confirmed, pending]).await;

        let err = service
            .update_status(pending_id, ReservationStatus::Confirmed, Actor::System)
            .await
            .unwrap_err();

        assert_eq!(err, ReservationError::unavailable(vec![confirmed_id]));
        let still = repo.find_by_id(&pending_id).await.unwrap().unwrap();
        assert_eq!(still.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn confirm_for_payment_is_idempotent() {
        let r = reservation_at(0, 2, ReservationStatus::Pending);
        let id = r.id;
        let (service, _) = setup(vec![r]).await;

        let first = service.confirm_for_successful_payment(id).await.unwrap();
        let second = service.confirm_for_successful_payment(id).await.unwrap();

        assert!(first.is_applied());
        assert_eq!(
            second,
            TransitionOutcome::Skipped(SkipReason::NotPending(ReservationStatus::Confirmed))
        );
    }

    #[tokio::test]
    async fn failed_payment_does_not_touch_confirmed_reservation() {
        let r = reservation_at(0, 2, ReservationStatus::Confirmed);
        let id = r.id;
        let (service, repo) = setup(vec![r]).await;

        let outcome = service.cancel_for_failed_payment(id).await.unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Skipped(SkipReason::NotPending(ReservationStatus::Confirmed))
        );
        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn reconciling_unknown_reservation_is_skipped() {
        let (service, _) = setup(vec![]).await;

        let outcome = service
            .cancel_for_failed_payment(ReservationId::new())
            .await
            .unwrap();

        assert_eq!(outcome, TransitionOutcome::Skipped(SkipReason::NotFound));
    }

    struct FailingRepository;

    #[async_trait]
    impl ReservationRepository for FailingRepository {
        async fn create(&self, _: &Reservation) -> Result<(), DomainError> {
            Err(DomainError::database("down"))
        }
        async fn create_if_available(
            &self,
            _: &Reservation,
            _: BlockingPolicy,
        ) -> Result<InsertOutcome, DomainError> {
            Err(DomainError::database("down"))
        }
        async fn update(
            &self,
            _: &ReservationId,
            _: &DateRange,
        ) -> Result<Option<Reservation>, DomainError> {
            Err(DomainError::database("down"))
        }
        async fn find_by_id(&self, _: &ReservationId) -> Result<Option<Reservation>, DomainError> {
            Err(DomainError::database("down"))
        }
        async fn update_status(
            &self,
            _: &ReservationId,
            _: ReservationStatus,
            _: ReservationStatus,
        ) -> Result<Option<Reservation>, DomainError> {
            Err(DomainError::database("down"))
        }
        async fn find_by_user_id(
            &self,
            _: &UserId,
            _: u32,
            _: u32,
        ) -> Result<ReservationPage, DomainError> {
            Err(DomainError::database("down"))
        }
        async fn check_availability(
            &self,
            _: &Subject,
            _: &DateRange,
            _: BlockingPolicy,
            _: Option<ReservationId>,
        ) -> Result<Vec<Reservation>, DomainError> {
            Err(DomainError::database("down"))
        }
        async fn find_by_subject_and_range(
            &self,
            _: &Subject,
            _: &DateRange,
        ) -> Result<Vec<Reservation>, DomainError> {
            Err(DomainError::database("down"))
        }
    }

    #[tokio::test]
    async fn store_failure_propagates_from_reconciliation() {
        let service = ReservationStatusService::new(Arc::new(FailingRepository));

        let err = service
            .confirm_for_successful_payment(ReservationId::new())
            .await
            .unwrap_err();

        assert!(matches!(err, ReservationError::Infrastructure(_)));
    }

    /// Serves a fixed snapshot for the first `stale_reads` lookups, as if
    /// every caller read before any of them wrote.
    struct StaleReads {
        inner: InMemoryReservationRepository,
        snapshot: Reservation,
        stale_reads: usize,
        reads: AtomicUsize,
    }

    #[async_trait]
    impl ReservationRepository for StaleReads {
        async fn create(&self, r: &Reservation) -> Result<(), DomainError> {
            self.inner.create(r).await
        }
        async fn create_if_available(
            &self,
            r: &Reservation,
            policy: BlockingPolicy,
        ) -> Result<InsertOutcome, DomainError> {
            self.inner.create_if_available(r, policy).await
        }
        async fn update(
            &self,
            id: &ReservationId,
            interval: &DateRange,
        ) -> Result<Option<Reservation>, DomainError> {
            self.inner.update(id, interval).await
        }
        async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, DomainError> {
            if self.reads.fetch_add(1, Ordering::SeqCst) < self.stale_reads {
                return Ok(Some(self.snapshot.clone()));
            }
            self.inner.find_by_id(id).await
        }
        async fn update_status(
            &self,
            id: &ReservationId,
            from: ReservationStatus,
            to: ReservationStatus,
        ) -> Result<Option<Reservation>, DomainError> {
            self.inner.update_status(id, from, to).await
        }
        async fn find_by_user_id(
            &self,
            user_id: &UserId,
            limit: u32,
            offset: u32,
        ) -> Result<ReservationPage, DomainError> {
            self.inner.find_by_user_id(user_id, limit, offset).await
        }
        async fn check_availability(
            &self,
            subject: &Subject,
            interval: &DateRange,
            policy: BlockingPolicy,
            exclude: Option<ReservationId>,
        ) -> Result<Vec<Reservation>, DomainError> {
            self.inner
                .check_availability(subject, interval, policy, exclude)
                .await
        }
        async fn find_by_subject_and_range(
            &self,
            subject: &Subject,
            interval: &DateRange,
        ) -> Result<Vec<Reservation>, DomainError> {
            self.inner.find_by_subject_and_range(subject, interval).await
        }
    }

    #[tokio::test]
    async fn cancel_and_confirm_from_the_same_snapshot_apply_once() {
        let r = reservation_at(0, 2, ReservationStatus::Pending);
        let id = r.id;
        let repo = InMemoryReservationRepository::new();
        repo.insert_raw(r.clone()).await;
        let service = ReservationStatusService::new(Arc::new(StaleReads {
            inner: repo.clone(),
            snapshot: r,
            stale_reads: 2,
            reads: AtomicUsize::new(0),
        }));

        let (cancelled, confirmed) = tokio::join!(
            service.update_status(id, ReservationStatus::Cancelled, Actor::User(guest())),
            service.confirm_for_successful_payment(id)
        );

        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        let confirmed = confirmed.unwrap();
        match cancelled {
            Ok(updated) => {
                assert_eq!(updated.status, ReservationStatus::Cancelled);
                assert_eq!(stored.status, ReservationStatus::Cancelled);
                assert_eq!(
                    confirmed,
                    TransitionOutcome::Skipped(SkipReason::NotPending(ReservationStatus::Cancelled))
                );
            }
            Err(err) => {
                assert_eq!(
                    err,
                    ReservationError::invalid_transition(
                        ReservationStatus::Confirmed,
                        ReservationStatus::Cancelled
                    )
                );
                assert_eq!(stored.status, ReservationStatus::Confirmed);
                assert!(confirmed.is_applied());
            }
        }
    }

    #[tokio::test]
    async fn lost_race_reports_the_status_that_won() {
        let r = reservation_at(0, 2, ReservationStatus::Pending);
        let id = r.id;
        let repo = InMemoryReservationRepository::new();
        let mut settled = r.clone();
        settled.status = ReservationStatus::Confirmed;
        repo.insert_raw(settled).await;
        let service = ReservationStatusService::new(Arc::new(StaleReads {
            inner: repo.clone(),
            snapshot: r,
            stale_reads: 1,
            reads: AtomicUsize::new(0),
        }));

        let outcome = service.cancel_for_failed_payment(id).await.unwrap();

        assert_eq!(
            outcome,
            TransitionOutcome::Skipped(SkipReason::NotPending(ReservationStatus::Confirmed))
        );
        let stored = repo.find_by_id(&id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Confirmed);
    }
}
