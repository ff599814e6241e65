//! In-memory reservation store.
//!
//! Used by tests and local development. A single write lock makes
//! check-then-insert atomic, mirroring the serializable transaction the
//! Postgres adapter uses.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{
    DateRange, DomainError, ErrorCode, ReservationId, Timestamp, UserId,
};
use crate::domain::reservation::{
    find_conflicts, BlockingPolicy, Reservation, ReservationStatus, Subject,
};
use crate::ports::{InsertOutcome, ReservationPage, ReservationRepository};

#[derive(Debug, Clone, Default)]
pub struct InMemoryReservationRepository {
    reservations: Arc<RwLock<HashMap<ReservationId, Reservation>>>,
}

impl InMemoryReservationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a reservation as-is, bypassing every rule.
    pub async fn insert_raw(&self, reservation: Reservation) {
        self.reservations
            .write()
            .await
            .insert(reservation.id, reservation);
    }

    pub async fn len(&self) -> usize {
        self.reservations.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.reservations.read().await.is_empty()
    }
}

fn unavailable(subject: &Subject) -> DomainError {
    DomainError::new(
        ErrorCode::SubjectUnavailable,
        format!("{} already has a confirmed reservation in that interval", subject),
    )
}

/// Refuses a write that would leave two confirmed reservations overlapping.
fn guard_confirmed_overlap(
    store: &HashMap<ReservationId, Reservation>,
    candidate: &Reservation,
) -> Result<(), DomainError> {
    if candidate.status != ReservationStatus::Confirmed {
        return Ok(());
    }
    let conflicts = find_conflicts(
        store.values(),
        &candidate.subject,
        &candidate.interval,
        BlockingPolicy::ConfirmedOnly,
        Some(candidate.id),
    );
    if conflicts.is_empty() {
        Ok(())
    } else {
        Err(unavailable(&candidate.subject))
    }
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn create(&self, reservation: &Reservation) -> Result<(), DomainError> {
        let mut store = self.reservations.write().await;
        if store.contains_key(&reservation.id) {
            return Err(DomainError::database(format!(
                "reservation {} already exists",
                reservation.id
            )));
        }
        guard_confirmed_overlap(&store, reservation)?;
        store.insert(reservation.id, reservation.clone());
        Ok(())
    }

    async fn create_if_available(
        &self,
        reservation: &Reservation,
        policy: BlockingPolicy,
    ) -> Result<InsertOutcome, DomainError> {
        let mut store = self.reservations.write().await;
        let conflicts = find_conflicts(
            store.values(),
            &reservation.subject,
            &reservation.interval,
            policy,
            Some(reservation.id),
        );
        if !conflicts.is_empty() {
            return Ok(InsertOutcome::Conflicts(conflicts));
        }
        store.insert(reservation.id, reservation.clone());
        Ok(InsertOutcome::Inserted)
    }

    async fn update(
        &self,
        id: &ReservationId,
        interval: &DateRange,
    ) -> Result<Option<Reservation>, DomainError> {
        let mut store = self.reservations.write().await;
        let Some(mut updated) = store.get(id).cloned() else {
            return Ok(None);
        };
        if updated.reschedule(*interval, Timestamp::now()).is_err() {
            return Ok(None);
        }
        guard_confirmed_overlap(&store, &updated)?;
        store.insert(updated.id, updated.clone());
        Ok(Some(updated))
    }

    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, DomainError> {
        Ok(self.reservations.read().await.get(id).cloned())
    }

    async fn update_status(
        &self,
        id: &ReservationId,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<Option<Reservation>, DomainError> {
        let mut store = self.reservations.write().await;
        let Some(mut updated) = store.get(id).filter(|r| r.status == from).cloned() else {
            return Ok(None);
        };
        updated.status = to;
        updated.updated_at = Timestamp::now();
        guard_confirmed_overlap(&store, &updated)?;
        store.insert(updated.id, updated.clone());
        Ok(Some(updated))
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
        page: u32,
        limit: u32,
    ) -> Result<ReservationPage, DomainError> {
        let store = self.reservations.read().await;
        let mut owned: Vec<Reservation> = store
            .values()
            .filter(|r| r.is_owned_by(user_id))
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        let total = owned.len() as u64;
        let offset = (page.saturating_sub(1) as usize).saturating_mul(limit as usize);
        let items = owned.into_iter().skip(offset).take(limit as usize).collect();

        Ok(ReservationPage { items, total })
    }

    async fn check_availability(
        &self,
        subject: &Subject,
        interval: &DateRange,
        policy: BlockingPolicy,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<Reservation>, DomainError> {
        let store = self.reservations.read().await;
        Ok(find_conflicts(store.values(), subject, interval, policy, exclude))
    }

    async fn find_by_subject_and_range(
        &self,
        subject: &Subject,
        interval: &DateRange,
    ) -> Result<Vec<Reservation>, DomainError> {
        let store = self.reservations.read().await;
        let mut found: Vec<Reservation> = store
            .values()
            .filter(|r| &r.subject == subject && r.interval.overlaps(interval))
            .cloned()
            .collect();
        found.sort_by(|a, b| a.interval.start().cmp(&b.interval.start()));
        Ok(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn guest() -> UserId {
        UserId::new("guest-1").unwrap()
    }

    fn pending(subject: &Subject, start_hours: i64, end_hours: i64) -> Reservation {
        let base = Timestamp::now().plus_days(2);
        Reservation::new(
            guest(),
            subject.clone(),
            DateRange::new(base.plus_hours(start_hours), base.plus_hours(end_hours)).unwrap(),
            Timestamp::now(),
        )
    }

    fn confirmed(subject: &Subject, start_hours: i64, end_hours: i64) -> Reservation {
        let mut r = pending(subject, start_hours, end_hours);
        r.status = ReservationStatus::Confirmed;
        r
    }

    #[tokio::test]
    async fn create_if_available_reports_confirmed_conflicts() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        let existing = confirmed(&room, 0, 4);
        repo.insert_raw(existing.clone()).await;

        let outcome = repo
            .create_if_available(&pending(&room, 2, 6), BlockingPolicy::ConfirmedOnly)
            .await
            .unwrap();

        assert_eq!(outcome, InsertOutcome::Conflicts(vec![existing]));
        assert_eq!(repo.len().await, 1);
    }

    #[tokio::test]
    async fn adjacent_intervals_do_not_conflict() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        repo.insert_raw(confirmed(&room, 0, 4)).await;

        let outcome = repo
            .create_if_available(&pending(&room, 4, 8), BlockingPolicy::ConfirmedOnly)
            .await
            .unwrap();

        assert_eq!(outcome, InsertOutcome::Inserted);
    }

    #[tokio::test]
    async fn pending_blocks_only_under_strict_policy() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        repo.insert_raw(pending(&room, 0, 4)).await;

        let lenient = repo
            .check_availability(
                &room,
                &pending(&room, 1, 2).interval,
                BlockingPolicy::ConfirmedOnly,
                None,
            )
            .await
            .unwrap();
        let strict = repo
            .check_availability(
                &room,
                &pending(&room, 1, 2).interval,
                BlockingPolicy::PendingAndConfirmed,
                None,
            )
            .await
            .unwrap();

        assert!(lenient.is_empty());
        assert_eq!(strict.len(), 1);
    }

    #[tokio::test]
    async fn confirming_into_an_occupied_slot_is_refused() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        repo.insert_raw(confirmed(&room, 0, 4)).await;
        let late = pending(&room, 1, 3);
        repo.insert_raw(late.clone()).await;

        let err = repo
            .update_status(&late.id, ReservationStatus::Pending, ReservationStatus::Confirmed)
            .await
            .unwrap_err();

        assert_eq!(err.code, ErrorCode::SubjectUnavailable);
        let stored = repo.find_by_id(&late.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Pending);
    }

    #[tokio::test]
    async fn update_status_of_unknown_reservation_is_none() {
        let repo = InMemoryReservationRepository::new();
        let result = repo
            .update_status(
                &ReservationId::new(),
                ReservationStatus::Pending,
                ReservationStatus::Cancelled,
            )
            .await
            .unwrap();
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn update_status_only_applies_from_the_expected_status() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        let booking = pending(&room, 0, 2);
        repo.insert_raw(booking.clone()).await;

        let cancelled = repo
            .update_status(&booking.id, ReservationStatus::Pending, ReservationStatus::Cancelled)
            .await
            .unwrap();
        let stale_confirm = repo
            .update_status(&booking.id, ReservationStatus::Pending, ReservationStatus::Confirmed)
            .await
            .unwrap();

        assert_eq!(cancelled.unwrap().status, ReservationStatus::Cancelled);
        assert!(stale_confirm.is_none());
        let stored = repo.find_by_id(&booking.id).await.unwrap().unwrap();
        assert_eq!(stored.status, ReservationStatus::Cancelled);
    }

    #[tokio::test]
    async fn update_moves_dates_but_keeps_stored_status() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        let mut booking = confirmed(&room, 0, 2);
        repo.insert_raw(booking.clone()).await;

        // A caller holding an older, still-pending copy reschedules.
        booking.status = ReservationStatus::Pending;
        let moved = pending(&room, 3, 6).interval;
        let updated = repo.update(&booking.id, &moved).await.unwrap().unwrap();

        assert_eq!(updated.interval, moved);
        assert_eq!(updated.status, ReservationStatus::Confirmed);
    }

    #[tokio::test]
    async fn update_of_cancelled_reservation_is_none() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        let mut booking = pending(&room, 0, 2);
        booking.status = ReservationStatus::Cancelled;
        repo.insert_raw(booking.clone()).await;

        let result = repo
            .update(&booking.id, &pending(&room, 3, 6).interval)
            .await
            .unwrap();

        assert!(result.is_none());
        let stored = repo.find_by_id(&booking.id).await.unwrap().unwrap();
        assert_eq!(stored.interval, booking.interval);
    }

    #[tokio::test]
    async fn find_by_user_id_pages_newest_first() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        let mut ids = Vec::new();
        for i in 0..5 {
            let mut r = pending(&room, i * 10, i * 10 + 1);
            r.created_at = Timestamp::now().plus_hours(i);
            ids.push(r.id);
            repo.insert_raw(r).await;
        }

        let page = repo.find_by_user_id(&guest(), 2, 2).await.unwrap();

        assert_eq!(page.total, 5);
        let got: Vec<_> = page.items.iter().map(|r| r.id).collect();
        assert_eq!(got, vec![ids[2], ids[1]]);
    }

    #[tokio::test]
    async fn find_by_subject_and_range_includes_every_status() {
        let repo = InMemoryReservationRepository::new();
        let room = Subject::room("101").unwrap();
        let other = Subject::resource("101").unwrap();
        let mut cancelled = pending(&room, 0, 2);
        cancelled.status = ReservationStatus::Cancelled;
        repo.insert_raw(cancelled).await;
        repo.insert_raw(confirmed(&room, 3, 5)).await;
        repo.insert_raw(confirmed(&other, 0, 5)).await;

        let window = DateRange::new(
            pending(&room, 0, 1).interval.start(),
            pending(&room, 0, 10).interval.end(),
        )
        .unwrap();
        let found = repo.find_by_subject_and_range(&room, &window).await.unwrap();

        assert_eq!(found.len(), 2);
        assert!(found.iter().all(|r| r.subject == room));
    }
}
