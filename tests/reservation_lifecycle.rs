//! Integration tests for the reservation lifecycle.
//!
//! Drives the application handlers end to end against the in-memory
//! repositories and the mock payment gateway.

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, Utc};

use hotel_booking::adapters::memory::{
    InMemoryAvailabilityOverrideRepository, InMemoryPaymentRepository,
    InMemoryReservationRepository,
};
use hotel_booking::adapters::stripe::MockPaymentProvider;
use hotel_booking::application::handlers::reservation::{
    Actor, AvailabilityOverrideService, AvailabilityService, CancelReservationCommand, CancelReservationHandler,
    CancelWithRefundCommand, CancelWithRefundHandler, CheckAvailabilityQuery, CheckoutUrls,
    CreateReservationCommand, CreateReservationHandler, ExtensionCostQuery,
    ExtensionPricingService, OccupancyStatsHandler, OccupancyStatsQuery,
    RescheduleReservationCommand, RescheduleReservationHandler, ReservationStatusService,
    SetAvailabilityCommand, SuggestExtensionsQuery,
};
use hotel_booking::domain::foundation::{CurrencyCode, DateRange, ReservationId, Timestamp, UserId};
use hotel_booking::domain::payment::PaymentStatus;
use hotel_booking::domain::reservation::{
    BlockingPolicy, ExtensionPolicy, Reservation, ReservationError, ReservationStatus,
    StatsPeriod, Subject,
};
use hotel_booking::ports::{PaymentRepository, ReservationRepository};

// =============================================================================
// Test Infrastructure
// =============================================================================

#[derive(Clone)]
struct World {
    reservations: InMemoryReservationRepository,
    payments: InMemoryPaymentRepository,
    overrides: InMemoryAvailabilityOverrideRepository,
    provider: MockPaymentProvider,
    policy: BlockingPolicy,
}

impl World {
    fn new(policy: BlockingPolicy) -> Self {
        Self {
            reservations: InMemoryReservationRepository::new(),
            payments: InMemoryPaymentRepository::new(),
            overrides: InMemoryAvailabilityOverrideRepository::new(),
            provider: MockPaymentProvider::new(),
            policy,
        }
    }

    fn create_handler(&self) -> CreateReservationHandler {
        CreateReservationHandler::new(
            Arc::new(self.reservations.clone()),
            Arc::new(self.payments.clone()),
            Arc::new(self.provider.clone()),
            self.policy,
            CheckoutUrls::new(
                "https://hotel.test/booked/{reservation_id}",
                "https://hotel.test/abandoned/{reservation_id}",
            ),
        )
        .with_overrides(Arc::new(self.overrides.clone()))
    }

    fn status_service(&self) -> ReservationStatusService {
        ReservationStatusService::new(Arc::new(self.reservations.clone()))
    }

    fn pricing(&self) -> ExtensionPricingService {
        ExtensionPricingService::new(
            Arc::new(self.reservations.clone()),
            ExtensionPolicy {
                hourly_rate: 25,
                currency: CurrencyCode::new("eur").unwrap(),
                max_extension_hours: 24,
                max_future_days: 30,
            },
            self.policy,
        )
        .with_overrides(Arc::new(self.overrides.clone()))
    }

    fn availability(&self) -> AvailabilityService {
        AvailabilityService::new(Arc::new(self.reservations.clone()), self.policy)
            .with_overrides(Arc::new(self.overrides.clone()))
    }

    fn override_service(&self) -> AvailabilityOverrideService {
        AvailabilityOverrideService::new(Arc::new(self.overrides.clone()))
    }

    fn reschedule_handler(&self) -> RescheduleReservationHandler {
        RescheduleReservationHandler::new(Arc::new(self.reservations.clone()), self.policy)
            .with_overrides(Arc::new(self.overrides.clone()))
    }

    async fn set_day(&self, subject: Subject, date: chrono::NaiveDate, is_available: bool) {
        self.override_service()
            .set(SetAvailabilityCommand {
                subject,
                date,
                is_available,
                set_by: UserId::new("front-desk").unwrap(),
            })
            .await
            .unwrap();
    }

    async fn book(
        &self,
        user: &str,
        subject: Subject,
        start: Timestamp,
        hours: i64,
    ) -> Result<Reservation, ReservationError> {
        self.create_handler()
            .handle(CreateReservationCommand {
                user_id: UserId::new(user).unwrap(),
                subject,
                start_date: start,
                end_date: start.plus_hours(hours),
                amount: hours * 2500,
                currency: CurrencyCode::new("eur").unwrap(),
                payment_method: "card".to_string(),
            })
            .await
            .map(|created| created.reservation)
    }

    async fn confirm(&self, id: ReservationId) {
        self.status_service()
            .confirm_for_successful_payment(id)
            .await
            .unwrap();
        self.payments
            .transition_for_reservation(&id, PaymentStatus::Pending, PaymentStatus::Paid)
            .await
            .unwrap();
    }

    async fn status_of(&self, id: ReservationId) -> ReservationStatus {
        self.reservations
            .find_by_id(&id)
            .await
            .unwrap()
            .unwrap()
            .status
    }
}

fn guest() -> UserId {
    UserId::new("guest-1").unwrap()
}

fn room(id: &str) -> Subject {
    Subject::room(id).unwrap()
}

fn next_week() -> Timestamp {
    Timestamp::now().plus_days(7)
}

fn at(rfc3339: &str) -> Timestamp {
    Timestamp::from_datetime(
        DateTime::parse_from_rfc3339(rfc3339)
            .unwrap()
            .with_timezone(&Utc),
    )
}

// =============================================================================
// Tests
// =============================================================================

#[tokio::test]
async fn guest_books_extends_and_cancels_with_refund() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let start = next_week();

    let reservation = world.book("guest-1", room("101"), start, 20).await.unwrap();
    assert_eq!(reservation.status, ReservationStatus::Pending);
    assert_eq!(
        world.provider.call_count("create_checkout_session"),
        1
    );

    world.confirm(reservation.id).await;
    assert_eq!(world.status_of(reservation.id).await, ReservationStatus::Confirmed);

    let quote = world
        .pricing()
        .calculate_extension_cost(ExtensionCostQuery {
            reservation_id: reservation.id,
            new_end_date: start.plus_hours(22),
            requested_by: Some(guest()),
        })
        .await
        .unwrap();
    assert!(quote.can_extend);
    assert_eq!(quote.additional_cost, 50);

    let extended = RescheduleReservationHandler::new(
        Arc::new(world.reservations.clone()),
        world.policy,
    )
    .handle(RescheduleReservationCommand {
        reservation_id: reservation.id,
        user_id: guest(),
        start_date: None,
        end_date: Some(start.plus_hours(22)),
    })
    .await
    .unwrap();
    assert_eq!(extended.interval.end(), start.plus_hours(22));
    assert_eq!(extended.status, ReservationStatus::Confirmed);

    let refunded = CancelWithRefundHandler::new(
        Arc::new(world.reservations.clone()),
        Arc::new(world.payments.clone()),
        Arc::new(world.provider.clone()),
    )
    .handle(CancelWithRefundCommand {
        reservation_id: reservation.id,
        user_id: guest(),
        reason: Some("requested_by_customer".to_string()),
        refund_amount: None,
    })
    .await
    .unwrap();

    assert_eq!(refunded.reservation.status, ReservationStatus::Cancelled);
    let payments = world
        .payments
        .find_by_reservation_id(&reservation.id)
        .await
        .unwrap();
    assert_eq!(payments[0].status, PaymentStatus::Refunded);
}

#[tokio::test]
async fn pending_reservations_only_block_under_strict_policy() {
    let start = next_week();

    let lenient = World::new(BlockingPolicy::ConfirmedOnly);
    lenient.book("guest-1", room("5"), start, 4).await.unwrap();
    assert!(lenient.book("guest-2", room("5"), start, 4).await.is_ok());

    let strict = World::new(BlockingPolicy::PendingAndConfirmed);
    let first = strict.book("guest-1", room("5"), start, 4).await.unwrap();
    let err = strict
        .book("guest-2", room("5"), start.plus_hours(2), 4)
        .await
        .unwrap_err();
    assert_eq!(err, ReservationError::unavailable(vec![first.id]));
}

#[tokio::test]
async fn back_to_back_reservations_do_not_conflict() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let start = next_week();

    let morning = world.book("guest-1", room("9"), start, 4).await.unwrap();
    world.confirm(morning.id).await;

    let afternoon = world
        .book("guest-2", room("9"), start.plus_hours(4), 4)
        .await
        .unwrap();
    world.confirm(afternoon.id).await;

    assert_eq!(world.status_of(afternoon.id).await, ReservationStatus::Confirmed);
}

#[tokio::test]
async fn concurrent_bookings_for_one_slot_admit_exactly_one() {
    let world = World::new(BlockingPolicy::PendingAndConfirmed);
    let start = next_week();

    let mut tasks = Vec::new();
    for n in 0..8 {
        let world = world.clone();
        tasks.push(tokio::spawn(async move {
            world
                .book(&format!("guest-{}", n), room("suite"), start, 24)
                .await
        }));
    }

    let mut admitted = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => admitted += 1,
            Err(err) => assert!(matches!(err, ReservationError::Unavailable { .. })),
        }
    }

    assert_eq!(admitted, 1);
    assert_eq!(world.reservations.len().await, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_cancel_and_confirm_settle_once() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let reservation = world.book("guest-1", room("race"), next_week(), 2).await.unwrap();
    let id = reservation.id;

    let mut tasks = Vec::new();
    for n in 0..16 {
        let service = world.status_service();
        tasks.push(tokio::spawn(async move {
            if n % 2 == 0 {
                let cancelled = service
                    .update_status(id, ReservationStatus::Cancelled, Actor::User(guest()))
                    .await;
                (cancelled.is_ok(), false)
            } else {
                let outcome = service.confirm_for_successful_payment(id).await.unwrap();
                (false, outcome.is_applied())
            }
        }));
    }

    let (mut cancels, mut confirms) = (0, 0);
    for task in tasks {
        let (cancelled, confirmed) = task.await.unwrap();
        cancels += usize::from(cancelled);
        confirms += usize::from(confirmed);
    }

    assert!(cancels <= 1, "{} cancellations landed", cancels);
    assert!(confirms <= 1, "{} confirmations landed", confirms);
    assert!(cancels + confirms >= 1);
    let expected = if cancels == 1 {
        ReservationStatus::Cancelled
    } else {
        ReservationStatus::Confirmed
    };
    assert_eq!(world.status_of(id).await, expected);
}

#[tokio::test]
async fn extension_into_next_guest_is_quoted_as_blocked() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let start = next_week();

    let mine = world.book("guest-1", room("12"), start, 4).await.unwrap();
    world.confirm(mine.id).await;
    let next = world
        .book("guest-2", room("12"), start.plus_hours(6), 4)
        .await
        .unwrap();
    world.confirm(next.id).await;

    let quote = world
        .pricing()
        .calculate_extension_cost(ExtensionCostQuery {
            reservation_id: mine.id,
            new_end_date: start.plus_hours(8),
            requested_by: Some(guest()),
        })
        .await
        .unwrap();
    assert!(!quote.can_extend);
    assert_eq!(quote.additional_cost, 0);
    assert_eq!(quote.conflicting_reservations, vec![next.id]);

    let suggestions = world
        .availability()
        .suggest_extensions(SuggestExtensionsQuery {
            reservation_id: mine.id,
            requested_end: start.plus_hours(8),
            requested_by: Some(guest()),
        })
        .await
        .unwrap();
    assert_eq!(suggestions, vec![start.plus_hours(5), start.plus_hours(6)]);
}

#[tokio::test]
async fn closed_day_blocks_booking_until_reopened() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let start = next_week();
    let day = start.as_datetime().date_naive();

    world.set_day(room("6"), day, false).await;

    let err = world.book("guest-1", room("6"), start, 3).await.unwrap_err();
    assert_eq!(err, ReservationError::dates_blocked(vec![day]));

    let report = world
        .availability()
        .check(CheckAvailabilityQuery {
            subject: room("6"),
            interval: DateRange::new(start, start.plus_hours(3)).unwrap(),
        })
        .await
        .unwrap();
    assert!(!report.is_available);
    assert!(report.conflicts.is_empty());
    assert_eq!(report.blocked_dates, vec![day]);

    // Other rooms are unaffected.
    world.book("guest-1", room("7"), start, 3).await.unwrap();

    world.set_day(room("6"), day, true).await;
    world.book("guest-1", room("6"), start, 3).await.unwrap();
}

#[tokio::test]
async fn closed_day_blocks_moves_and_extensions_into_it() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let start = next_week();
    let reservation = world.book("guest-1", room("8"), start, 2).await.unwrap();
    let closed = start.plus_days(2);
    let day = closed.as_datetime().date_naive();
    world.set_day(room("8"), day, false).await;

    let err = world
        .reschedule_handler()
        .handle(RescheduleReservationCommand {
            reservation_id: reservation.id,
            user_id: guest(),
            start_date: Some(closed),
            end_date: Some(closed.plus_hours(2)),
        })
        .await
        .unwrap_err();
    assert_eq!(err, ReservationError::dates_blocked(vec![day]));

    let quote = world
        .pricing()
        .calculate_extension_cost(ExtensionCostQuery {
            reservation_id: reservation.id,
            new_end_date: closed.plus_hours(1),
            requested_by: Some(guest()),
        })
        .await
        .unwrap();
    assert!(!quote.can_extend);
    assert_eq!(quote.additional_cost, 0);
    assert_eq!(quote.blocked_dates, vec![day]);
}

#[tokio::test]
async fn cancelled_reservation_frees_the_slot() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let start = next_week();

    let first = world.book("guest-1", room("3"), start, 10).await.unwrap();
    world.confirm(first.id).await;

    CancelReservationHandler::new(world.status_service())
        .handle(CancelReservationCommand {
            reservation_id: first.id,
            user_id: guest(),
            reason: None,
        })
        .await
        .unwrap();

    let report = world
        .availability()
        .check(CheckAvailabilityQuery {
            subject: room("3"),
            interval: DateRange::new(start, start.plus_hours(10)).unwrap(),
        })
        .await
        .unwrap();
    assert!(report.is_available);
}

#[tokio::test]
async fn terminal_reservations_cannot_change() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let reservation = world.book("guest-1", room("4"), next_week(), 2).await.unwrap();
    world.confirm(reservation.id).await;
    world
        .status_service()
        .update_status(reservation.id, ReservationStatus::Completed, Actor::System)
        .await
        .unwrap();

    let cancel = world
        .status_service()
        .update_status(
            reservation.id,
            ReservationStatus::Cancelled,
            Actor::User(guest()),
        )
        .await
        .unwrap_err();
    assert_eq!(
        cancel,
        ReservationError::invalid_transition(
            ReservationStatus::Completed,
            ReservationStatus::Cancelled
        )
    );

    let reschedule = RescheduleReservationHandler::new(
        Arc::new(world.reservations.clone()),
        world.policy,
    )
    .handle(RescheduleReservationCommand {
        reservation_id: reservation.id,
        user_id: guest(),
        start_date: None,
        end_date: Some(next_week().plus_hours(5)),
    })
    .await
    .unwrap_err();
    assert_eq!(
        reschedule,
        ReservationError::not_modifiable(ReservationStatus::Completed)
    );
}

#[tokio::test]
async fn occupancy_counts_only_confirmed_time_inside_the_window() {
    let world = World::new(BlockingPolicy::ConfirmedOnly);
    let subject = room("201");

    let mut confirmed = Reservation::new(
        guest(),
        subject.clone(),
        DateRange::new(at("2026-04-15T06:00:00Z"), at("2026-04-15T12:00:00Z")).unwrap(),
        Timestamp::now(),
    );
    confirmed.status = ReservationStatus::Confirmed;
    world.reservations.insert_raw(confirmed).await;

    // Straddles midnight; only the six hours on the 15th count.
    let mut overnight = Reservation::new(
        guest(),
        subject.clone(),
        DateRange::new(at("2026-04-15T18:00:00Z"), at("2026-04-16T06:00:00Z")).unwrap(),
        Timestamp::now(),
    );
    overnight.status = ReservationStatus::Confirmed;
    world.reservations.insert_raw(overnight).await;

    let pending = Reservation::new(
        guest(),
        subject.clone(),
        DateRange::new(at("2026-04-15T13:00:00Z"), at("2026-04-15T17:00:00Z")).unwrap(),
        Timestamp::now(),
    );
    world.reservations.insert_raw(pending).await;

    let utc = FixedOffset::east_opt(0).unwrap();
    let stats = OccupancyStatsHandler::new(Arc::new(world.reservations.clone()), 25, utc)
        .handle(OccupancyStatsQuery {
            subject,
            period: StatsPeriod::Day,
            reference_date: Some(at("2026-04-15T10:30:00Z")),
        })
        .await
        .unwrap();

    assert_eq!(stats.window_start, at("2026-04-15T00:00:00Z"));
    assert_eq!(stats.booked_hours, 12.0);
    assert_eq!(stats.occupancy_rate, 0.5);
    assert_eq!(stats.revenue, 300);
    assert_eq!(stats.reservation_count, 2);
}
