//! AvailabilityService - conflict queries over the reservation store and
//! the per-date overrides.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::foundation::{DateRange, ReservationId, Timestamp, UserId};
use crate::domain::reservation::{
    blocked_dates, days_touched, delta_window, suggestion_candidates, AvailabilityReport,
    BlockingPolicy, ReservationError, Subject,
};
use crate::ports::{AvailabilityOverrideRepository, ReservationRepository};

/// Days inside `interval` closed by an override. Empty without a store.
pub(crate) async fn closed_days(
    overrides: Option<&Arc<dyn AvailabilityOverrideRepository>>,
    subject: &Subject,
    interval: &DateRange,
) -> Result<Vec<NaiveDate>, ReservationError> {
    let Some(overrides) = overrides else {
        return Ok(Vec::new());
    };
    let (first, last) = days_touched(interval);
    let entries = overrides.list(subject, Some(first), Some(last)).await?;
    Ok(blocked_dates(&entries, interval))
}

/// Query for a free-slot check.
#[derive(Debug, Clone)]
pub struct CheckAvailabilityQuery {
    pub subject: Subject,
    pub interval: DateRange,
}

/// Query for extension suggestions.
#[derive(Debug, Clone)]
pub struct SuggestExtensionsQuery {
    pub reservation_id: ReservationId,
    pub requested_end: Timestamp,
    /// Ownership is enforced when present.
    pub requested_by: Option<UserId>,
}

/// Answers "is this subject free" questions under one blocking policy.
#[derive(Clone)]
pub struct AvailabilityService {
    repository: Arc<dyn ReservationRepository>,
    overrides: Option<Arc<dyn AvailabilityOverrideRepository>>,
    policy: BlockingPolicy,
}

impl AvailabilityService {
    pub fn new(repository: Arc<dyn ReservationRepository>, policy: BlockingPolicy) -> Self {
        Self {
            repository,
            overrides: None,
            policy,
        }
    }

    /// Closed days from `overrides` block like conflicting reservations.
    pub fn with_overrides(mut self, overrides: Arc<dyn AvailabilityOverrideRepository>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn policy(&self) -> BlockingPolicy {
        self.policy
    }

    /// Blocking reservations and closed days inside `interval`.
    pub async fn find_conflicts(
        &self,
        subject: &Subject,
        interval: &DateRange,
        exclude: Option<ReservationId>,
    ) -> Result<AvailabilityReport, ReservationError> {
        let conflicts = self
            .repository
            .check_availability(subject, interval, self.policy, exclude)
            .await?;
        let closed = closed_days(self.overrides.as_ref(), subject, interval).await?;
        Ok(AvailabilityReport::new(conflicts, closed))
    }

    pub async fn is_available(
        &self,
        subject: &Subject,
        interval: &DateRange,
        exclude: Option<ReservationId>,
    ) -> Result<bool, ReservationError> {
        Ok(self
            .find_conflicts(subject, interval, exclude)
            .await?
            .is_available)
    }

    pub async fn check(
        &self,
        query: CheckAvailabilityQuery,
    ) -> Result<AvailabilityReport, ReservationError> {
        let report = self
            .find_conflicts(&query.subject, &query.interval, None)
            .await?;

        tracing::debug!(
            subject = %query.subject,
            start = %query.interval.start(),
            end = %query.interval.end(),
            conflicts = report.conflicts.len(),
            blocked_dates = report.blocked_dates.len(),
            "Availability checked"
        );

        Ok(report)
    }

    /// End dates, one hour apart, the reservation could be extended to.
    ///
    /// Tries at most `MAX_EXTENSION_STEPS` candidates; each is checked over
    /// its delta window only, and candidates past `requested_end` are dropped.
    pub async fn suggest_extensions(
        &self,
        query: SuggestExtensionsQuery,
    ) -> Result<Vec<Timestamp>, ReservationError> {
        let reservation = self
            .repository
            .find_by_id(&query.reservation_id)
            .await?
            .ok_or(ReservationError::not_found(query.reservation_id))?;

        if let Some(user_id) = &query.requested_by {
            reservation.ensure_owned_by(user_id)?;
        }

        let mut suggestions = Vec::new();
        for candidate in suggestion_candidates(reservation.interval.end(), query.requested_end) {
            let delta = delta_window(&reservation, candidate)?;
            if self
                .is_available(&reservation.subject, &delta, Some(reservation.id))
                .await?
            {
                suggestions.push(candidate);
            }
        }

        Ok(suggestions)
    }
}
