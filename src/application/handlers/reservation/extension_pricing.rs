//! ExtensionPricingService - quotes and rule checks for extending a stay.

use std::sync::Arc;

use crate::domain::foundation::{ReservationId, Timestamp, UserId};
use crate::domain::reservation::{
    delta_window, BlockingPolicy, ExtensionPolicy, ExtensionQuote, Reservation, ReservationError,
};
use crate::ports::{AvailabilityOverrideRepository, ReservationRepository};

use super::availability::closed_days;

/// Query for an extension price quote.
#[derive(Debug, Clone)]
pub struct ExtensionCostQuery {
    pub reservation_id: ReservationId,
    pub new_end_date: Timestamp,
    /// Ownership is enforced when present.
    pub requested_by: Option<UserId>,
}

/// Query for the extension business rules.
#[derive(Debug, Clone)]
pub struct ValidateExtensionQuery {
    pub reservation_id: ReservationId,
    pub new_end_date: Timestamp,
    pub user_id: UserId,
}

pub struct ExtensionPricingService {
    repository: Arc<dyn ReservationRepository>,
    overrides: Option<Arc<dyn AvailabilityOverrideRepository>>,
    policy: ExtensionPolicy,
    blocking: BlockingPolicy,
}

impl ExtensionPricingService {
    pub fn new(
        repository: Arc<dyn ReservationRepository>,
        policy: ExtensionPolicy,
        blocking: BlockingPolicy,
    ) -> Self {
        Self {
            repository,
            overrides: None,
            policy,
            blocking,
        }
    }

    pub fn with_overrides(mut self, overrides: Arc<dyn AvailabilityOverrideRepository>) -> Self {
        self.overrides = Some(overrides);
        self
    }

    async fn load(&self, id: ReservationId) -> Result<Reservation, ReservationError> {
        self.repository
            .find_by_id(&id)
            .await?
            .ok_or(ReservationError::not_found(id))
    }

    /// Prices the delta window `[current_end, new_end)`.
    ///
    /// Only the delta is checked for conflicts and closed days; an
    /// infeasible extension is quoted at zero with the blockers listed.
    pub async fn calculate_extension_cost(
        &self,
        query: ExtensionCostQuery,
    ) -> Result<ExtensionQuote, ReservationError> {
        let reservation = self.load(query.reservation_id).await?;

        if let Some(user_id) = &query.requested_by {
            reservation.ensure_owned_by(user_id)?;
        }

        let delta = delta_window(&reservation, query.new_end_date)?;
        let conflicts = self
            .repository
            .check_availability(&reservation.subject, &delta, self.blocking, Some(reservation.id))
            .await?;
        let closed = closed_days(self.overrides.as_ref(), &reservation.subject, &delta).await?;

        let quote = ExtensionQuote::for_delta(
            &delta,
            conflicts.iter().map(|r| r.id).collect(),
            closed,
            self.policy.hourly_rate,
            self.policy.currency.clone(),
        )?;

        tracing::debug!(
            reservation_id = %reservation.id,
            new_end = %query.new_end_date,
            can_extend = quote.can_extend,
            cost = quote.additional_cost,
            "Extension quoted"
        );

        Ok(quote)
    }

    /// Ownership, status and length limits for an extension, checked
    /// against `now`. Availability is not part of this check.
    pub async fn validate_extension(
        &self,
        query: ValidateExtensionQuery,
        now: Timestamp,
    ) -> Result<(), ReservationError> {
        let reservation = self.load(query.reservation_id).await?;
        self.policy
            .validate(&reservation, query.new_end_date, &query.user_id, now)
    }
}
