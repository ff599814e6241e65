//! AvailabilityOverrideService - opens or closes single days of a subject.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::reservation::{AvailabilityOverride, ReservationError, Subject};
use crate::ports::AvailabilityOverrideRepository;

/// Command to pin one day of a subject open or closed.
#[derive(Debug, Clone)]
pub struct SetAvailabilityCommand {
    pub subject: Subject,
    pub date: NaiveDate,
    pub is_available: bool,
    pub set_by: UserId,
}

/// Query for the overrides of a subject, optionally bounded (inclusive).
#[derive(Debug, Clone)]
pub struct ListAvailabilityQuery {
    pub subject: Subject,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Clone)]
pub struct AvailabilityOverrideService {
    repository: Arc<dyn AvailabilityOverrideRepository>,
}

impl AvailabilityOverrideService {
    pub fn new(repository: Arc<dyn AvailabilityOverrideRepository>) -> Self {
        Self { repository }
    }

    /// Setting the same day again replaces the flag.
    pub async fn set(
        &self,
        cmd: SetAvailabilityCommand,
    ) -> Result<AvailabilityOverride, ReservationError> {
        let entry =
            AvailabilityOverride::new(cmd.subject, cmd.date, cmd.is_available, Timestamp::now());
        let stored = self.repository.set(&entry).await?;

        tracing::info!(
            subject = %stored.subject,
            date = %stored.date,
            is_available = stored.is_available,
            set_by = %cmd.set_by,
            "Availability override set"
        );

        Ok(stored)
    }

    pub async fn get(
        &self,
        subject: Subject,
        date: NaiveDate,
    ) -> Result<AvailabilityOverride, ReservationError> {
        self.repository
            .get(&subject, date)
            .await?
            .ok_or(ReservationError::override_not_found(subject, date))
    }

    pub async fn list(
        &self,
        query: ListAvailabilityQuery,
    ) -> Result<Vec<AvailabilityOverride>, ReservationError> {
        if let (Some(from), Some(to)) = (query.from, query.to) {
            if from > to {
                return Err(ReservationError::invalid_argument(
                    "from",
                    "from must not be after to",
                ));
            }
        }

        Ok(self
            .repository
            .list(&query.subject, query.from, query.to)
            .await?)
    }
}
