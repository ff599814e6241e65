//! OccupancyStatsHandler - Query handler for per-subject occupancy figures.

use std::sync::Arc;

use chrono::FixedOffset;

use crate::domain::foundation::Timestamp;
use crate::domain::reservation::{
    period_window, OccupancyStats, ReservationError, StatsPeriod, Subject,
};
use crate::ports::ReservationRepository;

/// Query for occupancy statistics.
#[derive(Debug, Clone)]
pub struct OccupancyStatsQuery {
    pub subject: Subject,
    pub period: StatsPeriod,
    /// Defaults to now.
    pub reference_date: Option<Timestamp>,
}

pub struct OccupancyStatsHandler {
    repository: Arc<dyn ReservationRepository>,
    average_hourly_rate: i64,
    offset: FixedOffset,
}

impl OccupancyStatsHandler {
    pub fn new(
        repository: Arc<dyn ReservationRepository>,
        average_hourly_rate: i64,
        offset: FixedOffset,
    ) -> Self {
        Self {
            repository,
            average_hourly_rate,
            offset,
        }
    }

    pub async fn handle(
        &self,
        query: OccupancyStatsQuery,
    ) -> Result<OccupancyStats, ReservationError> {
        let reference = query.reference_date.unwrap_or_else(Timestamp::now);
        let window = period_window(query.period, reference, self.offset)?;

        let reservations = self
            .repository
            .find_by_subject_and_range(&query.subject, &window)
            .await?;

        Ok(OccupancyStats::compute(
            query.subject,
            query.period,
            window,
            &reservations,
            self.average_hourly_rate,
        ))
    }
}
