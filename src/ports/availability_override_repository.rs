//! Storage for per-date availability overrides.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::domain::foundation::DomainError;
use crate::domain::reservation::{AvailabilityOverride, Subject};

/// One override per (subject, date).
#[async_trait]
pub trait AvailabilityOverrideRepository: Send + Sync {
    /// Upserts on (subject, date). An existing row keeps its `created_at`
    /// and takes the new flag and `updated_at`. Returns the stored row.
    async fn set(
        &self,
        entry: &AvailabilityOverride,
    ) -> Result<AvailabilityOverride, DomainError>;

    async fn get(
        &self,
        subject: &Subject,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityOverride>, DomainError>;

    /// Overrides for `subject` ordered by date, limited to the inclusive
    /// `[from, to]` range when bounds are given.
    async fn list(
        &self,
        subject: &Subject,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilityOverride>, DomainError>;
}
