//! In-memory availability override store.

use async_trait::async_trait;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::DomainError;
use crate::domain::reservation::{AvailabilityOverride, Subject};
use crate::ports::AvailabilityOverrideRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryAvailabilityOverrideRepository {
    overrides: Arc<RwLock<HashMap<(Subject, NaiveDate), AvailabilityOverride>>>,
}

impl InMemoryAvailabilityOverrideRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AvailabilityOverrideRepository for InMemoryAvailabilityOverrideRepository {
    async fn set(
        &self,
        entry: &AvailabilityOverride,
    ) -> Result<AvailabilityOverride, DomainError> {
        let mut overrides = self.overrides.write().await;
        let stored = overrides
            .entry((entry.subject.clone(), entry.date))
            .and_modify(|existing| {
                existing.is_available = entry.is_available;
                existing.updated_at = entry.updated_at;
            })
            .or_insert_with(|| entry.clone());
        Ok(stored.clone())
    }

    async fn get(
        &self,
        subject: &Subject,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityOverride>, DomainError> {
        Ok(self
            .overrides
            .read()
            .await
            .get(&(subject.clone(), date))
            .cloned())
    }

    async fn list(
        &self,
        subject: &Subject,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilityOverride>, DomainError> {
        let overrides = self.overrides.read().await;
        let mut found: Vec<AvailabilityOverride> = overrides
            .values()
            .filter(|o| &o.subject == subject)
            .filter(|o| from.map_or(true, |from| o.date >= from))
            .filter(|o| to.map_or(true, |to| o.date <= to))
            .cloned()
            .collect();
        found.sort_by_key(|o| o.date);
        Ok(found)
    }
}
