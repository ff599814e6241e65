//! PostgreSQL implementation of AvailabilityOverrideRepository.
//!
//! The primary key is (subject_kind, subject_id, date), so `set` is a single
//! `INSERT .. ON CONFLICT DO UPDATE`.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{DomainError, Timestamp};
use crate::domain::reservation::{AvailabilityOverride, Subject, SubjectKind};
use crate::ports::AvailabilityOverrideRepository;

const OVERRIDE_COLUMNS: &str =
    "subject_kind, subject_id, date, is_available, created_at, updated_at";

#[derive(Clone)]
pub struct PostgresAvailabilityOverrideRepository {
    pool: PgPool,
}

impl PostgresAvailabilityOverrideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct OverrideRow {
    subject_kind: String,
    subject_id: String,
    date: NaiveDate,
    is_available: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<OverrideRow> for AvailabilityOverride {
    type Error = DomainError;

    fn try_from(row: OverrideRow) -> Result<Self, Self::Error> {
        let kind: SubjectKind = row.subject_kind.parse().map_err(|_| {
            DomainError::database(format!("Invalid subject kind: {}", row.subject_kind))
        })?;
        let subject = Subject::new(kind, row.subject_id)
            .map_err(|e| DomainError::database(format!("Invalid subject: {}", e)))?;

        Ok(AvailabilityOverride {
            subject,
            date: row.date,
            is_available: row.is_available,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl AvailabilityOverrideRepository for PostgresAvailabilityOverrideRepository {
    async fn set(
        &self,
        entry: &AvailabilityOverride,
    ) -> Result<AvailabilityOverride, DomainError> {
        let row: OverrideRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO availability_overrides ({OVERRIDE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (subject_kind, subject_id, date) DO UPDATE SET
                is_available = EXCLUDED.is_available,
                updated_at = EXCLUDED.updated_at
            RETURNING {OVERRIDE_COLUMNS}
            "#
        ))
        .bind(entry.subject.kind().as_str())
        .bind(entry.subject.id())
        .bind(entry.date)
        .bind(entry.is_available)
        .bind(entry.created_at.as_datetime())
        .bind(entry.updated_at.as_datetime())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to set availability: {}", e)))?;

        AvailabilityOverride::try_from(row)
    }

    async fn get(
        &self,
        subject: &Subject,
        date: NaiveDate,
    ) -> Result<Option<AvailabilityOverride>, DomainError> {
        let row: Option<OverrideRow> = sqlx::query_as(&format!(
            r#"
            SELECT {OVERRIDE_COLUMNS}
            FROM availability_overrides
            WHERE subject_kind = $1 AND subject_id = $2 AND date = $3
            "#
        ))
        .bind(subject.kind().as_str())
        .bind(subject.id())
        .bind(date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch availability: {}", e)))?;

        row.map(AvailabilityOverride::try_from).transpose()
    }

    async fn list(
        &self,
        subject: &Subject,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<AvailabilityOverride>, DomainError> {
        let rows: Vec<OverrideRow> = sqlx::query_as(&format!(
            r#"
            SELECT {OVERRIDE_COLUMNS}
            FROM availability_overrides
            WHERE subject_kind = $1
              AND subject_id = $2
              AND ($3::date IS NULL OR date >= $3)
              AND ($4::date IS NULL OR date <= $4)
            ORDER BY date
            "#
        ))
        .bind(subject.kind().as_str())
        .bind(subject.id())
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list availability: {}", e)))?;

        rows.into_iter().map(AvailabilityOverride::try_from).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::ErrorCode;

    fn row(kind: &str) -> OverrideRow {
        let now = Utc::now();
        OverrideRow {
            subject_kind: kind.to_string(),
            subject_id: "101".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 5, 1).unwrap(),
            is_available: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn row_converts_to_override() {
        let entry = AvailabilityOverride::try_from(row("room")).unwrap();
        assert_eq!(entry.subject, Subject::room("101").unwrap());
        assert!(!entry.is_available);
    }

    #[test]
    fn row_with_unknown_kind_is_rejected() {
        let err = AvailabilityOverride::try_from(row("desk")).unwrap_err();
        assert_eq!(err.code, ErrorCode::DatabaseError);
    }
}
