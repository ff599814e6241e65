//! PostgreSQL implementation of ReservationRepository.
//!
//! Check-then-insert runs in a SERIALIZABLE transaction. The schema also
//! carries an exclusion constraint over confirmed intervals, so a racing
//! confirmation that slips past the application check still fails with
//! SQLSTATE 23P01, which is reported as `ErrorCode::SubjectUnavailable`.
//! Status writes are conditional on the status the caller read, so two
//! racing transitions out of the same state cannot both land.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use crate::domain::foundation::{
    DateRange, DomainError, ErrorCode, ReservationId, Timestamp, UserId,
};
use crate::domain::reservation::{
    BlockingPolicy, Reservation, ReservationStatus, Subject, SubjectKind,
};
use crate::ports::{InsertOutcome, ReservationPage, ReservationRepository};

/// SQLSTATE for exclusion constraint violations.
const EXCLUSION_VIOLATION: &str = "23P01";

/// SQLSTATE for serialization failures under SERIALIZABLE isolation.
const SERIALIZATION_FAILURE: &str = "40001";

/// Attempts for a check-then-insert that keeps losing serialization races.
const MAX_SERIALIZABLE_ATTEMPTS: u32 = 3;

const RESERVATION_COLUMNS: &str =
    "id, user_id, subject_kind, subject_id, start_at, end_at, status, created_at, updated_at";

/// PostgreSQL implementation of the ReservationRepository port.
#[derive(Clone)]
pub struct PostgresReservationRepository {
    pool: PgPool,
}

impl PostgresReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn try_create_if_available(
        &self,
        reservation: &Reservation,
        policy: BlockingPolicy,
    ) -> Result<InsertOutcome, sqlx::Error> {
        let mut tx = self.pool.begin().await?;
        set_transaction_serializable(&mut tx).await?;

        let conflicts: Vec<ReservationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE subject_kind = $1
              AND subject_id = $2
              AND start_at < $4
              AND $3 < end_at
              AND status = ANY($5)
            ORDER BY start_at
            "#
        ))
        .bind(reservation.subject.kind().as_str())
        .bind(reservation.subject.id())
        .bind(reservation.interval.start().as_datetime())
        .bind(reservation.interval.end().as_datetime())
        .bind(status_names(policy))
        .fetch_all(&mut *tx)
        .await?;

        if !conflicts.is_empty() {
            tx.rollback().await?;
            let conflicts = conflicts
                .into_iter()
                .filter_map(|row| Reservation::try_from(row).ok())
                .collect();
            return Ok(InsertOutcome::Conflicts(conflicts));
        }

        insert(&mut *tx, reservation).await?;
        tx.commit().await?;
        Ok(InsertOutcome::Inserted)
    }
}

/// Database row representation of a reservation.
#[derive(Debug, sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    user_id: String,
    subject_kind: String,
    subject_id: String,
    start_at: DateTime<Utc>,
    end_at: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = DomainError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let kind: SubjectKind = row.subject_kind.parse().map_err(|_| {
            DomainError::database(format!("Invalid subject kind: {}", row.subject_kind))
        })?;
        let status: ReservationStatus = row
            .status
            .parse()
            .map_err(|_| DomainError::database(format!("Invalid status value: {}", row.status)))?;
        let subject = Subject::new(kind, row.subject_id)
            .map_err(|e| DomainError::database(format!("Invalid subject: {}", e)))?;
        let interval = DateRange::new(
            Timestamp::from_datetime(row.start_at),
            Timestamp::from_datetime(row.end_at),
        )
        .map_err(|e| DomainError::database(format!("Invalid interval: {}", e)))?;

        Ok(Reservation {
            id: ReservationId::from_uuid(row.id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            subject,
            interval,
            status,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

fn status_names(policy: BlockingPolicy) -> Vec<String> {
    policy
        .blocking_statuses()
        .iter()
        .map(|s| s.as_str().to_string())
        .collect()
}

fn modifiable_status_names() -> Vec<String> {
    ReservationStatus::ALL
        .iter()
        .filter(|s| s.is_modifiable())
        .map(|s| s.as_str().to_string())
        .collect()
}

fn sqlstate(err: &sqlx::Error) -> Option<String> {
    match err {
        sqlx::Error::Database(db) => db.code().map(|c| c.into_owned()),
        _ => None,
    }
}

/// Maps driver errors, turning exclusion violations into availability errors.
fn map_db_error(operation: &str, err: sqlx::Error) -> DomainError {
    if sqlstate(&err).as_deref() == Some(EXCLUSION_VIOLATION) {
        return DomainError::new(
            ErrorCode::SubjectUnavailable,
            "Subject already has a confirmed reservation in that interval",
        );
    }
    DomainError::new(
        ErrorCode::DatabaseError,
        format!("Failed to {}: {}", operation, err),
    )
}

async fn set_transaction_serializable(
    tx: &mut Transaction<'_, Postgres>,
) -> Result<(), sqlx::Error> {
    sqlx::query("SET TRANSACTION ISOLATION LEVEL SERIALIZABLE")
        .execute(&mut **tx)
        .await?;
    Ok(())
}

async fn insert<'e, E>(executor: E, reservation: &Reservation) -> Result<(), sqlx::Error>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO reservations (
            id, user_id, subject_kind, subject_id, start_at, end_at,
            status, created_at, updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        "#,
    )
    .bind(reservation.id.as_uuid())
    .bind(reservation.user_id.as_str())
    .bind(reservation.subject.kind().as_str())
    .bind(reservation.subject.id())
    .bind(reservation.interval.start().as_datetime())
    .bind(reservation.interval.end().as_datetime())
    .bind(reservation.status.as_str())
    .bind(reservation.created_at.as_datetime())
    .bind(reservation.updated_at.as_datetime())
    .execute(executor)
    .await?;
    Ok(())
}

fn rows_to_reservations(rows: Vec<ReservationRow>) -> Result<Vec<Reservation>, DomainError> {
    rows.into_iter().map(Reservation::try_from).collect()
}

#[async_trait]
impl ReservationRepository for PostgresReservationRepository {
    async fn create(&self, reservation: &Reservation) -> Result<(), DomainError> {
        insert(&self.pool, reservation)
            .await
            .map_err(|e| map_db_error("insert reservation", e))
    }

    async fn create_if_available(
        &self,
        reservation: &Reservation,
        policy: BlockingPolicy,
    ) -> Result<InsertOutcome, DomainError> {
        let mut attempt = 1;
        loop {
            match self.try_create_if_available(reservation, policy).await {
                Ok(outcome) => return Ok(outcome),
                Err(e)
                    if sqlstate(&e).as_deref() == Some(SERIALIZATION_FAILURE)
                        && attempt < MAX_SERIALIZABLE_ATTEMPTS =>
                {
                    tracing::debug!(
                        reservation_id = %reservation.id,
                        attempt,
                        "Serialization failure on reservation insert, retrying"
                    );
                    attempt += 1;
                }
                Err(e) => return Err(map_db_error("insert reservation", e)),
            }
        }
    }

    async fn update(
        &self,
        id: &ReservationId,
        interval: &DateRange,
    ) -> Result<Option<Reservation>, DomainError> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            r#"
            UPDATE reservations SET
                start_at = $2,
                end_at = $3,
                updated_at = NOW()
            WHERE id = $1
              AND status = ANY($4)
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(interval.start().as_datetime())
        .bind(interval.end().as_datetime())
        .bind(modifiable_status_names())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("reschedule reservation", e))?;

        row.map(Reservation::try_from).transpose()
    }

    async fn find_by_id(&self, id: &ReservationId) -> Result<Option<Reservation>, DomainError> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            "SELECT {RESERVATION_COLUMNS} FROM reservations WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("fetch reservation", e))?;

        row.map(Reservation::try_from).transpose()
    }

    async fn update_status(
        &self,
        id: &ReservationId,
        from: ReservationStatus,
        to: ReservationStatus,
    ) -> Result<Option<Reservation>, DomainError> {
        let row: Option<ReservationRow> = sqlx::query_as(&format!(
            r#"
            UPDATE reservations SET status = $3, updated_at = NOW()
            WHERE id = $1
              AND status = $2
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| map_db_error("update reservation status", e))?;

        row.map(Reservation::try_from).transpose()
    }

    async fn find_by_user_id(
        &self,
        user_id: &UserId,
        page: u32,
        limit: u32,
    ) -> Result<ReservationPage, DomainError> {
        let offset = i64::from(page.saturating_sub(1)) * i64::from(limit);

        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE user_id = $1
            ORDER BY created_at DESC, id
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(user_id.as_str())
        .bind(i64::from(limit))
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("fetch reservations by user", e))?;

        let total: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM reservations WHERE user_id = $1")
            .bind(user_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_db_error("count reservations by user", e))?;

        Ok(ReservationPage {
            items: rows_to_reservations(rows)?,
            total: total.0.max(0) as u64,
        })
    }

    async fn check_availability(
        &self,
        subject: &Subject,
        interval: &DateRange,
        policy: BlockingPolicy,
        exclude: Option<ReservationId>,
    ) -> Result<Vec<Reservation>, DomainError> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE subject_kind = $1
              AND subject_id = $2
              AND start_at < $4
              AND $3 < end_at
              AND status = ANY($5)
              AND ($6::uuid IS NULL OR id <> $6)
            ORDER BY start_at
            "#
        ))
        .bind(subject.kind().as_str())
        .bind(subject.id())
        .bind(interval.start().as_datetime())
        .bind(interval.end().as_datetime())
        .bind(status_names(policy))
        .bind(exclude.map(|id| *id.as_uuid()))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("check availability", e))?;

        rows_to_reservations(rows)
    }

    async fn find_by_subject_and_range(
        &self,
        subject: &Subject,
        interval: &DateRange,
    ) -> Result<Vec<Reservation>, DomainError> {
        let rows: Vec<ReservationRow> = sqlx::query_as(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE subject_kind = $1
              AND subject_id = $2
              AND start_at < $4
              AND $3 < end_at
            ORDER BY start_at
            "#
        ))
        .bind(subject.kind().as_str())
        .bind(subject.id())
        .bind(interval.start().as_datetime())
        .bind(interval.end().as_datetime())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_db_error("fetch reservations by subject", e))?;

        rows_to_reservations(rows)
    }
}
