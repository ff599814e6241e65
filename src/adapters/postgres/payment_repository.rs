//! PostgreSQL implementation of PaymentRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::foundation::{
    CurrencyCode, DomainError, ErrorCode, PaymentId, ReservationId, Timestamp, UserId,
};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::ports::PaymentRepository;

/// PostgreSQL implementation of the PaymentRepository port.
#[derive(Clone)]
pub struct PostgresPaymentRepository {
    pool: PgPool,
}

impl PostgresPaymentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a payment attempt.
#[derive(Debug, sqlx::FromRow)]
struct PaymentRow {
    id: Uuid,
    reservation_id: Uuid,
    user_id: String,
    amount: i64,
    currency: String,
    status: String,
    method: String,
    provider_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for Payment {
    type Error = DomainError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let status: PaymentStatus = row.status.parse().map_err(|_| {
            DomainError::new(
                ErrorCode::DatabaseError,
                format!("Invalid payment status: {}", row.status),
            )
        })?;

        Ok(Payment {
            id: PaymentId::from_uuid(row.id),
            reservation_id: ReservationId::from_uuid(row.reservation_id),
            user_id: UserId::new(row.user_id)
                .map_err(|e| DomainError::database(format!("Invalid user_id: {}", e)))?,
            amount: row.amount,
            currency: CurrencyCode::new(&row.currency)
                .map_err(|e| DomainError::database(format!("Invalid currency: {}", e)))?,
            status,
            method: row.method,
            provider_reference: row.provider_reference,
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl PaymentRepository for PostgresPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            INSERT INTO payments (
                id, reservation_id, user_id, amount, currency, status, method,
                provider_reference, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            ON CONFLICT (id) DO UPDATE SET
                status = EXCLUDED.status,
                provider_reference = EXCLUDED.provider_reference,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(payment.id.as_uuid())
        .bind(payment.reservation_id.as_uuid())
        .bind(payment.user_id.as_str())
        .bind(payment.amount)
        .bind(payment.currency.as_str())
        .bind(payment.status.as_str())
        .bind(&payment.method)
        .bind(&payment.provider_reference)
        .bind(payment.created_at.as_datetime())
        .bind(payment.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to save payment: {}", e)))?;

        Ok(())
    }

    async fn find_by_reservation_id(
        &self,
        reservation_id: &ReservationId,
    ) -> Result<Vec<Payment>, DomainError> {
        let rows: Vec<PaymentRow> = sqlx::query_as(
            r#"
            SELECT id, reservation_id, user_id, amount, currency, status, method,
                   provider_reference, created_at, updated_at
            FROM payments
            WHERE reservation_id = $1
            ORDER BY created_at
            "#,
        )
        .bind(reservation_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to fetch payments: {}", e)))?;

        rows.into_iter().map(Payment::try_from).collect()
    }

    async fn transition_for_reservation(
        &self,
        reservation_id: &ReservationId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<u64, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE payments SET status = $3, updated_at = NOW()
            WHERE reservation_id = $1 AND status = $2
            "#,
        )
        .bind(reservation_id.as_uuid())
        .bind(from.as_str())
        .bind(to.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to update payments: {}", e)))?;

        Ok(result.rows_affected())
    }
}
