//! Payment attempt entity.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::domain::foundation::{
    CurrencyCode, PaymentId, ReservationId, StateMachine, Timestamp, UserId, ValidationError,
};

/// Settlement status of a payment attempt.
///
/// Driven by gateway webhooks and refunds only; clients never set it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
    Refunded,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Refunded => "refunded",
        }
    }
}

impl StateMachine for PaymentStatus {
    fn can_transition_to(&self, target: &Self) -> bool {
        use PaymentStatus::*;
        matches!(
            (self, target),
            (Pending, Paid) | (Pending, Failed) | (Failed, Paid) | (Paid, Refunded)
        )
    }

    fn valid_transitions(&self) -> Vec<Self> {
        use PaymentStatus::*;
        match self {
            Pending => vec![Paid, Failed],
            // A declined intent can still succeed after the guest retries the card.
            Failed => vec![Paid],
            Paid => vec![Refunded],
            Refunded => vec![],
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(PaymentStatus::Pending),
            "paid" => Ok(PaymentStatus::Paid),
            "failed" => Ok(PaymentStatus::Failed),
            "refunded" => Ok(PaymentStatus::Refunded),
            other => Err(ValidationError::invalid_format(
                "payment_status",
                format!("unknown payment status '{}'", other),
            )),
        }
    }
}

/// One attempt to pay for a reservation.
///
/// A reservation may accumulate several attempts (retried checkouts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub reservation_id: ReservationId,
    pub user_id: UserId,
    /// Minor units (cents).
    pub amount: i64,
    pub currency: CurrencyCode,
    pub status: PaymentStatus,
    pub method: String,
    /// Gateway checkout session or payment intent id.
    pub provider_reference: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Payment {
    pub fn pending(
        reservation_id: ReservationId,
        user_id: UserId,
        amount: i64,
        currency: CurrencyCode,
        method: impl Into<String>,
        now: Timestamp,
    ) -> Result<Self, ValidationError> {
        if amount <= 0 {
            return Err(ValidationError::out_of_range("amount", 1, i64::MAX, amount));
        }
        Ok(Self {
            id: PaymentId::new(),
            reservation_id,
            user_id,
            amount,
            currency,
            status: PaymentStatus::Pending,
            method: method.into(),
            provider_reference: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn with_provider_reference(mut self, reference: impl Into<String>) -> Self {
        self.provider_reference = Some(reference.into());
        self
    }
}
