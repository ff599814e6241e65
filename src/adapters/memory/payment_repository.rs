//! In-memory payment store.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::foundation::{DomainError, ReservationId, Timestamp};
use crate::domain::payment::{Payment, PaymentStatus};
use crate::ports::PaymentRepository;

#[derive(Debug, Clone, Default)]
pub struct InMemoryPaymentRepository {
    payments: Arc<RwLock<Vec<Payment>>>,
}

impl InMemoryPaymentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn all(&self) -> Vec<Payment> {
        self.payments.read().await.clone()
    }
}

#[async_trait]
impl PaymentRepository for InMemoryPaymentRepository {
    async fn save(&self, payment: &Payment) -> Result<(), DomainError> {
        let mut payments = self.payments.write().await;
        match payments.iter_mut().find(|p| p.id == payment.id) {
            Some(existing) => *existing = payment.clone(),
            None => payments.push(payment.clone()),
        }
        Ok(())
    }

    async fn find_by_reservation_id(
        &self,
        reservation_id: &ReservationId,
    ) -> Result<Vec<Payment>, DomainError> {
        let payments = self.payments.read().await;
        let mut found: Vec<Payment> = payments
            .iter()
            .filter(|p| &p.reservation_id == reservation_id)
            .cloned()
            .collect();
        found.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(found)
    }

    async fn transition_for_reservation(
        &self,
        reservation_id: &ReservationId,
        from: PaymentStatus,
        to: PaymentStatus,
    ) -> Result<u64, DomainError> {
        let mut payments = self.payments.write().await;
        let now = Timestamp::now();
        let mut changed = 0;
        for payment in payments
            .iter_mut()
            .filter(|p| &p.reservation_id == reservation_id && p.status == from)
        {
            payment.status = to;
            payment.updated_at = now;
            changed += 1;
        }
        Ok(changed)
    }
}
