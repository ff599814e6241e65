//! ListReservationsHandler - Query handler for a user's reservations.

use std::sync::Arc;

use crate::domain::foundation::UserId;
use crate::domain::reservation::{Reservation, ReservationError};
use crate::ports::ReservationRepository;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Query to list reservations for a user.
#[derive(Debug, Clone)]
pub struct ListReservationsQuery {
    pub user_id: UserId,
    /// 1-based.
    pub page: u32,
    pub limit: u32,
}

/// One page of reservations with paging totals.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservationList {
    pub items: Vec<Reservation>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

pub struct ListReservationsHandler {
    repository: Arc<dyn ReservationRepository>,
}

impl ListReservationsHandler {
    pub fn new(repository: Arc<dyn ReservationRepository>) -> Self {
        Self { repository }
    }

    pub async fn handle(
        &self,
        query: ListReservationsQuery,
    ) -> Result<ReservationList, ReservationError> {
        if query.page < 1 {
            return Err(ReservationError::invalid_argument(
                "page",
                "page must be at least 1",
            ));
        }
        if query.limit < 1 || query.limit > MAX_PAGE_SIZE {
            return Err(ReservationError::invalid_argument(
                "limit",
                format!("limit must be between 1 and {}", MAX_PAGE_SIZE),
            ));
        }

        let page = self
            .repository
            .find_by_user_id(&query.user_id, query.page, query.limit)
            .await?;

        Ok(ReservationList {
            total_pages: page.total.div_ceil(u64::from(query.limit)),
            items: page.items,
            total: page.total,
            page: query.page,
            limit: query.limit,
        })
    }
}
