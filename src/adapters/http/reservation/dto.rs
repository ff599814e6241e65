//! Request and response DTOs for the reservation HTTP API.
//!
//! Timestamps travel as RFC 3339 strings, amounts as integer minor units.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::application::handlers::reservation::{
    CancelWithRefundResult, CreateReservationResult, ReservationList, RetryCheckoutResult,
};
use crate::domain::foundation::Timestamp;
use crate::domain::payment::Payment;
use crate::domain::reservation::{
    AvailabilityOverride, AvailabilityReport, ExtensionQuote, HistoryAction, HistoryEntry, Reservation,
    ReservationStatus, SubjectKind,
};
use crate::ports::{IntentStatus, Refund};

fn rfc3339(ts: &Timestamp) -> String {
    ts.as_datetime().to_rfc3339()
}

// ════════════════════════════════════════════════════════════════════════════════
// Requests
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectRequest {
    pub kind: SubjectKind,
    pub id: String,
}

/// Body of `POST /api/reservations`.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateReservationRequest {
    pub subject: SubjectRequest,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    /// Minor units.
    pub amount: i64,
    /// Falls back to the configured booking currency.
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_method: Option<String>,
}

/// Body of `PUT /api/reservations/:id`.
#[derive(Debug, Clone, Deserialize)]
pub struct RescheduleReservationRequest {
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: ReservationStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelReservationRequest {
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CancelWithRefundRequest {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub refund_reason: Option<String>,
    /// Minor units; full refund when absent.
    #[serde(default)]
    pub refund_amount: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RetryCheckoutRequest {
    #[serde(default)]
    pub payment_method_id: Option<String>,
    #[serde(default)]
    pub use_new_payment_method: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CheckAvailabilityRequest {
    pub subject: SubjectRequest,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
}

/// Query string of `GET /api/reservations`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListReservationsParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_limit")]
    pub limit: u32,
}

fn default_page() -> u32 {
    1
}

fn default_limit() -> u32 {
    10
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionCostParams {
    pub new_end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExtensionSuggestionsParams {
    pub requested_end_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetAvailabilityRequest {
    pub is_available: bool,
}

/// Inclusive `YYYY-MM-DD` bounds for the override listing.
#[derive(Debug, Clone, Deserialize)]
pub struct AvailabilityOverrideParams {
    #[serde(default)]
    pub from: Option<NaiveDate>,
    #[serde(default)]
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OccupancyParams {
    #[serde(default)]
    pub period: Option<String>,
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,
}

// ════════════════════════════════════════════════════════════════════════════════
// Responses
// ════════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
pub struct SubjectResponse {
    pub kind: SubjectKind,
    pub id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationResponse {
    pub id: String,
    pub user_id: String,
    pub subject: SubjectResponse,
    pub start_date: String,
    pub end_date: String,
    pub status: ReservationStatus,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Reservation> for ReservationResponse {
    fn from(r: Reservation) -> Self {
        Self {
            id: r.id.to_string(),
            user_id: r.user_id.to_string(),
            subject: SubjectResponse {
                kind: r.subject.kind(),
                id: r.subject.id().to_string(),
            },
            start_date: rfc3339(&r.interval.start()),
            end_date: rfc3339(&r.interval.end()),
            status: r.status,
            created_at: rfc3339(&r.created_at),
            updated_at: rfc3339(&r.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityOverrideResponse {
    pub subject: SubjectResponse,
    pub date: NaiveDate,
    pub is_available: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<AvailabilityOverride> for AvailabilityOverrideResponse {
    fn from(o: AvailabilityOverride) -> Self {
        Self {
            subject: SubjectResponse {
                kind: o.subject.kind(),
                id: o.subject.id().to_string(),
            },
            date: o.date,
            is_available: o.is_available,
            created_at: rfc3339(&o.created_at),
            updated_at: rfc3339(&o.updated_at),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityOverrideListResponse {
    pub overrides: Vec<AvailabilityOverrideResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryEntryResponse {
    pub timestamp: String,
    pub action: HistoryAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_value: Option<ReservationStatus>,
    pub new_value: ReservationStatus,
    pub user_id: String,
}

impl From<HistoryEntry> for HistoryEntryResponse {
    fn from(entry: HistoryEntry) -> Self {
        Self {
            timestamp: rfc3339(&entry.timestamp),
            action: entry.action,
            old_value: entry.old_value,
            new_value: entry.new_value,
            user_id: entry.user_id.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationHistoryResponse {
    pub reservation_id: String,
    pub history: Vec<HistoryEntryResponse>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PaymentResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
    pub method: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id.to_string(),
            amount: p.amount,
            currency: p.currency.as_str().to_string(),
            status: p.status.to_string(),
            method: p.method,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CreateReservationResponse {
    pub reservation: ReservationResponse,
    pub payment: PaymentResponse,
    pub checkout_session_id: String,
    pub checkout_url: String,
}

impl From<CreateReservationResult> for CreateReservationResponse {
    fn from(result: CreateReservationResult) -> Self {
        Self {
            reservation: result.reservation.into(),
            payment: result.payment.into(),
            checkout_session_id: result.checkout.id,
            checkout_url: result.checkout.url,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ReservationListResponse {
    pub items: Vec<ReservationResponse>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u64,
}

impl From<ReservationList> for ReservationListResponse {
    fn from(list: ReservationList) -> Self {
        Self {
            items: list.items.into_iter().map(Into::into).collect(),
            total: list.total,
            page: list.page,
            limit: list.limit,
            total_pages: list.total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AvailabilityResponse {
    pub is_available: bool,
    pub conflicting_reservations: Vec<ReservationResponse>,
    pub blocked_dates: Vec<NaiveDate>,
}

impl From<AvailabilityReport> for AvailabilityResponse {
    fn from(report: AvailabilityReport) -> Self {
        Self {
            is_available: report.is_available,
            conflicting_reservations: report.conflicts.into_iter().map(Into::into).collect(),
            blocked_dates: report.blocked_dates,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionCostResponse {
    pub can_extend: bool,
    pub additional_cost: i64,
    pub currency: String,
    pub new_end_date: String,
    pub conflicting_reservations: Vec<String>,
    pub blocked_dates: Vec<NaiveDate>,
    pub extended_duration_hours: f64,
}

impl From<ExtensionQuote> for ExtensionCostResponse {
    fn from(quote: ExtensionQuote) -> Self {
        Self {
            can_extend: quote.can_extend,
            additional_cost: quote.additional_cost,
            currency: quote.currency.as_str().to_string(),
            new_end_date: rfc3339(&quote.new_end_date),
            conflicting_reservations: quote
                .conflicting_reservations
                .iter()
                .map(ToString::to_string)
                .collect(),
            blocked_dates: quote.blocked_dates,
            extended_duration_hours: quote.extended_duration_hours,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExtensionSuggestionsResponse {
    pub suggestions: Vec<String>,
}

impl From<Vec<Timestamp>> for ExtensionSuggestionsResponse {
    fn from(suggestions: Vec<Timestamp>) -> Self {
        Self {
            suggestions: suggestions.iter().map(rfc3339).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefundResponse {
    pub id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl From<Refund> for RefundResponse {
    fn from(refund: Refund) -> Self {
        Self {
            id: refund.id,
            amount: refund.amount,
            currency: refund.currency,
            status: refund.status,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct CancelWithRefundResponse {
    pub reservation: ReservationResponse,
    pub refund: RefundResponse,
}

impl From<CancelWithRefundResult> for CancelWithRefundResponse {
    fn from(result: CancelWithRefundResult) -> Self {
        Self {
            reservation: result.reservation.into(),
            refund: result.refund.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RetryCheckoutResponse {
    CheckoutCreated {
        checkout_session_id: String,
        checkout_url: String,
        payment: PaymentResponse,
    },
    PaymentConfirmed {
        payment_intent_id: String,
        status: IntentStatus,
        reservation_confirmed: bool,
    },
}

impl From<RetryCheckoutResult> for RetryCheckoutResponse {
    fn from(result: RetryCheckoutResult) -> Self {
        match result {
            RetryCheckoutResult::CheckoutCreated { checkout, payment } => {
                RetryCheckoutResponse::CheckoutCreated {
                    checkout_session_id: checkout.id,
                    checkout_url: checkout.url,
                    payment: payment.into(),
                }
            }
            RetryCheckoutResult::PaymentConfirmed {
                payment_intent_id,
                status,
                reservation_confirmed,
            } => RetryCheckoutResponse::PaymentConfirmed {
                payment_intent_id,
                status,
                reservation_confirmed,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct WebhookAckResponse {
    pub received: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

/// Standard error body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error_code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ErrorResponse {
    pub fn new(error_code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(
        error_code: impl Into<String>,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self {
            error_code: error_code.into(),
            message: message.into(),
            details: Some(details),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::foundation::{CurrencyCode, DateRange, UserId};
    use crate::domain::reservation::Subject;

    fn reservation() -> Reservation {
        let start = Timestamp::from_datetime(
            DateTime::parse_from_rfc3339("2026-03-01T14:00:00Z")
                .unwrap()
                .with_timezone(&Utc),
        );
        Reservation::new(
            UserId::new("guest-1").unwrap(),
            Subject::room("101").unwrap(),
            DateRange::new(start, start.plus_hours(3)).unwrap(),
            start,
        )
    }

    #[test]
    fn reservation_response_flattens_subject_and_dates() {
        let json = serde_json::to_value(ReservationResponse::from(reservation())).unwrap();

        assert_eq!(json["subject"]["kind"], "room");
        assert_eq!(json["subject"]["id"], "101");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["start_date"], "2026-03-01T14:00:00+00:00");
        assert_eq!(json["end_date"], "2026-03-01T17:00:00+00:00");
    }

    #[test]
    fn create_request_accepts_minimal_body() {
        let request: CreateReservationRequest = serde_json::from_str(
            r#"{
                "subject": {"kind": "resource", "id": "parking-7"},
                "start_date": "2026-03-01T09:00:00Z",
                "end_date": "2026-03-01T11:00:00Z",
                "amount": 5000
            }"#,
        )
        .unwrap();

        assert_eq!(request.subject.kind, SubjectKind::Resource);
        assert!(request.currency.is_none());
        assert!(request.payment_method.is_none());
    }

    #[test]
    fn create_request_rejects_unknown_subject_kind() {
        let result: Result<CreateReservationRequest, _> = serde_json::from_str(
            r#"{
                "subject": {"kind": "castle", "id": "1"},
                "start_date": "2026-03-01T09:00:00Z",
                "end_date": "2026-03-01T11:00:00Z",
                "amount": 5000
            }"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn list_params_default_to_first_page_of_ten() {
        let params: ListReservationsParams = serde_json::from_str("{}").unwrap();
        assert_eq!(params.page, 1);
        assert_eq!(params.limit, 10);
    }

    #[test]
    fn retry_response_is_tagged_by_outcome() {
        let response = RetryCheckoutResponse::PaymentConfirmed {
            payment_intent_id: "pi_1".to_string(),
            status: IntentStatus::RequiresAction,
            reservation_confirmed: false,
        };
        let json = serde_json::to_value(response).unwrap();

        assert_eq!(json["outcome"], "payment_confirmed");
        assert_eq!(json["status"], "requires_action");
    }

    #[test]
    fn extension_cost_response_formats_currency_and_ids() {
        let quote = ExtensionQuote {
            can_extend: false,
            additional_cost: 50,
            currency: CurrencyCode::new("eur").unwrap(),
            new_end_date: reservation().interval.end(),
            conflicting_reservations: vec![reservation().id],
            blocked_dates: vec![NaiveDate::from_ymd_opt(2026, 5, 2).unwrap()],
            extended_duration_hours: 2.0,
        };

        let response = ExtensionCostResponse::from(quote);

        assert_eq!(response.currency, "eur");
        assert_eq!(response.conflicting_reservations.len(), 1);
        assert_eq!(
            serde_json::to_value(&response).unwrap()["blocked_dates"][0],
            "2026-05-02"
        );
    }

    #[test]
    fn error_response_omits_empty_details() {
        let json = serde_json::to_value(ErrorResponse::new("NOT_FOUND", "missing")).unwrap();
        assert!(json.get("details").is_none());
    }
}
