//! HTTP handlers for reservation endpoints.
//!
//! These handlers connect Axum routes to application layer command/query handlers.

use std::sync::Arc;

use axum::extract::{Json, Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use chrono::{FixedOffset, NaiveDate};
use serde_json::json;

use crate::application::handlers::payment::{
    HandlePaymentWebhookCommand, HandlePaymentWebhookHandler,
};
use crate::application::handlers::reservation::{
    Actor, AvailabilityOverrideService, AvailabilityService, CancelReservationCommand,
    CancelReservationHandler, CancelWithRefundCommand, CancelWithRefundHandler,
    CheckAvailabilityQuery, CheckoutUrls, CreateReservationCommand, CreateReservationHandler,
    ExtensionCostQuery, ExtensionPricingService, GetReservationHandler, GetReservationQuery,
    ListAvailabilityQuery, ListReservationsHandler, ListReservationsQuery, OccupancyStatsHandler,
    OccupancyStatsQuery, RescheduleReservationCommand, RescheduleReservationHandler,
    ReservationStatusService, RetryCheckoutCommand, RetryCheckoutHandler, SetAvailabilityCommand,
    SuggestExtensionsQuery,
};
use crate::config::{BookingConfig, PaymentConfig, ValidationError};
use crate::domain::foundation::{CurrencyCode, DateRange, ReservationId, Timestamp, UserId};
use crate::domain::reservation::{
    BlockingPolicy, ExtensionPolicy, ReservationError, StatsPeriod, Subject, SubjectKind,
};
use crate::ports::{
    AvailabilityOverrideRepository, PaymentProvider, PaymentRepository, ReservationRepository,
};

use super::dto::{
    AvailabilityOverrideListResponse, AvailabilityOverrideParams, AvailabilityOverrideResponse,
    AvailabilityResponse, CancelReservationRequest, CancelWithRefundRequest,
    CancelWithRefundResponse, CheckAvailabilityRequest, CreateReservationRequest,
    CreateReservationResponse, ErrorResponse, ExtensionCostParams, ExtensionCostResponse,
    ExtensionSuggestionsParams, ExtensionSuggestionsResponse, HealthResponse,
    ListReservationsParams, OccupancyParams, RescheduleReservationRequest,
    ReservationHistoryResponse, ReservationListResponse, ReservationResponse,
    RetryCheckoutRequest, RetryCheckoutResponse, SetAvailabilityRequest, SubjectRequest,
    UpdateStatusRequest, WebhookAckResponse,
};

const DEFAULT_PAYMENT_METHOD: &str = "card";

// ════════════════════════════════════════════════════════════════════════════════
// Application State
// ════════════════════════════════════════════════════════════════════════════════

/// Booking rules shared by every request.
#[derive(Debug, Clone)]
pub struct BookingSettings {
    pub blocking_policy: BlockingPolicy,
    pub extension_policy: ExtensionPolicy,
    pub checkout_urls: CheckoutUrls,
    /// Offset of the property's local time, used for statistics windows.
    pub utc_offset: FixedOffset,
}

impl BookingSettings {
    pub fn from_config(
        booking: &BookingConfig,
        payment: &PaymentConfig,
    ) -> Result<Self, ValidationError> {
        Ok(Self {
            blocking_policy: booking.blocking_policy,
            extension_policy: booking.extension_policy()?,
            checkout_urls: payment.checkout_urls(),
            utc_offset: booking.utc_offset()?,
        })
    }

    fn default_currency(&self) -> CurrencyCode {
        self.extension_policy.currency.clone()
    }
}

/// Shared application state containing all dependencies.
///
/// Cloned per request; the adapters behind the Arcs are shared.
#[derive(Clone)]
pub struct ReservationAppState {
    pub reservation_repository: Arc<dyn ReservationRepository>,
    pub payment_repository: Arc<dyn PaymentRepository>,
    pub payment_provider: Arc<dyn PaymentProvider>,
    pub availability_overrides: Arc<dyn AvailabilityOverrideRepository>,
    pub booking: BookingSettings,
}

impl ReservationAppState {
    fn status_service(&self) -> ReservationStatusService {
        ReservationStatusService::new(self.reservation_repository.clone())
    }

    pub fn create_reservation_handler(&self) -> CreateReservationHandler {
        CreateReservationHandler::new(
            self.reservation_repository.clone(),
            self.payment_repository.clone(),
            self.payment_provider.clone(),
            self.booking.blocking_policy,
            self.booking.checkout_urls.clone(),
        )
        .with_overrides(self.availability_overrides.clone())
    }

    pub fn get_reservation_handler(&self) -> GetReservationHandler {
        GetReservationHandler::new(self.reservation_repository.clone())
    }

    pub fn list_reservations_handler(&self) -> ListReservationsHandler {
        ListReservationsHandler::new(self.reservation_repository.clone())
    }

    pub fn reschedule_handler(&self) -> RescheduleReservationHandler {
        RescheduleReservationHandler::new(
            self.reservation_repository.clone(),
            self.booking.blocking_policy,
        )
        .with_overrides(self.availability_overrides.clone())
    }

    pub fn cancel_handler(&self) -> CancelReservationHandler {
        CancelReservationHandler::new(self.status_service())
    }

    pub fn cancel_with_refund_handler(&self) -> CancelWithRefundHandler {
        CancelWithRefundHandler::new(
            self.reservation_repository.clone(),
            self.payment_repository.clone(),
            self.payment_provider.clone(),
        )
    }

    pub fn retry_checkout_handler(&self) -> RetryCheckoutHandler {
        RetryCheckoutHandler::new(
            self.reservation_repository.clone(),
            self.payment_repository.clone(),
            self.payment_provider.clone(),
            self.booking.checkout_urls.clone(),
        )
    }

    pub fn availability_service(&self) -> AvailabilityService {
        AvailabilityService::new(
            self.reservation_repository.clone(),
            self.booking.blocking_policy,
        )
        .with_overrides(self.availability_overrides.clone())
    }

    pub fn availability_override_service(&self) -> AvailabilityOverrideService {
        AvailabilityOverrideService::new(self.availability_overrides.clone())
    }

    pub fn extension_pricing_service(&self) -> ExtensionPricingService {
        ExtensionPricingService::new(
            self.reservation_repository.clone(),
            self.booking.extension_policy.clone(),
            self.booking.blocking_policy,
        )
        .with_overrides(self.availability_overrides.clone())
    }

    pub fn occupancy_stats_handler(&self) -> OccupancyStatsHandler {
        OccupancyStatsHandler::new(
            self.reservation_repository.clone(),
            self.booking.extension_policy.hourly_rate,
            self.booking.utc_offset,
        )
    }

    pub fn webhook_handler(&self) -> HandlePaymentWebhookHandler {
        HandlePaymentWebhookHandler::new(
            self.reservation_repository.clone(),
            self.payment_repository.clone(),
            self.payment_provider.clone(),
        )
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// User Context
// ════════════════════════════════════════════════════════════════════════════════

/// Caller identity, taken from the `X-User-Id` header set by the gateway
/// in front of this service.
#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub user_id: UserId,
}

/// Rejection type for AuthenticatedUser extraction.
pub struct AuthenticationRequired;

impl IntoResponse for AuthenticationRequired {
    fn into_response(self) -> axum::response::Response {
        let error = ErrorResponse::new("AUTHENTICATION_REQUIRED", "Authentication is required");
        (StatusCode::UNAUTHORIZED, Json(error)).into_response()
    }
}

impl<S> axum::extract::FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthenticationRequired;

    fn from_request_parts<'life0, 'life1, 'async_trait>(
        parts: &'life0 mut axum::http::request::Parts,
        _state: &'life1 S,
    ) -> std::pin::Pin<
        Box<dyn std::future::Future<Output = Result<Self, Self::Rejection>> + Send + 'async_trait>,
    >
    where
        'life0: 'async_trait,
        'life1: 'async_trait,
        Self: 'async_trait,
    {
        Box::pin(async move {
            let user_id = parts
                .headers
                .get("X-User-Id")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| UserId::new(s).ok())
                .ok_or(AuthenticationRequired)?;

            Ok(AuthenticatedUser { user_id })
        })
    }
}

// ════════════════════════════════════════════════════════════════════════════════
// Request parsing helpers
// ════════════════════════════════════════════════════════════════════════════════

fn parse_reservation_id(raw: &str) -> Result<ReservationId, ReservationError> {
    raw.parse()
        .map_err(|_| ReservationError::invalid_argument("id", "not a valid reservation id"))
}

fn parse_subject(subject: SubjectRequest) -> Result<Subject, ReservationError> {
    Ok(Subject::new(subject.kind, subject.id)?)
}

fn parse_path_subject(kind: &str, subject_id: String) -> Result<Subject, ReservationError> {
    let kind: SubjectKind = kind.parse()?;
    Ok(Subject::new(kind, subject_id)?)
}

fn parse_date(raw: &str) -> Result<NaiveDate, ReservationError> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| ReservationError::invalid_argument("date", "expected YYYY-MM-DD"))
}

fn parse_interval(
    start: chrono::DateTime<chrono::Utc>,
    end: chrono::DateTime<chrono::Utc>,
) -> Result<DateRange, ReservationError> {
    Ok(DateRange::new(
        Timestamp::from_datetime(start),
        Timestamp::from_datetime(end),
    )?)
}

// ════════════════════════════════════════════════════════════════════════════════
// Query Handlers (GET endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// GET /health - Liveness check
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok" })
}

/// GET /api/reservations - List the caller's reservations
pub async fn list_reservations(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Query(params): Query<ListReservationsParams>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let handler = state.list_reservations_handler();
    let query = ListReservationsQuery {
        user_id: user.user_id,
        page: params.page,
        limit: params.limit,
    };

    let result = handler.handle(query).await?;

    Ok(Json(ReservationListResponse::from(result)))
}

/// GET /api/reservations/:id - Get one of the caller's reservations
pub async fn get_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let handler = state.get_reservation_handler();
    let query = GetReservationQuery {
        reservation_id: parse_reservation_id(&id)?,
        user_id: user.user_id,
    };

    let reservation = handler.handle(query).await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

/// GET /api/reservations/:id/history - Creation and latest change
pub async fn get_reservation_history(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let reservation_id = parse_reservation_id(&id)?;
    let history = state
        .get_reservation_handler()
        .history(GetReservationQuery {
            reservation_id,
            user_id: user.user_id,
        })
        .await?;

    Ok(Json(ReservationHistoryResponse {
        reservation_id: reservation_id.to_string(),
        history: history.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/reservations/:id/extension-cost - Quote for a later end date
pub async fn get_extension_cost(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Query(params): Query<ExtensionCostParams>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let service = state.extension_pricing_service();
    let query = ExtensionCostQuery {
        reservation_id: parse_reservation_id(&id)?,
        new_end_date: Timestamp::from_datetime(params.new_end_date),
        requested_by: Some(user.user_id),
    };

    let quote = service.calculate_extension_cost(query).await?;

    Ok(Json(ExtensionCostResponse::from(quote)))
}

/// GET /api/reservations/:id/extension-suggestions - Free end dates near a request
pub async fn get_extension_suggestions(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Query(params): Query<ExtensionSuggestionsParams>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let service = state.availability_service();
    let query = SuggestExtensionsQuery {
        reservation_id: parse_reservation_id(&id)?,
        requested_end: Timestamp::from_datetime(params.requested_end_date),
        requested_by: Some(user.user_id),
    };

    let suggestions = service.suggest_extensions(query).await?;

    Ok(Json(ExtensionSuggestionsResponse::from(suggestions)))
}

/// GET /api/subjects/:kind/:subject_id/availability - Per-date overrides
pub async fn list_availability_overrides(
    State(state): State<ReservationAppState>,
    _user: AuthenticatedUser,
    Path((kind, subject_id)): Path<(String, String)>,
    Query(params): Query<AvailabilityOverrideParams>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let query = ListAvailabilityQuery {
        subject: parse_path_subject(&kind, subject_id)?,
        from: params.from,
        to: params.to,
    };

    let overrides = state.availability_override_service().list(query).await?;

    Ok(Json(AvailabilityOverrideListResponse {
        overrides: overrides.into_iter().map(Into::into).collect(),
    }))
}

/// GET /api/subjects/:kind/:subject_id/availability/:date - One override
pub async fn get_availability_override(
    State(state): State<ReservationAppState>,
    _user: AuthenticatedUser,
    Path((kind, subject_id, date)): Path<(String, String, String)>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let entry = state
        .availability_override_service()
        .get(parse_path_subject(&kind, subject_id)?, parse_date(&date)?)
        .await?;

    Ok(Json(AvailabilityOverrideResponse::from(entry)))
}

/// GET /api/stats/occupancy/:kind/:subject_id - Occupancy for one subject
pub async fn get_occupancy_stats(
    State(state): State<ReservationAppState>,
    _user: AuthenticatedUser,
    Path((kind, subject_id)): Path<(String, String)>,
    Query(params): Query<OccupancyParams>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let kind: SubjectKind = kind.parse().map_err(ReservationError::from)?;
    let period = match params.period.as_deref() {
        Some(raw) => raw.parse::<StatsPeriod>().map_err(ReservationError::from)?,
        None => StatsPeriod::default(),
    };

    let handler = state.occupancy_stats_handler();
    let query = OccupancyStatsQuery {
        subject: Subject::new(kind, subject_id).map_err(ReservationError::from)?,
        period,
        reference_date: params.start_date.map(Timestamp::from_datetime),
    };

    let stats = handler.handle(query).await?;

    Ok(Json(stats))
}

// ════════════════════════════════════════════════════════════════════════════════
// Command Handlers (POST/PUT endpoints)
// ════════════════════════════════════════════════════════════════════════════════

/// POST /api/reservations - Create a reservation and start checkout
pub async fn create_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateReservationRequest>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let currency = match request.currency.as_deref() {
        Some(code) => CurrencyCode::new(code).map_err(ReservationError::from)?,
        None => state.booking.default_currency(),
    };

    let handler = state.create_reservation_handler();
    let cmd = CreateReservationCommand {
        user_id: user.user_id,
        subject: parse_subject(request.subject)?,
        start_date: Timestamp::from_datetime(request.start_date),
        end_date: Timestamp::from_datetime(request.end_date),
        amount: request.amount,
        currency,
        payment_method: request
            .payment_method
            .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
    };

    let result = handler.handle(cmd).await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateReservationResponse::from(result)),
    ))
}

/// PUT /api/reservations/:id - Move a reservation's dates
pub async fn reschedule_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<RescheduleReservationRequest>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let handler = state.reschedule_handler();
    let cmd = RescheduleReservationCommand {
        reservation_id: parse_reservation_id(&id)?,
        user_id: user.user_id,
        start_date: request.start_date.map(Timestamp::from_datetime),
        end_date: request.end_date.map(Timestamp::from_datetime),
    };

    let reservation = handler.handle(cmd).await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

/// PUT /api/reservations/:id/status - Explicit status transition
pub async fn update_reservation_status(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateStatusRequest>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let reservation = state
        .status_service()
        .update_status(
            parse_reservation_id(&id)?,
            request.status,
            Actor::User(user.user_id),
        )
        .await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

/// PUT /api/reservations/:id/cancel - Cancel without refund
pub async fn cancel_reservation(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    request: Option<Json<CancelReservationRequest>>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let request = request.map(|Json(body)| body).unwrap_or_default();

    let handler = state.cancel_handler();
    let cmd = CancelReservationCommand {
        reservation_id: parse_reservation_id(&id)?,
        user_id: user.user_id,
        reason: request.reason,
    };

    let reservation = handler.handle(cmd).await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

/// POST /api/reservations/:id/cancel-with-refund - Refund, then cancel
pub async fn cancel_with_refund(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    request: Option<Json<CancelWithRefundRequest>>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let request = request.map(|Json(body)| body).unwrap_or_default();

    let handler = state.cancel_with_refund_handler();
    let cmd = CancelWithRefundCommand {
        reservation_id: parse_reservation_id(&id)?,
        user_id: user.user_id,
        reason: request.refund_reason.or(request.reason),
        refund_amount: request.refund_amount,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(CancelWithRefundResponse::from(result)))
}

/// POST /api/reservations/:id/retry-checkout - New checkout or confirm with a saved method
pub async fn retry_checkout(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path(id): Path<String>,
    request: Option<Json<RetryCheckoutRequest>>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let request = request.map(|Json(body)| body).unwrap_or_default();

    let handler = state.retry_checkout_handler();
    let cmd = RetryCheckoutCommand {
        reservation_id: parse_reservation_id(&id)?,
        user_id: user.user_id,
        payment_method_id: request.payment_method_id,
        use_new_payment_method: request.use_new_payment_method,
    };

    let result = handler.handle(cmd).await?;

    Ok(Json(RetryCheckoutResponse::from(result)))
}

/// POST /api/subjects/check-availability - Availability report for an interval
pub async fn check_availability(
    State(state): State<ReservationAppState>,
    _user: AuthenticatedUser,
    Json(request): Json<CheckAvailabilityRequest>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let service = state.availability_service();
    let query = CheckAvailabilityQuery {
        subject: parse_subject(request.subject)?,
        interval: parse_interval(request.start_date, request.end_date)?,
    };

    let report = service.check(query).await?;

    Ok(Json(AvailabilityResponse::from(report)))
}

/// PUT /api/subjects/:kind/:subject_id/availability/:date - Open or close a day
pub async fn set_availability_override(
    State(state): State<ReservationAppState>,
    user: AuthenticatedUser,
    Path((kind, subject_id, date)): Path<(String, String, String)>,
    Json(request): Json<SetAvailabilityRequest>,
) -> Result<impl IntoResponse, ReservationApiError> {
    let cmd = SetAvailabilityCommand {
        subject: parse_path_subject(&kind, subject_id)?,
        date: parse_date(&date)?,
        is_available: request.is_available,
        set_by: user.user_id,
    };

    let entry = state.availability_override_service().set(cmd).await?;

    Ok(Json(AvailabilityOverrideResponse::from(entry)))
}

/// POST /api/webhooks/stripe - Handle Stripe webhook events
pub async fn handle_stripe_webhook(
    State(state): State<ReservationAppState>,
    headers: HeaderMap,
    body: axum::body::Bytes,
) -> Result<impl IntoResponse, ReservationApiError> {
    let signature = headers
        .get("Stripe-Signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| ReservationError::webhook_rejected("missing Stripe-Signature header"))?;

    let handler = state.webhook_handler();
    let cmd = HandlePaymentWebhookCommand {
        payload: body.to_vec(),
        signature: signature.to_string(),
    };

    let outcome = handler.handle(cmd).await?;
    tracing::debug!(?outcome, "Webhook processed");

    Ok(Json(WebhookAckResponse { received: true }))
}

// ════════════════════════════════════════════════════════════════════════════════
// Error Handling
// ════════════════════════════════════════════════════════════════════════════════

/// API error type that converts reservation errors to HTTP responses.
#[derive(Debug)]
pub struct ReservationApiError(ReservationError);

impl From<ReservationError> for ReservationApiError {
    fn from(err: ReservationError) -> Self {
        Self(err)
    }
}

impl ReservationApiError {
    fn status(&self) -> StatusCode {
        match &self.0 {
            ReservationError::NotFound(_) | ReservationError::OverrideNotFound { .. } => {
                StatusCode::NOT_FOUND
            }
            ReservationError::Unauthorized(_) => StatusCode::FORBIDDEN,
            ReservationError::InvalidTransition { .. }
            | ReservationError::Unavailable { .. }
            | ReservationError::NotModifiable { .. } => StatusCode::CONFLICT,
            ReservationError::InvalidArgument { .. } => StatusCode::BAD_REQUEST,
            ReservationError::WebhookRejected(_) => StatusCode::UNAUTHORIZED,
            ReservationError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            ReservationError::Infrastructure(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn details(&self) -> Option<serde_json::Value> {
        match &self.0 {
            ReservationError::Unavailable {
                conflicts,
                blocked_dates,
            } => Some(json!({
                "conflicting_reservations": conflicts
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>(),
                "blocked_dates": blocked_dates,
            })),
            ReservationError::InvalidArgument { field, .. } => Some(json!({ "field": field })),
            ReservationError::InvalidTransition { from, to } => {
                Some(json!({ "from": from, "to": to }))
            }
            ReservationError::NotModifiable { status } => Some(json!({ "status": status })),
            _ => None,
        }
    }
}

impl IntoResponse for ReservationApiError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();

        match &self.0 {
            ReservationError::Infrastructure(detail) => {
                tracing::error!(error = %detail, "Request failed on infrastructure error");
            }
            ReservationError::UpstreamFailure(detail) => {
                tracing::warn!(error = %detail, "Payment gateway call failed");
            }
            _ => {}
        }

        let error_code = self.0.code().to_string();
        let message = self.0.public_message();
        let body = match self.details() {
            Some(details) => ErrorResponse::with_details(error_code, message, details),
            None => ErrorResponse::new(error_code, message),
        };

        (status, Json(body)).into_response()
    }
}
