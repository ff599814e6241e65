//! Hotel booking HTTP server.

use std::sync::Arc;

use http::HeaderValue;
use tokio::signal;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use hotel_booking::adapters::http::{api_router, BookingSettings, ReservationAppState};
use hotel_booking::adapters::postgres::{
    PostgresAvailabilityOverrideRepository, PostgresPaymentRepository,
    PostgresReservationRepository,
};
use hotel_booking::adapters::stripe::{StripeConfig, StripePaymentAdapter};
use hotel_booking::config::{AppConfig, LogFormat, PaymentConfig, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    init_tracing(&config.server);
    config.validate()?;

    info!(
        environment = ?config.server.environment,
        stripe_test_mode = config.payment.is_test_mode(),
        "Configuration loaded"
    );

    let pool = config
        .database
        .pool_options()
        .connect(&config.database.url)
        .await?;
    info!(database = %config.database.display_target(), "Database connected");

    if config.database.run_migrations {
        sqlx::migrate!().run(&pool).await?;
        info!("Migrations applied");
    }

    let state = ReservationAppState {
        reservation_repository: Arc::new(PostgresReservationRepository::new(pool.clone())),
        payment_repository: Arc::new(PostgresPaymentRepository::new(pool.clone())),
        payment_provider: Arc::new(StripePaymentAdapter::new(stripe_config(&config.payment))),
        availability_overrides: Arc::new(PostgresAvailabilityOverrideRepository::new(pool)),
        booking: BookingSettings::from_config(&config.booking, &config.payment)?,
    };

    let app = api_router()
        .with_state(state)
        .layer(TimeoutLayer::new(config.server.request_timeout()))
        .layer(cors_layer(&config.server))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid));

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(address = %addr, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&server.log_level));

    match server.log_format() {
        LogFormat::Json => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }
}

fn stripe_config(payment: &PaymentConfig) -> StripeConfig {
    let config = StripeConfig::new(&payment.stripe_api_key, &payment.stripe_webhook_secret)
        .with_require_livemode(payment.require_livemode);

    match &payment.stripe_api_base {
        Some(base) => config.with_base_url(base),
        None => config,
    }
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let Some(origins) = server.allowed_origins() else {
        return CorsLayer::permissive();
    };

    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(tower_http::cors::Any)
        .allow_headers(tower_http::cors::Any)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
