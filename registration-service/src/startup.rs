//! Application startup and lifecycle management.

use crate::config::RegistrationConfig;
use crate::handlers::{self, enrollments, invoices, payments, pricing, receipts, registrations};
use crate::middleware::{auth_middleware, metrics_middleware, require_registrar, require_staff};
use crate::services::providers::{HttpSmsProvider, SmsProvider};
use crate::services::{
    init_metrics, Database, EnrollmentService, InvoiceService, JwtService, PaymentProcessor,
    PricingService, ReceiptService, RegistrationService, SmsNotifier,
};
use axum::{
    http::{header, HeaderName, HeaderValue, Method, Request},
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post, put},
    Router,
};
use service_core::error::AppError;
use service_core::middleware::rate_limit::{
    create_ip_rate_limiter, ip_rate_limit_middleware, IpRateLimiter,
};
use service_core::middleware::security_headers::security_headers_middleware;
use service_core::middleware::tracing::{request_id_middleware, REQUEST_ID_HEADER};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: RegistrationConfig,
    pub db: Database,
    pub jwt: JwtService,
    pub pricing: PricingService,
    pub registrations: RegistrationService,
    pub payments: PaymentProcessor,
    pub invoices: InvoiceService,
    pub enrollments: EnrollmentService,
    pub receipts: ReceiptService,
    pub sms: Arc<dyn SmsProvider>,
    pub api_rate_limiter: IpRateLimiter,
    pub payment_rate_limiter: IpRateLimiter,
}

impl AppState {
    pub fn new(config: RegistrationConfig, db: Database, sms: Arc<dyn SmsProvider>) -> Self {
        let notifier = SmsNotifier::new(sms.clone(), config.app_url.clone());
        let limits = &config.rate_limit;

        Self {
            jwt: JwtService::new(&config.auth.jwt_secret),
            pricing: PricingService::new(db.clone()),
            registrations: RegistrationService::new(db.clone()),
            payments: PaymentProcessor::new(db.clone(), notifier.clone()),
            invoices: InvoiceService::new(db.clone(), notifier),
            enrollments: EnrollmentService::new(db.clone()),
            receipts: ReceiptService::new(db.clone()),
            sms,
            api_rate_limiter: create_ip_rate_limiter(limits.api_requests, limits.api_window_seconds),
            payment_rate_limiter: create_ip_rate_limiter(
                limits.payment_requests,
                limits.payment_window_seconds,
            ),
            db,
            config,
        }
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Invalid CORS origin, skipping");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(origins)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
}

pub fn build_router(state: AppState) -> Router {
    let staff_routes = Router::new()
        .route(
            "/api/pricing",
            get(pricing::get_pricing_schema).post(pricing::save_pricing_schema),
        )
        .route(
            "/api/registrations/details",
            get(registrations::get_registration_details),
        )
        .route("/api/invoices", get(invoices::list_invoices))
        .route("/api/invoices/export", get(invoices::export_invoices))
        .route("/api/invoices/:id", get(invoices::get_invoice))
        .route(
            "/api/invoices/:id/confirm-payment",
            post(invoices::confirm_payment),
        )
        .route(
            "/api/invoices/:id/resend-link",
            post(invoices::resend_payment_link),
        )
        .route("/api/receipts/generate", post(receipts::generate_receipt))
        .route(
            "/api/receipts/combined/:parent_id",
            get(receipts::get_combined_receipt),
        )
        .route(
            "/api/receipts/parent-invoices/:parent_phone",
            get(receipts::get_parent_invoices),
        )
        .route("/api/receipts/:id", get(receipts::get_receipt))
        .route("/api/receipts/:id/check-fs", get(receipts::check_fs_number))
        .route("/api/receipts/:id/fs-number", put(receipts::update_fs_number))
        .route_layer(from_fn(require_staff));

    let registrar_routes = Router::new()
        .route(
            "/api/registrations",
            get(registrations::list_registrations).post(registrations::create_registration),
        )
        .route(
            "/api/enrollments",
            get(enrollments::list_enrollment_registrations).post(enrollments::create_enrollment),
        )
        .route("/api/enrollments/unenroll", post(enrollments::unenroll_student))
        .route("/api/enrollments/stats", get(enrollments::get_enrollment_stats))
        .route(
            "/api/enrollments/export",
            get(enrollments::export_enrolled_students),
        )
        .route_layer(from_fn(require_registrar));

    // Payment submissions carry their own, tighter limit on top of the API one.
    let payment_route = Router::new()
        .route(
            "/api/registration-payments/pay",
            post(payments::handle_payment),
        )
        .route_layer(from_fn(require_staff))
        .layer(from_fn_with_state(
            state.payment_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    let api_routes = Router::new()
        .merge(staff_routes)
        .merge(registrar_routes)
        .merge(payment_route)
        .layer(from_fn_with_state(state.clone(), auth_middleware))
        .layer(from_fn_with_state(
            state.api_rate_limiter.clone(),
            ip_rate_limit_middleware,
        ));

    Router::new()
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .route("/metrics", get(handlers::metrics_handler))
        .merge(api_routes)
        .with_state(state.clone())
        .layer(from_fn(metrics_middleware))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<_>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .unwrap_or("-");

                tracing::info_span!(
                    "http_request",
                    request_id = %request_id,
                    method = %request.method(),
                    uri = %request.uri(),
                    version = ?request.version(),
                    user_id = tracing::field::Empty,
                )
            }),
        )
        .layer(from_fn(request_id_middleware))
        .layer(from_fn(security_headers_middleware))
        .layer(cors_layer(&state.config.frontend_urls))
}

/// Application container for managing server lifecycle.
pub struct Application {
    http_port: u16,
    http_listener: TcpListener,
    state: AppState,
}

impl Application {
    /// Build the application with the given configuration.
    pub async fn build(config: RegistrationConfig) -> Result<Self, AppError> {
        Self::build_internal(config, true).await
    }

    /// Build the application without running migrations.
    /// Use this in tests when migrations are already applied by the test harness.
    pub async fn build_without_migrations(config: RegistrationConfig) -> Result<Self, AppError> {
        Self::build_internal(config, false).await
    }

    async fn build_internal(
        config: RegistrationConfig,
        run_migrations: bool,
    ) -> Result<Self, AppError> {
        let db = Database::new(
            &config.database.url,
            config.database.max_connections,
            config.database.min_connections,
        )
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to connect to PostgreSQL");
            e
        })?;

        if run_migrations {
            db.run_migrations().await.map_err(|e| {
                tracing::error!(error = %e, "Failed to run migrations");
                e
            })?;
        }

        let sms: Arc<dyn SmsProvider> = Arc::new(HttpSmsProvider::new(config.sms.clone()));
        Self::build_with(config, db, sms).await
    }

    /// Build around an existing pool and SMS provider.
    pub async fn build_with(
        config: RegistrationConfig,
        db: Database,
        sms: Arc<dyn SmsProvider>,
    ) -> Result<Self, AppError> {
        init_metrics();

        let bind_address = config.common.bind_address();
        let http_listener = TcpListener::bind(&bind_address).await.map_err(|e| {
            tracing::error!(error = %e, addr = %bind_address, "Failed to bind HTTP listener");
            AppError::from(e)
        })?;
        let http_port = http_listener.local_addr()?.port();

        tracing::info!(http_port = http_port, "Registration service listener bound");

        Ok(Self {
            http_port,
            http_listener,
            state: AppState::new(config, db, sms),
        })
    }

    /// Get the HTTP port the server is listening on.
    pub fn http_port(&self) -> u16 {
        self.http_port
    }

    /// Get a reference to the database.
    pub fn db(&self) -> &Database {
        &self.state.db
    }

    /// Run the application until stopped.
    pub async fn run_until_stopped(self) -> std::io::Result<()> {
        let router = build_router(self.state);

        tracing::info!(port = self.http_port, "HTTP server listening");

        axum::serve(
            self.http_listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
    }
}
