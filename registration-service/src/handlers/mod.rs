//! HTTP handlers for registration-service.

pub mod enrollments;
pub mod invoices;
pub mod payments;
pub mod pricing;
pub mod receipts;
pub mod registrations;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;
use service_core::error::AppError;

use crate::services::get_metrics;
use crate::services::providers::SmsProvider;
use crate::AppState;

/// Health check endpoint for Docker/K8s liveness probes.
pub async fn health_check() -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "ok",
            "service": "registration-service",
            "version": env!("CARGO_PKG_VERSION")
        })),
    )
}

/// Readiness check endpoint. Fails while PostgreSQL is unreachable.
///
/// The SMS gateway is reported alongside but never fails readiness.
pub async fn readiness_check(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    state.db.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Readiness check failed");
        AppError::ServiceUnavailable
    })?;

    let sms = sms_status(state.sms.as_ref()).await;

    Ok((StatusCode::OK, Json(json!({ "status": "ready", "sms": sms }))))
}

async fn sms_status(provider: &dyn SmsProvider) -> &'static str {
    if !provider.is_enabled() {
        return "disabled";
    }
    match provider.health_check().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "SMS provider not ready");
            "unavailable"
        }
    }
}

/// Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmsConfig;
    use crate::services::providers::{HttpSmsProvider, MockSmsProvider};
    use secrecy::Secret;

    fn gateway(enabled: bool, api_url: &str) -> HttpSmsProvider {
        HttpSmsProvider::new(SmsConfig {
            enabled,
            api_url: api_url.to_string(),
            api_key: Secret::new("key".to_string()),
            sender_id: "SCHOOL".to_string(),
        })
    }

    #[tokio::test]
    async fn sms_status_reports_without_failing() {
        assert_eq!(sms_status(&MockSmsProvider::new(true)).await, "ok");
        assert_eq!(sms_status(&gateway(false, "")).await, "disabled");
        assert_eq!(sms_status(&gateway(true, "")).await, "unavailable");
        assert_eq!(
            sms_status(&gateway(true, "https://sms.example.com/send")).await,
            "ok"
        );
    }
}
