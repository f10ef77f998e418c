//! Registration payment endpoint.

use axum::{extract::State, Json};
use service_core::error::AppError;
use validator::Validate;

use crate::{
    dtos::{PaymentResponse, ProcessPaymentRequest},
    middleware::AuthUser,
    AppState,
};

/// Bill a pending registration and record its payment.
pub async fn handle_payment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<ProcessPaymentRequest>,
) -> Result<Json<PaymentResponse>, AppError> {
    payload.validate()?;

    tracing::info!(
        user_id = %actor.user_id,
        registration_id = ?payload.registration_id,
        payment_method = ?payload.payment_method,
        "Processing registration payment"
    );

    let outcome = state.payments.handle_payment(&actor, &payload).await?;

    Ok(Json(PaymentResponse::from(outcome)))
}
