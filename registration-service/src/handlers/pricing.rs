//! Pricing schema endpoints.

use axum::{
    extract::{Query, State},
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{GetPricingResponse, PricingQuery, SavePricingResponse, SavePricingSchemaRequest},
    middleware::AuthUser,
    AppState,
};

/// Active schema for a branch and grade, with every payment option priced.
pub async fn get_pricing_schema(
    State(state): State<AppState>,
    AuthUser(_actor): AuthUser,
    Query(query): Query<PricingQuery>,
) -> Result<Json<GetPricingResponse>, AppError> {
    let details = state
        .pricing
        .get_pricing_schema(query.branch_id, query.grade_id)
        .await?;

    Ok(Json(GetPricingResponse::from(details)))
}

pub async fn save_pricing_schema(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<SavePricingSchemaRequest>,
) -> Result<Json<SavePricingResponse>, AppError> {
    let schema = state.pricing.save_pricing_schema(&actor, &payload).await?;

    Ok(Json(SavePricingResponse {
        message: "Pricing schema saved successfully".to_string(),
        pricing_schema: schema,
    }))
}
