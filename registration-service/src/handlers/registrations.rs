//! Registration endpoints.

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        CreateRegistrationRequest, CreateRegistrationResponse, ListRegistrationsQuery,
        ListRegistrationsResponse, Pagination, RegistrationDetailsQuery,
    },
    middleware::AuthUser,
    models::{CreateRegistration, ListRegistrationsFilter, RegistrationListRow},
    services::ServiceError,
    AppState,
};

pub async fn create_registration(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<CreateRegistrationRequest>,
) -> Result<(StatusCode, Json<CreateRegistrationResponse>), AppError> {
    let input = CreateRegistration::try_from(payload)?;
    let registration = state
        .registrations
        .create_registration(&actor, &input)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateRegistrationResponse::from(registration)),
    ))
}

pub async fn list_registrations(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<ListRegistrationsQuery>,
) -> Result<Json<ListRegistrationsResponse>, AppError> {
    let filter = ListRegistrationsFilter::try_from(query)?;

    let (registrations, total) = state
        .registrations
        .list_registrations(&actor, &filter)
        .await?;

    Ok(Json(ListRegistrationsResponse {
        registrations,
        pagination: Pagination::new(filter.page, total),
    }))
}

pub async fn get_registration_details(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<RegistrationDetailsQuery>,
) -> Result<Json<RegistrationListRow>, AppError> {
    let registration_id = query
        .registration_id
        .ok_or_else(|| ServiceError::validation("Registration ID is required"))?;

    let registration = state
        .registrations
        .get_registration_details(&actor, registration_id)
        .await?;

    Ok(Json(registration))
}
