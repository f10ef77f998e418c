//! Enrollment endpoints.

use axum::{
    extract::{Query, State},
    response::IntoResponse,
    Json,
};
use service_core::error::AppError;

use crate::{
    dtos::{
        CreateEnrollmentRequest, EnrollmentResponse, ExportEnrolledQuery, ListRegistrationsQuery,
        ListRegistrationsResponse, Pagination, UnenrollRequest, UnenrollResponse,
    },
    handlers::invoices::attachment,
    middleware::AuthUser,
    models::{EnrollmentStats, ListRegistrationsFilter},
    AppState,
};

pub async fn create_enrollment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<CreateEnrollmentRequest>,
) -> Result<Json<EnrollmentResponse>, AppError> {
    let (registration_id, class_id) = payload.ids()?;

    let (enrollment, registration) = state
        .enrollments
        .create_enrollment(&actor, registration_id, class_id)
        .await?;

    Ok(Json(EnrollmentResponse {
        message: "Student enrolled successfully".to_string(),
        enrollment,
        registration,
    }))
}

pub async fn unenroll_student(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<UnenrollRequest>,
) -> Result<Json<UnenrollResponse>, AppError> {
    let registration_id = payload.id()?;

    let registration = state
        .enrollments
        .unenroll_student(&actor, registration_id)
        .await?;

    Ok(Json(UnenrollResponse {
        message: "Student unenrolled successfully".to_string(),
        registration,
    }))
}

/// Registrations awaiting or holding an enrollment, same shape as the registration list.
pub async fn list_enrollment_registrations(
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

pub async fn get_enrollment_stats(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
) -> Result<Json<EnrollmentStats>, AppError> {
    let stats = state.enrollments.get_enrollment_stats(&actor).await?;
    Ok(Json(stats))
}

pub async fn export_enrolled_students(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<ExportEnrolledQuery>,
) -> Result<impl IntoResponse, AppError> {
    let file = state
        .enrollments
        .export_enrolled_students(&actor, &query.into())
        .await?;

    Ok(attachment("enrolled-students", file))
}
