use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{parse_filter, Pagination};
use crate::models::{
    CreateRegistration, ListRegistrationsFilter, Page, PaymentDuration, Registration,
    RegistrationListRow,
};
use crate::services::ServiceError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationRequest {
    pub student_id: Option<Uuid>,
    pub grade_id: Option<Uuid>,
    pub payment_duration: Option<String>,
}

impl TryFrom<CreateRegistrationRequest> for CreateRegistration {
    type Error = ServiceError;

    fn try_from(req: CreateRegistrationRequest) -> Result<Self, Self::Error> {
        let student_id = req
            .student_id
            .ok_or_else(|| ServiceError::validation("Student ID is required"))?;
        let payment_duration: PaymentDuration =
            parse_filter("payment duration", req.payment_duration.as_deref())?
                .ok_or_else(|| ServiceError::validation("Payment duration is required"))?;

        Ok(CreateRegistration {
            student_id,
            grade_id: req.grade_id,
            payment_duration,
        })
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRegistrationResponse {
    pub message: String,
    pub registration: Registration,
    pub redirect_to: String,
}

impl From<Registration> for CreateRegistrationResponse {
    fn from(registration: Registration) -> Self {
        Self {
            message: "Registration created successfully".to_string(),
            redirect_to: format!("/registration/payment/{}", registration.id),
            registration,
        }
    }
}

/// Query string shared by the registration and enrollment listings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListRegistrationsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub payment_duration: Option<String>,
    pub branch_id: Option<Uuid>,
    pub grade_id: Option<Uuid>,
}

impl TryFrom<ListRegistrationsQuery> for ListRegistrationsFilter {
    type Error = ServiceError;

    fn try_from(query: ListRegistrationsQuery) -> Result<Self, Self::Error> {
        Ok(ListRegistrationsFilter {
            page: Page::new(query.page, query.limit),
            status: parse_filter("status", query.status.as_deref())?,
            payment_duration: parse_filter("payment duration", query.payment_duration.as_deref())?,
            search: query.search,
            branch_id: query.branch_id,
            grade_id: query.grade_id,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct ListRegistrationsResponse {
    pub registrations: Vec<RegistrationListRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationDetailsQuery {
    pub registration_id: Option<Uuid>,
}
