use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{Enrollment, ExportEnrolledFilter, Registration};
use crate::services::ServiceError;

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateEnrollmentRequest {
    pub registration_id: Option<Uuid>,
    pub class_id: Option<Uuid>,
}

impl CreateEnrollmentRequest {
    pub fn ids(&self) -> Result<(Uuid, Uuid), ServiceError> {
        self.registration_id
            .zip(self.class_id)
            .ok_or_else(|| ServiceError::validation("Missing required fields"))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnenrollRequest {
    pub registration_id: Option<Uuid>,
}

impl UnenrollRequest {
    pub fn id(&self) -> Result<Uuid, ServiceError> {
        self.registration_id
            .ok_or_else(|| ServiceError::validation("Missing registration ID"))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportEnrolledQuery {
    pub grade_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}

impl From<ExportEnrolledQuery> for ExportEnrolledFilter {
    fn from(query: ExportEnrolledQuery) -> Self {
        Self {
            grade_id: query.grade_id,
            branch_id: query.branch_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EnrollmentResponse {
    pub message: String,
    pub enrollment: Enrollment,
    pub registration: Registration,
}

#[derive(Debug, Serialize)]
pub struct UnenrollResponse {
    pub message: String,
    pub registration: Registration,
}
