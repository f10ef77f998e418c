//! Enrollment model and the class/academic-year reference rows it depends on.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Enrollment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnrollmentStatus {
    Active,
    Inactive,
}

impl EnrollmentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EnrollmentStatus::Active => "ACTIVE",
            EnrollmentStatus::Inactive => "INACTIVE",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "ACTIVE" => EnrollmentStatus::Active,
            _ => EnrollmentStatus::Inactive,
        }
    }
}

/// A student's placement in a class for an academic year.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: Uuid,
    pub student_id: Uuid,
    pub class_id: Uuid,
    pub branch_id: Uuid,
    pub academic_year_id: Uuid,
    pub enrollment_date: DateTime<Utc>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct AcademicYear {
    pub id: Uuid,
    pub school_id: Uuid,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClassRecord {
    pub id: Uuid,
    pub branch_id: Uuid,
    pub grade_id: Uuid,
    pub name: String,
    pub section: Option<String>,
    pub capacity: i32,
}

/// Registration counts by workflow stage.
#[derive(Debug, Clone, Default, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EnrollmentStats {
    pub pending_payment: i64,
    pub ready_for_enrollment: i64,
    pub enrolled: i64,
    pub total_registrations: i64,
}

/// One enrolled student row for the CSV export.
#[derive(Debug, Clone, FromRow)]
pub struct EnrolledStudentRow {
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: Option<String>,
    pub grade_name: String,
    pub class_name: String,
    pub section: Option<String>,
    pub branch_name: String,
    pub registration_number: String,
    pub enrollment_date: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct ExportEnrolledFilter {
    pub grade_id: Option<Uuid>,
    pub branch_id: Option<Uuid>,
}
