//! Enrollment of paid registrations into classes, and the reverse.

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    Actor, ClassRecord, EnrolledStudentRow, Enrollment, EnrollmentStats, EnrollmentStatus,
    ExportEnrolledFilter, Registration, RegistrationStatus, Role,
};
use crate::services::export::{format_date, Cell, ExportFile, ExportFormat, Table};
use crate::services::metrics::{DB_QUERY_DURATION, ENROLLMENTS_TOTAL};
use crate::services::{lookups, Database, ServiceError};

const ACTIVE_ENROLLMENT_INDEX: &str = "enrollments_one_active_per_student";

pub const ENROLLED_EXPORT_HEADERS: [&str; 11] = [
    "Student ID",
    "First Name",
    "Last Name",
    "Email",
    "Phone",
    "Grade",
    "Class",
    "Section",
    "Branch",
    "Registration Number",
    "Enrollment Date",
];

#[derive(Clone)]
pub struct EnrollmentService {
    db: Database,
}

impl EnrollmentService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Place a paid registration's student into a class.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn create_enrollment(
        &self,
        actor: &Actor,
        registration_id: Uuid,
        class_id: Uuid,
    ) -> Result<(Enrollment, Registration), ServiceError> {
        actor.require_any(Role::REGISTRARS)?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_enrollment"])
            .start_timer();

        let mut tx = self.db.pool().begin().await?;
        let (enrollment, registration) =
            match Self::enroll(&mut tx, actor, registration_id, class_id).await {
                Ok(enrolled) => enrolled,
                Err(e) => {
                    tx.rollback().await?;
                    return Err(e);
                }
            };
        tx.commit().await?;
        timer.observe_duration();

        ENROLLMENTS_TOTAL.with_label_values(&["enroll"]).inc();
        info!(
            registration_id = %registration.id,
            enrollment_id = %enrollment.id,
            class_id = %enrollment.class_id,
            "Student enrolled"
        );

        Ok((enrollment, registration))
    }

    async fn enroll(
        tx: &mut Transaction<'_, Postgres>,
        actor: &Actor,
        registration_id: Uuid,
        class_id: Uuid,
    ) -> Result<(Enrollment, Registration), ServiceError> {
        let registration = lookups::registration_for_update(&mut **tx, registration_id)
            .await?
            .filter(|r| actor.can_access_branch(r.branch_id))
            .ok_or(ServiceError::RegistrationNotFound)?;

        match registration.status() {
            RegistrationStatus::Enrolled => return Err(ServiceError::AlreadyEnrolled),
            RegistrationStatus::PendingPayment => return Err(ServiceError::PaymentNotCompleted),
            RegistrationStatus::PaymentCompleted => {}
        }

        let branch = lookups::branch(&mut **tx, registration.branch_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Branch {} is missing", registration.branch_id))?;
        let academic_year = lookups::active_academic_year(&mut **tx, branch.school_id)
            .await?
            .ok_or(ServiceError::NoActiveAcademicYear)?;

        let class = sqlx::query_as::<_, ClassRecord>(
            r#"
            SELECT id, branch_id, grade_id, name, section, capacity
            FROM classes
            WHERE id = $1 AND branch_id = $2
            FOR UPDATE
            "#,
        )
        .bind(class_id)
        .bind(registration.branch_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(ServiceError::ClassNotFound)?;

        let active: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE class_id = $1 AND status = $2",
        )
        .bind(class.id)
        .bind(EnrollmentStatus::Active.as_str())
        .fetch_one(&mut **tx)
        .await?;
        if active >= i64::from(class.capacity) {
            return Err(ServiceError::ClassFull);
        }

        let now = Utc::now();
        sqlx::query("UPDATE students SET admission_date = $2 WHERE id = $1")
            .bind(registration.student_id)
            .bind(now)
            .execute(&mut **tx)
            .await?;

        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (
                id, student_id, class_id, branch_id, academic_year_id, enrollment_date, status,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $6, $6)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(registration.student_id)
        .bind(class.id)
        .bind(registration.branch_id)
        .bind(academic_year.id)
        .bind(now)
        .bind(EnrollmentStatus::Active.as_str())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some(ACTIVE_ENROLLMENT_INDEX) =>
            {
                ServiceError::AlreadyEnrolled
            }
            other => ServiceError::Database(other),
        })?;

        let registration = sqlx::query_as::<_, Registration>(
            r#"
            UPDATE registrations
            SET status = $2, enrolled_at = $3, enrolled_by_id = $4, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(registration.id)
        .bind(RegistrationStatus::Enrolled.as_str())
        .bind(now)
        .bind(actor.user_id)
        .fetch_one(&mut **tx)
        .await?;

        Ok((enrollment, registration))
    }

    /// Deactivate the student's enrollment and reopen the registration for enrollment.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn unenroll_student(
        &self,
        actor: &Actor,
        registration_id: Uuid,
    ) -> Result<Registration, ServiceError> {
        actor.require_any(Role::REGISTRARS)?;

        let mut tx = self.db.pool().begin().await?;
        let registration = match Self::unenroll(&mut tx, actor, registration_id).await {
            Ok(registration) => registration,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };
        tx.commit().await?;

        ENROLLMENTS_TOTAL.with_label_values(&["unenroll"]).inc();
        info!(registration_id = %registration.id, "Student unenrolled");

        Ok(registration)
    }

    async fn unenroll(
        tx: &mut Transaction<'_, Postgres>,
        actor: &Actor,
        registration_id: Uuid,
    ) -> Result<Registration, ServiceError> {
        let registration = lookups::registration_for_update(&mut **tx, registration_id)
            .await?
            .filter(|r| actor.can_access_branch(r.branch_id))
            .ok_or(ServiceError::RegistrationNotFound)?;

        if registration.status() != RegistrationStatus::Enrolled {
            return Err(ServiceError::NotEnrolled);
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE enrollments
            SET status = $3, updated_at = $4
            WHERE student_id = $1 AND status = $2
            "#,
        )
        .bind(registration.student_id)
        .bind(EnrollmentStatus::Active.as_str())
        .bind(EnrollmentStatus::Inactive.as_str())
        .bind(now)
        .execute(&mut **tx)
        .await?;

        let registration = sqlx::query_as::<_, Registration>(
            r#"
            UPDATE registrations
            SET status = $2, enrolled_at = NULL, enrolled_by_id = NULL, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(registration.id)
        .bind(RegistrationStatus::PaymentCompleted.as_str())
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        Ok(registration)
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_enrollment_stats(&self, actor: &Actor) -> Result<EnrollmentStats, ServiceError> {
        actor.require_any(Role::REGISTRARS)?;
        let branch_id = actor.resolve_branch_filter(None)?;

        let stats = sqlx::query_as::<_, EnrollmentStats>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE status = 'PENDING_PAYMENT') AS pending_payment,
                COUNT(*) FILTER (WHERE status = 'PAYMENT_COMPLETED') AS ready_for_enrollment,
                COUNT(*) FILTER (WHERE status = 'ENROLLED') AS enrolled,
                COUNT(*) AS total_registrations
            FROM registrations
            WHERE ($1::uuid IS NULL OR branch_id = $1)
            "#,
        )
        .bind(branch_id)
        .fetch_one(self.db.pool())
        .await?;

        Ok(stats)
    }

    /// Enrolled students with their active class as CSV.
    #[instrument(skip(self, actor, filter), fields(user_id = %actor.user_id))]
    pub async fn export_enrolled_students(
        &self,
        actor: &Actor,
        filter: &ExportEnrolledFilter,
    ) -> Result<ExportFile, ServiceError> {
        actor.require_any(Role::REGISTRARS)?;
        let branch_id = actor.resolve_branch_filter(filter.branch_id)?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["export_enrolled_students"])
            .start_timer();

        let rows = sqlx::query_as::<_, EnrolledStudentRow>(
            r#"
            SELECT s.student_code, u.first_name, u.last_name, u.email, u.phone,
                   g.name AS grade_name, c.name AS class_name, c.section,
                   b.name AS branch_name, r.registration_number, e.enrollment_date
            FROM registrations r
            JOIN students s ON s.id = r.student_id
            JOIN users u ON u.id = s.user_id
            JOIN grades g ON g.id = r.grade_id
            JOIN branches b ON b.id = r.branch_id
            JOIN enrollments e ON e.student_id = r.student_id AND e.status = 'ACTIVE'
            JOIN classes c ON c.id = e.class_id
            WHERE r.status = 'ENROLLED'
              AND ($1::uuid IS NULL OR r.branch_id = $1)
              AND ($2::uuid IS NULL OR r.grade_id = $2)
            ORDER BY g.level, c.name, u.last_name, u.first_name
            "#,
        )
        .bind(branch_id)
        .bind(filter.grade_id)
        .fetch_all(self.db.pool())
        .await?;

        timer.observe_duration();

        enrolled_students_table(&rows).render(ExportFormat::Csv, "Enrolled Students")
    }
}

pub fn enrolled_students_table(rows: &[EnrolledStudentRow]) -> Table {
    let mut table = Table::new(&ENROLLED_EXPORT_HEADERS);
    for row in rows {
        table.push(vec![
            Cell::text(&row.student_code),
            Cell::text(&row.first_name),
            Cell::text(&row.last_name),
            Cell::text(&row.email),
            Cell::text(row.phone.clone().unwrap_or_default()),
            Cell::text(&row.grade_name),
            Cell::text(&row.class_name),
            Cell::text(row.section.clone().unwrap_or_default()),
            Cell::text(&row.branch_name),
            Cell::text(&row.registration_number),
            Cell::text(format_date(row.enrollment_date)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn enrolled_export_quotes_every_field() {
        let rows = vec![EnrolledStudentRow {
            student_code: "STU-001".to_string(),
            first_name: "Liya".to_string(),
            last_name: "O\"Brien".to_string(),
            email: "liya@example.com".to_string(),
            phone: None,
            grade_name: "Grade 3".to_string(),
            class_name: "3A".to_string(),
            section: Some("A".to_string()),
            branch_name: "Bole".to_string(),
            registration_number: "REG-BOL-00007".to_string(),
            enrollment_date: Utc.with_ymd_and_hms(2026, 9, 15, 10, 0, 0).unwrap(),
        }];

        let csv = enrolled_students_table(&rows).to_csv().unwrap();
        let csv = String::from_utf8(csv).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("\"Student ID\",\"First Name\",\"Last Name\""));
        assert_eq!(
            lines[1],
            "\"STU-001\",\"Liya\",\"O\"\"Brien\",\"liya@example.com\",\"\",\"Grade 3\",\"3A\",\"A\",\"Bole\",\"REG-BOL-00007\",\"2026-09-15\""
        );
    }
}
