//! Registration creation, listing and detail lookups.

use chrono::{Duration, Utc};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    Actor, CreateRegistration, ListRegistrationsFilter, Registration, RegistrationListRow,
    RegistrationStatus, Role,
};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::{lookups, numbering, Database, ServiceError};

/// Days a new registration has to be paid in.
const PAYMENT_DUE_DAYS: i64 = 7;

const REGISTRATION_UNIQUE_CONSTRAINT: &str = "registrations_student_id_academic_year_id_key";

const LIST_SELECT: &str = r#"
    SELECT r.id, r.registration_number, r.status, r.payment_duration, r.registration_fee,
           r.additional_fee, r.service_fee, r.total_amount, r.discount_amount, r.paid_amount,
           r.payment_due_date, r.completed_at, r.enrolled_at, r.created_at,
           s.id AS student_id, s.student_code,
           u.first_name AS student_first_name, u.last_name AS student_last_name,
           u.email AS student_email, u.phone AS student_phone,
           b.id AS branch_id, b.name AS branch_name, b.code AS branch_code,
           g.id AS grade_id, g.name AS grade_name, g.level AS grade_level,
           li.id AS latest_invoice_id, li.invoice_number AS latest_invoice_number,
           li.status AS latest_invoice_status, li.total_amount AS latest_invoice_total,
           li.paid_amount AS latest_invoice_paid,
           lp.id AS latest_payment_id, lp.payment_number AS latest_payment_number,
           lp.payment_method AS latest_payment_method, lp.status AS latest_payment_status,
           lp.amount AS latest_payment_amount, lp.created_at AS latest_payment_created_at
    FROM registrations r
    JOIN students s ON s.id = r.student_id
    JOIN users u ON u.id = s.user_id
    JOIN branches b ON b.id = r.branch_id
    JOIN grades g ON g.id = r.grade_id
    LEFT JOIN LATERAL (
        SELECT i.id, i.invoice_number, i.status, i.total_amount, i.paid_amount
        FROM invoices i
        WHERE i.registration_id = r.id
        ORDER BY i.created_at DESC
        LIMIT 1
    ) li ON TRUE
    LEFT JOIN LATERAL (
        SELECT p.id, p.payment_number, p.payment_method, p.status, p.amount, p.created_at
        FROM payments p
        WHERE p.registration_id = r.id
        ORDER BY p.created_at DESC
        LIMIT 1
    ) lp ON TRUE
"#;

const LIST_WHERE: &str = r#"
    WHERE ($1::uuid IS NULL OR r.branch_id = $1)
      AND ($2::text IS NULL OR r.status = $2)
      AND ($3::text IS NULL OR r.payment_duration = $3)
      AND ($4::uuid IS NULL OR r.grade_id = $4)
      AND ($5::text IS NULL
           OR r.registration_number ILIKE $5
           OR u.first_name ILIKE $5
           OR u.last_name ILIKE $5
           OR (u.first_name || ' ' || u.last_name) ILIKE $5
           OR u.email ILIKE $5
           OR s.student_code ILIKE $5)
"#;

/// `ILIKE` pattern for a free-text search, or `None` when blank.
pub(crate) fn search_pattern(search: Option<&str>) -> Option<String> {
    let term = search.map(str::trim).filter(|s| !s.is_empty())?;
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    Some(format!("%{}%", escaped))
}

#[derive(Clone)]
pub struct RegistrationService {
    db: Database,
}

impl RegistrationService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Open a registration for an existing student, snapshotting current pricing.
    #[instrument(skip(self, actor, input), fields(user_id = %actor.user_id, student_id = %input.student_id))]
    pub async fn create_registration(
        &self,
        actor: &Actor,
        input: &CreateRegistration,
    ) -> Result<Registration, ServiceError> {
        actor.require_any(Role::REGISTRARS)?;

        let pool = self.db.pool();
        let student = lookups::student(pool, input.student_id)
            .await?
            .ok_or(ServiceError::StudentNotFound)?;
        actor.require_branch(student.branch_id)?;

        let grade_id = input
            .grade_id
            .or(student.grade_id)
            .ok_or_else(|| ServiceError::validation("Grade ID is required"))?;

        let pricing = lookups::active_pricing_schema(pool, student.branch_id, grade_id)
            .await?
            .ok_or(ServiceError::PricingNotFound)?;
        let academic_year = lookups::active_academic_year(pool, student.school_id)
            .await?
            .ok_or(ServiceError::NoActiveAcademicYear)?;
        let branch = lookups::branch(pool, student.branch_id)
            .await?
            .ok_or_else(|| anyhow::anyhow!("Branch {} of student is missing", student.branch_id))?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_registration"])
            .start_timer();

        let mut tx = pool.begin().await?;
        sqlx::query("SET LOCAL statement_timeout = '15s'")
            .execute(&mut *tx)
            .await?;

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM registrations WHERE student_id = $1 AND academic_year_id = $2)",
        )
        .bind(student.id)
        .bind(academic_year.id)
        .fetch_one(&mut *tx)
        .await?;
        if exists {
            tx.rollback().await?;
            return Err(ServiceError::DuplicateRegistration);
        }

        let sequence =
            numbering::next_value(&mut *tx, &numbering::registration_scope(branch.id)).await?;
        let registration_number = numbering::registration_number(&branch.code, sequence);

        let now = Utc::now();
        let additional_fee = pricing.additional_fee(input.payment_duration);
        let total_amount = pricing.registration_fee + additional_fee;

        let registration = sqlx::query_as::<_, Registration>(
            r#"
            INSERT INTO registrations (
                id, student_id, branch_id, grade_id, academic_year_id, registration_number,
                status, registration_fee, additional_fee, service_fee, total_amount,
                payment_duration, payment_due_date, created_by_id, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $15)
            RETURNING *
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(student.id)
        .bind(branch.id)
        .bind(grade_id)
        .bind(academic_year.id)
        .bind(&registration_number)
        .bind(RegistrationStatus::PendingPayment.as_str())
        .bind(pricing.registration_fee)
        .bind(additional_fee)
        .bind(pricing.service_fee)
        .bind(total_amount)
        .bind(input.payment_duration.as_str())
        .bind(now + Duration::days(PAYMENT_DUE_DAYS))
        .bind(actor.user_id)
        .bind(now)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err)
                if db_err.constraint() == Some(REGISTRATION_UNIQUE_CONSTRAINT) =>
            {
                ServiceError::DuplicateRegistration
            }
            other => ServiceError::Database(other),
        })?;

        tx.commit().await?;
        timer.observe_duration();

        info!(
            registration_id = %registration.id,
            registration_number = %registration.registration_number,
            total_amount = %registration.total_amount,
            "Registration created"
        );

        Ok(registration)
    }

    /// Page of registrations with their latest invoice and payment.
    #[instrument(skip(self, actor, filter), fields(user_id = %actor.user_id))]
    pub async fn list_registrations(
        &self,
        actor: &Actor,
        filter: &ListRegistrationsFilter,
    ) -> Result<(Vec<RegistrationListRow>, i64), ServiceError> {
        let branch_id = actor.resolve_branch_filter(filter.branch_id)?;
        let status = filter.status.map(|s| s.as_str());
        let duration = filter.payment_duration.map(|d| d.as_str());
        let search = search_pattern(filter.search.as_deref());

        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_registrations"])
            .start_timer();

        let rows_sql = format!(
            "{} {} ORDER BY r.created_at DESC LIMIT $6 OFFSET $7",
            LIST_SELECT, LIST_WHERE
        );
        let rows = sqlx::query_as::<_, RegistrationListRow>(&rows_sql)
            .bind(branch_id)
            .bind(status)
            .bind(duration)
            .bind(filter.grade_id)
            .bind(search.as_deref())
            .bind(filter.page.limit)
            .bind(filter.page.offset())
            .fetch_all(self.db.pool())
            .await?;

        let count_sql = format!(
            r#"
            SELECT COUNT(*)
            FROM registrations r
            JOIN students s ON s.id = r.student_id
            JOIN users u ON u.id = s.user_id
            {}
            "#,
            LIST_WHERE
        );
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(branch_id)
            .bind(status)
            .bind(duration)
            .bind(filter.grade_id)
            .bind(search.as_deref())
            .fetch_one(self.db.pool())
            .await?;

        timer.observe_duration();

        Ok((rows, total))
    }

    /// One registration, hidden when it belongs to another branch.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_registration_details(
        &self,
        actor: &Actor,
        registration_id: Uuid,
    ) -> Result<RegistrationListRow, ServiceError> {
        let sql = format!("{} WHERE r.id = $1", LIST_SELECT);
        let row = sqlx::query_as::<_, RegistrationListRow>(&sql)
            .bind(registration_id)
            .fetch_optional(self.db.pool())
            .await?
            .filter(|row| actor.can_access_branch(row.branch_id))
            .ok_or(ServiceError::RegistrationNotFound)?;

        Ok(row)
    }
}
