//! Row lookups shared by the workflow services.
//!
//! Every function takes any Postgres executor so it can run against the pool
//! or inside an open transaction.

use sqlx::PgExecutor;
use uuid::Uuid;

use crate::models::{
    AcademicYear, BranchRecord, FeeTypeCode, Invoice, InvoiceItem, ParentContact, Payment,
    PricingSchema, Registration, StudentRecord,
};

pub async fn student<'e, E: PgExecutor<'e>>(
    executor: E,
    student_id: Uuid,
) -> Result<Option<StudentRecord>, sqlx::Error> {
    sqlx::query_as::<_, StudentRecord>(
        r#"
        SELECT s.id, s.user_id, s.student_code, s.branch_id, s.grade_id, s.admission_date,
               u.first_name, u.last_name, u.email, u.phone, b.school_id
        FROM students s
        JOIN users u ON u.id = s.user_id
        JOIN branches b ON b.id = s.branch_id
        WHERE s.id = $1
        "#,
    )
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub async fn registration<'e, E: PgExecutor<'e>>(
    executor: E,
    registration_id: Uuid,
) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE id = $1")
        .bind(registration_id)
        .fetch_optional(executor)
        .await
}

/// Same as [`registration`] but holds the row lock until the transaction ends.
pub async fn registration_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    registration_id: Uuid,
) -> Result<Option<Registration>, sqlx::Error> {
    sqlx::query_as::<_, Registration>("SELECT * FROM registrations WHERE id = $1 FOR UPDATE")
        .bind(registration_id)
        .fetch_optional(executor)
        .await
}

pub async fn active_academic_year<'e, E: PgExecutor<'e>>(
    executor: E,
    school_id: Uuid,
) -> Result<Option<AcademicYear>, sqlx::Error> {
    sqlx::query_as::<_, AcademicYear>(
        r#"
        SELECT id, school_id, name, start_date, end_date, is_active
        FROM academic_years
        WHERE school_id = $1 AND is_active = TRUE
        LIMIT 1
        "#,
    )
    .bind(school_id)
    .fetch_optional(executor)
    .await
}

pub async fn branch<'e, E: PgExecutor<'e>>(
    executor: E,
    branch_id: Uuid,
) -> Result<Option<BranchRecord>, sqlx::Error> {
    sqlx::query_as::<_, BranchRecord>(
        r#"
        SELECT b.id, b.school_id, b.name, b.code, s.name AS school_name
        FROM branches b
        JOIN schools s ON s.id = b.school_id
        WHERE b.id = $1
        "#,
    )
    .bind(branch_id)
    .fetch_optional(executor)
    .await
}

pub async fn active_pricing_schema<'e, E: PgExecutor<'e>>(
    executor: E,
    branch_id: Uuid,
    grade_id: Uuid,
) -> Result<Option<PricingSchema>, sqlx::Error> {
    sqlx::query_as::<_, PricingSchema>(
        r#"
        SELECT id, school_id, branch_id, grade_id, registration_fee, monthly_fee, service_fee,
               is_active, created_at, updated_at
        FROM pricing_schemas
        WHERE branch_id = $1 AND grade_id = $2 AND is_active = TRUE
        "#,
    )
    .bind(branch_id)
    .bind(grade_id)
    .fetch_optional(executor)
    .await
}

/// Primary parent of a student, falling back to any linked parent.
pub async fn primary_parent<'e, E: PgExecutor<'e>>(
    executor: E,
    student_id: Uuid,
) -> Result<Option<ParentContact>, sqlx::Error> {
    sqlx::query_as::<_, ParentContact>(
        r#"
        SELECT p.id AS parent_id, u.first_name, u.last_name, u.phone, sp.is_primary
        FROM student_parents sp
        JOIN parents p ON p.id = sp.parent_id
        JOIN users u ON u.id = p.user_id
        WHERE sp.student_id = $1
        ORDER BY sp.is_primary DESC, u.created_at ASC
        LIMIT 1
        "#,
    )
    .bind(student_id)
    .fetch_optional(executor)
    .await
}

pub async fn fee_type_id<'e, E: PgExecutor<'e>>(
    executor: E,
    code: FeeTypeCode,
) -> Result<Option<Uuid>, sqlx::Error> {
    sqlx::query_scalar("SELECT id FROM fee_types WHERE code = $1")
        .bind(code.as_str())
        .fetch_optional(executor)
        .await
}

/// Recreate a fee type whose seed row was removed. Concurrent callers get the same id.
pub async fn insert_fee_type<'e, E: PgExecutor<'e>>(
    executor: E,
    code: FeeTypeCode,
) -> Result<Uuid, sqlx::Error> {
    sqlx::query_scalar(
        r#"
        INSERT INTO fee_types (code, name)
        VALUES ($1, $2)
        ON CONFLICT (code) DO UPDATE SET code = EXCLUDED.code
        RETURNING id
        "#,
    )
    .bind(code.as_str())
    .bind(code.display_name())
    .fetch_one(executor)
    .await
}

pub async fn invoice<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_id: Uuid,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1")
        .bind(invoice_id)
        .fetch_optional(executor)
        .await
}

pub async fn invoice_for_update<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_id: Uuid,
) -> Result<Option<Invoice>, sqlx::Error> {
    sqlx::query_as::<_, Invoice>("SELECT * FROM invoices WHERE id = $1 FOR UPDATE")
        .bind(invoice_id)
        .fetch_optional(executor)
        .await
}

pub async fn invoice_items<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_id: Uuid,
) -> Result<Vec<InvoiceItem>, sqlx::Error> {
    sqlx::query_as::<_, InvoiceItem>(
        r#"
        SELECT ii.id, ii.invoice_id, ii.fee_type_id, ii.description, ii.amount, ii.quantity
        FROM invoice_items ii
        JOIN fee_types ft ON ft.id = ii.fee_type_id
        WHERE ii.invoice_id = $1
        ORDER BY (ft.code = 'REGISTRATION') DESC, ii.description
        "#,
    )
    .bind(invoice_id)
    .fetch_all(executor)
    .await
}

/// Payments on an invoice, newest first.
pub async fn invoice_payments<'e, E: PgExecutor<'e>>(
    executor: E,
    invoice_id: Uuid,
) -> Result<Vec<Payment>, sqlx::Error> {
    sqlx::query_as::<_, Payment>(
        "SELECT * FROM payments WHERE invoice_id = $1 ORDER BY created_at DESC, payment_number DESC",
    )
    .bind(invoice_id)
    .fetch_all(executor)
    .await
}
