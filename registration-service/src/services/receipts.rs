//! Receipt data assembly, FS number bookkeeping and parent invoice lookups.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::{FromRow, Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{round_money, Actor, InvoiceItem, ParentContact, PaymentDuration, Role};
use crate::services::metrics::DB_QUERY_DURATION;
use crate::services::receipt_format::{calculate_penalty_fee, format_payment_duration};
use crate::services::{lookups, Database, ServiceError};

const RECEIPT_SELECT: &str = r#"
    SELECT i.id, i.invoice_number, i.fs_number, i.total_amount, i.discount_amount,
           i.final_amount, i.paid_amount, i.created_at,
           s.id AS student_id, s.student_code,
           su.first_name || ' ' || su.last_name AS student_name,
           COALESCE(rg.name, sg.name) AS grade_name,
           b.name AS branch_name, sc.name AS school_name,
           r.registration_number, r.payment_duration, r.payment_due_date,
           r.created_at AS registration_created_at,
           lp.payment_method, lp.transaction_id, lp.payment_date,
           lp.created_at AS payment_created_at, lp.cashier_name
    FROM invoices i
    JOIN students s ON s.id = i.student_id
    JOIN users su ON su.id = s.user_id
    JOIN branches b ON b.id = i.branch_id
    JOIN schools sc ON sc.id = b.school_id
    LEFT JOIN grades sg ON sg.id = s.grade_id
    LEFT JOIN registrations r ON r.id = i.registration_id
    LEFT JOIN grades rg ON rg.id = r.grade_id
    LEFT JOIN LATERAL (
        SELECT p.payment_method, p.transaction_id, p.payment_date, p.created_at,
               pu.first_name || ' ' || pu.last_name AS cashier_name
        FROM payments p
        LEFT JOIN users pu ON pu.id = p.processed_by_id
        WHERE p.invoice_id = i.id
        ORDER BY p.created_at DESC
        LIMIT 1
    ) lp ON TRUE
"#;

const RECEIPT_ORDER: &str = "ORDER BY student_name, i.created_at";

#[derive(Debug, Clone, FromRow)]
struct ReceiptRow {
    id: Uuid,
    invoice_number: String,
    fs_number: Option<String>,
    total_amount: Decimal,
    discount_amount: Decimal,
    final_amount: Decimal,
    paid_amount: Decimal,
    created_at: DateTime<Utc>,
    student_id: Uuid,
    student_code: String,
    student_name: String,
    grade_name: Option<String>,
    branch_name: String,
    school_name: String,
    registration_number: Option<String>,
    payment_duration: Option<String>,
    payment_due_date: Option<DateTime<Utc>>,
    registration_created_at: Option<DateTime<Utc>>,
    payment_method: Option<String>,
    transaction_id: Option<String>,
    payment_date: Option<DateTime<Utc>>,
    payment_created_at: Option<DateTime<Utc>>,
    cashier_name: Option<String>,
}

impl ReceiptRow {
    fn has_fs_number(&self) -> bool {
        self.fs_number
            .as_deref()
            .is_some_and(|fs| !fs.trim().is_empty())
    }

    fn receipt_number(&self) -> String {
        self.registration_number
            .clone()
            .or_else(|| self.transaction_id.clone())
            .unwrap_or_else(|| self.invoice_number.clone())
    }

    fn penalty_fee(&self) -> Decimal {
        match (self.payment_due_date, self.payment_created_at) {
            (Some(due), Some(paid)) => calculate_penalty_fee(due, paid),
            _ => Decimal::ZERO,
        }
    }

    fn fs_pending(&self) -> FsPending {
        FsPending {
            id: self.id,
            student_name: self.student_name.clone(),
        }
    }

    fn into_entry(self, items: Vec<InvoiceItem>) -> ReceiptEntry {
        let receipt_number = self.receipt_number();
        let penalty_fee = self.penalty_fee();
        let duration_label = match (self.payment_duration.as_deref(), self.registration_created_at) {
            (Some(duration), Some(created)) => Some(format_payment_duration(
                PaymentDuration::from_string(duration),
                created,
            )),
            _ => None,
        };

        ReceiptEntry {
            invoice_id: self.id,
            invoice_number: self.invoice_number,
            receipt_number,
            fs_number: self.fs_number,
            student_id: self.student_id,
            student_code: self.student_code,
            student_name: self.student_name,
            grade_name: self.grade_name,
            branch_name: self.branch_name,
            duration_label,
            payment_method: self.payment_method,
            transaction_id: self.transaction_id,
            payment_date: self.payment_date,
            cashier_name: self.cashier_name,
            items,
            total_amount: self.total_amount,
            discount_amount: self.discount_amount,
            penalty_fee,
            final_amount: round_money(self.total_amount - self.discount_amount + penalty_fee),
        }
    }

    fn into_summary(self) -> ParentInvoiceSummary {
        let receipt_number = self.receipt_number();
        let needs_fs_number = !self.has_fs_number();
        ParentInvoiceSummary {
            id: self.id,
            invoice_number: self.invoice_number,
            student_name: self.student_name,
            student_code: self.student_code,
            grade_name: self.grade_name,
            total_amount: self.total_amount,
            final_amount: self.final_amount,
            paid_amount: self.paid_amount,
            receipt_number,
            fs_number: self.fs_number,
            needs_fs_number,
            created_at: self.created_at,
        }
    }
}

/// Invoice that blocks receipt printing until an FS number is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FsPending {
    pub id: Uuid,
    pub student_name: String,
}

/// One invoice as it appears on a receipt.
#[derive(Debug, Clone)]
pub struct ReceiptEntry {
    pub invoice_id: Uuid,
    pub invoice_number: String,
    pub receipt_number: String,
    pub fs_number: Option<String>,
    pub student_id: Uuid,
    pub student_code: String,
    pub student_name: String,
    pub grade_name: Option<String>,
    pub branch_name: String,
    pub duration_label: Option<String>,
    pub payment_method: Option<String>,
    pub transaction_id: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
    pub cashier_name: Option<String>,
    pub items: Vec<InvoiceItem>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub penalty_fee: Decimal,
    pub final_amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct ReceiptParent {
    pub name: String,
    pub phone: Option<String>,
}

impl From<ParentContact> for ReceiptParent {
    fn from(contact: ParentContact) -> Self {
        Self {
            name: contact.full_name(),
            phone: contact.phone,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ReceiptDocument {
    pub school_name: String,
    pub parent: Option<ReceiptParent>,
    pub entries: Vec<ReceiptEntry>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub penalty_fee: Decimal,
    pub final_amount: Decimal,
}

impl ReceiptDocument {
    pub fn new(school_name: String, parent: Option<ReceiptParent>, entries: Vec<ReceiptEntry>) -> Self {
        let sum = |f: fn(&ReceiptEntry) -> Decimal| entries.iter().map(f).sum::<Decimal>();
        let total_amount = sum(|e| e.total_amount);
        let discount_amount = sum(|e| e.discount_amount);
        let penalty_fee = sum(|e| e.penalty_fee);
        let final_amount = sum(|e| e.final_amount);

        Self {
            school_name,
            parent,
            entries,
            total_amount,
            discount_amount,
            penalty_fee,
            final_amount,
        }
    }

    pub fn is_multiple(&self) -> bool {
        self.entries.len() > 1
    }
}

#[derive(Debug)]
pub enum ReceiptOutcome {
    Ready(ReceiptDocument),
    NeedsFsNumber(Vec<FsPending>),
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FsStatus {
    pub has_fs: bool,
    pub fs_number: Option<String>,
    pub needs_fs_number: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParentInvoiceSummary {
    pub id: Uuid,
    pub invoice_number: String,
    pub student_name: String,
    #[serde(rename = "studentId")]
    pub student_code: String,
    pub grade_name: Option<String>,
    pub total_amount: Decimal,
    pub final_amount: Decimal,
    pub paid_amount: Decimal,
    pub receipt_number: String,
    pub fs_number: Option<String>,
    pub needs_fs_number: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct ParentInvoices {
    pub invoices: Vec<ParentInvoiceSummary>,
    pub parent: Option<ReceiptParent>,
}

#[derive(Clone)]
pub struct ReceiptService {
    db: Database,
}

impl ReceiptService {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Receipt for one or more invoices, or the invoices still missing an FS number.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id, count = invoice_ids.len()))]
    pub async fn get_receipt_data(
        &self,
        actor: &Actor,
        invoice_ids: &[Uuid],
    ) -> Result<ReceiptOutcome, ServiceError> {
        actor.require_any(Role::STAFF)?;
        if invoice_ids.is_empty() {
            return Err(ServiceError::validation("Invoice ID(s) required"));
        }
        let branch_id = actor.resolve_branch_filter(None)?;

        let rows = self
            .fetch_rows(
                "WHERE i.id = ANY($1) AND ($2::uuid IS NULL OR i.branch_id = $2)",
                |q| q.bind(invoice_ids.to_vec()).bind(branch_id),
            )
            .await?;
        if rows.is_empty() {
            return Err(ServiceError::InvoicesNotFound);
        }

        let pending = pending_fs(&rows);
        if !pending.is_empty() {
            return Ok(ReceiptOutcome::NeedsFsNumber(pending));
        }

        let parent = lookups::primary_parent(self.db.pool(), rows[0].student_id)
            .await?
            .map(ReceiptParent::from);

        Ok(ReceiptOutcome::Ready(self.assemble(rows, parent).await?))
    }

    /// Every invoice of every child of a parent on one receipt.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_combined_receipt(
        &self,
        actor: &Actor,
        parent_id: Uuid,
    ) -> Result<ReceiptOutcome, ServiceError> {
        actor.require_any(Role::STAFF)?;
        let branch_id = actor.resolve_branch_filter(None)?;

        let rows = self
            .fetch_rows(
                r#"
                WHERE i.student_id IN (SELECT student_id FROM student_parents WHERE parent_id = $1)
                  AND ($2::uuid IS NULL OR i.branch_id = $2)
                "#,
                |q| q.bind(parent_id).bind(branch_id),
            )
            .await?;
        if rows.is_empty() {
            return Err(ServiceError::NoInvoicesForParent);
        }

        let pending = pending_fs(&rows);
        if !pending.is_empty() {
            return Ok(ReceiptOutcome::NeedsFsNumber(pending));
        }

        let parent = sqlx::query_as::<_, ParentContact>(
            r#"
            SELECT p.id AS parent_id, u.first_name, u.last_name, u.phone, TRUE AS is_primary
            FROM parents p
            JOIN users u ON u.id = p.user_id
            WHERE p.id = $1
            "#,
        )
        .bind(parent_id)
        .fetch_optional(self.db.pool())
        .await?
        .map(ReceiptParent::from);

        Ok(ReceiptOutcome::Ready(self.assemble(rows, parent).await?))
    }

    /// Record the fiscal-slip number printed on the paper receipt. Set once.
    #[instrument(skip(self, actor, fs_number), fields(user_id = %actor.user_id))]
    pub async fn update_fs_number(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        fs_number: Option<&str>,
    ) -> Result<String, ServiceError> {
        actor.require_any(Role::STAFF)?;
        let fs_number = fs_number
            .map(str::trim)
            .filter(|fs| !fs.is_empty())
            .ok_or_else(|| ServiceError::validation("FS number is required"))?
            .to_string();

        let mut tx = self.db.pool().begin().await?;
        let stored = match Self::write_fs_number(&mut tx, actor, invoice_id, &fs_number).await {
            Ok(stored) => stored,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };
        tx.commit().await?;

        info!(invoice_id = %invoice_id, "FS number recorded");
        Ok(stored)
    }

    async fn write_fs_number(
        tx: &mut Transaction<'_, Postgres>,
        actor: &Actor,
        invoice_id: Uuid,
        fs_number: &str,
    ) -> Result<String, ServiceError> {
        let invoice = lookups::invoice_for_update(&mut **tx, invoice_id)
            .await?
            .filter(|i| actor.can_access_branch(i.branch_id))
            .ok_or(ServiceError::InvoiceNotFound)?;

        if invoice.has_fs_number() {
            let current = invoice.fs_number.unwrap_or_default();
            if current.trim() == fs_number {
                return Ok(current);
            }
            return Err(ServiceError::FsNumberAlreadyAssigned);
        }

        sqlx::query("UPDATE invoices SET fs_number = $2, updated_at = NOW() WHERE id = $1")
            .bind(invoice.id)
            .bind(fs_number)
            .execute(&mut **tx)
            .await?;

        Ok(fs_number.to_string())
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn check_fs_number(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
    ) -> Result<FsStatus, ServiceError> {
        actor.require_any(Role::STAFF)?;
        let invoice = lookups::invoice(self.db.pool(), invoice_id)
            .await?
            .filter(|i| actor.can_access_branch(i.branch_id))
            .ok_or(ServiceError::InvoiceNotFound)?;

        let has_fs = invoice.has_fs_number();
        Ok(FsStatus {
            has_fs,
            fs_number: invoice.fs_number,
            needs_fs_number: !has_fs,
        })
    }

    /// Invoices of the children whose parent has this phone number.
    #[instrument(skip(self, actor, parent_phone), fields(user_id = %actor.user_id))]
    pub async fn get_parent_invoices(
        &self,
        actor: &Actor,
        parent_phone: &str,
    ) -> Result<ParentInvoices, ServiceError> {
        actor.require_any(Role::STAFF)?;
        let parent_phone = parent_phone.trim();
        if parent_phone.is_empty() {
            return Err(ServiceError::validation("Parent phone is required"));
        }
        let branch_id = actor.resolve_branch_filter(None)?;

        let rows = self
            .fetch_rows(
                r#"
                WHERE i.student_id IN (
                    SELECT sp.student_id
                    FROM student_parents sp
                    JOIN parents p ON p.id = sp.parent_id
                    JOIN users pu ON pu.id = p.user_id
                    WHERE pu.phone = $1
                )
                  AND ($2::uuid IS NULL OR i.branch_id = $2)
                "#,
                |q| q.bind(parent_phone.to_string()).bind(branch_id),
            )
            .await?;

        let parent = match rows.first() {
            Some(row) => lookups::primary_parent(self.db.pool(), row.student_id)
                .await?
                .map(ReceiptParent::from),
            None => None,
        };

        Ok(ParentInvoices {
            invoices: rows.into_iter().map(ReceiptRow::into_summary).collect(),
            parent,
        })
    }

    async fn fetch_rows<F>(&self, where_clause: &str, bind: F) -> Result<Vec<ReceiptRow>, ServiceError>
    where
        F: for<'q> FnOnce(
            sqlx::query::QueryAs<'q, Postgres, ReceiptRow, sqlx::postgres::PgArguments>,
        ) -> sqlx::query::QueryAs<'q, Postgres, ReceiptRow, sqlx::postgres::PgArguments>,
    {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["receipt_rows"])
            .start_timer();

        let sql = format!("{} {} {}", RECEIPT_SELECT, where_clause, RECEIPT_ORDER);
        let rows = bind(sqlx::query_as::<_, ReceiptRow>(&sql))
            .fetch_all(self.db.pool())
            .await?;

        timer.observe_duration();
        Ok(rows)
    }

    async fn assemble(
        &self,
        rows: Vec<ReceiptRow>,
        parent: Option<ReceiptParent>,
    ) -> Result<ReceiptDocument, ServiceError> {
        let school_name = rows
            .first()
            .map(|r| r.school_name.clone())
            .unwrap_or_default();

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let items = lookups::invoice_items(self.db.pool(), row.id).await?;
            entries.push(row.into_entry(items));
        }

        Ok(ReceiptDocument::new(school_name, parent, entries))
    }
}

fn pending_fs(rows: &[ReceiptRow]) -> Vec<FsPending> {
    rows.iter()
        .filter(|r| !r.has_fs_number())
        .map(ReceiptRow::fs_pending)
        .collect()
}
