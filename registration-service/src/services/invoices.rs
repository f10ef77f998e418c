//! Invoice listing, export, online payment confirmation and link resend.

use chrono::Utc;
use sqlx::{Postgres, Transaction};
use tracing::{info, instrument};
use uuid::Uuid;

use crate::models::{
    Actor, Invoice, InvoiceItem, InvoiceListRow, InvoiceStatus, ListInvoicesFilter, Payment,
    PaymentMethod, PaymentStatus, RegistrationStatus, Role,
};
use crate::services::export::{format_timestamp, Cell, ExportFile, ExportFormat, Table};
use crate::services::metrics::{DB_QUERY_DURATION, INVOICES_TOTAL, PAYMENTS_TOTAL};
use crate::services::registrations::search_pattern;
use crate::services::{lookups, numbering, Database, ServiceError, SmsNotifier};

const INVOICE_COLUMNS: &str = r#"
    SELECT i.id, i.invoice_number, i.status, i.total_amount, i.discount_amount, i.final_amount,
           i.paid_amount, i.fs_number, i.due_date, i.created_at,
           s.id AS student_id, s.student_code,
           (su.first_name || ' ' || su.last_name) AS student_name,
           b.id AS branch_id, b.name AS branch_name,
           r.id AS registration_id, r.registration_number,
           par.parent_name, par.parent_phone,
           (cu.first_name || ' ' || cu.last_name) AS created_by_name,
           lp.id AS latest_payment_id, lp.payment_method AS latest_payment_method,
           lp.status AS latest_payment_status, lp.payment_date AS latest_payment_date,
           lp.transaction_id AS latest_transaction_id
"#;

const INVOICE_FROM: &str = r#"
    FROM invoices i
    JOIN students s ON s.id = i.student_id
    JOIN users su ON su.id = s.user_id
    JOIN branches b ON b.id = i.branch_id
    LEFT JOIN registrations r ON r.id = i.registration_id
    LEFT JOIN users cu ON cu.id = i.created_by_id
    LEFT JOIN LATERAL (
        SELECT (pu.first_name || ' ' || pu.last_name) AS parent_name, pu.phone AS parent_phone
        FROM student_parents sp
        JOIN parents p ON p.id = sp.parent_id
        JOIN users pu ON pu.id = p.user_id
        WHERE sp.student_id = s.id
        ORDER BY sp.is_primary DESC
        LIMIT 1
    ) par ON TRUE
    LEFT JOIN LATERAL (
        SELECT p.id, p.payment_method, p.status, p.payment_date, p.transaction_id
        FROM payments p
        WHERE p.invoice_id = i.id
        ORDER BY p.created_at DESC
        LIMIT 1
    ) lp ON TRUE
"#;

const INVOICE_WHERE: &str = r#"
    WHERE ($1::uuid IS NULL OR i.branch_id = $1)
      AND ($2::text IS NULL OR i.status = $2)
      AND ($3::text IS NULL OR lp.payment_method = $3)
      AND ($4::text IS NULL
           OR i.invoice_number ILIKE $4
           OR su.first_name ILIKE $4
           OR su.last_name ILIKE $4
           OR (su.first_name || ' ' || su.last_name) ILIKE $4
           OR s.student_code ILIKE $4)
"#;

pub const INVOICE_EXPORT_HEADERS: [&str; 15] = [
    "Invoice Number",
    "Transaction ID",
    "Registration Number",
    "Student Name",
    "Student ID",
    "Parent Name",
    "Parent Phone",
    "Branch",
    "Total Amount",
    "Paid Amount",
    "Status",
    "Payment Method",
    "Payment Date",
    "Created By",
    "Created At",
];

/// Invoice with its lines and payments.
#[derive(Debug, Clone)]
pub struct InvoiceDetails {
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}

#[derive(Debug, Clone)]
pub struct ResentLink {
    pub invoice: Invoice,
    pub parent_phone: String,
    pub payment_link: String,
}

#[derive(Clone)]
pub struct InvoiceService {
    db: Database,
    notifier: SmsNotifier,
}

impl InvoiceService {
    pub fn new(db: Database, notifier: SmsNotifier) -> Self {
        Self { db, notifier }
    }

    /// Settle the pending online payment of an invoice.
    #[instrument(skip(self, actor, transaction_reference, notes), fields(user_id = %actor.user_id))]
    pub async fn confirm_payment(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
        transaction_reference: Option<String>,
        notes: Option<String>,
    ) -> Result<(Invoice, Payment), ServiceError> {
        actor.require_any(Role::STAFF)?;

        let timer = DB_QUERY_DURATION
            .with_label_values(&["confirm_payment"])
            .start_timer();

        let mut tx = self.db.pool().begin().await?;
        let result =
            Self::settle_pending(&mut tx, actor, invoice_id, transaction_reference, notes).await;
        let (invoice, payment) = match result {
            Ok(settled) => settled,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };
        tx.commit().await?;
        timer.observe_duration();

        PAYMENTS_TOTAL
            .with_label_values(&[payment.payment_method.as_str(), PaymentStatus::Completed.as_str()])
            .inc();
        INVOICES_TOTAL
            .with_label_values(&[InvoiceStatus::Paid.as_str()])
            .inc();

        info!(
            invoice_id = %invoice.id,
            payment_number = %payment.payment_number,
            "Online payment confirmed"
        );

        Ok((invoice, payment))
    }

    async fn settle_pending(
        tx: &mut Transaction<'_, Postgres>,
        actor: &Actor,
        invoice_id: Uuid,
        transaction_reference: Option<String>,
        notes: Option<String>,
    ) -> Result<(Invoice, Payment), ServiceError> {
        let invoice = lookups::invoice_for_update(&mut **tx, invoice_id)
            .await?
            .filter(|invoice| actor.can_access_branch(invoice.branch_id))
            .ok_or(ServiceError::InvoiceNotFound)?;

        if invoice.status() == InvoiceStatus::Paid {
            return Err(ServiceError::InvoiceAlreadyPaid);
        }

        let pending = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM payments
            WHERE invoice_id = $1 AND status = $2
            ORDER BY created_at DESC
            LIMIT 1
            FOR UPDATE
            "#,
        )
        .bind(invoice.id)
        .bind(PaymentStatus::Pending.as_str())
        .fetch_optional(&mut **tx)
        .await?
        .ok_or(ServiceError::NoPendingPayment)?;

        let now = Utc::now();
        let payment = sqlx::query_as::<_, Payment>(
            r#"
            UPDATE payments
            SET status = $2,
                transaction_id = COALESCE($3, transaction_id),
                notes = COALESCE($4, notes)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(pending.id)
        .bind(PaymentStatus::Completed.as_str())
        .bind(transaction_reference.filter(|s| !s.trim().is_empty()))
        .bind(notes.filter(|s| !s.trim().is_empty()))
        .fetch_one(&mut **tx)
        .await?;

        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET status = $2, paid_amount = total_amount, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(InvoiceStatus::Paid.as_str())
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE registrations
            SET status = $3, completed_at = $4, paid_amount = $5, updated_at = $4
            WHERE student_id = $1 AND status = $2
            "#,
        )
        .bind(invoice.student_id)
        .bind(RegistrationStatus::PendingPayment.as_str())
        .bind(RegistrationStatus::PaymentCompleted.as_str())
        .bind(now)
        .bind(payment.amount)
        .execute(&mut **tx)
        .await?;

        Ok((invoice, payment))
    }

    /// Renumber an unpaid online invoice and send its payment link again.
    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn resend_payment_link(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
    ) -> Result<ResentLink, ServiceError> {
        actor.require_any(Role::STAFF)?;

        let mut tx = self.db.pool().begin().await?;
        let (invoice, parent_phone) = match Self::renumber(&mut tx, actor, invoice_id).await {
            Ok(renumbered) => renumbered,
            Err(e) => {
                tx.rollback().await?;
                return Err(e);
            }
        };
        tx.commit().await?;

        let payment_link = self.notifier.payment_link(invoice.id);
        self.notifier
            .notify_payment_link(parent_phone.clone(), invoice.final_amount, invoice.id);

        info!(
            invoice_id = %invoice.id,
            invoice_number = %invoice.invoice_number,
            "Payment link resent"
        );

        Ok(ResentLink {
            invoice,
            parent_phone,
            payment_link,
        })
    }

    async fn renumber(
        tx: &mut Transaction<'_, Postgres>,
        actor: &Actor,
        invoice_id: Uuid,
    ) -> Result<(Invoice, String), ServiceError> {
        let invoice = lookups::invoice_for_update(&mut **tx, invoice_id)
            .await?
            .filter(|invoice| actor.can_access_branch(invoice.branch_id))
            .ok_or(ServiceError::InvoiceNotFound)?;

        let has_pending_online: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM payments
                WHERE invoice_id = $1 AND status = $2 AND payment_method IN ($3, $4)
            )
            "#,
        )
        .bind(invoice.id)
        .bind(PaymentStatus::Pending.as_str())
        .bind(PaymentMethod::Telebirr.as_str())
        .bind(PaymentMethod::Online.as_str())
        .fetch_one(&mut **tx)
        .await?;
        if !has_pending_online {
            return Err(ServiceError::NoPendingOnlinePayment);
        }

        let parent_phone = lookups::primary_parent(&mut **tx, invoice.student_id)
            .await?
            .and_then(|parent| parent.phone)
            .filter(|phone| !phone.trim().is_empty())
            .ok_or(ServiceError::ParentPhoneMissing)?;

        let now = Utc::now();
        let sequence = numbering::next_value(&mut **tx, numbering::INVOICE_SCOPE).await?;
        let invoice = sqlx::query_as::<_, Invoice>(
            r#"
            UPDATE invoices
            SET invoice_number = $2, updated_at = $3
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(invoice.id)
        .bind(numbering::invoice_number(now, sequence))
        .bind(now)
        .fetch_one(&mut **tx)
        .await?;

        Ok((invoice, parent_phone))
    }

    #[instrument(skip(self, actor, filter), fields(user_id = %actor.user_id))]
    pub async fn list_invoices(
        &self,
        actor: &Actor,
        filter: &ListInvoicesFilter,
    ) -> Result<(Vec<InvoiceListRow>, i64), ServiceError> {
        actor.require_any(Role::STAFF)?;
        let branch_id = actor.resolve_branch_filter(filter.branch_id)?;
        let status = filter.status.map(|s| s.as_str());
        let method = filter.payment_method.map(|m| m.as_str());
        let search = search_pattern(filter.search.as_deref());

        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_invoices"])
            .start_timer();

        let rows_sql = format!(
            "{} {} {} ORDER BY i.created_at DESC LIMIT $5 OFFSET $6",
            INVOICE_COLUMNS, INVOICE_FROM, INVOICE_WHERE
        );
        let rows = sqlx::query_as::<_, InvoiceListRow>(&rows_sql)
            .bind(branch_id)
            .bind(status)
            .bind(method)
            .bind(search.as_deref())
            .bind(filter.page.limit)
            .bind(filter.page.offset())
            .fetch_all(self.db.pool())
            .await?;

        let count_sql = format!("SELECT COUNT(*) {} {}", INVOICE_FROM, INVOICE_WHERE);
        let total: i64 = sqlx::query_scalar(&count_sql)
            .bind(branch_id)
            .bind(status)
            .bind(method)
            .bind(search.as_deref())
            .fetch_one(self.db.pool())
            .await?;

        timer.observe_duration();

        Ok((rows, total))
    }

    #[instrument(skip(self, actor), fields(user_id = %actor.user_id))]
    pub async fn get_invoice(
        &self,
        actor: &Actor,
        invoice_id: Uuid,
    ) -> Result<InvoiceDetails, ServiceError> {
        actor.require_any(Role::STAFF)?;

        let pool = self.db.pool();
        let invoice = lookups::invoice(pool, invoice_id)
            .await?
            .filter(|invoice| actor.can_access_branch(invoice.branch_id))
            .ok_or(ServiceError::InvoiceNotFound)?;
        let items = lookups::invoice_items(pool, invoice.id).await?;
        let payments = lookups::invoice_payments(pool, invoice.id).await?;

        Ok(InvoiceDetails {
            invoice,
            items,
            payments,
        })
    }

    /// Every invoice matching the filter, newest first, as a workbook or CSV.
    #[instrument(skip(self, actor, filter), fields(user_id = %actor.user_id))]
    pub async fn export_invoices(
        &self,
        actor: &Actor,
        filter: &ListInvoicesFilter,
        format: ExportFormat,
    ) -> Result<ExportFile, ServiceError> {
        actor.require_any(Role::STAFF)?;
        let branch_id = actor.resolve_branch_filter(filter.branch_id)?;
        let search = search_pattern(filter.search.as_deref());

        let timer = DB_QUERY_DURATION
            .with_label_values(&["export_invoices"])
            .start_timer();

        let sql = format!(
            "{} {} {} ORDER BY i.created_at DESC",
            INVOICE_COLUMNS, INVOICE_FROM, INVOICE_WHERE
        );
        let rows = sqlx::query_as::<_, InvoiceListRow>(&sql)
            .bind(branch_id)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.payment_method.map(|m| m.as_str()))
            .bind(search.as_deref())
            .fetch_all(self.db.pool())
            .await?;

        timer.observe_duration();

        invoices_table(&rows).render(format, "Invoices")
    }
}

pub fn invoices_table(rows: &[InvoiceListRow]) -> Table {
    let mut table = Table::new(&INVOICE_EXPORT_HEADERS);
    let or_na = |value: Option<String>| Cell::Text(value.unwrap_or_else(|| "N/A".to_string()));
    for row in rows {
        table.push(vec![
            Cell::text(&row.invoice_number),
            or_na(row.latest_transaction_id.clone()),
            or_na(row.registration_number.clone()),
            Cell::text(&row.student_name),
            Cell::text(&row.student_code),
            or_na(row.parent_name.clone()),
            or_na(row.parent_phone.clone()),
            Cell::text(&row.branch_name),
            Cell::Money(row.total_amount),
            Cell::Money(row.paid_amount),
            Cell::text(&row.status),
            or_na(row.latest_payment_method.clone()),
            or_na(row.latest_payment_date.map(format_timestamp)),
            Cell::text(row.created_by_name.clone().unwrap_or_default()),
            Cell::text(format_timestamp(row.created_at)),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn row() -> InvoiceListRow {
        let created = Utc.with_ymd_and_hms(2026, 10, 1, 8, 0, 0).unwrap();
        InvoiceListRow {
            id: Uuid::new_v4(),
            invoice_number: "INV-1-0001".to_string(),
            status: "PAID".to_string(),
            total_amount: "1500.00".parse().unwrap(),
            discount_amount: "150.00".parse().unwrap(),
            final_amount: "1350.00".parse().unwrap(),
            paid_amount: "1350.00".parse().unwrap(),
            fs_number: None,
            due_date: created,
            created_at: created,
            student_id: Uuid::new_v4(),
            student_code: "STU-001".to_string(),
            student_name: "Sara \"Sisi\" Tesfaye".to_string(),
            branch_id: Uuid::new_v4(),
            branch_name: "Bole".to_string(),
            registration_id: None,
            registration_number: Some("REG-BOL-00001".to_string()),
            parent_name: None,
            parent_phone: Some("0911223344".to_string()),
            created_by_name: Some("Abebe Kebede".to_string()),
            latest_payment_id: None,
            latest_payment_method: Some("CASH".to_string()),
            latest_payment_status: Some("COMPLETED".to_string()),
            latest_payment_date: Some(created),
            latest_transaction_id: Some("RCPT-9".to_string()),
        }
    }

    #[test]
    fn export_rows_follow_the_header_order() {
        let table = invoices_table(&[row()]);
        assert_eq!(table.len(), 1);

        let csv = String::from_utf8(table.to_csv().unwrap()).unwrap();
        let mut lines = csv.lines();

        let header = lines.next().unwrap();
        assert!(header.starts_with("\"Invoice Number\",\"Transaction ID\""));
        assert_eq!(header.split(',').count(), INVOICE_EXPORT_HEADERS.len());

        let line = lines.next().unwrap();
        assert!(line.starts_with("\"INV-1-0001\",\"RCPT-9\",\"REG-BOL-00001\""));
        assert!(line.contains("\"Sara \"\"Sisi\"\" Tesfaye\""));
        assert!(line.contains("\"N/A\",\"0911223344\""));
        assert!(line.contains("\"1350.00\""));
        assert!(line.ends_with("\"2026-10-01 08:00:00\""));
    }

    #[test]
    fn invoice_workbook_renders() {
        let file = invoices_table(&[row()])
            .render(ExportFormat::Excel, "Invoices")
            .unwrap();
        assert_eq!(file.format, ExportFormat::Excel);
        assert!(file.bytes.starts_with(b"PK"));
    }
}
