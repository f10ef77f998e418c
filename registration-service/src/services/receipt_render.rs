//! HTML rendering of receipt documents.

use askama::Template;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::round_money;
use crate::services::metrics::RECEIPTS_RENDERED_TOTAL;
use crate::services::receipts::{ReceiptDocument, ReceiptEntry};
use crate::services::ServiceError;

const NOT_AVAILABLE: &str = "N/A";

fn money(amount: Decimal) -> String {
    format!("{:.2}", round_money(amount))
}

fn date(value: DateTime<Utc>) -> String {
    value.format("%Y-%m-%d").to_string()
}

struct ItemView {
    description: String,
    quantity: i32,
    amount: String,
}

struct EntryView {
    receipt_number: String,
    invoice_number: String,
    student_name: String,
    student_code: String,
    grade_name: String,
    branch_name: String,
    duration_label: String,
    fs_number: String,
    payment_method: String,
    transaction_id: String,
    payment_date: String,
    cashier_name: String,
    items: Vec<ItemView>,
    total_amount: String,
    discount_amount: String,
    has_discount: bool,
    penalty_fee: String,
    has_penalty: bool,
    final_amount: String,
}

impl From<&ReceiptEntry> for EntryView {
    fn from(entry: &ReceiptEntry) -> Self {
        let or_na = |value: &Option<String>| value.clone().unwrap_or_else(|| NOT_AVAILABLE.to_string());
        Self {
            receipt_number: entry.receipt_number.clone(),
            invoice_number: entry.invoice_number.clone(),
            student_name: entry.student_name.clone(),
            student_code: entry.student_code.clone(),
            grade_name: or_na(&entry.grade_name),
            branch_name: entry.branch_name.clone(),
            duration_label: or_na(&entry.duration_label),
            fs_number: entry.fs_number.clone().unwrap_or_default(),
            payment_method: or_na(&entry.payment_method),
            transaction_id: or_na(&entry.transaction_id),
            payment_date: entry
                .payment_date
                .map(date)
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            cashier_name: entry
                .cashier_name
                .clone()
                .unwrap_or_else(|| "System".to_string()),
            items: entry
                .items
                .iter()
                .map(|item| ItemView {
                    description: item.description.clone(),
                    quantity: item.quantity,
                    amount: money(item.amount),
                })
                .collect(),
            total_amount: money(entry.total_amount),
            discount_amount: money(entry.discount_amount),
            has_discount: entry.discount_amount > Decimal::ZERO,
            penalty_fee: money(entry.penalty_fee),
            has_penalty: entry.penalty_fee > Decimal::ZERO,
            final_amount: money(entry.final_amount),
        }
    }
}

struct Totals {
    total_amount: String,
    discount_amount: String,
    has_discount: bool,
    penalty_fee: String,
    has_penalty: bool,
    final_amount: String,
}

impl From<&ReceiptDocument> for Totals {
    fn from(doc: &ReceiptDocument) -> Self {
        Self {
            total_amount: money(doc.total_amount),
            discount_amount: money(doc.discount_amount),
            has_discount: doc.discount_amount > Decimal::ZERO,
            penalty_fee: money(doc.penalty_fee),
            has_penalty: doc.penalty_fee > Decimal::ZERO,
            final_amount: money(doc.final_amount),
        }
    }
}

#[derive(Template)]
#[template(path = "receipt.html")]
struct ReceiptTemplate {
    school_name: String,
    title: String,
    printed_on: String,
    parent_name: String,
    parent_phone: String,
    entries: Vec<EntryView>,
    multiple: bool,
    totals: Totals,
}

struct StudentGroup {
    student_name: String,
    student_code: String,
    entries: Vec<EntryView>,
    total: String,
}

#[derive(Template)]
#[template(path = "combined_receipt.html")]
struct CombinedReceiptTemplate {
    school_name: String,
    printed_on: String,
    parent_name: String,
    parent_phone: String,
    students: Vec<StudentGroup>,
    payment_method: String,
    cashier_name: String,
    totals: Totals,
}

fn parent_fields(doc: &ReceiptDocument) -> (String, String) {
    match &doc.parent {
        Some(parent) => (
            parent.name.clone(),
            parent
                .phone
                .clone()
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        ),
        None => (NOT_AVAILABLE.to_string(), NOT_AVAILABLE.to_string()),
    }
}

fn render_error(e: askama::Error) -> ServiceError {
    ServiceError::Internal(anyhow::anyhow!("Failed to render receipt: {}", e))
}

/// Receipt for one invoice, or several printed together.
pub fn render_receipt(doc: &ReceiptDocument, now: DateTime<Utc>) -> Result<String, ServiceError> {
    let (parent_name, parent_phone) = parent_fields(doc);
    let entries: Vec<EntryView> = doc.entries.iter().map(EntryView::from).collect();
    let title = entries
        .first()
        .map(|e| e.receipt_number.clone())
        .unwrap_or_default();

    let html = ReceiptTemplate {
        school_name: doc.school_name.clone(),
        title,
        printed_on: date(now),
        parent_name,
        parent_phone,
        multiple: doc.is_multiple(),
        totals: Totals::from(doc),
        entries,
    }
    .render()
    .map_err(render_error)?;

    let kind = if doc.is_multiple() { "multiple" } else { "single" };
    RECEIPTS_RENDERED_TOTAL.with_label_values(&[kind]).inc();
    Ok(html)
}

/// Parent-level receipt grouped per student, with student subtotals.
pub fn render_combined_receipt(
    doc: &ReceiptDocument,
    now: DateTime<Utc>,
) -> Result<String, ServiceError> {
    let (parent_name, parent_phone) = parent_fields(doc);

    let mut order: Vec<Uuid> = Vec::new();
    for entry in &doc.entries {
        if !order.contains(&entry.student_id) {
            order.push(entry.student_id);
        }
    }
    let students = order
        .into_iter()
        .filter_map(|student_id| {
            let own: Vec<&ReceiptEntry> = doc
                .entries
                .iter()
                .filter(|e| e.student_id == student_id)
                .collect();
            let first = own.first()?;
            Some(StudentGroup {
                student_name: first.student_name.clone(),
                student_code: first.student_code.clone(),
                total: money(own.iter().map(|e| e.final_amount).sum()),
                entries: own.into_iter().map(EntryView::from).collect(),
            })
        })
        .collect();

    let first = doc.entries.first();
    let html = CombinedReceiptTemplate {
        school_name: doc.school_name.clone(),
        printed_on: date(now),
        parent_name,
        parent_phone,
        students,
        payment_method: first
            .and_then(|e| e.payment_method.clone())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
        cashier_name: first
            .and_then(|e| e.cashier_name.clone())
            .unwrap_or_else(|| "System".to_string()),
        totals: Totals::from(doc),
    }
    .render()
    .map_err(render_error)?;

    RECEIPTS_RENDERED_TOTAL.with_label_values(&["combined"]).inc();
    Ok(html)
}
