//! Invoice and invoice line models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::{Page, PaymentMethod};

/// Invoice status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Pending,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Pending => "PENDING",
            InvoiceStatus::Paid => "PAID",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "PAID" => InvoiceStatus::Paid,
            _ => InvoiceStatus::Pending,
        }
    }
}

/// Fee type codes seeded by the migrations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeeTypeCode {
    Registration,
    Tuition,
}

impl FeeTypeCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeeTypeCode::Registration => "REGISTRATION",
            FeeTypeCode::Tuition => "TUITION",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            FeeTypeCode::Registration => "Registration Fee",
            FeeTypeCode::Tuition => "Tuition Fee",
        }
    }
}

/// Invoice header.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Invoice {
    pub id: Uuid,
    pub invoice_number: String,
    pub student_id: Uuid,
    pub branch_id: Uuid,
    pub registration_id: Option<Uuid>,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub paid_amount: Decimal,
    pub status: String,
    pub fs_number: Option<String>,
    pub due_date: DateTime<Utc>,
    pub created_by_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    pub fn status(&self) -> InvoiceStatus {
        InvoiceStatus::from_string(&self.status)
    }

    /// FS numbers are blank-insensitive: whitespace counts as missing.
    pub fn has_fs_number(&self) -> bool {
        self.fs_number
            .as_deref()
            .is_some_and(|fs| !fs.trim().is_empty())
    }
}

/// Invoice line. Never updated after creation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItem {
    pub id: Uuid,
    pub invoice_id: Uuid,
    pub fee_type_id: Uuid,
    pub description: String,
    pub amount: Decimal,
    pub quantity: i32,
}

/// Invoice joined with student, parent, branch and latest payment for listings and export.
#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceListRow {
    pub id: Uuid,
    pub invoice_number: String,
    pub status: String,
    pub total_amount: Decimal,
    pub discount_amount: Decimal,
    pub final_amount: Decimal,
    pub paid_amount: Decimal,
    pub fs_number: Option<String>,
    pub due_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub student_id: Uuid,
    pub student_code: String,
    pub student_name: String,
    pub branch_id: Uuid,
    pub branch_name: String,
    pub registration_id: Option<Uuid>,
    pub registration_number: Option<String>,
    pub parent_name: Option<String>,
    pub parent_phone: Option<String>,
    pub created_by_name: Option<String>,
    pub latest_payment_id: Option<Uuid>,
    pub latest_payment_method: Option<String>,
    pub latest_payment_status: Option<String>,
    pub latest_payment_date: Option<DateTime<Utc>>,
    pub latest_transaction_id: Option<String>,
}

/// Filter parameters for listing and exporting invoices.
#[derive(Debug, Clone, Default)]
pub struct ListInvoicesFilter {
    pub page: Page,
    pub search: Option<String>,
    pub status: Option<InvoiceStatus>,
    pub payment_method: Option<PaymentMethod>,
    pub branch_id: Option<Uuid>,
}
