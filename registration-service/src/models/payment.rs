//! Payment model: one settlement attempt against an invoice.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Payment method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    BankTransfer,
    Telebirr,
    Online,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "CASH",
            PaymentMethod::BankTransfer => "BANK_TRANSFER",
            PaymentMethod::Telebirr => "TELEBIRR",
            PaymentMethod::Online => "ONLINE",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "CASH" => Some(PaymentMethod::Cash),
            "BANK_TRANSFER" => Some(PaymentMethod::BankTransfer),
            "TELEBIRR" => Some(PaymentMethod::Telebirr),
            "ONLINE" => Some(PaymentMethod::Online),
            _ => None,
        }
    }

    /// Cash and bank transfers are settled at the counter.
    pub fn is_manual(&self) -> bool {
        matches!(self, PaymentMethod::Cash | PaymentMethod::BankTransfer)
    }
}

/// Payment status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    Pending,
    Completed,
}

impl PaymentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "PENDING",
            PaymentStatus::Completed => "COMPLETED",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "COMPLETED" => PaymentStatus::Completed,
            _ => PaymentStatus::Pending,
        }
    }
}

/// Payment record.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: Uuid,
    pub payment_number: String,
    pub invoice_id: Uuid,
    pub student_id: Uuid,
    pub registration_id: Option<Uuid>,
    pub branch_id: Uuid,
    pub amount: Decimal,
    pub payment_method: String,
    pub status: String,
    pub transaction_id: Option<String>,
    pub notes: Option<String>,
    pub payment_date: DateTime<Utc>,
    pub processed_by_id: Uuid,
    pub created_at: DateTime<Utc>,
}

impl Payment {
    pub fn status(&self) -> PaymentStatus {
        PaymentStatus::from_string(&self.status)
    }

    pub fn method(&self) -> Option<PaymentMethod> {
        PaymentMethod::parse(&self.payment_method)
    }
}
