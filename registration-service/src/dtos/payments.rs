use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::models::{Invoice, InvoiceItem, Payment, Registration};
use crate::services::PaymentOutcome;

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProcessPaymentRequest {
    pub registration_id: Option<Uuid>,
    pub payment_method: Option<String>,
    pub discount_percentage: Option<Decimal>,
    #[validate(length(max = 100, message = "Receipt number is too long"))]
    pub receipt_number: Option<String>,
    #[validate(length(max = 100, message = "Transaction number is too long"))]
    pub transaction_number: Option<String>,
    pub paid_amount: Option<Decimal>,
    #[validate(length(max = 1000, message = "Notes are too long"))]
    pub notes: Option<String>,
    pub payment_date: Option<DateTime<Utc>>,
}

/// Invoice with its lines, as returned after a payment.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceWithItems {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub message: String,
    pub registration: Registration,
    pub invoice: InvoiceWithItems,
    pub payment: Payment,
    pub redirect_to: String,
}

impl From<PaymentOutcome> for PaymentResponse {
    fn from(outcome: PaymentOutcome) -> Self {
        let (message, redirect_to) = if outcome.is_settled() {
            (
                "Payment processed successfully",
                format!(
                    "/registration/payment/success?invoiceId={}",
                    outcome.invoice.id
                ),
            )
        } else {
            (
                "Invoice created. Awaiting online payment confirmation",
                format!("/invoices/{}", outcome.invoice.id),
            )
        };

        Self {
            message: message.to_string(),
            registration: outcome.registration,
            invoice: InvoiceWithItems {
                invoice: outcome.invoice,
                items: outcome.items,
            },
            payment: outcome.payment,
            redirect_to,
        }
    }
}
