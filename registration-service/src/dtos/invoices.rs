use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use super::{parse_filter, Pagination};
use crate::models::{Invoice, InvoiceItem, InvoiceListRow, ListInvoicesFilter, Page, Payment};
use crate::services::{InvoiceDetails, ResentLink, ServiceError};

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListInvoicesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
    pub status: Option<String>,
    pub payment_method: Option<String>,
    pub branch_id: Option<Uuid>,
}

impl TryFrom<ListInvoicesQuery> for ListInvoicesFilter {
    type Error = ServiceError;

    fn try_from(query: ListInvoicesQuery) -> Result<Self, Self::Error> {
        Ok(ListInvoicesFilter {
            page: Page::new(query.page, query.limit),
            status: parse_filter("status", query.status.as_deref())?,
            payment_method: parse_filter("payment method", query.payment_method.as_deref())?,
            search: query.search,
            branch_id: query.branch_id,
        })
    }
}

/// `?format=excel|csv` on the invoice export, read alongside the list filters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ListInvoicesResponse {
    pub invoices: Vec<InvoiceListRow>,
    pub pagination: Pagination,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceDetailsResponse {
    #[serde(flatten)]
    pub invoice: Invoice,
    pub items: Vec<InvoiceItem>,
    pub payments: Vec<Payment>,
}

impl From<InvoiceDetails> for InvoiceDetailsResponse {
    fn from(details: InvoiceDetails) -> Self {
        Self {
            invoice: details.invoice,
            items: details.items,
            payments: details.payments,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ConfirmPaymentRequest {
    #[validate(length(max = 100, message = "Transaction reference is too long"))]
    pub transaction_reference: Option<String>,
    #[validate(length(max = 1000, message = "Notes are too long"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConfirmPaymentResponse {
    pub message: String,
    pub invoice: Invoice,
    pub payment: Payment,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResendLinkResponse {
    pub message: String,
    pub invoice: Invoice,
    pub parent_phone: String,
    pub payment_link: String,
}

impl From<ResentLink> for ResendLinkResponse {
    fn from(resent: ResentLink) -> Self {
        Self {
            message: "Payment link resent successfully".to_string(),
            invoice: resent.invoice,
            parent_phone: resent.parent_phone,
            payment_link: resent.payment_link,
        }
    }
}
