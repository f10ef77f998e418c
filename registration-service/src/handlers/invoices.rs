//! Invoice endpoints: listing, export, details, confirmation and link resend.

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        ConfirmPaymentRequest, ConfirmPaymentResponse, ExportQuery, InvoiceDetailsResponse,
        ListInvoicesQuery, ListInvoicesResponse, Pagination, ResendLinkResponse,
    },
    middleware::AuthUser,
    models::ListInvoicesFilter,
    services::export::{self, ExportFile, ExportFormat},
    AppState,
};

pub async fn list_invoices(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<ListInvoicesResponse>, AppError> {
    let filter = ListInvoicesFilter::try_from(query)?;
    let (invoices, total) = state.invoices.list_invoices(&actor, &filter).await?;

    Ok(Json(ListInvoicesResponse {
        invoices,
        pagination: Pagination::new(filter.page, total),
    }))
}

/// Workbook (default) or CSV attachment of every invoice matching the list filters.
pub async fn export_invoices(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Query(query): Query<ListInvoicesQuery>,
    Query(export): Query<ExportQuery>,
) -> Result<impl IntoResponse, AppError> {
    let filter = ListInvoicesFilter::try_from(query)?;
    let format = ExportFormat::parse(export.format.as_deref())?;
    let file = state
        .invoices
        .export_invoices(&actor, &filter, format)
        .await?;

    Ok(attachment("invoices-export", file))
}

pub(crate) fn attachment(prefix: &str, file: ExportFile) -> impl IntoResponse {
    let disposition = format!(
        "attachment; filename=\"{}\"",
        export::file_name(prefix, file.format, Utc::now())
    );
    (
        [
            (header::CONTENT_TYPE, file.format.content_type().to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
}

pub async fn get_invoice(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<InvoiceDetailsResponse>, AppError> {
    let details = state.invoices.get_invoice(&actor, invoice_id).await?;
    Ok(Json(InvoiceDetailsResponse::from(details)))
}

/// Settle the pending online payment of an invoice.
pub async fn confirm_payment(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<ConfirmPaymentRequest>,
) -> Result<Json<ConfirmPaymentResponse>, AppError> {
    payload.validate()?;

    let (invoice, payment) = state
        .invoices
        .confirm_payment(
            &actor,
            invoice_id,
            payload.transaction_reference,
            payload.notes,
        )
        .await?;

    Ok(Json(ConfirmPaymentResponse {
        message: "Payment confirmed successfully".to_string(),
        invoice,
        payment,
    }))
}

pub async fn resend_payment_link(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<ResendLinkResponse>, AppError> {
    let resent = state
        .invoices
        .resend_payment_link(&actor, invoice_id)
        .await?;

    Ok(Json(ResendLinkResponse::from(resent)))
}
