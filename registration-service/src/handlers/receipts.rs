//! Receipt endpoints. Receipts are rendered server-side as HTML.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use uuid::Uuid;
use validator::Validate;

use crate::{
    dtos::{
        GenerateReceiptRequest, NeedsFsNumberResponse, ParentInvoicesResponse,
        UpdateFsNumberRequest, UpdateFsNumberResponse,
    },
    middleware::AuthUser,
    models::Actor,
    services::{
        receipt_render::{render_combined_receipt, render_receipt},
        receipts::FsStatus,
        ReceiptOutcome,
    },
    AppState,
};

async fn receipt_for(
    state: &AppState,
    actor: &Actor,
    invoice_ids: &[Uuid],
) -> Result<Response, AppError> {
    match state.receipts.get_receipt_data(actor, invoice_ids).await? {
        ReceiptOutcome::Ready(doc) => {
            let html = render_receipt(&doc, Utc::now())?;
            Ok(Html(html).into_response())
        }
        ReceiptOutcome::NeedsFsNumber(pending) => Ok((
            StatusCode::BAD_REQUEST,
            Json(NeedsFsNumberResponse::new("FS number required", pending)),
        )
            .into_response()),
    }
}

pub async fn get_receipt(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Response, AppError> {
    receipt_for(&state, &actor, &[invoice_id]).await
}

pub async fn generate_receipt(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Json(payload): Json<GenerateReceiptRequest>,
) -> Result<Response, AppError> {
    receipt_for(&state, &actor, &payload.invoice_ids).await
}

/// Every invoice of every child of a parent on one page.
pub async fn get_combined_receipt(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(parent_id): Path<Uuid>,
) -> Result<Response, AppError> {
    match state.receipts.get_combined_receipt(&actor, parent_id).await? {
        ReceiptOutcome::Ready(doc) => {
            let html = render_combined_receipt(&doc, Utc::now())?;
            Ok(Html(html).into_response())
        }
        ReceiptOutcome::NeedsFsNumber(pending) => Ok((
            StatusCode::BAD_REQUEST,
            Json(NeedsFsNumberResponse::new(
                "Some invoices require FS numbers",
                pending,
            )),
        )
            .into_response()),
    }
}

pub async fn update_fs_number(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<Uuid>,
    Json(payload): Json<UpdateFsNumberRequest>,
) -> Result<Json<UpdateFsNumberResponse>, AppError> {
    payload.validate()?;

    let fs_number = state
        .receipts
        .update_fs_number(&actor, invoice_id, payload.fs_number.as_deref())
        .await?;

    Ok(Json(UpdateFsNumberResponse {
        message: "FS number updated successfully".to_string(),
        fs_number,
    }))
}

pub async fn check_fs_number(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(invoice_id): Path<Uuid>,
) -> Result<Json<FsStatus>, AppError> {
    let status = state.receipts.check_fs_number(&actor, invoice_id).await?;
    Ok(Json(status))
}

pub async fn get_parent_invoices(
    State(state): State<AppState>,
    AuthUser(actor): AuthUser,
    Path(parent_phone): Path<String>,
) -> Result<Json<ParentInvoicesResponse>, AppError> {
    let found = state
        .receipts
        .get_parent_invoices(&actor, &parent_phone)
        .await?;

    Ok(Json(ParentInvoicesResponse::from(found)))
}
