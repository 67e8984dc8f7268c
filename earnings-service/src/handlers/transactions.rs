use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    dtos::{transactions::TransactionRequest, ErrorResponse},
    middleware::TenantContext,
    models::{ensure_not_future, TransactionDetail},
    services::metrics,
    utils::ValidatedJson,
    AppState,
};

/// Record a client transaction on the caller's day
#[utoipa::path(
    post,
    path = "/api/earnings/{date}/transactions",
    params(("date" = NaiveDate, Path, description = "Day, YYYY-MM-DD")),
    request_body = TransactionRequest,
    responses(
        (status = 201, description = "Transaction recorded", body = TransactionDetail),
        (status = 400, description = "Invalid amounts, services or client", body = ErrorResponse)
    ),
    tag = "Transactions",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, user_id = %tenant.user_id, date = %date))]
pub async fn create_transaction(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(date): Path<NaiveDate>,
    ValidatedJson(req): ValidatedJson<TransactionRequest>,
) -> Result<(StatusCode, Json<TransactionDetail>), AppError> {
    ensure_not_future(date, Utc::now().date_naive())?;

    let detail = state
        .db
        .create_transaction(tenant.company_id, tenant.user_id, date, req.into())
        .await?;

    metrics::record_operation(&tenant.company_id, "create_transaction");
    Ok((StatusCode::CREATED, Json(detail)))
}

/// Replace a transaction
#[utoipa::path(
    put,
    path = "/api/transactions/{transaction_id}",
    params(("transaction_id" = Uuid, Path, description = "Transaction id")),
    request_body = TransactionRequest,
    responses(
        (status = 200, description = "Transaction updated", body = TransactionDetail),
        (status = 403, description = "Not the day's employee", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Transactions",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, transaction_id = %transaction_id))]
pub async fn update_transaction(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(transaction_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<TransactionRequest>,
) -> Result<(StatusCode, Json<TransactionDetail>), AppError> {
    let detail = state
        .db
        .update_transaction(tenant.company_id, tenant.user_id, transaction_id, req.into())
        .await?;

    metrics::record_operation(&tenant.company_id, "update_transaction");
    Ok((StatusCode::OK, Json(detail)))
}

#[utoipa::path(
    delete,
    path = "/api/transactions/{transaction_id}",
    params(("transaction_id" = Uuid, Path, description = "Transaction id")),
    responses(
        (status = 204, description = "Transaction deleted"),
        (status = 403, description = "Not the day's employee", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Transactions",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, transaction_id = %transaction_id))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(transaction_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .delete_transaction(tenant.company_id, tenant.user_id, transaction_id)
        .await?;
    metrics::record_operation(&tenant.company_id, "delete_transaction");
    Ok(StatusCode::NO_CONTENT)
}
