use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use service_core::error::AppError;
use tracing::instrument;

use crate::{
    dtos::{
        earnings::{DayQuery, ListEarningsQuery, UpsertDayRequest},
        ErrorResponse,
    },
    middleware::TenantContext,
    models::{ensure_not_future, DailyEarnings, DayChanges, DayDetail},
    services::metrics,
    utils::ValidatedJson,
    AppState,
};

/// Recorded days, newest first
#[utoipa::path(
    get,
    path = "/api/earnings",
    params(ListEarningsQuery),
    responses(
        (status = 200, description = "Days", body = [DailyEarnings]),
        (status = 400, description = "from is after to", body = ErrorResponse),
        (status = 403, description = "Owner only for other members", body = ErrorResponse)
    ),
    tag = "Earnings",
    security(("bearer_auth" = []))
)]
pub async fn list_earnings(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListEarningsQuery>,
) -> Result<(StatusCode, Json<Vec<DailyEarnings>>), AppError> {
    let user_id = tenant.target_user(query.user_id)?;

    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "from must not be after to"
            )));
        }
    }

    let days = state
        .db
        .list_days(tenant.company_id, user_id, query.from, query.to)
        .await?;
    Ok((StatusCode::OK, Json(days)))
}

/// One day with its transactions
#[utoipa::path(
    get,
    path = "/api/earnings/{date}",
    params(
        ("date" = NaiveDate, Path, description = "Day, YYYY-MM-DD"),
        DayQuery
    ),
    responses(
        (status = 200, description = "Day", body = DayDetail),
        (status = 404, description = "Nothing recorded", body = ErrorResponse)
    ),
    tag = "Earnings",
    security(("bearer_auth" = []))
)]
pub async fn get_day(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(date): Path<NaiveDate>,
    Query(query): Query<DayQuery>,
) -> Result<(StatusCode, Json<DayDetail>), AppError> {
    let user_id = tenant.target_user(query.user_id)?;

    let day = state
        .db
        .find_day_detail(tenant.company_id, user_id, date)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No earnings recorded for this date")))?;
    Ok((StatusCode::OK, Json(day)))
}

/// Create or update the caller's day
#[utoipa::path(
    put,
    path = "/api/earnings/{date}",
    params(("date" = NaiveDate, Path, description = "Day, YYYY-MM-DD")),
    request_body = UpsertDayRequest,
    responses(
        (status = 200, description = "Day saved", body = DailyEarnings),
        (status = 400, description = "Future date or negative amount", body = ErrorResponse)
    ),
    tag = "Earnings",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, user_id = %tenant.user_id, date = %date))]
pub async fn upsert_day(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(date): Path<NaiveDate>,
    ValidatedJson(req): ValidatedJson<UpsertDayRequest>,
) -> Result<(StatusCode, Json<DailyEarnings>), AppError> {
    ensure_not_future(date, Utc::now().date_naive())?;

    let changes = DayChanges::from(req);
    changes.validate()?;

    let day = state
        .db
        .upsert_day(tenant.company_id, tenant.user_id, date, &changes)
        .await?;

    metrics::record_operation(&tenant.company_id, "upsert_day");
    Ok((StatusCode::OK, Json(day)))
}

/// Delete the caller's day and its transactions
#[utoipa::path(
    delete,
    path = "/api/earnings/{date}",
    params(("date" = NaiveDate, Path, description = "Day, YYYY-MM-DD")),
    responses(
        (status = 204, description = "Day deleted"),
        (status = 404, description = "Nothing recorded", body = ErrorResponse)
    ),
    tag = "Earnings",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, user_id = %tenant.user_id, date = %date))]
pub async fn delete_day(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(date): Path<NaiveDate>,
) -> Result<StatusCode, AppError> {
    state
        .db
        .delete_day(tenant.company_id, tenant.user_id, date)
        .await?;
    metrics::record_operation(&tenant.company_id, "delete_day");
    Ok(StatusCode::NO_CONTENT)
}
