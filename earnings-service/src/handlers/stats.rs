use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

use crate::{
    dtos::{stats::StatsQuery, ErrorResponse},
    middleware::TenantContext,
    models::{CompanyStats, DailyPoint, DateBounds, MyStats, ServicePopularity, StatsPeriod},
    AppState,
};

fn resolve_period(query: &StatsQuery) -> Result<(StatsPeriod, DateBounds), AppError> {
    let period = query.period.unwrap_or_default();
    let anchor = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let bounds = period.bounds(anchor).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Date is outside the supported range"))
    })?;
    Ok((period, bounds))
}

/// The caller's totals and estimated pay for a period
#[utoipa::path(
    get,
    path = "/api/stats",
    params(StatsQuery),
    responses(
        (status = 200, description = "Statistics", body = MyStats),
        (status = 400, description = "Date outside the supported range", body = ErrorResponse)
    ),
    tag = "Statistics",
    security(("bearer_auth" = []))
)]
pub async fn my_stats(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<StatsQuery>,
) -> Result<(StatusCode, Json<MyStats>), AppError> {
    let (period, (from, to)) = resolve_period(&query)?;

    let totals = state
        .db
        .earnings_totals(tenant.company_id, tenant.user_id, from, to)
        .await?;

    Ok((
        StatusCode::OK,
        Json(MyStats::new(period, (from, to), totals, tenant.commission_rate)),
    ))
}

/// Company totals with one row per member (owner)
#[utoipa::path(
    get,
    path = "/api/stats/company",
    params(StatsQuery),
    responses(
        (status = 200, description = "Company statistics", body = CompanyStats),
        (status = 403, description = "Owner only", body = ErrorResponse)
    ),
    tag = "Statistics",
    security(("bearer_auth" = []))
)]
pub async fn company_stats(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<StatsQuery>,
) -> Result<(StatusCode, Json<CompanyStats>), AppError> {
    tenant.require_owner()?;
    let (period, (from, to)) = resolve_period(&query)?;

    let employees = state
        .db
        .employee_totals(tenant.company_id, from, to)
        .await?;

    Ok((
        StatusCode::OK,
        Json(CompanyStats::new(period, (from, to), employees)),
    ))
}

/// Per-day totals for charts
#[utoipa::path(
    get,
    path = "/api/stats/daily",
    params(StatsQuery),
    responses(
        (status = 200, description = "Daily series, oldest first", body = [DailyPoint]),
        (status = 403, description = "Owner only for other members", body = ErrorResponse)
    ),
    tag = "Statistics",
    security(("bearer_auth" = []))
)]
pub async fn daily_series(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<StatsQuery>,
) -> Result<(StatusCode, Json<Vec<DailyPoint>>), AppError> {
    let user_id = tenant.target_user(query.user_id)?;
    let (_, (from, to)) = resolve_period(&query)?;

    let points = state
        .db
        .daily_series(tenant.company_id, user_id, from, to)
        .await?;
    Ok((StatusCode::OK, Json(points)))
}

/// Services ranked by sales (owner)
#[utoipa::path(
    get,
    path = "/api/stats/services",
    params(StatsQuery),
    responses(
        (status = 200, description = "Service popularity", body = [ServicePopularity]),
        (status = 403, description = "Owner only", body = ErrorResponse)
    ),
    tag = "Statistics",
    security(("bearer_auth" = []))
)]
pub async fn service_popularity(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<StatsQuery>,
) -> Result<(StatusCode, Json<Vec<ServicePopularity>>), AppError> {
    tenant.require_owner()?;
    let (_, (from, to)) = resolve_period(&query)?;

    let services = state
        .db
        .service_popularity(tenant.company_id, from, to)
        .await?;
    Ok((StatusCode::OK, Json(services)))
}
