use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

use crate::{
    dtos::{
        services::{CreateServiceRequest, ListServicesQuery, UpdateServiceRequest},
        ErrorResponse,
    },
    middleware::TenantContext,
    models::{ensure_amount, round_money, CatalogService, PriceHistoryEntry, ServiceChanges},
    services::metrics,
    utils::ValidatedJson,
    AppState,
};

/// Service catalog of the active company
#[utoipa::path(
    get,
    path = "/api/services",
    params(ListServicesQuery),
    responses(
        (status = 200, description = "Services", body = [CatalogService])
    ),
    tag = "Services",
    security(("bearer_auth" = []))
)]
pub async fn list_services(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListServicesQuery>,
) -> Result<(StatusCode, Json<Vec<CatalogService>>), AppError> {
    let services = state
        .db
        .list_services(tenant.company_id, query.include_inactive.unwrap_or(false))
        .await?;
    Ok((StatusCode::OK, Json(services)))
}

#[utoipa::path(
    get,
    path = "/api/services/{service_id}",
    params(("service_id" = Uuid, Path, description = "Service id")),
    responses(
        (status = 200, description = "Service", body = CatalogService),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Services",
    security(("bearer_auth" = []))
)]
pub async fn get_service(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(service_id): Path<Uuid>,
) -> Result<(StatusCode, Json<CatalogService>), AppError> {
    let service = state
        .db
        .find_service(tenant.company_id, service_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Service not found")))?;
    Ok((StatusCode::OK, Json(service)))
}

/// Add a service to the catalog (owner)
#[utoipa::path(
    post,
    path = "/api/services",
    request_body = CreateServiceRequest,
    responses(
        (status = 201, description = "Service created", body = CatalogService),
        (status = 403, description = "Owner only", body = ErrorResponse),
        (status = 409, description = "Name already used", body = ErrorResponse)
    ),
    tag = "Services",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id))]
pub async fn create_service(
    State(state): State<AppState>,
    tenant: TenantContext,
    ValidatedJson(req): ValidatedJson<CreateServiceRequest>,
) -> Result<(StatusCode, Json<CatalogService>), AppError> {
    tenant.require_owner()?;
    ensure_amount("price", req.price)?;

    let service = state
        .db
        .create_service(
            tenant.company_id,
            req.service_name.trim(),
            req.description.as_deref(),
            round_money(req.price),
            req.duration_minutes,
        )
        .await?;

    metrics::record_operation(&tenant.company_id, "create_service");
    Ok((StatusCode::CREATED, Json(service)))
}

/// Update a service; a new price is recorded in its history (owner)
#[utoipa::path(
    patch,
    path = "/api/services/{service_id}",
    params(("service_id" = Uuid, Path, description = "Service id")),
    request_body = UpdateServiceRequest,
    responses(
        (status = 200, description = "Service updated", body = CatalogService),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Name already used", body = ErrorResponse)
    ),
    tag = "Services",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, service_id = %service_id))]
pub async fn update_service(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(service_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateServiceRequest>,
) -> Result<(StatusCode, Json<CatalogService>), AppError> {
    tenant.require_owner()?;

    let mut changes = ServiceChanges::from(req);
    if let Some(price) = changes.price {
        ensure_amount("price", price)?;
        changes.price = Some(round_money(price));
    }

    let service = state
        .db
        .update_service(tenant.company_id, service_id, &changes, tenant.user_id)
        .await?;

    metrics::record_operation(&tenant.company_id, "update_service");
    Ok((StatusCode::OK, Json(service)))
}

/// Delete a service no transaction uses (owner)
#[utoipa::path(
    delete,
    path = "/api/services/{service_id}",
    params(("service_id" = Uuid, Path, description = "Service id")),
    responses(
        (status = 204, description = "Service deleted"),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "In use; deactivate instead", body = ErrorResponse)
    ),
    tag = "Services",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, service_id = %service_id))]
pub async fn delete_service(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(service_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    tenant.require_owner()?;
    state.db.delete_service(tenant.company_id, service_id).await?;
    metrics::record_operation(&tenant.company_id, "delete_service");
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/services/{service_id}/price-history",
    params(("service_id" = Uuid, Path, description = "Service id")),
    responses(
        (status = 200, description = "Price changes, newest first", body = [PriceHistoryEntry]),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Services",
    security(("bearer_auth" = []))
)]
pub async fn price_history(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(service_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Vec<PriceHistoryEntry>>), AppError> {
    let history = state
        .db
        .list_price_history(tenant.company_id, service_id)
        .await?;
    Ok((StatusCode::OK, Json(history)))
}
