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
        clients::{CreateClientRequest, ListClientsQuery, UpdateClientRequest},
        ErrorResponse,
    },
    middleware::TenantContext,
    models::{Client, ClientDetail, ClientFilter},
    services::metrics,
    utils::ValidatedJson,
    AppState,
};

/// Clients of the active company, most recently seen first
#[utoipa::path(
    get,
    path = "/api/clients",
    params(ListClientsQuery),
    responses(
        (status = 200, description = "Clients", body = [Client])
    ),
    tag = "Clients",
    security(("bearer_auth" = []))
)]
pub async fn list_clients(
    State(state): State<AppState>,
    tenant: TenantContext,
    Query(query): Query<ListClientsQuery>,
) -> Result<(StatusCode, Json<Vec<Client>>), AppError> {
    let filter = ClientFilter::from(query);
    let clients = state.db.list_clients(tenant.company_id, &filter).await?;
    Ok((StatusCode::OK, Json(clients)))
}

/// A client with their latest transactions
#[utoipa::path(
    get,
    path = "/api/clients/{client_id}",
    params(("client_id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 200, description = "Client", body = ClientDetail),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Clients",
    security(("bearer_auth" = []))
)]
pub async fn get_client(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(client_id): Path<Uuid>,
) -> Result<(StatusCode, Json<ClientDetail>), AppError> {
    let client = state
        .db
        .find_client(tenant.company_id, client_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

    let recent_transactions = state.db.client_history(tenant.company_id, client_id).await?;

    Ok((
        StatusCode::OK,
        Json(ClientDetail {
            client,
            recent_transactions,
        }),
    ))
}

#[utoipa::path(
    post,
    path = "/api/clients",
    request_body = CreateClientRequest,
    responses(
        (status = 201, description = "Client created", body = Client),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Clients",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id))]
pub async fn create_client(
    State(state): State<AppState>,
    tenant: TenantContext,
    ValidatedJson(req): ValidatedJson<CreateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let client = state
        .db
        .create_client(tenant.company_id, tenant.user_id, &req.fields())
        .await?;

    metrics::record_operation(&tenant.company_id, "create_client");
    Ok((StatusCode::CREATED, Json(client)))
}

#[utoipa::path(
    patch,
    path = "/api/clients/{client_id}",
    params(("client_id" = Uuid, Path, description = "Client id")),
    request_body = UpdateClientRequest,
    responses(
        (status = 200, description = "Client updated", body = Client),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Clients",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, client_id = %client_id))]
pub async fn update_client(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(client_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<UpdateClientRequest>,
) -> Result<(StatusCode, Json<Client>), AppError> {
    let client = state
        .db
        .update_client(tenant.company_id, client_id, &req.fields())
        .await?;
    Ok((StatusCode::OK, Json(client)))
}

/// Delete a client; their transactions keep the name (owner)
#[utoipa::path(
    delete,
    path = "/api/clients/{client_id}",
    params(("client_id" = Uuid, Path, description = "Client id")),
    responses(
        (status = 204, description = "Client deleted"),
        (status = 403, description = "Owner only", body = ErrorResponse),
        (status = 404, description = "Not found", body = ErrorResponse)
    ),
    tag = "Clients",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, client_id = %client_id))]
pub async fn delete_client(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(client_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    tenant.require_owner()?;
    state.db.delete_client(tenant.company_id, client_id).await?;
    metrics::record_operation(&tenant.company_id, "delete_client");
    Ok(StatusCode::NO_CONTENT)
}
