use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    dtos::{
        companies::{CreateCompanyRequest, UpdateCompanyRequest, UpdateMemberRequest},
        ErrorResponse, MessageResponse,
    },
    middleware::{AuthUser, TenantContext},
    models::{
        normalize_currency, validate_commission_rate, Company, CompanyMember, Membership,
        DEFAULT_CURRENCY,
    },
    services::metrics,
    utils::ValidatedJson,
    AppState,
};

fn currency_or_error(code: &str) -> Result<String, AppError> {
    normalize_currency(code).ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!("Currency code must be three letters"))
    })
}

/// Create a company owned by the caller
#[utoipa::path(
    post,
    path = "/api/companies",
    request_body = CreateCompanyRequest,
    responses(
        (status = 201, description = "Company created and made active", body = Company),
        (status = 422, description = "Validation error", body = ErrorResponse)
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(user_id = %auth.user_id))]
pub async fn create_company(
    State(state): State<AppState>,
    auth: AuthUser,
    ValidatedJson(req): ValidatedJson<CreateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    let currency = match req.currency_code.as_deref() {
        Some(code) => currency_or_error(code)?,
        None => DEFAULT_CURRENCY.to_string(),
    };

    let company = state
        .db
        .create_company(auth.user_id, req.company_name.trim(), &currency)
        .await?;

    metrics::record_operation(&company.company_id, "create_company");
    Ok((StatusCode::CREATED, Json(company)))
}

/// Companies the caller belongs to
#[utoipa::path(
    get,
    path = "/api/companies",
    responses(
        (status = 200, description = "Memberships", body = [Membership])
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
pub async fn list_my_companies(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<(StatusCode, Json<Vec<Membership>>), AppError> {
    let memberships = state.db.list_memberships(auth.user_id).await?;
    Ok((StatusCode::OK, Json(memberships)))
}

/// The active company
#[utoipa::path(
    get,
    path = "/api/companies/current",
    responses(
        (status = 200, description = "Active company", body = Company),
        (status = 400, description = "No active company", body = ErrorResponse)
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
pub async fn get_current_company(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<(StatusCode, Json<Company>), AppError> {
    let company = state
        .db
        .find_company(tenant.company_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))?;
    Ok((StatusCode::OK, Json(company)))
}

/// Rename the company or change its currency (owner)
#[utoipa::path(
    patch,
    path = "/api/companies/current",
    request_body = UpdateCompanyRequest,
    responses(
        (status = 200, description = "Company updated", body = Company),
        (status = 403, description = "Owner only", body = ErrorResponse)
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id))]
pub async fn update_current_company(
    State(state): State<AppState>,
    tenant: TenantContext,
    ValidatedJson(req): ValidatedJson<UpdateCompanyRequest>,
) -> Result<(StatusCode, Json<Company>), AppError> {
    tenant.require_owner()?;

    let currency = req
        .currency_code
        .as_deref()
        .map(currency_or_error)
        .transpose()?;

    let company = state
        .db
        .update_company(
            tenant.company_id,
            req.company_name.as_deref().map(str::trim),
            currency.as_deref(),
        )
        .await?;

    metrics::record_operation(&tenant.company_id, "update_company");
    Ok((StatusCode::OK, Json(company)))
}

/// Delete the company and all of its data (owner)
#[utoipa::path(
    delete,
    path = "/api/companies/current",
    responses(
        (status = 204, description = "Company deleted"),
        (status = 403, description = "Owner only", body = ErrorResponse)
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id))]
pub async fn delete_current_company(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<StatusCode, AppError> {
    tenant.require_owner()?;
    state.db.delete_company(tenant.company_id).await?;
    info!(user_id = %tenant.user_id, "Company deleted by owner");
    Ok(StatusCode::NO_CONTENT)
}

/// Members of the active company
#[utoipa::path(
    get,
    path = "/api/companies/current/members",
    responses(
        (status = 200, description = "Members", body = [CompanyMember])
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
pub async fn list_members(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<(StatusCode, Json<Vec<CompanyMember>>), AppError> {
    let members = state.db.list_members(tenant.company_id).await?;
    Ok((StatusCode::OK, Json(members)))
}

/// Change a member's role or commission rate (owner)
#[utoipa::path(
    patch,
    path = "/api/companies/current/members/{user_id}",
    params(("user_id" = Uuid, Path, description = "Member user id")),
    request_body = UpdateMemberRequest,
    responses(
        (status = 200, description = "Member updated", body = CompanyMember),
        (status = 400, description = "Commission out of range", body = ErrorResponse),
        (status = 404, description = "Not a member", body = ErrorResponse),
        (status = 409, description = "Would leave the company without an owner", body = ErrorResponse)
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, member_id = %user_id))]
pub async fn update_member(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
    Json(req): Json<UpdateMemberRequest>,
) -> Result<(StatusCode, Json<CompanyMember>), AppError> {
    tenant.require_owner()?;

    if let Some(rate) = req.commission_rate {
        validate_commission_rate(rate)?;
    }

    let member = state
        .db
        .update_member(tenant.company_id, user_id, req.role, req.commission_rate)
        .await?;

    metrics::record_operation(&tenant.company_id, "update_member");
    Ok((StatusCode::OK, Json(member)))
}

/// Remove another member (owner)
#[utoipa::path(
    delete,
    path = "/api/companies/current/members/{user_id}",
    params(("user_id" = Uuid, Path, description = "Member user id")),
    responses(
        (status = 204, description = "Member removed"),
        (status = 400, description = "Use leave to remove yourself", body = ErrorResponse),
        (status = 404, description = "Not a member", body = ErrorResponse)
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, member_id = %user_id))]
pub async fn remove_member(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    tenant.require_owner()?;

    if user_id == tenant.user_id {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Use the leave endpoint to remove yourself"
        )));
    }

    state
        .db
        .remove_member(
            tenant.company_id,
            user_id,
            "Cannot remove the last owner of the company",
        )
        .await?;

    metrics::record_operation(&tenant.company_id, "remove_member");
    Ok(StatusCode::NO_CONTENT)
}

/// Leave the active company
#[utoipa::path(
    post,
    path = "/api/companies/current/leave",
    responses(
        (status = 200, description = "Left the company", body = MessageResponse),
        (status = 409, description = "The last owner cannot leave", body = ErrorResponse)
    ),
    tag = "Companies",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, user_id = %tenant.user_id))]
pub async fn leave_company(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<(StatusCode, Json<MessageResponse>), AppError> {
    state
        .db
        .remove_member(
            tenant.company_id,
            tenant.user_id,
            "The last owner cannot leave; promote another owner or delete the company",
        )
        .await?;

    Ok((StatusCode::OK, Json(MessageResponse::new("You left the company"))))
}
