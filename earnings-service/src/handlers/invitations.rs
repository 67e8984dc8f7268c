use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::{
    dtos::{
        invitations::{
            CreateInvitationRequest, InvitationCreatedResponse, InvitationLookupResponse,
        },
        ErrorResponse,
    },
    middleware::{AuthUser, TenantContext},
    models::{Invitation, Membership, Role},
    services::metrics,
    utils::{generate_token, hash_token, ValidatedJson},
    AppState,
};

/// Invite someone to the active company (owner)
#[utoipa::path(
    post,
    path = "/api/invitations",
    request_body = CreateInvitationRequest,
    responses(
        (status = 201, description = "Invitation created", body = InvitationCreatedResponse),
        (status = 403, description = "Owner only", body = ErrorResponse),
        (status = 409, description = "Already a member", body = ErrorResponse)
    ),
    tag = "Invitations",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id))]
pub async fn create_invitation(
    State(state): State<AppState>,
    tenant: TenantContext,
    ValidatedJson(req): ValidatedJson<CreateInvitationRequest>,
) -> Result<(StatusCode, Json<InvitationCreatedResponse>), AppError> {
    tenant.require_owner()?;

    let token = generate_token();
    let invitation = Invitation::new(
        tenant.company_id,
        &req.email,
        req.role.unwrap_or(Role::Employee),
        hash_token(&token),
        tenant.user_id,
    );

    state.db.create_invitation(&invitation).await?;
    metrics::record_operation(&tenant.company_id, "create_invitation");

    let invite_url = format!(
        "{}/{}",
        state.config.invitation.base_url.trim_end_matches('/'),
        token
    );

    Ok((
        StatusCode::CREATED,
        Json(InvitationCreatedResponse {
            invitation,
            invite_token: token,
            invite_url,
        }),
    ))
}

/// Pending, unexpired invitations of the active company (owner)
#[utoipa::path(
    get,
    path = "/api/invitations",
    responses(
        (status = 200, description = "Pending invitations", body = [Invitation]),
        (status = 403, description = "Owner only", body = ErrorResponse)
    ),
    tag = "Invitations",
    security(("bearer_auth" = []))
)]
pub async fn list_invitations(
    State(state): State<AppState>,
    tenant: TenantContext,
) -> Result<(StatusCode, Json<Vec<Invitation>>), AppError> {
    tenant.require_owner()?;
    let invitations = state.db.list_pending_invitations(tenant.company_id).await?;
    Ok((StatusCode::OK, Json(invitations)))
}

/// Revoke a pending invitation (owner)
#[utoipa::path(
    delete,
    path = "/api/invitations/{invitation_id}",
    params(("invitation_id" = Uuid, Path, description = "Invitation id")),
    responses(
        (status = 200, description = "Invitation revoked", body = Invitation),
        (status = 404, description = "Not found", body = ErrorResponse),
        (status = 409, description = "Not pending", body = ErrorResponse)
    ),
    tag = "Invitations",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(company_id = %tenant.company_id, invitation_id = %invitation_id))]
pub async fn revoke_invitation(
    State(state): State<AppState>,
    tenant: TenantContext,
    Path(invitation_id): Path<Uuid>,
) -> Result<(StatusCode, Json<Invitation>), AppError> {
    tenant.require_owner()?;

    let invitation = state
        .db
        .revoke_invitation(tenant.company_id, invitation_id)
        .await?;

    info!("Invitation revoked");
    Ok((StatusCode::OK, Json(invitation)))
}

/// Look up an invitation by its token (public)
#[utoipa::path(
    get,
    path = "/api/invitations/token/{token}",
    params(("token" = String, Path, description = "Invitation token")),
    responses(
        (status = 200, description = "Invitation found", body = InvitationLookupResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse)
    ),
    tag = "Invitations"
)]
pub async fn lookup_invitation(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> Result<(StatusCode, Json<InvitationLookupResponse>), AppError> {
    let preview = state
        .db
        .find_invitation_preview(&hash_token(&token))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invitation not found")))?;

    let is_valid = preview.is_valid_at(Utc::now());

    Ok((
        StatusCode::OK,
        Json(InvitationLookupResponse {
            company_name: preview.company_name,
            email: preview.email,
            role: preview.role_code,
            expiry_utc: preview.expiry_utc,
            is_valid,
        }),
    ))
}

/// Accept an invitation as the signed-in user
#[utoipa::path(
    post,
    path = "/api/invitations/token/{token}/accept",
    params(("token" = String, Path, description = "Invitation token")),
    responses(
        (status = 200, description = "Joined the company", body = Membership),
        (status = 400, description = "Invitation expired", body = ErrorResponse),
        (status = 403, description = "Issued to a different e-mail", body = ErrorResponse),
        (status = 404, description = "Unknown token", body = ErrorResponse),
        (status = 409, description = "Already used, revoked, or already a member", body = ErrorResponse)
    ),
    tag = "Invitations",
    security(("bearer_auth" = []))
)]
#[instrument(skip_all, fields(user_id = %auth.user_id))]
pub async fn accept_invitation(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(token): Path<String>,
) -> Result<(StatusCode, Json<Membership>), AppError> {
    let invitation = state
        .db
        .find_invitation_by_token_hash(&hash_token(&token))
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invitation not found")))?;

    let user = state
        .db
        .find_user_by_id(auth.user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User no longer exists")))?;

    invitation.check_acceptable(&user.email, Utc::now())?;

    state.db.accept_invitation(&invitation, user.user_id).await?;
    metrics::record_operation(&invitation.company_id, "accept_invitation");

    let membership = state
        .db
        .find_membership(user.user_id, invitation.company_id)
        .await?
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Membership missing after accept")))?;

    Ok((StatusCode::OK, Json(membership)))
}
