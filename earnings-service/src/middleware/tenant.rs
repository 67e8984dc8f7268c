//! Company context for tenant-scoped routes.
//!
//! Runs after [`auth_middleware`](super::auth_middleware). The caller's
//! active company and their membership in it are read from the database on
//! every request, so role changes and removals take effect immediately.

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::Response,
};
use rust_decimal::Decimal;
use service_core::error::AppError;
use uuid::Uuid;

use crate::{models::Role, services::AccessTokenClaims, AppState};

/// The company a request operates on and the caller's standing in it.
#[derive(Debug, Clone)]
pub struct TenantContext {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub role: Role,
    pub commission_rate: Decimal,
}

impl TenantContext {
    pub fn is_owner(&self) -> bool {
        self.role.is_owner()
    }

    pub fn require_owner(&self) -> Result<(), AppError> {
        if self.is_owner() {
            Ok(())
        } else {
            Err(AppError::Forbidden(anyhow::anyhow!(
                "Only company owners can perform this action"
            )))
        }
    }

    /// Resolve whose data a read targets. Reading another member's data is
    /// reserved to owners.
    pub fn target_user(&self, requested: Option<Uuid>) -> Result<Uuid, AppError> {
        match requested {
            Some(user_id) if user_id != self.user_id => {
                self.require_owner()?;
                Ok(user_id)
            }
            _ => Ok(self.user_id),
        }
    }
}

pub async fn tenant_middleware(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user_id = req
        .extensions()
        .get::<AccessTokenClaims>()
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("Authentication required")))?
        .user_id()?;

    let membership = state
        .db
        .find_active_membership(user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized(anyhow::anyhow!("User no longer exists")))?;

    let company_id = membership.active_company_id.ok_or_else(|| {
        AppError::BadRequest(anyhow::anyhow!(
            "No active company selected; create or switch to a company first"
        ))
    })?;

    let role = membership.role().ok_or_else(|| {
        AppError::Forbidden(anyhow::anyhow!(
            "You are no longer a member of the active company"
        ))
    })?;

    req.extensions_mut().insert(TenantContext {
        user_id,
        company_id,
        role,
        commission_rate: membership.commission_rate.unwrap_or_default(),
    });

    Ok(next.run(req).await)
}

#[async_trait]
impl<S> FromRequestParts<S> for TenantContext
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<TenantContext>()
            .cloned()
            .ok_or_else(|| AppError::AuthError(anyhow::anyhow!("Tenant context not found")))
    }
}
