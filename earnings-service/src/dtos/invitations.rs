use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Invitation, Role};

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateInvitationRequest {
    #[validate(email(message = "Invalid email format"))]
    #[schema(example = "nina@salon.example")]
    pub email: String,

    /// Defaults to `employee`.
    pub role: Option<Role>,
}

/// The raw token is only ever returned here; share `invite_url` with the
/// invitee.
#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationCreatedResponse {
    pub invitation: Invitation,
    pub invite_token: String,
    #[schema(example = "http://localhost:3000/invite/3f9a...")]
    pub invite_url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct InvitationLookupResponse {
    pub company_name: String,
    pub email: String,
    pub role: Role,
    pub expiry_utc: DateTime<Utc>,
    pub is_valid: bool,
}
