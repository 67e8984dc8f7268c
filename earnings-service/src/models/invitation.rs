//! Company invitations - single-use, e-mail bound, seven day expiry.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use service_core::error::AppError;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::membership::Role;
use super::user::normalize_email;

pub const INVITATION_TTL_DAYS: i64 = 7;

/// Invitation state codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InvitationState {
    Pending,
    Accepted,
    Revoked,
}

impl InvitationState {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationState::Pending => "pending",
            InvitationState::Accepted => "accepted",
            InvitationState::Revoked => "revoked",
        }
    }
}

impl TryFrom<String> for InvitationState {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "pending" => Ok(InvitationState::Pending),
            "accepted" => Ok(InvitationState::Accepted),
            "revoked" => Ok(InvitationState::Revoked),
            other => Err(format!("unknown invitation state '{}'", other)),
        }
    }
}

/// Invitation row. The raw token is never stored, only its SHA-256.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Invitation {
    pub invitation_id: Uuid,
    pub company_id: Uuid,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role_code: Role,
    #[serde(skip)]
    pub token_hash: String,
    #[sqlx(try_from = "String")]
    pub state_code: InvitationState,
    pub invited_by_user_id: Option<Uuid>,
    pub accepted_by_user_id: Option<Uuid>,
    pub expiry_utc: DateTime<Utc>,
    pub accepted_utc: Option<DateTime<Utc>>,
    pub created_utc: DateTime<Utc>,
}

impl Invitation {
    pub fn new(
        company_id: Uuid,
        email: &str,
        role: Role,
        token_hash: String,
        invited_by_user_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            invitation_id: Uuid::new_v4(),
            company_id,
            email: normalize_email(email),
            role_code: role,
            token_hash,
            state_code: InvitationState::Pending,
            invited_by_user_id: Some(invited_by_user_id),
            accepted_by_user_id: None,
            expiry_utc: now + Duration::days(INVITATION_TTL_DAYS),
            accepted_utc: None,
            created_utc: now,
        }
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expiry_utc
    }

    /// Pending and not yet expired.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        is_open(self.state_code, self.expiry_utc, now)
    }

    /// Check whether `email` may accept this invitation at `now`.
    pub fn check_acceptable(&self, email: &str, now: DateTime<Utc>) -> Result<(), AppError> {
        match self.state_code {
            InvitationState::Accepted => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Invitation has already been accepted"
                )))
            }
            InvitationState::Revoked => {
                return Err(AppError::Conflict(anyhow::anyhow!(
                    "Invitation has been revoked"
                )))
            }
            InvitationState::Pending => {}
        }

        if self.is_expired_at(now) {
            return Err(AppError::BadRequest(anyhow::anyhow!("Invitation has expired")));
        }

        if normalize_email(email) != normalize_email(&self.email) {
            return Err(AppError::Forbidden(anyhow::anyhow!(
                "Invitation was issued to a different e-mail address"
            )));
        }

        Ok(())
    }
}

/// Public view of an invitation, looked up by its token.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct InvitationPreview {
    pub company_name: String,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role_code: Role,
    #[sqlx(try_from = "String")]
    pub state_code: InvitationState,
    pub expiry_utc: DateTime<Utc>,
}

impl InvitationPreview {
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        is_open(self.state_code, self.expiry_utc, now)
    }
}

fn is_open(state: InvitationState, expiry_utc: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    state == InvitationState::Pending && now < expiry_utc
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invitation() -> Invitation {
        Invitation::new(
            Uuid::new_v4(),
            "Nina@Example.com",
            Role::Employee,
            "hash".to_string(),
            Uuid::new_v4(),
        )
    }

    #[test]
    fn new_invitation_is_pending_for_seven_days() {
        let inv = invitation();
        assert_eq!(inv.state_code, InvitationState::Pending);
        assert_eq!(inv.expiry_utc - inv.created_utc, Duration::days(7));
        assert_eq!(inv.email, "nina@example.com");
        assert!(inv.is_valid_at(Utc::now()));
    }

    #[test]
    fn email_match_is_case_insensitive() {
        let inv = invitation();
        assert!(inv.check_acceptable("NINA@example.COM", Utc::now()).is_ok());
        assert!(matches!(
            inv.check_acceptable("other@example.com", Utc::now()),
            Err(AppError::Forbidden(_))
        ));
    }

    #[test]
    fn expired_invitation_is_a_bad_request() {
        let inv = invitation();
        let later = inv.expiry_utc + Duration::seconds(1);
        assert!(!inv.is_valid_at(later));
        assert!(matches!(
            inv.check_acceptable("nina@example.com", later),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn preview_validity_matches_the_invitation() {
        let inv = invitation();
        let mut preview = InvitationPreview {
            company_name: "Salon".to_string(),
            email: inv.email.clone(),
            role_code: inv.role_code,
            state_code: inv.state_code,
            expiry_utc: inv.expiry_utc,
        };

        assert!(preview.is_valid_at(Utc::now()));
        assert!(!preview.is_valid_at(inv.expiry_utc));

        preview.state_code = InvitationState::Revoked;
        assert!(!preview.is_valid_at(Utc::now()));
    }

    #[test]
    fn used_invitations_conflict() {
        let mut inv = invitation();
        inv.state_code = InvitationState::Accepted;
        assert!(matches!(
            inv.check_acceptable("nina@example.com", Utc::now()),
            Err(AppError::Conflict(_))
        ));

        inv.state_code = InvitationState::Revoked;
        assert!(matches!(
            inv.check_acceptable("nina@example.com", Utc::now()),
            Err(AppError::Conflict(_))
        ));
    }
}
