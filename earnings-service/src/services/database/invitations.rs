use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{commit, Database};
use crate::models::{Invitation, InvitationPreview};
use crate::services::metrics::DB_QUERY_DURATION;

const INVITATION_COLUMNS: &str = r#"
    invitation_id, company_id, email, role_code, token_hash, state_code,
    invited_by_user_id, accepted_by_user_id, expiry_utc, accepted_utc, created_utc
"#;

impl Database {
    // ==================== Invitation Operations ====================

    /// Store a new invitation, revoking any earlier pending one for the same
    /// e-mail in the company. Existing members cannot be invited.
    #[instrument(skip(self, invitation), fields(company_id = %invitation.company_id))]
    pub async fn create_invitation(&self, invitation: &Invitation) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_invitation"])
            .start_timer();

        let mut tx = self.begin().await?;

        let already_member: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1 FROM user_companies uc
                JOIN users u ON u.user_id = uc.user_id
                WHERE uc.company_id = $1 AND LOWER(u.email) = LOWER($2)
            )
            "#,
        )
        .bind(invitation.company_id)
        .bind(&invitation.email)
        .fetch_one(&mut *tx)
        .await?;

        if already_member {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "User is already a member of this company"
            )));
        }

        let revoked = sqlx::query(
            r#"
            UPDATE company_invitations SET state_code = 'revoked'
            WHERE company_id = $1 AND LOWER(email) = LOWER($2) AND state_code = 'pending'
            "#,
        )
        .bind(invitation.company_id)
        .bind(&invitation.email)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query(
            r#"
            INSERT INTO company_invitations
                (invitation_id, company_id, email, role_code, token_hash, state_code,
                 invited_by_user_id, expiry_utc, created_utc)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(invitation.invitation_id)
        .bind(invitation.company_id)
        .bind(&invitation.email)
        .bind(invitation.role_code.as_str())
        .bind(&invitation.token_hash)
        .bind(invitation.state_code.as_str())
        .bind(invitation.invited_by_user_id)
        .bind(invitation.expiry_utc)
        .bind(invitation.created_utc)
        .execute(&mut *tx)
        .await?;

        commit(tx).await?;
        timer.observe_duration();

        info!(
            invitation_id = %invitation.invitation_id,
            superseded = revoked,
            "Invitation created"
        );
        Ok(())
    }

    pub async fn list_pending_invitations(
        &self,
        company_id: Uuid,
    ) -> Result<Vec<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(&format!(
            r#"
            SELECT {} FROM company_invitations
            WHERE company_id = $1 AND state_code = 'pending' AND expiry_utc > now()
            ORDER BY created_utc DESC
            "#,
            INVITATION_COLUMNS
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Revoke a pending invitation. Accepted or revoked ones conflict.
    #[instrument(skip(self))]
    pub async fn revoke_invitation(
        &self,
        company_id: Uuid,
        invitation_id: Uuid,
    ) -> Result<Invitation, AppError> {
        let revoked = sqlx::query_as::<_, Invitation>(&format!(
            r#"
            UPDATE company_invitations SET state_code = 'revoked'
            WHERE invitation_id = $1 AND company_id = $2 AND state_code = 'pending'
            RETURNING {}
            "#,
            INVITATION_COLUMNS
        ))
        .bind(invitation_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await?;

        if let Some(invitation) = revoked {
            return Ok(invitation);
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM company_invitations WHERE invitation_id = $1 AND company_id = $2)",
        )
        .bind(invitation_id)
        .bind(company_id)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Err(AppError::Conflict(anyhow::anyhow!(
                "Only pending invitations can be revoked"
            )))
        } else {
            Err(AppError::NotFound(anyhow::anyhow!("Invitation not found")))
        }
    }

    pub async fn find_invitation_by_token_hash(
        &self,
        token_hash: &str,
    ) -> Result<Option<Invitation>, AppError> {
        sqlx::query_as::<_, Invitation>(&format!(
            "SELECT {} FROM company_invitations WHERE token_hash = $1",
            INVITATION_COLUMNS
        ))
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_invitation_preview(
        &self,
        token_hash: &str,
    ) -> Result<Option<InvitationPreview>, AppError> {
        sqlx::query_as::<_, InvitationPreview>(
            r#"
            SELECT c.company_name, i.email, i.role_code, i.state_code, i.expiry_utc
            FROM company_invitations i
            JOIN companies c ON c.company_id = i.company_id
            WHERE i.token_hash = $1
            "#,
        )
        .bind(token_hash)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Consume the invitation and create the membership in one transaction.
    /// The state update is guarded so a token can only be used once.
    #[instrument(skip(self, invitation), fields(invitation_id = %invitation.invitation_id))]
    pub async fn accept_invitation(
        &self,
        invitation: &Invitation,
        user_id: Uuid,
    ) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["accept_invitation"])
            .start_timer();

        let mut tx = self.begin().await?;

        let consumed = sqlx::query(
            r#"
            UPDATE company_invitations
            SET state_code = 'accepted', accepted_utc = now(), accepted_by_user_id = $2
            WHERE invitation_id = $1 AND state_code = 'pending' AND expiry_utc > now()
            "#,
        )
        .bind(invitation.invitation_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if consumed == 0 {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Invitation is no longer pending"
            )));
        }

        let joined = sqlx::query(
            r#"
            INSERT INTO user_companies (user_id, company_id, role_code)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, company_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(invitation.company_id)
        .bind(invitation.role_code.as_str())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if joined == 0 {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "You are already a member of this company"
            )));
        }

        sqlx::query(
            r#"
            UPDATE users
            SET active_company_id = COALESCE(active_company_id, $2), updated_utc = now()
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .bind(invitation.company_id)
        .execute(&mut *tx)
        .await?;

        commit(tx).await?;
        timer.observe_duration();

        info!(user_id = %user_id, company_id = %invitation.company_id, "Invitation accepted");
        Ok(())
    }
}
