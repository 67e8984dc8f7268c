use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::FromRow;
use tracing::instrument;
use uuid::Uuid;

use super::Database;
use crate::models::{Membership, Role, User};
use crate::services::metrics::DB_QUERY_DURATION;

const USER_COLUMNS: &str =
    "user_id, email, password_hash, full_name, active_company_id, created_utc, updated_utc";

const MEMBERSHIP_SELECT: &str = r#"
    SELECT uc.user_id, uc.company_id, c.company_name, c.currency_code,
           uc.role_code, uc.commission_rate, uc.joined_utc
    FROM user_companies uc
    JOIN companies c ON c.company_id = uc.company_id
"#;

/// The user's active company and their membership in it, if still a member.
#[derive(Debug, Clone, FromRow)]
pub struct ActiveMembership {
    pub active_company_id: Option<Uuid>,
    pub role_code: Option<String>,
    pub commission_rate: Option<Decimal>,
}

impl ActiveMembership {
    pub fn role(&self) -> Option<Role> {
        self.role_code.clone().and_then(|r| Role::try_from(r).ok())
    }
}

impl Database {
    // ==================== User Operations ====================

    #[instrument(skip(self, user), fields(user_id = %user.user_id))]
    pub async fn insert_user(&self, user: &User) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["insert_user"])
            .start_timer();

        sqlx::query(
            r#"
            INSERT INTO users (user_id, email, password_hash, full_name, created_utc, updated_utc)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(user.user_id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.full_name)
        .bind(user.created_utc)
        .bind(user.updated_utc)
        .execute(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email is already registered"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to create user: {}", e)),
        })?;

        timer.observe_duration();
        Ok(())
    }

    pub async fn find_user_by_id(&self, user_id: Uuid) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE user_id = $1",
            USER_COLUMNS
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, AppError> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        ))
        .bind(email.trim())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Partial profile update; `None` keeps the stored value.
    #[instrument(skip(self, full_name, email))]
    pub async fn update_user_profile(
        &self,
        user_id: Uuid,
        full_name: Option<&str>,
        email: Option<&str>,
    ) -> Result<User, AppError> {
        sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET full_name = COALESCE($2, full_name),
                email = COALESCE($3, email),
                updated_utc = now()
            WHERE user_id = $1
            RETURNING {}
            "#,
            USER_COLUMNS
        ))
        .bind(user_id)
        .bind(full_name)
        .bind(email)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                AppError::Conflict(anyhow::anyhow!("Email is already in use"))
            }
            _ => AppError::DatabaseError(anyhow::anyhow!("Failed to update user: {}", e)),
        })?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("User not found")))
    }

    #[instrument(skip(self, password_hash))]
    pub async fn update_password_hash(
        &self,
        user_id: Uuid,
        password_hash: &str,
    ) -> Result<(), AppError> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_utc = now() WHERE user_id = $1")
            .bind(user_id)
            .bind(password_hash)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    pub async fn set_active_company(
        &self,
        user_id: Uuid,
        company_id: Option<Uuid>,
    ) -> Result<(), AppError> {
        sqlx::query(
            "UPDATE users SET active_company_id = $2, updated_utc = now() WHERE user_id = $1",
        )
        .bind(user_id)
        .bind(company_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        Ok(())
    }

    // ==================== Membership Lookups ====================

    pub async fn list_memberships(&self, user_id: Uuid) -> Result<Vec<Membership>, AppError> {
        sqlx::query_as::<_, Membership>(&format!(
            "{} WHERE uc.user_id = $1 ORDER BY c.company_name",
            MEMBERSHIP_SELECT
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_membership(
        &self,
        user_id: Uuid,
        company_id: Uuid,
    ) -> Result<Option<Membership>, AppError> {
        sqlx::query_as::<_, Membership>(&format!(
            "{} WHERE uc.user_id = $1 AND uc.company_id = $2",
            MEMBERSHIP_SELECT
        ))
        .bind(user_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Resolve the tenant of a request. `None` when the user no longer exists.
    pub async fn find_active_membership(
        &self,
        user_id: Uuid,
    ) -> Result<Option<ActiveMembership>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["find_active_membership"])
            .start_timer();

        let row = sqlx::query_as::<_, ActiveMembership>(
            r#"
            SELECT u.active_company_id, uc.role_code, uc.commission_rate
            FROM users u
            LEFT JOIN user_companies uc
                   ON uc.user_id = u.user_id AND uc.company_id = u.active_company_id
            WHERE u.user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        timer.observe_duration();
        Ok(row)
    }
}
