use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{commit, Database};
use crate::models::{Company, CompanyMember, Role};
use crate::services::metrics::DB_QUERY_DURATION;

const COMPANY_COLUMNS: &str =
    "company_id, company_name, currency_code, created_by_user_id, created_utc, updated_utc";

const MEMBER_SELECT: &str = r#"
    SELECT uc.user_id, u.email, u.full_name, uc.role_code, uc.commission_rate, uc.joined_utc
    FROM user_companies uc
    JOIN users u ON u.user_id = uc.user_id
"#;

impl Database {
    // ==================== Company Operations ====================

    /// Create a company, make `owner_id` its owner and switch them to it.
    #[instrument(skip(self, company_name), fields(owner_id = %owner_id))]
    pub async fn create_company(
        &self,
        owner_id: Uuid,
        company_name: &str,
        currency_code: &str,
    ) -> Result<Company, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_company"])
            .start_timer();

        let mut tx = self.begin().await?;

        let company = sqlx::query_as::<_, Company>(&format!(
            r#"
            INSERT INTO companies (company_id, company_name, currency_code, created_by_user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(company_name)
        .bind(currency_code)
        .bind(owner_id)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!("Failed to create company: {}", e)))?;

        sqlx::query(
            r#"
            INSERT INTO user_companies (user_id, company_id, role_code)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(owner_id)
        .bind(company.company_id)
        .bind(Role::Owner.as_str())
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "UPDATE users SET active_company_id = $2, updated_utc = now() WHERE user_id = $1",
        )
        .bind(owner_id)
        .bind(company.company_id)
        .execute(&mut *tx)
        .await?;

        commit(tx).await?;
        timer.observe_duration();

        info!(company_id = %company.company_id, "Company created");
        Ok(company)
    }

    pub async fn find_company(&self, company_id: Uuid) -> Result<Option<Company>, AppError> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {} FROM companies WHERE company_id = $1",
            COMPANY_COLUMNS
        ))
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    #[instrument(skip(self, company_name, currency_code))]
    pub async fn update_company(
        &self,
        company_id: Uuid,
        company_name: Option<&str>,
        currency_code: Option<&str>,
    ) -> Result<Company, AppError> {
        sqlx::query_as::<_, Company>(&format!(
            r#"
            UPDATE companies
            SET company_name = COALESCE($2, company_name),
                currency_code = COALESCE($3, currency_code),
                updated_utc = now()
            WHERE company_id = $1
            RETURNING {}
            "#,
            COMPANY_COLUMNS
        ))
        .bind(company_id)
        .bind(company_name)
        .bind(currency_code)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Company not found")))
    }

    /// Delete a company and, by cascade, everything it owns. Members whose
    /// active company it was are left without one.
    #[instrument(skip(self))]
    pub async fn delete_company(&self, company_id: Uuid) -> Result<(), AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["delete_company"])
            .start_timer();

        let mut tx = self.begin().await?;

        // Days go first: their transaction service links block the
        // cascade from companies to services.
        sqlx::query("DELETE FROM daily_earnings WHERE company_id = $1")
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM companies WHERE company_id = $1")
            .bind(company_id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Company not found")));
        }

        commit(tx).await?;
        timer.observe_duration();

        info!(company_id = %company_id, "Company deleted");
        Ok(())
    }

    // ==================== Member Operations ====================

    pub async fn list_members(&self, company_id: Uuid) -> Result<Vec<CompanyMember>, AppError> {
        sqlx::query_as::<_, CompanyMember>(&format!(
            "{} WHERE uc.company_id = $1 ORDER BY uc.role_code DESC, u.full_name",
            MEMBER_SELECT
        ))
        .bind(company_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Change a member's role and/or commission. Demoting the last owner is
    /// refused.
    #[instrument(skip(self))]
    pub async fn update_member(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        role: Option<Role>,
        commission_rate: Option<Decimal>,
    ) -> Result<CompanyMember, AppError> {
        let mut tx = self.begin().await?;

        let (current_role, owner_count) = lock_member(&mut tx, company_id, user_id).await?;

        if current_role == Role::Owner && role == Some(Role::Employee) && owner_count <= 1 {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Cannot demote the last owner of the company"
            )));
        }

        sqlx::query(
            r#"
            UPDATE user_companies
            SET role_code = COALESCE($3, role_code),
                commission_rate = COALESCE($4, commission_rate)
            WHERE company_id = $1 AND user_id = $2
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .bind(role.map(|r| r.as_str()))
        .bind(commission_rate)
        .execute(&mut *tx)
        .await?;

        let member = sqlx::query_as::<_, CompanyMember>(&format!(
            "{} WHERE uc.company_id = $1 AND uc.user_id = $2",
            MEMBER_SELECT
        ))
        .bind(company_id)
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;

        commit(tx).await?;
        Ok(member)
    }

    /// Remove a membership. `last_owner_message` is the conflict reported
    /// when the member is the company's only owner.
    #[instrument(skip(self, last_owner_message))]
    pub async fn remove_member(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        last_owner_message: &'static str,
    ) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        let (current_role, owner_count) = lock_member(&mut tx, company_id, user_id).await?;
        if current_role == Role::Owner && owner_count <= 1 {
            return Err(AppError::Conflict(anyhow::anyhow!(last_owner_message)));
        }

        sqlx::query("DELETE FROM user_companies WHERE company_id = $1 AND user_id = $2")
            .bind(company_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE users SET active_company_id = NULL, updated_utc = now()
            WHERE user_id = $1 AND active_company_id = $2
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .execute(&mut *tx)
        .await?;

        commit(tx).await?;

        info!(company_id = %company_id, user_id = %user_id, "Member removed");
        Ok(())
    }
}

/// Lock the company's owner rows plus the target membership, returning the
/// target's role and the number of owners.
async fn lock_member(
    conn: &mut PgConnection,
    company_id: Uuid,
    user_id: Uuid,
) -> Result<(Role, i64), AppError> {
    let owners: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT user_id FROM user_companies
        WHERE company_id = $1 AND role_code = 'owner'
        FOR UPDATE
        "#,
    )
    .bind(company_id)
    .fetch_all(&mut *conn)
    .await?;

    let role_code: Option<String> = sqlx::query_scalar(
        "SELECT role_code FROM user_companies WHERE company_id = $1 AND user_id = $2 FOR UPDATE",
    )
    .bind(company_id)
    .bind(user_id)
    .fetch_optional(&mut *conn)
    .await?;

    let role = role_code
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Member not found")))
        .and_then(|code| {
            Role::try_from(code).map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
        })?;

    Ok((role, owners.len() as i64))
}
