use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{commit, Database};
use crate::models::{Client, ClientFilter, ClientVisit, CLIENT_HISTORY_LIMIT};
use crate::services::metrics::DB_QUERY_DURATION;

const CLIENT_COLUMNS: &str = r#"
    client_id, company_id, client_name, phone, email, notes, total_visits, total_spent,
    last_visit_date, visits_last_30_days, is_recent, created_utc, updated_utc
"#;

/// Fields of a client write. On update `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ClientFields<'a> {
    pub client_name: Option<&'a str>,
    pub phone: Option<&'a str>,
    pub email: Option<&'a str>,
    pub notes: Option<&'a str>,
}

impl Database {
    // ==================== Client Operations ====================

    #[instrument(skip(self, filter))]
    pub async fn list_clients(
        &self,
        company_id: Uuid,
        filter: &ClientFilter,
    ) -> Result<Vec<Client>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_clients"])
            .start_timer();

        let clients = sqlx::query_as::<_, Client>(&format!(
            r#"
            SELECT {} FROM clients_with_recent_activity
            WHERE company_id = $1
              AND ($2::text IS NULL
                   OR client_name ILIKE $2
                   OR phone ILIKE $2
                   OR email ILIKE $2)
              AND (NOT $3 OR is_recent)
            ORDER BY last_visit_date DESC NULLS LAST, LOWER(client_name)
            "#,
            CLIENT_COLUMNS
        ))
        .bind(company_id)
        .bind(filter.search_pattern())
        .bind(filter.recent_only)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        timer.observe_duration();
        Ok(clients)
    }

    pub async fn find_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<Option<Client>, AppError> {
        sqlx::query_as::<_, Client>(&format!(
            "SELECT {} FROM clients_with_recent_activity WHERE client_id = $1 AND company_id = $2",
            CLIENT_COLUMNS
        ))
        .bind(client_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Most recent transactions of a client, newest day first.
    pub async fn client_history(
        &self,
        company_id: Uuid,
        client_id: Uuid,
    ) -> Result<Vec<ClientVisit>, AppError> {
        sqlx::query_as::<_, ClientVisit>(
            r#"
            SELECT t.transaction_id, d.earnings_date, d.user_id,
                   tt.total_amount, t.tip_amount, t.notes
            FROM client_transactions t
            JOIN client_transaction_totals tt ON tt.transaction_id = t.transaction_id
            JOIN daily_earnings d ON d.earnings_id = t.earnings_id
            WHERE t.client_id = $1 AND d.company_id = $2
            ORDER BY d.earnings_date DESC, t.created_utc DESC
            LIMIT $3
            "#,
        )
        .bind(client_id)
        .bind(company_id)
        .bind(CLIENT_HISTORY_LIMIT)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    #[instrument(skip(self, fields))]
    pub async fn create_client(
        &self,
        company_id: Uuid,
        created_by: Uuid,
        fields: &ClientFields<'_>,
    ) -> Result<Client, AppError> {
        let client_name = fields
            .client_name
            .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("client_name is required")))?;

        let client_id: Uuid = sqlx::query_scalar(
            r#"
            INSERT INTO clients (client_id, company_id, client_name, phone, email, notes, created_by_user_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING client_id
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(client_name)
        .bind(fields.phone)
        .bind(fields.email)
        .bind(fields.notes)
        .bind(created_by)
        .fetch_one(&self.pool)
        .await?;

        info!(client_id = %client_id, "Client created");
        self.find_client(company_id, client_id)
            .await?
            .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Created client not found")))
    }

    #[instrument(skip(self, fields))]
    pub async fn update_client(
        &self,
        company_id: Uuid,
        client_id: Uuid,
        fields: &ClientFields<'_>,
    ) -> Result<Client, AppError> {
        let updated: Option<Uuid> = sqlx::query_scalar(
            r#"
            UPDATE clients
            SET client_name = COALESCE($3, client_name),
                phone = COALESCE($4, phone),
                email = COALESCE($5, email),
                notes = COALESCE($6, notes),
                updated_utc = now()
            WHERE client_id = $1 AND company_id = $2
            RETURNING client_id
            "#,
        )
        .bind(client_id)
        .bind(company_id)
        .bind(fields.client_name)
        .bind(fields.phone)
        .bind(fields.email)
        .bind(fields.notes)
        .fetch_optional(&self.pool)
        .await?;

        if updated.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Client not found")));
        }

        self.find_client(company_id, client_id)
            .await?
            .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))
    }

    /// Delete a client. Its transactions keep the client's name as a label.
    #[instrument(skip(self))]
    pub async fn delete_client(&self, company_id: Uuid, client_id: Uuid) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        let client_name: String = sqlx::query_scalar(
            "SELECT client_name FROM clients WHERE client_id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(client_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Client not found")))?;

        let relabelled = sqlx::query(
            r#"
            UPDATE client_transactions
            SET client_name = COALESCE(client_name, $2), updated_utc = now()
            WHERE client_id = $1
            "#,
        )
        .bind(client_id)
        .bind(&client_name)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM clients WHERE client_id = $1")
            .bind(client_id)
            .execute(&mut *tx)
            .await?;

        commit(tx).await?;

        info!(client_id = %client_id, transactions = relabelled, "Client deleted");
        Ok(())
    }
}

/// Recompute the rolling visit statistics of `client_ids` from their
/// transactions. Runs on the caller's transaction.
pub(super) async fn refresh_client_stats(
    conn: &mut PgConnection,
    client_ids: &[Uuid],
) -> Result<(), AppError> {
    if client_ids.is_empty() {
        return Ok(());
    }

    sqlx::query(
        r#"
        UPDATE clients c
        SET total_visits = COALESCE(s.total_visits, 0),
            total_spent = COALESCE(s.total_spent, 0),
            last_visit_date = s.last_visit_date,
            updated_utc = now()
        FROM (
            SELECT ids.client_id,
                   COUNT(tt.transaction_id)::int AS total_visits,
                   SUM(tt.total_amount) AS total_spent,
                   MAX(d.earnings_date) AS last_visit_date
            FROM UNNEST($1::uuid[]) AS ids(client_id)
            LEFT JOIN client_transaction_totals tt ON tt.client_id = ids.client_id
            LEFT JOIN daily_earnings d ON d.earnings_id = tt.earnings_id
            GROUP BY ids.client_id
        ) s
        WHERE c.client_id = s.client_id
        "#,
    )
    .bind(client_ids)
    .execute(&mut *conn)
    .await?;

    Ok(())
}
