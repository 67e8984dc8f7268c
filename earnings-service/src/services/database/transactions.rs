use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::PgConnection;
use tracing::{info, instrument};
use uuid::Uuid;

use super::clients::refresh_client_stats;
use super::earnings::{ensure_detailed_day, load_transaction_details};
use super::{commit, Database};
use crate::models::{dedup_service_ids, ResolvedAmounts, TransactionDetail, TransactionInput};
use crate::services::metrics::DB_QUERY_DURATION;

/// A linked service as priced at the time of the write.
struct PricedService {
    service_id: Uuid,
    price: Decimal,
}

impl Database {
    // ==================== Client Transactions ====================

    /// Record a transaction on the user's day, switching the day to
    /// detailed mode if needed.
    #[instrument(skip(self, input))]
    pub async fn create_transaction(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        earnings_date: NaiveDate,
        input: TransactionInput,
    ) -> Result<TransactionDetail, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["create_transaction"])
            .start_timer();

        let mut tx = self.begin().await?;

        let services = load_priced_services(&mut tx, company_id, &input.service_ids).await?;
        let amounts = resolve_amounts(&input, &services)?;
        let client_name = resolve_client_name(&mut tx, company_id, &input).await?;

        let earnings_id = ensure_detailed_day(&mut tx, company_id, user_id, earnings_date).await?;
        let transaction_id = Uuid::new_v4();

        sqlx::query(
            r#"
            INSERT INTO client_transactions
                (transaction_id, earnings_id, client_id, client_name, amount, payment_method,
                 has_multiple_payments, tip_amount, notes)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction_id)
        .bind(earnings_id)
        .bind(input.client_id)
        .bind(client_name.as_deref())
        .bind(amounts.amount)
        .bind(amounts.payment_method.as_str())
        .bind(amounts.has_multiple_payments)
        .bind(amounts.tip_amount)
        .bind(input.notes.as_deref())
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, transaction_id, &amounts, &services).await?;

        if let Some(client_id) = input.client_id {
            refresh_client_stats(&mut tx, &[client_id]).await?;
        }

        let detail = load_one(&mut tx, transaction_id).await?;
        commit(tx).await?;
        timer.observe_duration();

        info!(transaction_id = %transaction_id, earnings_id = %earnings_id, "Transaction recorded");
        Ok(detail)
    }

    /// Replace a transaction's client, amounts, payments and services.
    #[instrument(skip(self, input))]
    pub async fn update_transaction(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        transaction_id: Uuid,
        input: TransactionInput,
    ) -> Result<TransactionDetail, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_transaction"])
            .start_timer();

        let mut tx = self.begin().await?;

        let previous_client =
            lock_own_transaction(&mut tx, company_id, user_id, transaction_id).await?;

        let services = load_priced_services(&mut tx, company_id, &input.service_ids).await?;
        let amounts = resolve_amounts(&input, &services)?;
        let client_name = resolve_client_name(&mut tx, company_id, &input).await?;

        sqlx::query("DELETE FROM client_payment_methods WHERE transaction_id = $1")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM client_transaction_services WHERE transaction_id = $1")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query(
            r#"
            UPDATE client_transactions
            SET client_id = $2, client_name = $3, amount = $4, payment_method = $5,
                has_multiple_payments = $6, tip_amount = $7, notes = $8, updated_utc = now()
            WHERE transaction_id = $1
            "#,
        )
        .bind(transaction_id)
        .bind(input.client_id)
        .bind(client_name.as_deref())
        .bind(amounts.amount)
        .bind(amounts.payment_method.as_str())
        .bind(amounts.has_multiple_payments)
        .bind(amounts.tip_amount)
        .bind(input.notes.as_deref())
        .execute(&mut *tx)
        .await?;

        insert_lines(&mut tx, transaction_id, &amounts, &services).await?;

        let mut touched: Vec<Uuid> = previous_client.into_iter().chain(input.client_id).collect();
        touched.dedup();
        refresh_client_stats(&mut tx, &touched).await?;

        let detail = load_one(&mut tx, transaction_id).await?;
        commit(tx).await?;
        timer.observe_duration();

        Ok(detail)
    }

    #[instrument(skip(self))]
    pub async fn delete_transaction(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        transaction_id: Uuid,
    ) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        let client_id = lock_own_transaction(&mut tx, company_id, user_id, transaction_id).await?;

        sqlx::query("DELETE FROM client_transactions WHERE transaction_id = $1")
            .bind(transaction_id)
            .execute(&mut *tx)
            .await?;

        if let Some(client_id) = client_id {
            refresh_client_stats(&mut tx, &[client_id]).await?;
        }

        commit(tx).await?;

        info!(transaction_id = %transaction_id, "Transaction deleted");
        Ok(())
    }
}

fn resolve_amounts(
    input: &TransactionInput,
    services: &[PricedService],
) -> Result<ResolvedAmounts, AppError> {
    let service_total = if services.is_empty() {
        None
    } else {
        Some(services.iter().map(|s| s.price).sum::<Decimal>())
    };
    Ok(input.draft.clone().resolve(service_total)?)
}

/// Check the linked client belongs to the company and default the
/// transaction's label to the client's name.
async fn resolve_client_name(
    conn: &mut PgConnection,
    company_id: Uuid,
    input: &TransactionInput,
) -> Result<Option<String>, AppError> {
    let given_name = input
        .client_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    let Some(client_id) = input.client_id else {
        return Ok(given_name);
    };

    let stored: String = sqlx::query_scalar(
        "SELECT client_name FROM clients WHERE client_id = $1 AND company_id = $2",
    )
    .bind(client_id)
    .bind(company_id)
    .fetch_optional(&mut *conn)
    .await?
    .ok_or_else(|| AppError::BadRequest(anyhow::anyhow!("Client not found in this company")))?;

    Ok(Some(given_name.unwrap_or(stored)))
}

/// Lock `service_ids` for the write. Every id must be an active service of
/// the company.
async fn load_priced_services(
    conn: &mut PgConnection,
    company_id: Uuid,
    service_ids: &[Uuid],
) -> Result<Vec<PricedService>, AppError> {
    let ids = dedup_service_ids(service_ids);
    if ids.is_empty() {
        return Ok(Vec::new());
    }

    let rows: Vec<(Uuid, Decimal, bool)> = sqlx::query_as(
        r#"
        SELECT service_id, price, is_active FROM services
        WHERE company_id = $1 AND service_id = ANY($2)
        FOR SHARE
        "#,
    )
    .bind(company_id)
    .bind(&ids)
    .fetch_all(&mut *conn)
    .await?;

    if rows.len() != ids.len() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "One or more services do not exist in this company"
        )));
    }
    if rows.iter().any(|(_, _, active)| !active) {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Inactive services cannot be added to a transaction"
        )));
    }

    Ok(rows
        .into_iter()
        .map(|(service_id, price, _)| PricedService { service_id, price })
        .collect())
}

/// Lock a transaction for writing. Returns its current client id.
async fn lock_own_transaction(
    conn: &mut PgConnection,
    company_id: Uuid,
    user_id: Uuid,
    transaction_id: Uuid,
) -> Result<Option<Uuid>, AppError> {
    let row: Option<(Option<Uuid>, Uuid)> = sqlx::query_as(
        r#"
        SELECT t.client_id, d.user_id
        FROM client_transactions t
        JOIN daily_earnings d ON d.earnings_id = t.earnings_id
        WHERE t.transaction_id = $1 AND d.company_id = $2
        FOR UPDATE OF t
        "#,
    )
    .bind(transaction_id)
    .bind(company_id)
    .fetch_optional(&mut *conn)
    .await?;

    let (client_id, day_owner) =
        row.ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction not found")))?;

    if day_owner != user_id {
        return Err(AppError::Forbidden(anyhow::anyhow!(
            "Only the employee who recorded the day can change its transactions"
        )));
    }

    Ok(client_id)
}

async fn insert_lines(
    conn: &mut PgConnection,
    transaction_id: Uuid,
    amounts: &ResolvedAmounts,
    services: &[PricedService],
) -> Result<(), AppError> {
    for line in &amounts.payments {
        sqlx::query(
            r#"
            INSERT INTO client_payment_methods (payment_id, transaction_id, payment_method, amount)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(transaction_id)
        .bind(line.payment_method.as_str())
        .bind(line.amount)
        .execute(&mut *conn)
        .await?;
    }

    for service in services {
        sqlx::query(
            r#"
            INSERT INTO client_transaction_services (transaction_id, service_id, price_at_time)
            VALUES ($1, $2, $3)
            "#,
        )
        .bind(transaction_id)
        .bind(service.service_id)
        .bind(service.price)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

async fn load_one(
    conn: &mut PgConnection,
    transaction_id: Uuid,
) -> Result<TransactionDetail, AppError> {
    load_transaction_details(conn, "transaction_id = ANY($1)", &[transaction_id])
        .await?
        .pop()
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Transaction not found")))
}
