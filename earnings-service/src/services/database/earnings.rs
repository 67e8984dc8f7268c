use chrono::NaiveDate;
use rust_decimal::Decimal;
use service_core::error::AppError;
use sqlx::PgConnection;
use std::collections::HashMap;
use tracing::{info, instrument};
use uuid::Uuid;

use super::clients::refresh_client_stats;
use super::{commit, Database};
use crate::models::{
    ClientTransaction, DailyEarnings, DayChanges, DayDetail, EntryMode, PaymentLine,
    TransactionDetail, TransactionServiceLine,
};
use crate::services::metrics::DB_QUERY_DURATION;

const DAY_COLUMNS: &str = r#"
    earnings_id, user_id, company_id, earnings_date, entry_mode,
    cash_amount, card_amount, other_amount, tips_amount, total_amount,
    transaction_count, notes, created_utc, updated_utc
"#;

pub(super) const TRANSACTION_COLUMNS: &str = r#"
    transaction_id, earnings_id, client_id, client_name, amount, payment_method,
    has_multiple_payments, tip_amount, notes, created_utc, updated_utc
"#;

impl Database {
    // ==================== Daily Earnings ====================

    /// Days of one user in the company, newest first. Bounds are inclusive
    /// and optional.
    #[instrument(skip(self))]
    pub async fn list_days(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyEarnings>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["list_days"])
            .start_timer();

        let days = sqlx::query_as::<_, DailyEarnings>(&format!(
            r#"
            SELECT {} FROM daily_earnings_complete
            WHERE company_id = $1 AND user_id = $2
              AND ($3::date IS NULL OR earnings_date >= $3)
              AND ($4::date IS NULL OR earnings_date <= $4)
            ORDER BY earnings_date DESC
            "#,
            DAY_COLUMNS
        ))
        .bind(company_id)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        timer.observe_duration();
        Ok(days)
    }

    pub async fn find_day(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        earnings_date: NaiveDate,
    ) -> Result<Option<DailyEarnings>, AppError> {
        sqlx::query_as::<_, DailyEarnings>(&format!(
            r#"
            SELECT {} FROM daily_earnings_complete
            WHERE company_id = $1 AND user_id = $2 AND earnings_date = $3
            "#,
            DAY_COLUMNS
        ))
        .bind(company_id)
        .bind(user_id)
        .bind(earnings_date)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// A day with its transactions, or `None` when nothing is recorded.
    pub async fn find_day_detail(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        earnings_date: NaiveDate,
    ) -> Result<Option<DayDetail>, AppError> {
        let Some(day) = self.find_day(company_id, user_id, earnings_date).await? else {
            return Ok(None);
        };

        let mut conn = self.pool.acquire().await?;
        let transactions =
            load_transaction_details(&mut conn, "earnings_id = ANY($1)", &[day.earnings_id])
                .await?;

        Ok(Some(DayDetail { day, transactions }))
    }

    /// Insert or partially update the user's day. Switching a detailed day
    /// to summary drops its transactions; switching to detailed zeroes the
    /// stored summary amounts. Amounts are refused while the day is detailed.
    #[instrument(skip(self, changes))]
    pub async fn upsert_day(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        earnings_date: NaiveDate,
        changes: &DayChanges,
    ) -> Result<DailyEarnings, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["upsert_day"])
            .start_timer();

        let mut tx = self.begin().await?;

        let existing: Option<(Uuid, String)> = sqlx::query_as(
            r#"
            SELECT earnings_id, entry_mode FROM daily_earnings
            WHERE user_id = $1 AND company_id = $2 AND earnings_date = $3
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(earnings_date)
        .fetch_optional(&mut *tx)
        .await?;

        let previous_mode = existing
            .as_ref()
            .map(|(_, mode)| EntryMode::try_from(mode.clone()))
            .transpose()
            .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        changes.check_mode(
            changes
                .entry_mode
                .or(previous_mode)
                .unwrap_or(EntryMode::Summary),
        )?;

        if let (Some((earnings_id, _)), Some(EntryMode::Detailed), Some(EntryMode::Summary)) =
            (&existing, previous_mode, changes.entry_mode)
        {
            let dropped = delete_day_transactions(&mut tx, *earnings_id).await?;
            info!(
                earnings_id = %earnings_id,
                transactions = dropped,
                "Day switched to summary, transactions removed"
            );
        }

        let to_detailed = changes.entry_mode == Some(EntryMode::Detailed)
            && previous_mode != Some(EntryMode::Detailed);
        let zero = to_detailed.then_some(Decimal::ZERO);

        sqlx::query(
            r#"
            INSERT INTO daily_earnings
                (earnings_id, user_id, company_id, earnings_date, entry_mode,
                 cash_amount, card_amount, other_amount, tips_amount, notes)
            VALUES ($1, $2, $3, $4, COALESCE($5, 'summary'),
                    COALESCE($6, 0), COALESCE($7, 0), COALESCE($8, 0), COALESCE($9, 0), $10)
            ON CONFLICT (user_id, company_id, earnings_date) DO UPDATE SET
                entry_mode = COALESCE($5, daily_earnings.entry_mode),
                cash_amount = COALESCE($6, daily_earnings.cash_amount),
                card_amount = COALESCE($7, daily_earnings.card_amount),
                other_amount = COALESCE($8, daily_earnings.other_amount),
                tips_amount = COALESCE($9, daily_earnings.tips_amount),
                notes = COALESCE($10, daily_earnings.notes),
                updated_utc = now()
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(company_id)
        .bind(earnings_date)
        .bind(changes.entry_mode.map(|m| m.as_str()))
        .bind(zero.or(changes.cash_amount))
        .bind(zero.or(changes.card_amount))
        .bind(zero.or(changes.other_amount))
        .bind(zero.or(changes.tips_amount))
        .bind(changes.notes.as_deref())
        .execute(&mut *tx)
        .await?;

        let day = sqlx::query_as::<_, DailyEarnings>(&format!(
            r#"
            SELECT {} FROM daily_earnings_complete
            WHERE user_id = $1 AND company_id = $2 AND earnings_date = $3
            "#,
            DAY_COLUMNS
        ))
        .bind(user_id)
        .bind(company_id)
        .bind(earnings_date)
        .fetch_one(&mut *tx)
        .await?;

        commit(tx).await?;
        timer.observe_duration();

        Ok(day)
    }

    #[instrument(skip(self))]
    pub async fn delete_day(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        earnings_date: NaiveDate,
    ) -> Result<(), AppError> {
        let mut tx = self.begin().await?;

        let earnings_id: Uuid = sqlx::query_scalar(
            r#"
            SELECT earnings_id FROM daily_earnings
            WHERE user_id = $1 AND company_id = $2 AND earnings_date = $3
            FOR UPDATE
            "#,
        )
        .bind(user_id)
        .bind(company_id)
        .bind(earnings_date)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("No earnings recorded for this date")))?;

        delete_day_transactions(&mut tx, earnings_id).await?;

        sqlx::query("DELETE FROM daily_earnings WHERE earnings_id = $1")
            .bind(earnings_id)
            .execute(&mut *tx)
            .await?;

        commit(tx).await?;

        info!(earnings_id = %earnings_id, "Day deleted");
        Ok(())
    }
}

/// Remove a day's transactions and refresh the stats of the clients they
/// referenced. Returns the number of transactions removed.
async fn delete_day_transactions(
    conn: &mut PgConnection,
    earnings_id: Uuid,
) -> Result<u64, AppError> {
    let client_ids: Vec<Uuid> = sqlx::query_scalar(
        r#"
        SELECT DISTINCT client_id FROM client_transactions
        WHERE earnings_id = $1 AND client_id IS NOT NULL
        "#,
    )
    .bind(earnings_id)
    .fetch_all(&mut *conn)
    .await?;

    let removed = sqlx::query("DELETE FROM client_transactions WHERE earnings_id = $1")
        .bind(earnings_id)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    refresh_client_stats(conn, &client_ids).await?;
    Ok(removed)
}

/// Make sure the user's day exists in detailed mode and return its id.
/// A summary day is switched over with its stored amounts zeroed.
pub(super) async fn ensure_detailed_day(
    conn: &mut PgConnection,
    company_id: Uuid,
    user_id: Uuid,
    earnings_date: NaiveDate,
) -> Result<Uuid, AppError> {
    let earnings_id: Uuid = sqlx::query_scalar(
        r#"
        INSERT INTO daily_earnings (earnings_id, user_id, company_id, earnings_date, entry_mode)
        VALUES ($1, $2, $3, $4, 'detailed')
        ON CONFLICT (user_id, company_id, earnings_date) DO UPDATE SET
            entry_mode = 'detailed',
            cash_amount = CASE WHEN daily_earnings.entry_mode = 'detailed'
                               THEN daily_earnings.cash_amount ELSE 0 END,
            card_amount = CASE WHEN daily_earnings.entry_mode = 'detailed'
                               THEN daily_earnings.card_amount ELSE 0 END,
            other_amount = CASE WHEN daily_earnings.entry_mode = 'detailed'
                                THEN daily_earnings.other_amount ELSE 0 END,
            tips_amount = CASE WHEN daily_earnings.entry_mode = 'detailed'
                               THEN daily_earnings.tips_amount ELSE 0 END,
            updated_utc = now()
        RETURNING earnings_id
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(company_id)
    .bind(earnings_date)
    .fetch_one(&mut *conn)
    .await?;

    Ok(earnings_id)
}

/// Load transactions matching `condition` (bound to `$1` as a uuid array)
/// with their payment lines and services, in creation order.
pub(super) async fn load_transaction_details(
    conn: &mut PgConnection,
    condition: &str,
    ids: &[Uuid],
) -> Result<Vec<TransactionDetail>, AppError> {
    let transactions = sqlx::query_as::<_, ClientTransaction>(&format!(
        "SELECT {} FROM client_transactions WHERE {} ORDER BY created_utc, transaction_id",
        TRANSACTION_COLUMNS, condition
    ))
    .bind(ids)
    .fetch_all(&mut *conn)
    .await?;

    if transactions.is_empty() {
        return Ok(Vec::new());
    }

    let transaction_ids: Vec<Uuid> = transactions.iter().map(|t| t.transaction_id).collect();

    let payment_rows: Vec<(Uuid, String, Decimal)> = sqlx::query_as(
        r#"
        SELECT transaction_id, payment_method, amount
        FROM transaction_payment_lines
        WHERE transaction_id = ANY($1)
        ORDER BY transaction_id, payment_method
        "#,
    )
    .bind(&transaction_ids)
    .fetch_all(&mut *conn)
    .await?;

    let service_rows: Vec<(Uuid, Uuid, String, Decimal)> = sqlx::query_as(
        r#"
        SELECT ts.transaction_id, ts.service_id, s.service_name, ts.price_at_time
        FROM client_transaction_services ts
        JOIN services s ON s.service_id = ts.service_id
        WHERE ts.transaction_id = ANY($1)
        ORDER BY s.service_name
        "#,
    )
    .bind(&transaction_ids)
    .fetch_all(&mut *conn)
    .await?;

    let mut payments: HashMap<Uuid, Vec<PaymentLine>> = HashMap::new();
    for (transaction_id, method, amount) in payment_rows {
        let payment_method = method
            .try_into()
            .map_err(|e: String| AppError::DatabaseError(anyhow::anyhow!(e)))?;
        payments.entry(transaction_id).or_default().push(PaymentLine {
            payment_method,
            amount,
        });
    }

    let mut services: HashMap<Uuid, Vec<TransactionServiceLine>> = HashMap::new();
    for (transaction_id, service_id, service_name, price_at_time) in service_rows {
        services
            .entry(transaction_id)
            .or_default()
            .push(TransactionServiceLine {
                service_id,
                service_name,
                price_at_time,
            });
    }

    Ok(transactions
        .into_iter()
        .map(|t| {
            let id = t.transaction_id;
            TransactionDetail::new(
                t,
                payments.remove(&id).unwrap_or_default(),
                services.remove(&id).unwrap_or_default(),
            )
        })
        .collect())
}
