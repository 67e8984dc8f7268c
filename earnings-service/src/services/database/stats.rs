use chrono::NaiveDate;
use service_core::error::AppError;
use tracing::instrument;
use uuid::Uuid;

use super::Database;
use crate::models::{DailyPoint, EarningsTotals, EmployeeTotals, ServicePopularity};
use crate::services::metrics::DB_QUERY_DURATION;

const TOTALS_SELECT: &str = r#"
    COALESCE(SUM(e.cash_amount), 0) AS cash_amount,
    COALESCE(SUM(e.card_amount), 0) AS card_amount,
    COALESCE(SUM(e.other_amount), 0) AS other_amount,
    COALESCE(SUM(e.total_amount), 0) AS total_amount,
    COALESCE(SUM(e.tips_amount), 0) AS tips_amount,
    COUNT(e.earnings_id) AS days_worked,
    COALESCE(SUM(e.transaction_count), 0)::bigint AS transaction_count
"#;

impl Database {
    // ==================== Statistics ====================

    /// Totals of one user's days in the company between the inclusive
    /// bounds.
    #[instrument(skip(self))]
    pub async fn earnings_totals(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<EarningsTotals, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["earnings_totals"])
            .start_timer();

        let totals = sqlx::query_as::<_, EarningsTotals>(&format!(
            r#"
            SELECT {} FROM daily_earnings_complete e
            WHERE e.company_id = $1 AND e.user_id = $2
              AND ($3::date IS NULL OR e.earnings_date >= $3)
              AND ($4::date IS NULL OR e.earnings_date <= $4)
            "#,
            TOTALS_SELECT
        ))
        .bind(company_id)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        timer.observe_duration();
        Ok(totals)
    }

    /// One row per member of the company, including members without any
    /// recorded days.
    #[instrument(skip(self))]
    pub async fn employee_totals(
        &self,
        company_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<EmployeeTotals>, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["employee_totals"])
            .start_timer();

        let rows = sqlx::query_as::<_, EmployeeTotals>(&format!(
            r#"
            SELECT uc.user_id, u.full_name, uc.role_code, uc.commission_rate, {}
            FROM user_companies uc
            JOIN users u ON u.user_id = uc.user_id
            LEFT JOIN daily_earnings_complete e
                   ON e.user_id = uc.user_id
                  AND e.company_id = uc.company_id
                  AND ($2::date IS NULL OR e.earnings_date >= $2)
                  AND ($3::date IS NULL OR e.earnings_date <= $3)
            WHERE uc.company_id = $1
            GROUP BY uc.user_id, u.full_name, uc.role_code, uc.commission_rate
            ORDER BY total_amount DESC, u.full_name
            "#,
            TOTALS_SELECT
        ))
        .bind(company_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))?;

        timer.observe_duration();
        Ok(rows)
    }

    /// One user's per-date totals, oldest first.
    pub async fn daily_series(
        &self,
        company_id: Uuid,
        user_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<DailyPoint>, AppError> {
        sqlx::query_as::<_, DailyPoint>(
            r#"
            SELECT earnings_date,
                   SUM(cash_amount) AS cash_amount,
                   SUM(card_amount) AS card_amount,
                   SUM(other_amount) AS other_amount,
                   SUM(total_amount) AS total_amount,
                   SUM(tips_amount) AS tips_amount,
                   SUM(transaction_count)::bigint AS transaction_count
            FROM daily_earnings_complete
            WHERE company_id = $1
              AND user_id = $2
              AND ($3::date IS NULL OR earnings_date >= $3)
              AND ($4::date IS NULL OR earnings_date <= $4)
            GROUP BY earnings_date
            ORDER BY earnings_date
            "#,
        )
        .bind(company_id)
        .bind(user_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    /// Services ranked by how often they were sold; revenue is the sum of
    /// the prices charged at the time.
    pub async fn service_popularity(
        &self,
        company_id: Uuid,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Vec<ServicePopularity>, AppError> {
        sqlx::query_as::<_, ServicePopularity>(
            r#"
            SELECT s.service_id, s.service_name,
                   COUNT(*) AS times_sold,
                   COALESCE(SUM(ts.price_at_time), 0) AS revenue
            FROM client_transaction_services ts
            JOIN services s ON s.service_id = ts.service_id
            JOIN client_transactions t ON t.transaction_id = ts.transaction_id
            JOIN daily_earnings d ON d.earnings_id = t.earnings_id
            WHERE d.company_id = $1
              AND ($2::date IS NULL OR d.earnings_date >= $2)
              AND ($3::date IS NULL OR d.earnings_date <= $3)
            GROUP BY s.service_id, s.service_name
            ORDER BY times_sold DESC, revenue DESC, s.service_name
            "#,
        )
        .bind(company_id)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}
