use rust_decimal::Decimal;
use service_core::error::AppError;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{commit, Database};
use crate::models::{CatalogService, PriceHistoryEntry, ServiceChanges};
use crate::services::metrics::DB_QUERY_DURATION;

const SERVICE_COLUMNS: &str = r#"
    service_id, company_id, service_name, description, price, duration_minutes,
    is_active, created_utc, updated_utc
"#;

fn duplicate_name(e: sqlx::Error) -> AppError {
    match e {
        sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
            AppError::Conflict(anyhow::anyhow!("A service with this name already exists"))
        }
        other => AppError::from(other),
    }
}

impl Database {
    // ==================== Service Catalog ====================

    pub async fn list_services(
        &self,
        company_id: Uuid,
        include_inactive: bool,
    ) -> Result<Vec<CatalogService>, AppError> {
        sqlx::query_as::<_, CatalogService>(&format!(
            r#"
            SELECT {} FROM services
            WHERE company_id = $1 AND ($2 OR is_active)
            ORDER BY LOWER(service_name)
            "#,
            SERVICE_COLUMNS
        ))
        .bind(company_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    pub async fn find_service(
        &self,
        company_id: Uuid,
        service_id: Uuid,
    ) -> Result<Option<CatalogService>, AppError> {
        sqlx::query_as::<_, CatalogService>(&format!(
            "SELECT {} FROM services WHERE service_id = $1 AND company_id = $2",
            SERVICE_COLUMNS
        ))
        .bind(service_id)
        .bind(company_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }

    #[instrument(skip(self, service_name, description), fields(company_id = %company_id))]
    pub async fn create_service(
        &self,
        company_id: Uuid,
        service_name: &str,
        description: Option<&str>,
        price: Decimal,
        duration_minutes: Option<i32>,
    ) -> Result<CatalogService, AppError> {
        let service = sqlx::query_as::<_, CatalogService>(&format!(
            r#"
            INSERT INTO services (service_id, company_id, service_name, description, price, duration_minutes)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        ))
        .bind(Uuid::new_v4())
        .bind(company_id)
        .bind(service_name)
        .bind(description)
        .bind(price)
        .bind(duration_minutes)
        .fetch_one(&self.pool)
        .await
        .map_err(duplicate_name)?;

        info!(service_id = %service.service_id, "Service created");
        Ok(service)
    }

    /// Partial update. A price change is appended to the price history in
    /// the same transaction.
    #[instrument(skip(self, changes))]
    pub async fn update_service(
        &self,
        company_id: Uuid,
        service_id: Uuid,
        changes: &ServiceChanges,
        changed_by: Uuid,
    ) -> Result<CatalogService, AppError> {
        let timer = DB_QUERY_DURATION
            .with_label_values(&["update_service"])
            .start_timer();

        let mut tx = self.begin().await?;

        let current_price: Decimal = sqlx::query_scalar(
            "SELECT price FROM services WHERE service_id = $1 AND company_id = $2 FOR UPDATE",
        )
        .bind(service_id)
        .bind(company_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Service not found")))?;

        let service = sqlx::query_as::<_, CatalogService>(&format!(
            r#"
            UPDATE services
            SET service_name = COALESCE($3, service_name),
                description = COALESCE($4, description),
                price = COALESCE($5, price),
                duration_minutes = COALESCE($6, duration_minutes),
                is_active = COALESCE($7, is_active),
                updated_utc = now()
            WHERE service_id = $1 AND company_id = $2
            RETURNING {}
            "#,
            SERVICE_COLUMNS
        ))
        .bind(service_id)
        .bind(company_id)
        .bind(changes.service_name.as_deref())
        .bind(changes.description.as_deref())
        .bind(changes.price)
        .bind(changes.duration_minutes)
        .bind(changes.is_active)
        .fetch_one(&mut *tx)
        .await
        .map_err(duplicate_name)?;

        if let Some(new_price) = changes.price_change(current_price) {
            sqlx::query(
                r#"
                INSERT INTO service_price_history (history_id, service_id, old_price, new_price, changed_by_user_id)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(Uuid::new_v4())
            .bind(service_id)
            .bind(current_price)
            .bind(new_price)
            .bind(changed_by)
            .execute(&mut *tx)
            .await?;

            info!(
                service_id = %service_id,
                old_price = %current_price,
                new_price = %new_price,
                "Service price changed"
            );
        }

        commit(tx).await?;
        timer.observe_duration();

        Ok(service)
    }

    /// Delete a service that no transaction references.
    #[instrument(skip(self))]
    pub async fn delete_service(&self, company_id: Uuid, service_id: Uuid) -> Result<(), AppError> {
        let in_use: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM client_transaction_services WHERE service_id = $1)",
        )
        .bind(service_id)
        .fetch_one(&self.pool)
        .await?;

        if in_use {
            return Err(AppError::Conflict(anyhow::anyhow!(
                "Service is used by transactions; deactivate it instead"
            )));
        }

        let result = sqlx::query("DELETE FROM services WHERE service_id = $1 AND company_id = $2")
            .bind(service_id)
            .bind(company_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(anyhow::anyhow!("Service not found")));
        }

        info!(service_id = %service_id, "Service deleted");
        Ok(())
    }

    pub async fn list_price_history(
        &self,
        company_id: Uuid,
        service_id: Uuid,
    ) -> Result<Vec<PriceHistoryEntry>, AppError> {
        if self.find_service(company_id, service_id).await?.is_none() {
            return Err(AppError::NotFound(anyhow::anyhow!("Service not found")));
        }

        sqlx::query_as::<_, PriceHistoryEntry>(
            r#"
            SELECT history_id, service_id, old_price, new_price, changed_by_user_id, changed_utc
            FROM service_price_history
            WHERE service_id = $1
            ORDER BY changed_utc DESC
            "#,
        )
        .bind(service_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::DatabaseError(anyhow::anyhow!(e)))
    }
}
