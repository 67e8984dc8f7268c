//! Service catalog entries and their price history.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// A priced service a company offers (haircut, manicure, ...).
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct CatalogService {
    pub service_id: Uuid,
    pub company_id: Uuid,
    #[schema(example = "Women's haircut")]
    pub service_name: String,
    pub description: Option<String>,
    #[schema(value_type = String, example = "45.00")]
    pub price: Decimal,
    pub duration_minutes: Option<i32>,
    pub is_active: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct PriceHistoryEntry {
    pub history_id: Uuid,
    pub service_id: Uuid,
    #[schema(value_type = String)]
    pub old_price: Decimal,
    #[schema(value_type = String)]
    pub new_price: Decimal,
    pub changed_by_user_id: Option<Uuid>,
    pub changed_utc: DateTime<Utc>,
}

/// Partial update of a catalog entry; `None` keeps the stored value.
#[derive(Debug, Clone, Default)]
pub struct ServiceChanges {
    pub service_name: Option<String>,
    pub description: Option<String>,
    pub price: Option<Decimal>,
    pub duration_minutes: Option<i32>,
    pub is_active: Option<bool>,
}

impl ServiceChanges {
    /// The new price, if it differs from `current`.
    pub fn price_change(&self, current: Decimal) -> Option<Decimal> {
        self.price.filter(|p| *p != current)
    }
}
