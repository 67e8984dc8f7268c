//! Companies (tenants).

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

pub const DEFAULT_CURRENCY: &str = "EUR";

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Company {
    pub company_id: Uuid,
    #[schema(example = "Salon Anna")]
    pub company_name: String,
    #[schema(example = "EUR")]
    pub currency_code: String,
    pub created_by_user_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// Currency codes are three ASCII letters, stored uppercase.
pub fn normalize_currency(code: &str) -> Option<String> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}
