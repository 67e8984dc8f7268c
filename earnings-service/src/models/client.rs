//! Client register (CRM) with rolling visit statistics.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Number of transactions shown on a client's detail page.
pub const CLIENT_HISTORY_LIMIT: i64 = 20;

/// Client row as read through `clients_with_recent_activity`.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Client {
    pub client_id: Uuid,
    pub company_id: Uuid,
    #[schema(example = "Maria Rossi")]
    pub client_name: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub notes: Option<String>,
    pub total_visits: i32,
    #[schema(value_type = String, example = "180.00")]
    pub total_spent: Decimal,
    pub last_visit_date: Option<NaiveDate>,
    pub visits_last_30_days: i64,
    pub is_recent: bool,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

/// One line of a client's visit history.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ClientVisit {
    pub transaction_id: Uuid,
    pub earnings_date: NaiveDate,
    pub user_id: Uuid,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub tip_amount: Decimal,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ClientDetail {
    #[serde(flatten)]
    pub client: Client,
    pub recent_transactions: Vec<ClientVisit>,
}

/// Query filter for the client list.
#[derive(Debug, Clone, Default)]
pub struct ClientFilter {
    pub search: Option<String>,
    pub recent_only: bool,
}

impl ClientFilter {
    /// `ILIKE` pattern for the search term, with wildcards in the term escaped.
    pub fn search_pattern(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                let escaped = s
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_");
                format!("%{}%", escaped)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_search_matches_everything() {
        let filter = ClientFilter {
            search: Some("   ".to_string()),
            recent_only: false,
        };
        assert_eq!(filter.search_pattern(), None);
    }

    #[test]
    fn search_wildcards_are_escaped() {
        let filter = ClientFilter {
            search: Some("50%_off".to_string()),
            recent_only: true,
        };
        assert_eq!(filter.search_pattern().as_deref(), Some("%50\\%\\_off%"));
    }
}
