//! User accounts.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// User row, including the password hash. Never serialized directly.
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub full_name: String,
    pub active_company_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl User {
    pub fn new(email: String, password_hash: String, full_name: String) -> Self {
        let now = Utc::now();
        Self {
            user_id: Uuid::new_v4(),
            email: normalize_email(&email),
            password_hash,
            full_name: full_name.trim().to_string(),
            active_company_id: None,
            created_utc: now,
            updated_utc: now,
        }
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(self.clone())
    }
}

/// User as returned by the API.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserProfile {
    pub user_id: Uuid,
    #[schema(example = "anna@salon.example")]
    pub email: String,
    #[schema(example = "Anna Schmidt")]
    pub full_name: String,
    pub active_company_id: Option<Uuid>,
    pub created_utc: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            user_id: u.user_id,
            email: u.email,
            full_name: u.full_name,
            active_company_id: u.active_company_id,
            created_utc: u.created_utc,
        }
    }
}

/// E-mail addresses are compared case-insensitively and stored lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}
