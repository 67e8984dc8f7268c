//! Company membership: who belongs to which company, in what role.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Membership role inside a company.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Owner,
    Employee,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Owner => "owner",
            Role::Employee => "employee",
        }
    }

    pub fn is_owner(&self) -> bool {
        matches!(self, Role::Owner)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "owner" => Ok(Role::Owner),
            "employee" => Ok(Role::Employee),
            other => Err(format!("unknown role code '{}'", other)),
        }
    }
}

/// A user's membership in one company, joined with the company label.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct Membership {
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub company_name: String,
    pub currency_code: String,
    #[sqlx(try_from = "String")]
    pub role_code: Role,
    pub commission_rate: Decimal,
    pub joined_utc: DateTime<Utc>,
}

/// A member as seen from the company side.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct CompanyMember {
    pub user_id: Uuid,
    pub email: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role_code: Role,
    pub commission_rate: Decimal,
    pub joined_utc: DateTime<Utc>,
}

/// Commission rates are percentages.
pub fn validate_commission_rate(rate: Decimal) -> Result<(), AppError> {
    if rate < Decimal::ZERO || rate > Decimal::ONE_HUNDRED {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Commission rate must be between 0 and 100"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn role_codes_round_trip_through_strings() {
        assert_eq!(Role::try_from("owner".to_string()), Ok(Role::Owner));
        assert_eq!(Role::Employee.as_str(), "employee");
        assert!(Role::try_from("admin".to_string()).is_err());
    }

    #[test]
    fn commission_rate_bounds_are_inclusive() {
        assert!(validate_commission_rate(dec("0")).is_ok());
        assert!(validate_commission_rate(dec("100")).is_ok());
        assert!(validate_commission_rate(dec("42.50")).is_ok());
        assert!(validate_commission_rate(dec("-0.01")).is_err());
        assert!(validate_commission_rate(dec("100.01")).is_err());
    }
}
