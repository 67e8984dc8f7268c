//! Daily earnings: one row per user, company and date.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use service_core::error::AppError;
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::transaction::{DraftError, TransactionDetail};

/// Whether a day is itemized per client or stored as totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EntryMode {
    Summary,
    Detailed,
}

impl EntryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryMode::Summary => "summary",
            EntryMode::Detailed => "detailed",
        }
    }
}

impl TryFrom<String> for EntryMode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "summary" => Ok(EntryMode::Summary),
            "detailed" => Ok(EntryMode::Detailed),
            other => Err(format!("unknown entry mode '{}'", other)),
        }
    }
}

/// A day as read from `daily_earnings_complete`: detailed days carry the
/// totals aggregated from their transactions.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct DailyEarnings {
    pub earnings_id: Uuid,
    pub user_id: Uuid,
    pub company_id: Uuid,
    pub earnings_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub entry_mode: EntryMode,
    #[schema(value_type = String, example = "120.00")]
    pub cash_amount: Decimal,
    #[schema(value_type = String, example = "80.00")]
    pub card_amount: Decimal,
    #[schema(value_type = String, example = "0.00")]
    pub other_amount: Decimal,
    #[schema(value_type = String, example = "15.00")]
    pub tips_amount: Decimal,
    #[schema(value_type = String, example = "200.00")]
    pub total_amount: Decimal,
    pub transaction_count: i64,
    pub notes: Option<String>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DayDetail {
    #[serde(flatten)]
    pub day: DailyEarnings,
    pub transactions: Vec<TransactionDetail>,
}

/// Partial write of a day. `None` fields keep their stored value (or the
/// column default on insert).
#[derive(Debug, Clone, Default)]
pub struct DayChanges {
    pub entry_mode: Option<EntryMode>,
    pub cash_amount: Option<Decimal>,
    pub card_amount: Option<Decimal>,
    pub other_amount: Option<Decimal>,
    pub tips_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl DayChanges {
    pub fn validate(&self) -> Result<(), AppError> {
        let amounts = [
            ("cash_amount", self.cash_amount),
            ("card_amount", self.card_amount),
            ("other_amount", self.other_amount),
            ("tips_amount", self.tips_amount),
        ];

        for (field, value) in amounts {
            if let Some(v) = value {
                ensure_amount(field, v)?;
            }
        }

        Ok(())
    }

    fn has_amounts(&self) -> bool {
        self.cash_amount.is_some()
            || self.card_amount.is_some()
            || self.other_amount.is_some()
            || self.tips_amount.is_some()
    }

    /// A detailed day's amounts are derived from its transactions and cannot
    /// be written directly. `mode` is the mode the day has after the write.
    pub fn check_mode(&self, mode: EntryMode) -> Result<(), AppError> {
        if mode == EntryMode::Detailed && self.has_amounts() {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "A detailed day's amounts come from its transactions"
            )));
        }
        Ok(())
    }
}

/// Earnings cannot be recorded for days that have not happened yet.
pub fn ensure_not_future(date: NaiveDate, today: NaiveDate) -> Result<(), AppError> {
    if date > today {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Cannot record earnings for a future date"
        )));
    }
    Ok(())
}

pub fn ensure_amount(field: &'static str, value: Decimal) -> Result<(), AppError> {
    checked_money(field, value)?;
    Ok(())
}

/// Monetary values are kept at two decimal places.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp(2)
}

/// Largest value a NUMERIC(12,2) money column holds.
pub fn max_amount() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Round to cents and check the result fits a money column.
pub fn checked_money(field: &'static str, value: Decimal) -> Result<Decimal, DraftError> {
    let value = round_money(value);
    if value.is_sign_negative() && !value.is_zero() {
        return Err(DraftError::NegativeAmount(field));
    }
    if value > max_amount() {
        return Err(DraftError::AmountTooLarge(field));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn today_is_not_in_the_future() {
        let today = date("2025-03-10");
        assert!(ensure_not_future(today, today).is_ok());
        assert!(ensure_not_future(date("2025-03-09"), today).is_ok());
        assert!(matches!(
            ensure_not_future(date("2025-03-11"), today),
            Err(AppError::BadRequest(_))
        ));
    }

    #[test]
    fn negative_amounts_are_rejected() {
        let changes = DayChanges {
            cash_amount: Some(Decimal::new(10, 0)),
            tips_amount: Some(Decimal::new(-1, 2)),
            ..Default::default()
        };
        assert!(changes.validate().is_err());

        let changes = DayChanges {
            card_amount: Some(Decimal::ZERO),
            ..Default::default()
        };
        assert!(changes.validate().is_ok());
    }

    #[test]
    fn amounts_beyond_the_column_range_are_rejected() {
        let changes = DayChanges {
            cash_amount: Some("99999999999.00".parse().unwrap()),
            ..Default::default()
        };
        assert!(matches!(changes.validate(), Err(AppError::BadRequest(_))));

        let changes = DayChanges {
            card_amount: Some(max_amount()),
            ..Default::default()
        };
        assert!(changes.validate().is_ok());

        assert_eq!(
            checked_money("tips_amount", Decimal::MAX),
            Err(DraftError::AmountTooLarge("tips_amount"))
        );
    }

    #[test]
    fn detailed_days_take_no_direct_amounts() {
        let amounts = DayChanges {
            cash_amount: Some(Decimal::new(50, 0)),
            ..Default::default()
        };
        assert!(amounts.check_mode(EntryMode::Summary).is_ok());
        assert!(matches!(
            amounts.check_mode(EntryMode::Detailed),
            Err(AppError::BadRequest(_))
        ));

        let notes_only = DayChanges {
            notes: Some("quiet day".to_string()),
            ..Default::default()
        };
        assert!(notes_only.check_mode(EntryMode::Detailed).is_ok());
    }

    #[test]
    fn entry_mode_codes() {
        assert_eq!(
            EntryMode::try_from("detailed".to_string()),
            Ok(EntryMode::Detailed)
        );
        assert_eq!(EntryMode::Summary.as_str(), "summary");
        assert!(EntryMode::try_from("weekly".to_string()).is_err());
    }
}
