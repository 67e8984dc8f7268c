use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

use crate::models::{round_money, DayChanges, EntryMode};

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct ListEarningsQuery {
    /// First day, inclusive
    pub from: Option<NaiveDate>,
    /// Last day, inclusive
    pub to: Option<NaiveDate>,
    /// Another member's days (owners only)
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct DayQuery {
    /// Another member's day (owners only)
    pub user_id: Option<Uuid>,
}

/// Omitted fields keep their stored value.
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpsertDayRequest {
    pub entry_mode: Option<EntryMode>,
    #[schema(value_type = Option<String>, example = "120.00")]
    pub cash_amount: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "80.00")]
    pub card_amount: Option<Decimal>,
    #[schema(value_type = Option<String>)]
    pub other_amount: Option<Decimal>,
    #[schema(value_type = Option<String>, example = "15.00")]
    pub tips_amount: Option<Decimal>,
    pub notes: Option<String>,
}

impl From<UpsertDayRequest> for DayChanges {
    fn from(req: UpsertDayRequest) -> Self {
        Self {
            entry_mode: req.entry_mode,
            cash_amount: req.cash_amount.map(round_money),
            card_amount: req.card_amount.map(round_money),
            other_amount: req.other_amount.map(round_money),
            tips_amount: req.tips_amount.map(round_money),
            notes: req.notes,
        }
    }
}
