use chrono::NaiveDate;
use serde::Deserialize;
use utoipa::IntoParams;
use uuid::Uuid;

use crate::models::StatsPeriod;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct StatsQuery {
    /// day, week, month (default), year or all
    #[param(value_type = Option<String>, example = "month")]
    pub period: Option<StatsPeriod>,
    /// Anchor date of the period; defaults to today (UTC)
    pub date: Option<NaiveDate>,
    /// Another member (owners only); daily series only
    pub user_id: Option<Uuid>,
}
