//! Reporting periods and aggregated statistics.

use chrono::{Datelike, Duration, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

use super::earnings::round_money;
use super::membership::Role;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum StatsPeriod {
    Day,
    Week,
    #[default]
    Month,
    Year,
    All,
}

/// Inclusive `(from, to)`; `None` leaves that side open.
pub type DateBounds = (Option<NaiveDate>, Option<NaiveDate>);

impl StatsPeriod {
    /// Inclusive date bounds of the period containing `anchor`. `All` is
    /// unbounded on both sides. Weeks start on Monday.
    ///
    /// Returns `None` when the period runs past the calendar's range.
    pub fn bounds(&self, anchor: NaiveDate) -> Option<DateBounds> {
        match self {
            StatsPeriod::Day => Some((Some(anchor), Some(anchor))),
            StatsPeriod::Week => {
                let offset = i64::from(anchor.weekday().num_days_from_monday());
                let start = anchor.checked_sub_signed(Duration::days(offset))?;
                let end = start.checked_add_signed(Duration::days(6))?;
                Some((Some(start), Some(end)))
            }
            StatsPeriod::Month => {
                let start = anchor.with_day(1)?;
                let (year, month) = if start.month() == 12 {
                    (start.year() + 1, 1)
                } else {
                    (start.year(), start.month() + 1)
                };
                let end = NaiveDate::from_ymd_opt(year, month, 1)?.pred_opt()?;
                Some((Some(start), Some(end)))
            }
            StatsPeriod::Year => Some((
                Some(NaiveDate::from_ymd_opt(anchor.year(), 1, 1)?),
                Some(NaiveDate::from_ymd_opt(anchor.year(), 12, 31)?),
            )),
            StatsPeriod::All => Some((None, None)),
        }
    }
}

/// Sums over `daily_earnings_complete` for some set of days.
#[derive(Debug, Clone, Default, PartialEq, FromRow, Serialize, ToSchema)]
pub struct EarningsTotals {
    #[schema(value_type = String)]
    pub cash_amount: Decimal,
    #[schema(value_type = String)]
    pub card_amount: Decimal,
    #[schema(value_type = String)]
    pub other_amount: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub tips_amount: Decimal,
    pub days_worked: i64,
    pub transaction_count: i64,
}

impl EarningsTotals {
    pub fn average_per_day(&self) -> Decimal {
        if self.days_worked == 0 {
            return Decimal::ZERO;
        }
        round_money(self.total_amount / Decimal::from(self.days_worked))
    }
}

/// Commission on revenue plus tips, which go to the employee in full.
pub fn estimated_pay(total: Decimal, commission_rate: Decimal, tips: Decimal) -> Decimal {
    round_money(total * commission_rate / Decimal::ONE_HUNDRED + tips)
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct MyStats {
    pub period: StatsPeriod,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    #[serde(flatten)]
    pub totals: EarningsTotals,
    #[schema(value_type = String)]
    pub average_per_day: Decimal,
    #[schema(value_type = String)]
    pub commission_rate: Decimal,
    #[schema(value_type = String)]
    pub estimated_pay: Decimal,
}

impl MyStats {
    pub fn new(
        period: StatsPeriod,
        bounds: DateBounds,
        totals: EarningsTotals,
        commission_rate: Decimal,
    ) -> Self {
        Self {
            period,
            from: bounds.0,
            to: bounds.1,
            average_per_day: totals.average_per_day(),
            estimated_pay: estimated_pay(totals.total_amount, commission_rate, totals.tips_amount),
            commission_rate,
            totals,
        }
    }
}

/// Per-member aggregate row of the company report.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct EmployeeTotals {
    pub user_id: Uuid,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role_code: Role,
    #[schema(value_type = String)]
    pub commission_rate: Decimal,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: EarningsTotals,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct EmployeeStats {
    #[serde(flatten)]
    pub employee: EmployeeTotals,
    #[schema(value_type = String)]
    pub estimated_pay: Decimal,
}

impl From<EmployeeTotals> for EmployeeStats {
    fn from(employee: EmployeeTotals) -> Self {
        let estimated_pay = estimated_pay(
            employee.totals.total_amount,
            employee.commission_rate,
            employee.totals.tips_amount,
        );
        Self {
            employee,
            estimated_pay,
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct CompanyStats {
    pub period: StatsPeriod,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub totals: EarningsTotals,
    #[schema(value_type = String)]
    pub total_estimated_pay: Decimal,
    pub employees: Vec<EmployeeStats>,
}

impl CompanyStats {
    pub fn new(
        period: StatsPeriod,
        bounds: DateBounds,
        employees: Vec<EmployeeTotals>,
    ) -> Self {
        let employees: Vec<EmployeeStats> = employees.into_iter().map(Into::into).collect();

        let mut totals = EarningsTotals::default();
        for e in &employees {
            let t = &e.employee.totals;
            totals.cash_amount += t.cash_amount;
            totals.card_amount += t.card_amount;
            totals.other_amount += t.other_amount;
            totals.total_amount += t.total_amount;
            totals.tips_amount += t.tips_amount;
            totals.days_worked += t.days_worked;
            totals.transaction_count += t.transaction_count;
        }
        let total_estimated_pay = employees.iter().map(|e| e.estimated_pay).sum();

        Self {
            period,
            from: bounds.0,
            to: bounds.1,
            totals,
            total_estimated_pay,
            employees,
        }
    }
}

/// One point of the daily chart series.
#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct DailyPoint {
    pub earnings_date: NaiveDate,
    #[schema(value_type = String)]
    pub cash_amount: Decimal,
    #[schema(value_type = String)]
    pub card_amount: Decimal,
    #[schema(value_type = String)]
    pub other_amount: Decimal,
    #[schema(value_type = String)]
    pub total_amount: Decimal,
    #[schema(value_type = String)]
    pub tips_amount: Decimal,
    pub transaction_count: i64,
}

#[derive(Debug, Clone, FromRow, Serialize, ToSchema)]
pub struct ServicePopularity {
    pub service_id: Uuid,
    pub service_name: String,
    pub times_sold: i64,
    #[schema(value_type = String)]
    pub revenue: Decimal,
}
