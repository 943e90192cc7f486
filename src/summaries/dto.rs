use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::Date;

use super::{
    pagination::PageQuery,
    repo_types::{Bucket, MonthlyRow, RecentExpense},
};
use crate::expenses::format::serde_date;

#[derive(Debug, Default, Deserialize)]
pub struct WeeklyQuery {
    /// `YYYY-MM`
    pub month: Option<String>,
    #[serde(flatten)]
    pub page: PageQuery,
}

/// A Monday-to-Sunday calendar week in the dashboard's trailing series.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WeekTotal {
    #[serde(serialize_with = "serde_date::serialize")]
    pub start_date: Date,
    #[serde(serialize_with = "serde_date::serialize")]
    pub end_date: Date,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayTotal {
    #[serde(serialize_with = "serde_date::serialize")]
    pub date: Date,
    pub total: Decimal,
}

#[derive(Debug, Serialize)]
pub struct DashboardSnapshot {
    pub all_time: Bucket,
    pub this_month: Bucket,
    pub this_week: Bucket,
    pub today: Bucket,
    /// Newest month first.
    pub monthly_totals: Vec<MonthlyRow>,
    /// Oldest week first; the last entry is the current week.
    pub last_four_weeks: Vec<WeekTotal>,
    /// Oldest day first; the last entry is today.
    pub last_seven_days: Vec<DayTotal>,
    pub recent_expenses: Vec<RecentExpense>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub message: String,
    pub dashboard: DashboardSnapshot,
}
