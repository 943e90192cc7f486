use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use time::{Date, Time};

use crate::expenses::format::{serde_date, serde_time};

/// Count and sum of one bucket; the sum is `0` for an empty bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Bucket {
    pub count: i64,
    pub total: Decimal,
}

#[derive(Debug, Clone, FromRow)]
pub struct TotalsRow {
    pub all_count: i64,
    pub all_total: Decimal,
    pub month_count: i64,
    pub month_total: Decimal,
    pub week_count: i64,
    pub week_total: Decimal,
    pub today_count: i64,
    pub today_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct MonthlyRow {
    /// `YYYY-MM`
    pub month: String,
    /// `Mon YYYY`
    pub label: String,
    pub count: i64,
    pub total: Decimal,
}

/// One ISO week within a month. The dates are the earliest and latest
/// expense dates seen in the bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct WeeklyRow {
    pub iso_year: i32,
    pub week: i32,
    #[serde(serialize_with = "serde_date::serialize")]
    pub start_date: Date,
    #[serde(serialize_with = "serde_date::serialize")]
    pub end_date: Date,
    pub count: i64,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, FromRow)]
pub struct DailyRow {
    #[serde(serialize_with = "serde_date::serialize")]
    pub date: Date,
    pub count: i64,
    pub total: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecentExpense {
    pub title: String,
    pub amount: Decimal,
    #[serde(serialize_with = "serde_date::serialize")]
    pub expense_date: Date,
    #[serde(serialize_with = "serde_time::serialize")]
    pub expense_time: Time,
}
