use rust_decimal::Decimal;
use sqlx::FromRow;
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

#[derive(Debug, Clone, FromRow)]
pub struct ExpenseRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub expense_date: Date,
    pub expense_time: Time,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

/// One row of the expense/category join, keyed by the expense it belongs to.
#[derive(Debug, Clone, FromRow)]
pub struct ExpenseCategoryRow {
    pub expense_id: Uuid,
    pub id: Uuid,
    pub name: String,
    pub is_default: bool,
}
