use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use time::{Date, OffsetDateTime, Time};
use uuid::Uuid;

use super::{
    format::{serde_date, serde_time},
    repo_types::ExpenseRow,
};
use crate::categories::repo_types::CategoryRef;

/// Body of both create and update; update replaces every field.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpenseRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(alias = "date")]
    pub expense_date: String,
    #[serde(alias = "time")]
    pub expense_time: String,
    #[serde(alias = "category_ids")]
    pub categories: Vec<Uuid>,
}

/// Raw list filters as they arrive on the query string.
#[derive(Debug, Default, Deserialize)]
pub struct ExpenseFilterQuery {
    pub category_id: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub min_amount: Option<String>,
    pub max_amount: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExpenseView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub amount: Decimal,
    #[serde(serialize_with = "serde_date::serialize")]
    pub expense_date: Date,
    #[serde(serialize_with = "serde_time::serialize")]
    pub expense_time: Time,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
    pub categories: Vec<CategoryRef>,
}

impl ExpenseView {
    pub fn new(row: ExpenseRow, categories: Vec<CategoryRef>) -> Self {
        Self {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            description: row.description,
            amount: row.amount,
            expense_date: row.expense_date,
            expense_time: row.expense_time,
            created_at: row.created_at,
            updated_at: row.updated_at,
            categories,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ExpenseResponse {
    pub message: String,
    pub expense: ExpenseView,
}

#[derive(Debug, Serialize)]
pub struct ExpenseListResponse {
    pub message: String,
    pub count: usize,
    pub expenses: Vec<ExpenseView>,
}
