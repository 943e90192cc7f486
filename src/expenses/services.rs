use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use sqlx::PgPool;
use time::{Date, Time};
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{ExpenseRequest, ExpenseView},
    filters::ExpenseFilter,
    format::{parse_date, parse_time},
    repo::{self, ExpenseFields},
    repo_types::{ExpenseCategoryRow, ExpenseRow},
};
use crate::{
    categories::{self, repo_types::CategoryRef},
    error::AppError,
};

/// Exclusive upper bound imposed by `NUMERIC(12, 2)`.
fn max_amount() -> Decimal {
    Decimal::new(10_000_000_000, 0)
}

/// An expense request that passed every check that needs no datastore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidExpense {
    pub title: String,
    pub description: Option<String>,
    pub amount: Decimal,
    pub date: Date,
    pub time: Time,
    /// De-duplicated, first occurrence wins the position.
    pub category_ids: Vec<Uuid>,
}

impl ValidExpense {
    fn fields(&self) -> ExpenseFields<'_> {
        ExpenseFields {
            title: &self.title,
            description: self.description.as_deref(),
            amount: self.amount,
            date: self.date,
            time: self.time,
        }
    }
}

pub(crate) fn dedup_ids(ids: &[Uuid]) -> Vec<Uuid> {
    let mut seen = HashSet::with_capacity(ids.len());
    ids.iter().copied().filter(|id| seen.insert(*id)).collect()
}

pub fn validate_expense(req: &ExpenseRequest) -> Result<ValidExpense, AppError> {
    let title = req.title.trim();
    if title.is_empty() {
        return Err(AppError::validation("Title is required"));
    }
    if title.chars().count() > 255 {
        return Err(AppError::validation("Title must be at most 255 characters"));
    }
    if req.amount <= Decimal::ZERO {
        return Err(AppError::validation("Amount must be greater than 0"));
    }
    if req.amount.normalize().scale() > 2 {
        return Err(AppError::validation(
            "Amount must have at most two decimal places",
        ));
    }
    if req.amount >= max_amount() {
        return Err(AppError::validation("Amount is too large"));
    }
    if req.categories.is_empty() {
        return Err(AppError::validation("At least one category is required"));
    }
    if req.expense_date.trim().is_empty() {
        return Err(AppError::validation("Expense date is required"));
    }
    if req.expense_time.trim().is_empty() {
        return Err(AppError::validation("Expense time is required"));
    }
    let date = parse_date(&req.expense_date)?;
    let time = parse_time(&req.expense_time)?;

    let description = req
        .description
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Ok(ValidExpense {
        title: title.to_string(),
        description,
        amount: req.amount,
        date,
        time,
        category_ids: dedup_ids(&req.categories),
    })
}

/// Groups join rows by expense and attaches them, keeping the expense order.
pub(crate) fn attach_categories(
    rows: Vec<ExpenseRow>,
    links: Vec<ExpenseCategoryRow>,
) -> Vec<ExpenseView> {
    let mut by_expense: HashMap<Uuid, Vec<CategoryRef>> = HashMap::new();
    for link in links {
        by_expense.entry(link.expense_id).or_default().push(CategoryRef {
            id: link.id,
            name: link.name,
            is_default: link.is_default,
        });
    }
    rows.into_iter()
        .map(|row| {
            let cats = by_expense.remove(&row.id).unwrap_or_default();
            ExpenseView::new(row, cats)
        })
        .collect()
}

async fn ensure_categories_visible(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    user_id: Uuid,
    ids: &[Uuid],
) -> Result<(), AppError> {
    let visible = categories::repo::count_visible_tx(tx, user_id, ids).await?;
    if visible != ids.len() as i64 {
        warn!(%user_id, requested = ids.len(), visible, "unknown category in expense");
        return Err(AppError::validation("One or more categories do not exist"));
    }
    Ok(())
}

/// Writes the expense and one link per category in a single transaction.
pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    req: &ExpenseRequest,
) -> Result<ExpenseView, AppError> {
    let valid = validate_expense(req)?;

    let mut tx = db.begin().await?;
    ensure_categories_visible(&mut tx, user_id, &valid.category_ids).await?;
    let row = repo::insert_tx(&mut tx, user_id, &valid.fields()).await?;
    repo::insert_links_tx(&mut tx, row.id, &valid.category_ids).await?;
    let links = repo::categories_for_tx(&mut tx, row.id).await?;
    tx.commit().await?;

    info!(%user_id, expense_id = %row.id, categories = valid.category_ids.len(), "expense created");
    Ok(attach_categories(vec![row], links).remove(0))
}

/// Replaces every field and the full set of category links.
pub async fn update(
    db: &PgPool,
    user_id: Uuid,
    expense_id: Uuid,
    req: &ExpenseRequest,
) -> Result<ExpenseView, AppError> {
    let valid = validate_expense(req)?;

    let mut tx = db.begin().await?;
    if !repo::lock_for_user_tx(&mut tx, expense_id, user_id).await? {
        return Err(AppError::not_found("Expense not found"));
    }
    ensure_categories_visible(&mut tx, user_id, &valid.category_ids).await?;
    let row = repo::update_tx(&mut tx, expense_id, user_id, &valid.fields()).await?;
    repo::delete_links_tx(&mut tx, expense_id).await?;
    repo::insert_links_tx(&mut tx, expense_id, &valid.category_ids).await?;
    let links = repo::categories_for_tx(&mut tx, expense_id).await?;
    tx.commit().await?;

    info!(%user_id, %expense_id, "expense updated");
    Ok(attach_categories(vec![row], links).remove(0))
}

pub async fn exists_for_user(db: &PgPool, expense_id: Uuid, user_id: Uuid) -> Result<bool, AppError> {
    Ok(repo::exists_for_user(db, expense_id, user_id).await?)
}

pub async fn delete(db: &PgPool, user_id: Uuid, expense_id: Uuid) -> Result<(), AppError> {
    if !exists_for_user(db, expense_id, user_id).await? {
        return Err(AppError::not_found("Expense not found"));
    }
    if !repo::delete_for_user(db, expense_id, user_id).await? {
        return Err(AppError::not_found("Expense not found"));
    }
    info!(%user_id, %expense_id, "expense deleted");
    Ok(())
}

pub async fn get(db: &PgPool, user_id: Uuid, expense_id: Uuid) -> Result<ExpenseView, AppError> {
    let row = repo::find_for_user(db, expense_id, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("Expense not found"))?;
    let links = repo::categories_for(db, &[row.id]).await?;
    Ok(attach_categories(vec![row], links).remove(0))
}

/// Two round trips regardless of result size: the filtered expenses, then
/// the categories of all of them at once.
pub async fn list_filtered(
    db: &PgPool,
    user_id: Uuid,
    filter: &ExpenseFilter,
) -> Result<Vec<ExpenseView>, AppError> {
    filter.validate()?;
    let rows = repo::list_filtered(db, user_id, filter).await?;
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
    let links = repo::categories_for(db, &ids).await?;
    Ok(attach_categories(rows, links))
}
