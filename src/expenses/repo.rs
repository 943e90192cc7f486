use anyhow::Context;
use rust_decimal::Decimal;
use sqlx::{PgPool, Postgres, Transaction};
use time::{Date, Time};
use uuid::Uuid;

use super::{
    filters::ExpenseFilter,
    repo_types::{ExpenseCategoryRow, ExpenseRow},
};

const EXPENSE_COLUMNS: &str = "id, user_id, title, description, amount, expense_date, \
                               expense_time, created_at, updated_at";

/// Column values written on create and update.
#[derive(Debug, Clone)]
pub struct ExpenseFields<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub amount: Decimal,
    pub date: Date,
    pub time: Time,
}

pub async fn insert_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    fields: &ExpenseFields<'_>,
) -> anyhow::Result<ExpenseRow> {
    let row = sqlx::query_as::<_, ExpenseRow>(&format!(
        r#"
        INSERT INTO expenses (user_id, title, description, amount, expense_date, expense_time)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING {EXPENSE_COLUMNS}
        "#
    ))
    .bind(user_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.amount)
    .bind(fields.date)
    .bind(fields.time)
    .fetch_one(&mut **tx)
    .await
    .context("insert expense")?;
    Ok(row)
}

/// Locks the caller's expense row for the rest of the transaction.
pub async fn lock_for_user_tx(
    tx: &mut Transaction<'_, Postgres>,
    expense_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<bool> {
    let found: Option<Uuid> =
        sqlx::query_scalar("SELECT id FROM expenses WHERE id = $1 AND user_id = $2 FOR UPDATE")
            .bind(expense_id)
            .bind(user_id)
            .fetch_optional(&mut **tx)
            .await
            .context("lock expense")?;
    Ok(found.is_some())
}

pub async fn update_tx(
    tx: &mut Transaction<'_, Postgres>,
    expense_id: Uuid,
    user_id: Uuid,
    fields: &ExpenseFields<'_>,
) -> anyhow::Result<ExpenseRow> {
    let row = sqlx::query_as::<_, ExpenseRow>(&format!(
        r#"
        UPDATE expenses
           SET title = $3, description = $4, amount = $5,
               expense_date = $6, expense_time = $7, updated_at = now()
         WHERE id = $1 AND user_id = $2
        RETURNING {EXPENSE_COLUMNS}
        "#
    ))
    .bind(expense_id)
    .bind(user_id)
    .bind(fields.title)
    .bind(fields.description)
    .bind(fields.amount)
    .bind(fields.date)
    .bind(fields.time)
    .fetch_one(&mut **tx)
    .await
    .context("update expense")?;
    Ok(row)
}

pub async fn delete_links_tx(
    tx: &mut Transaction<'_, Postgres>,
    expense_id: Uuid,
) -> anyhow::Result<()> {
    sqlx::query("DELETE FROM expense_categories WHERE expense_id = $1")
        .bind(expense_id)
        .execute(&mut **tx)
        .await
        .context("delete expense links")?;
    Ok(())
}

/// One insert per category, issued in order after the expense row exists.
pub async fn insert_links_tx(
    tx: &mut Transaction<'_, Postgres>,
    expense_id: Uuid,
    category_ids: &[Uuid],
) -> anyhow::Result<()> {
    for category_id in category_ids {
        sqlx::query("INSERT INTO expense_categories (expense_id, category_id) VALUES ($1, $2)")
            .bind(expense_id)
            .bind(category_id)
            .execute(&mut **tx)
            .await
            .with_context(|| format!("link category {category_id}"))?;
    }
    Ok(())
}

pub async fn exists_for_user(db: &PgPool, expense_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let exists: bool = sqlx::query_scalar(
        "SELECT EXISTS (SELECT 1 FROM expenses WHERE id = $1 AND user_id = $2)",
    )
    .bind(expense_id)
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("check expense ownership")?;
    Ok(exists)
}

pub async fn find_for_user(
    db: &PgPool,
    expense_id: Uuid,
    user_id: Uuid,
) -> anyhow::Result<Option<ExpenseRow>> {
    let row = sqlx::query_as::<_, ExpenseRow>(&format!(
        "SELECT {EXPENSE_COLUMNS} FROM expenses WHERE id = $1 AND user_id = $2"
    ))
    .bind(expense_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find expense")?;
    Ok(row)
}

/// Removes the expense; its links go with it via `ON DELETE CASCADE`.
pub async fn delete_for_user(db: &PgPool, expense_id: Uuid, user_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query("DELETE FROM expenses WHERE id = $1 AND user_id = $2")
        .bind(expense_id)
        .bind(user_id)
        .execute(db)
        .await
        .context("delete expense")?;
    Ok(res.rows_affected() == 1)
}

pub async fn list_filtered(
    db: &PgPool,
    user_id: Uuid,
    filter: &ExpenseFilter,
) -> anyhow::Result<Vec<ExpenseRow>> {
    let mut qb = filter.list_query(user_id);
    let rows = qb
        .build_query_as::<ExpenseRow>()
        .fetch_all(db)
        .await
        .context("list expenses")?;
    Ok(rows)
}

const CATEGORIES_FOR_EXPENSES: &str = r#"
    SELECT ec.expense_id, c.id, c.name, c.is_default
      FROM expense_categories ec
      JOIN categories c ON c.id = ec.category_id
     WHERE ec.expense_id = ANY($1)
     ORDER BY lower(c.name) ASC, c.name ASC
"#;

/// Categories for a whole batch of expenses in one round trip.
pub async fn categories_for(
    db: &PgPool,
    expense_ids: &[Uuid],
) -> anyhow::Result<Vec<ExpenseCategoryRow>> {
    if expense_ids.is_empty() {
        return Ok(Vec::new());
    }
    let rows = sqlx::query_as::<_, ExpenseCategoryRow>(CATEGORIES_FOR_EXPENSES)
        .bind(expense_ids)
        .fetch_all(db)
        .await
        .context("load expense categories")?;
    Ok(rows)
}

pub async fn categories_for_tx(
    tx: &mut Transaction<'_, Postgres>,
    expense_id: Uuid,
) -> anyhow::Result<Vec<ExpenseCategoryRow>> {
    let rows = sqlx::query_as::<_, ExpenseCategoryRow>(CATEGORIES_FOR_EXPENSES)
        .bind(vec![expense_id])
        .fetch_all(&mut **tx)
        .await
        .context("load expense categories")?;
    Ok(rows)
}
