use anyhow::Context;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::repo_types::Category;

const CATEGORY_COLUMNS: &str = "id, name, user_id, is_default, created_at, updated_at";

/// Defaults first, then the caller's own categories, each alphabetical.
pub async fn list_visible(db: &PgPool, user_id: Uuid) -> anyhow::Result<Vec<Category>> {
    let rows = sqlx::query_as::<_, Category>(&format!(
        r#"
        SELECT {CATEGORY_COLUMNS}
          FROM categories
         WHERE is_default OR user_id = $1
         ORDER BY is_default DESC, lower(name) ASC, name ASC
        "#
    ))
    .bind(user_id)
    .fetch_all(db)
    .await
    .context("list visible categories")?;
    Ok(rows)
}

/// Finds a category the user can see: a default or one of their own.
pub async fn find_visible(
    db: &PgPool,
    user_id: Uuid,
    category_id: Uuid,
) -> anyhow::Result<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(&format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories \
         WHERE id = $1 AND (is_default OR user_id = $2)"
    ))
    .bind(category_id)
    .bind(user_id)
    .fetch_optional(db)
    .await
    .context("find category")?;
    Ok(row)
}

/// Case-insensitive name check across the user's categories and all defaults.
pub async fn name_taken(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
    exclude_id: Option<Uuid>,
) -> anyhow::Result<bool> {
    let taken: bool = sqlx::query_scalar(
        r#"
        SELECT EXISTS (
            SELECT 1
              FROM categories
             WHERE lower(name) = lower($1)
               AND (user_id = $2 OR is_default)
               AND ($3::uuid IS NULL OR id <> $3)
        )
        "#,
    )
    .bind(name)
    .bind(user_id)
    .bind(exclude_id)
    .fetch_one(db)
    .await
    .context("check category name")?;
    Ok(taken)
}

pub async fn insert(db: &PgPool, user_id: Uuid, name: &str) -> anyhow::Result<Category> {
    let row = sqlx::query_as::<_, Category>(&format!(
        "INSERT INTO categories (name, user_id, is_default) VALUES ($1, $2, FALSE) \
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(name)
    .bind(user_id)
    .fetch_one(db)
    .await
    .context("insert category")?;
    Ok(row)
}

pub async fn rename(
    db: &PgPool,
    user_id: Uuid,
    category_id: Uuid,
    name: &str,
) -> anyhow::Result<Option<Category>> {
    let row = sqlx::query_as::<_, Category>(&format!(
        "UPDATE categories SET name = $3, updated_at = now() \
         WHERE id = $1 AND user_id = $2 AND NOT is_default \
         RETURNING {CATEGORY_COLUMNS}"
    ))
    .bind(category_id)
    .bind(user_id)
    .bind(name)
    .fetch_optional(db)
    .await
    .context("rename category")?;
    Ok(row)
}

/// Deletes an owned category; its expense links go with it via `ON DELETE CASCADE`.
pub async fn delete(db: &PgPool, user_id: Uuid, category_id: Uuid) -> anyhow::Result<bool> {
    let res = sqlx::query(
        "DELETE FROM categories WHERE id = $1 AND user_id = $2 AND NOT is_default",
    )
    .bind(category_id)
    .bind(user_id)
    .execute(db)
    .await
    .context("delete category")?;
    Ok(res.rows_affected() == 1)
}

/// How many of `ids` (already de-duplicated) the user may attach to an expense.
pub async fn count_visible_tx(
    tx: &mut Transaction<'_, Postgres>,
    user_id: Uuid,
    ids: &[Uuid],
) -> anyhow::Result<i64> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM categories WHERE id = ANY($1) AND (is_default OR user_id = $2)",
    )
    .bind(ids)
    .bind(user_id)
    .fetch_one(&mut **tx)
    .await
    .context("count visible categories")?;
    Ok(count)
}
