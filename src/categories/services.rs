use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{repo, repo_types::Category};
use crate::error::AppError;

pub(crate) fn validate_category_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Category name is required"));
    }
    if !(2..=255).contains(&name.chars().count()) {
        return Err(AppError::validation(
            "Category name must be between 2 and 255 characters",
        ));
    }
    Ok(name.to_string())
}

/// Users never own default categories.
fn reject_default_flag(is_default: Option<bool>) -> Result<(), AppError> {
    if is_default == Some(true) {
        return Err(AppError::Forbidden(
            "Default categories are managed by the system".into(),
        ));
    }
    Ok(())
}

/// Decides whether `user_id` may rename or delete a category it can see.
pub(crate) fn ensure_mutable_by(category: &Category, user_id: Uuid) -> Result<(), AppError> {
    if category.is_default {
        return Err(AppError::Forbidden(
            "Default categories cannot be modified".into(),
        ));
    }
    if category.user_id != Some(user_id) {
        return Err(AppError::not_found("Category not found"));
    }
    Ok(())
}

pub async fn list_visible(db: &PgPool, user_id: Uuid) -> Result<Vec<Category>, AppError> {
    Ok(repo::list_visible(db, user_id).await?)
}

pub async fn create(
    db: &PgPool,
    user_id: Uuid,
    name: &str,
    is_default: Option<bool>,
) -> Result<Category, AppError> {
    let name = validate_category_name(name)?;
    reject_default_flag(is_default)?;

    if repo::name_taken(db, user_id, &name, None).await? {
        warn!(%user_id, name = %name, "duplicate category name");
        return Err(AppError::Conflict("Category already exists".into()));
    }

    let category = repo::insert(db, user_id, &name)
        .await
        .map_err(duplicate_as_conflict)?;
    info!(%user_id, category_id = %category.id, "category created");
    Ok(category)
}

pub async fn rename(
    db: &PgPool,
    user_id: Uuid,
    category_id: Uuid,
    name: &str,
    is_default: Option<bool>,
) -> Result<Category, AppError> {
    let name = validate_category_name(name)?;
    reject_default_flag(is_default)?;

    let existing = repo::find_visible(db, user_id, category_id)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    ensure_mutable_by(&existing, user_id)?;

    if repo::name_taken(db, user_id, &name, Some(category_id)).await? {
        return Err(AppError::Conflict("Category already exists".into()));
    }

    let category = repo::rename(db, user_id, category_id, &name)
        .await
        .map_err(duplicate_as_conflict)?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    info!(%user_id, %category_id, "category renamed");
    Ok(category)
}

pub async fn delete(db: &PgPool, user_id: Uuid, category_id: Uuid) -> Result<(), AppError> {
    let existing = repo::find_visible(db, user_id, category_id)
        .await?
        .ok_or_else(|| AppError::not_found("Category not found"))?;
    ensure_mutable_by(&existing, user_id)?;

    if !repo::delete(db, user_id, category_id).await? {
        return Err(AppError::not_found("Category not found"));
    }
    info!(%user_id, %category_id, "category deleted");
    Ok(())
}

fn duplicate_as_conflict(e: anyhow::Error) -> AppError {
    match AppError::from(e) {
        AppError::Conflict(_) => AppError::Conflict("Category already exists".into()),
        other => other,
    }
}
