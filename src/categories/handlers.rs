use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, put},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{CategoryListResponse, CategoryRequest, CategoryResponse},
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{AppJson, AppPath},
    response::MessageResponse,
    state::AppState,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            put(update_category).delete(delete_category),
        )
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<CategoryListResponse>, AppError> {
    let categories = services::list_visible(&state.db, user_id).await?;
    Ok(Json(CategoryListResponse {
        message: "Categories retrieved successfully".into(),
        categories,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_category(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppJson(payload): AppJson<CategoryRequest>,
) -> Result<(StatusCode, Json<CategoryResponse>), AppError> {
    let category =
        services::create(&state.db, user_id, &payload.name, payload.is_default).await?;
    Ok((
        StatusCode::CREATED,
        Json(CategoryResponse {
            message: "Category created successfully".into(),
            category,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn update_category(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<CategoryRequest>,
) -> Result<Json<CategoryResponse>, AppError> {
    let category =
        services::rename(&state.db, user_id, id, &payload.name, payload.is_default).await?;
    Ok(Json(CategoryResponse {
        message: "Category updated successfully".into(),
        category,
    }))
}

#[instrument(skip(state))]
pub async fn delete_category(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete(&state.db, user_id, id).await?;
    Ok(Json(MessageResponse::new("Category deleted successfully")))
}
