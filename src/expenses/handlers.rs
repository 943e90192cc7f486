use axum::{
    extract::State,
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::{
    dto::{ExpenseFilterQuery, ExpenseListResponse, ExpenseRequest, ExpenseResponse},
    filters::ExpenseFilter,
    services,
};
use crate::{
    auth::AuthUser,
    error::AppError,
    extract::{AppJson, AppPath, AppQuery},
    response::MessageResponse,
    state::AppState,
};

pub fn expense_routes() -> Router<AppState> {
    Router::new()
        .route("/expenses", get(list_expenses).post(create_expense))
        .route(
            "/expenses/:id",
            get(get_expense).put(update_expense).delete(delete_expense),
        )
}

#[instrument(skip(state))]
pub async fn list_expenses(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppQuery(query): AppQuery<ExpenseFilterQuery>,
) -> Result<Json<ExpenseListResponse>, AppError> {
    let filter = ExpenseFilter::from_query(&query)?;
    let expenses = services::list_filtered(&state.db, user_id, &filter).await?;
    Ok(Json(ExpenseListResponse {
        message: "Expenses retrieved successfully".into(),
        count: expenses.len(),
        expenses,
    }))
}

#[instrument(skip(state, payload))]
pub async fn create_expense(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppJson(payload): AppJson<ExpenseRequest>,
) -> Result<(StatusCode, Json<ExpenseResponse>), AppError> {
    let expense = services::create(&state.db, user_id, &payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ExpenseResponse {
            message: "Expense created successfully".into(),
            expense,
        }),
    ))
}

#[instrument(skip(state))]
pub async fn get_expense(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<ExpenseResponse>, AppError> {
    let expense = services::get(&state.db, user_id, id).await?;
    Ok(Json(ExpenseResponse {
        message: "Expense retrieved successfully".into(),
        expense,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_expense(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<ExpenseRequest>,
) -> Result<Json<ExpenseResponse>, AppError> {
    let expense = services::update(&state.db, user_id, id, &payload).await?;
    Ok(Json(ExpenseResponse {
        message: "Expense updated successfully".into(),
        expense,
    }))
}

#[instrument(skip(state))]
pub async fn delete_expense(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppPath(id): AppPath<Uuid>,
) -> Result<Json<MessageResponse>, AppError> {
    services::delete(&state.db, user_id, id).await?;
    Ok(Json(MessageResponse::new("Expense deleted successfully")))
}
