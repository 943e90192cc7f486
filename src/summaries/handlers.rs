use axum::{
    extract::State,
    routing::get,
    Json, Router,
};
use time::OffsetDateTime;
use tracing::instrument;

use super::{
    dto::{DashboardResponse, WeeklyQuery},
    pagination::{PageQuery, PageRequest, Paged},
    repo_types::{DailyRow, MonthlyRow, WeeklyRow},
    services::{self, DAILY_DEFAULT_LIMIT, MONTHLY_DEFAULT_LIMIT, WEEKLY_DEFAULT_LIMIT},
};
use crate::{auth::AuthUser, error::AppError, extract::AppQuery, state::AppState};

pub fn summary_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard))
        .route("/summaries/monthly", get(monthly_summary))
        .route("/summaries/weekly", get(weekly_summary))
        .route("/summaries/daily", get(daily_summary))
}

#[instrument(skip(state))]
pub async fn dashboard(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<DashboardResponse>, AppError> {
    let today = OffsetDateTime::now_utc().date();
    let dashboard = services::dashboard(&state.db, user_id, today).await?;
    Ok(Json(DashboardResponse {
        message: "Dashboard data retrieved successfully".into(),
        dashboard,
    }))
}

#[instrument(skip(state))]
pub async fn monthly_summary(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<Paged<MonthlyRow>>, AppError> {
    let page = PageRequest::resolve(&query, MONTHLY_DEFAULT_LIMIT);
    Ok(Json(services::monthly(&state.db, user_id, page).await?))
}

#[instrument(skip(state))]
pub async fn weekly_summary(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppQuery(query): AppQuery<WeeklyQuery>,
) -> Result<Json<Paged<WeeklyRow>>, AppError> {
    let page = PageRequest::resolve(&query.page, WEEKLY_DEFAULT_LIMIT);
    Ok(Json(
        services::weekly(&state.db, user_id, query.month.as_deref(), page).await?,
    ))
}

#[instrument(skip(state))]
pub async fn daily_summary(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppQuery(query): AppQuery<PageQuery>,
) -> Result<Json<Paged<DailyRow>>, AppError> {
    let page = PageRequest::resolve(&query, DAILY_DEFAULT_LIMIT);
    Ok(Json(services::daily(&state.db, user_id, page).await?))
}
