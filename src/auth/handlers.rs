use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use tracing::instrument;

use crate::{
    auth::{
        dto::{
            ChangePasswordRequest, LoginRequest, LoginResponse, ProfileResponse, RegisterRequest,
            RegisterResponse, UpdateProfileRequest,
        },
        extractors::AuthUser,
        jwt::JwtKeys,
        services,
    },
    error::AppError,
    extract::AppJson,
    response::MessageResponse,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
}

pub fn profile_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/profile",
            get(get_profile).put(update_profile).delete(deactivate),
        )
        .route("/profile/password", put(change_password))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RegisterRequest>,
) -> Result<(StatusCode, Json<RegisterResponse>), AppError> {
    let user = services::register(&state.db, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(RegisterResponse {
            message: "User registered successfully.".into(),
            user,
        }),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(payload): AppJson<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let outcome = services::login(&state.db, &keys, payload).await?;
    Ok(Json(LoginResponse {
        message: "Login successful.".into(),
        token: outcome.token,
        session_id: outcome.session_id,
    }))
}

#[instrument(skip(state))]
pub async fn logout(
    State(state): State<AppState>,
    auth: AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    services::logout(&state.db, auth.session_id).await?;
    Ok(Json(MessageResponse::new("Logged out successfully")))
}

#[instrument(skip(state))]
pub async fn get_profile(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = services::get_profile(&state.db, user_id).await?;
    Ok(Json(ProfileResponse {
        message: "Profile retrieved successfully".into(),
        profile,
    }))
}

#[instrument(skip(state, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppJson(payload): AppJson<UpdateProfileRequest>,
) -> Result<Json<ProfileResponse>, AppError> {
    let profile = services::update_profile(&state.db, user_id, payload).await?;
    Ok(Json(ProfileResponse {
        message: "Profile updated successfully".into(),
        profile,
    }))
}

#[instrument(skip(state, payload))]
pub async fn change_password(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
    AppJson(payload): AppJson<ChangePasswordRequest>,
) -> Result<Json<MessageResponse>, AppError> {
    services::change_password(&state.db, user_id, payload).await?;
    Ok(Json(MessageResponse::new("Password changed successfully")))
}

#[instrument(skip(state))]
pub async fn deactivate(
    State(state): State<AppState>,
    AuthUser { user_id, .. }: AuthUser,
) -> Result<Json<MessageResponse>, AppError> {
    services::deactivate(&state.db, user_id).await?;
    Ok(Json(MessageResponse::new("Account deactivated")))
}
