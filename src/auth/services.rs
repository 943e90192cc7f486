use lazy_static::lazy_static;
use regex::Regex;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use super::{
    dto::{ChangePasswordRequest, LoginRequest, RegisterRequest, UpdateProfileRequest},
    jwt::JwtKeys,
    password::{digest_blocking, matches_blocking},
    repo,
    repo_types::User,
};
use crate::error::{AppError, AuthFailure};

pub const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex =
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex compiles");
    }
    EMAIL_RE.is_match(email)
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::validation("Name is required"));
    }
    let len = name.chars().count();
    if !(2..=255).contains(&len) {
        return Err(AppError::validation(
            "Name must be between 2 and 255 characters",
        ));
    }
    Ok(name.to_string())
}

pub(crate) fn validate_password(password: &str) -> Result<(), AppError> {
    if password.trim().is_empty() {
        return Err(AppError::validation("Password is required"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(
            "Password must be at least 8 characters",
        ));
    }
    Ok(())
}

/// Validated registration input: trimmed name, normalized email.
#[derive(Debug, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
}

pub fn validate_registration(req: &RegisterRequest) -> Result<NewUser, AppError> {
    let name = validate_name(&req.name)?;
    let email = normalize_email(&req.email);
    if email.is_empty() {
        return Err(AppError::validation("Email is required"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("Invalid email format"));
    }
    validate_password(&req.password)?;
    Ok(NewUser { name, email })
}

pub async fn register(db: &PgPool, req: RegisterRequest) -> Result<User, AppError> {
    let new_user = validate_registration(&req)?;

    if User::find_by_email(db, &new_user.email).await?.is_some() {
        warn!(email = %new_user.email, "email already registered");
        return Err(AppError::Conflict("Email already exists".into()));
    }

    let hash = digest_blocking(req.password).await?;
    let user = User::create(db, &new_user.name, &new_user.email, &hash)
        .await
        .map_err(|e| match AppError::from(e) {
            AppError::Conflict(_) => AppError::Conflict("Email already exists".into()),
            other => other,
        })?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok(user)
}

/// Result of a successful login.
#[derive(Debug)]
pub struct LoginOutcome {
    pub user_id: Uuid,
    pub session_id: Uuid,
    pub token: String,
}

pub async fn login(db: &PgPool, keys: &JwtKeys, req: LoginRequest) -> Result<LoginOutcome, AppError> {
    let email = normalize_email(&req.email);
    if !is_valid_email(&email) || req.password.is_empty() {
        return Err(AppError::Unauthorized(AuthFailure::InvalidCredentials));
    }

    let user = match User::find_by_email(db, &email).await? {
        Some(u) if u.is_active => u,
        _ => {
            warn!(email = %email, "login unknown or inactive email");
            return Err(AppError::Unauthorized(AuthFailure::InvalidCredentials));
        }
    };

    if !matches_blocking(req.password, user.password_hash.clone()).await? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(AppError::Unauthorized(AuthFailure::InvalidCredentials));
    }

    let session_id = Uuid::new_v4();
    let signed = keys.sign(user.id, session_id)?;
    repo::create_session(db, session_id, user.id, &signed.token, signed.expires_at).await?;

    // The audit log is best effort and never fails the login.
    if let Err(e) = repo::record_login(db, user.id).await {
        warn!(error = %e, user_id = %user.id, "failed to record login history");
    }

    info!(user_id = %user.id, session_id = %session_id, "user logged in");
    Ok(LoginOutcome {
        user_id: user.id,
        session_id,
        token: signed.token,
    })
}

pub async fn logout(db: &PgPool, session_id: Uuid) -> Result<(), AppError> {
    repo::revoke_session(db, session_id).await?;
    info!(session_id = %session_id, "session revoked");
    Ok(())
}

pub async fn get_profile(db: &PgPool, user_id: Uuid) -> Result<User, AppError> {
    User::find_active_by_id(db, user_id)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn update_profile(
    db: &PgPool,
    user_id: Uuid,
    req: UpdateProfileRequest,
) -> Result<User, AppError> {
    let name = validate_name(&req.name)?;
    let image = req
        .profile_image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    User::update_profile(db, user_id, &name, image)
        .await?
        .ok_or_else(|| AppError::not_found("User not found"))
}

pub async fn change_password(
    db: &PgPool,
    user_id: Uuid,
    req: ChangePasswordRequest,
) -> Result<(), AppError> {
    validate_password(&req.new_password)
        .map_err(|_| AppError::validation("New password must be at least 8 characters"))?;

    let user = get_profile(db, user_id).await?;
    if !matches_blocking(req.current_password, user.password_hash).await? {
        return Err(AppError::validation("Current password is incorrect"));
    }

    let hash = digest_blocking(req.new_password).await?;
    User::update_password(db, user_id, &hash).await?;
    info!(user_id = %user_id, "password changed");
    Ok(())
}

pub async fn deactivate(db: &PgPool, user_id: Uuid) -> Result<(), AppError> {
    if !User::deactivate(db, user_id).await? {
        return Err(AppError::not_found("User not found"));
    }
    info!(user_id = %user_id, "account deactivated");
    Ok(())
}
