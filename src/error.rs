//! Application error type and its mapping onto HTTP responses.
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Why a request failed to authenticate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    /// No `Authorization` header at all.
    MissingCredentials,
    /// Wrong scheme, bad signature, wrong issuer/audience or expired JWT.
    InvalidToken,
    /// The JWT is well formed but its session was revoked or has expired.
    SessionExpired,
    /// Email/password pair did not match an active user.
    InvalidCredentials,
}

impl AuthFailure {
    pub fn code(self) -> &'static str {
        match self {
            AuthFailure::MissingCredentials => "unauthorized",
            AuthFailure::InvalidToken => "invalid_token",
            AuthFailure::SessionExpired => "session_expired",
            AuthFailure::InvalidCredentials => "invalid_credentials",
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            AuthFailure::MissingCredentials => "Access denied. Please login to continue",
            AuthFailure::InvalidToken => "Invalid or malformed authentication token",
            AuthFailure::SessionExpired => "Session expired, please login again",
            AuthFailure::InvalidCredentials => "Invalid email or password",
        }
    }
}

/// The errors a request handler may return.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// Malformed or missing input, detected before touching the datastore.
    #[error("{0}")]
    Validation(String),

    #[error("{}", .0.message())]
    Unauthorized(AuthFailure),

    /// Authenticated, but not entitled to the target resource.
    #[error("{0}")]
    Forbidden(String),

    /// The target does not exist or is not owned by the caller. The two cases
    /// are deliberately indistinguishable.
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    /// The datastore (or another collaborator) failed. Logged in full, never
    /// shown to the client.
    #[error("dependency failure: {0:#}")]
    Dependency(anyhow::Error),
}

impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Dependency(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "validation_failed",
            AppError::Unauthorized(reason) => reason.code(),
            AppError::Forbidden(_) => "forbidden",
            AppError::NotFound(_) => "not_found",
            AppError::Conflict(_) => "already_exists",
            AppError::Dependency(_) => "database_error",
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        if is_unique_violation(&err) {
            return AppError::Conflict("Resource already exists".into());
        }
        AppError::Dependency(err)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::from(anyhow::Error::new(err))
    }
}

fn is_unique_violation(err: &anyhow::Error) -> bool {
    err.chain()
        .filter_map(|cause| cause.downcast_ref::<sqlx::Error>())
        .filter_map(|e| e.as_database_error())
        .any(|db| db.is_unique_violation())
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
    pub status_code: u16,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Dependency(e) => {
                tracing::error!(error = %format!("{e:#}"), "dependency failure");
                "Database operation failed".to_string()
            }
            other => other.to_string(),
        };
        let body = ErrorBody {
            error: self.code(),
            message,
            status_code: status.as_u16(),
        };
        (status, Json(body)).into_response()
    }
}
