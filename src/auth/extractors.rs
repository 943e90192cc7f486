use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use tracing::warn;
use uuid::Uuid;

use super::{jwt::JwtKeys, repo};
use crate::{
    error::{AppError, AuthFailure},
    state::AppState,
};

/// The authenticated caller. Extracting it validates the bearer token and
/// re-checks the backing session against the datastore on every request.
#[derive(Debug, Clone, Copy)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub session_id: Uuid,
}

/// Pulls the raw token out of an `Authorization: Bearer <token>` value.
pub(crate) fn bearer_token(header: Option<&str>) -> Result<&str, AuthFailure> {
    let header = header.ok_or(AuthFailure::MissingCredentials)?;
    header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthFailure::InvalidToken)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok());
        let token = bearer_token(header).map_err(AppError::Unauthorized)?;

        let keys = JwtKeys::from_ref(state);
        let claims = keys.verify(token).map_err(|e| {
            warn!(error = %e, "invalid or expired token");
            AppError::Unauthorized(AuthFailure::InvalidToken)
        })?;

        let session = repo::find_active_session(&state.db, token)
            .await?
            .filter(|s| s.user_id == claims.sub && s.id == claims.sid)
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "session inactive or expired");
                AppError::Unauthorized(AuthFailure::SessionExpired)
            })?;

        Ok(AuthUser {
            user_id: session.user_id,
            session_id: session.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Request;

    async fn extract(header: Option<&str>) -> Result<AuthUser, AppError> {
        extract_with(&AppState::fake(), header).await
    }

    async fn extract_with(state: &AppState, header: Option<&str>) -> Result<AuthUser, AppError> {
        let mut builder = Request::builder().uri("/api/expenses");
        if let Some(h) = header {
            builder = builder.header(AUTHORIZATION, h);
        }
        let (mut parts, _) = builder.body(()).unwrap().into_parts();
        AuthUser::from_request_parts(&mut parts, state).await
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(None), Err(AuthFailure::MissingCredentials));
        assert_eq!(bearer_token(Some("Basic abc")), Err(AuthFailure::InvalidToken));
        assert_eq!(bearer_token(Some("Bearer ")), Err(AuthFailure::InvalidToken));
        assert_eq!(bearer_token(Some("Bearer abc.def")), Ok("abc.def"));
    }

    #[tokio::test]
    async fn missing_header_is_unauthorized() {
        let err = extract(None).await.unwrap_err();
        assert!(matches!(
            err,
            AppError::Unauthorized(AuthFailure::MissingCredentials)
        ));
    }

    #[tokio::test]
    async fn wrong_scheme_is_invalid_token() {
        let err = extract(Some("Token abc")).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(AuthFailure::InvalidToken)));
    }

    #[tokio::test]
    async fn bad_signature_is_invalid_token() {
        let foreign = JwtKeys::from_config(&crate::config::JwtConfig {
            secret: "someone-else".into(),
            issuer: "test-issuer".into(),
            audience: "test-aud".into(),
            ttl_minutes: 5,
        })
        .sign(Uuid::new_v4(), Uuid::new_v4())
        .unwrap();
        let header = format!("Bearer {}", foreign.token);
        let err = extract(Some(&header)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(AuthFailure::InvalidToken)));
    }

    async fn seed_user(pool: &sqlx::PgPool) -> Uuid {
        sqlx::query_scalar(
            "INSERT INTO users (name, email, password_hash) VALUES ('T', 't@x.com', 'x') RETURNING id",
        )
        .fetch_one(pool)
        .await
        .unwrap()
    }

    fn state_for(pool: &sqlx::PgPool) -> AppState {
        AppState {
            db: pool.clone(),
            config: AppState::fake().config,
        }
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn live_session_yields_the_caller(pool: sqlx::PgPool) {
        let state = state_for(&pool);
        let user_id = seed_user(&pool).await;
        let session_id = Uuid::new_v4();
        let signed = JwtKeys::from_ref(&state).sign(user_id, session_id).unwrap();
        repo::create_session(&pool, session_id, user_id, &signed.token, signed.expires_at)
            .await
            .unwrap();

        let header = format!("Bearer {}", signed.token);
        let caller = extract_with(&state, Some(&header)).await.unwrap();
        assert_eq!(caller.user_id, user_id);
        assert_eq!(caller.session_id, session_id);
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn revoked_session_is_session_expired(pool: sqlx::PgPool) {
        let state = state_for(&pool);
        let user_id = seed_user(&pool).await;
        let session_id = Uuid::new_v4();
        let signed = JwtKeys::from_ref(&state).sign(user_id, session_id).unwrap();
        repo::create_session(&pool, session_id, user_id, &signed.token, signed.expires_at)
            .await
            .unwrap();
        repo::revoke_session(&pool, session_id).await.unwrap();

        let header = format!("Bearer {}", signed.token);
        let err = extract_with(&state, Some(&header)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(AuthFailure::SessionExpired)));
    }

    #[sqlx::test(migrations = "./migrations")]
    #[ignore = "requires a PostgreSQL DATABASE_URL"]
    async fn signed_token_without_its_session_is_session_expired(pool: sqlx::PgPool) {
        let state = state_for(&pool);
        let user_id = seed_user(&pool).await;
        let keys = JwtKeys::from_ref(&state);

        // Never stored.
        let orphan = keys.sign(user_id, Uuid::new_v4()).unwrap();
        let header = format!("Bearer {}", orphan.token);
        let err = extract_with(&state, Some(&header)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(AuthFailure::SessionExpired)));

        // Stored under a different session id than the one the token names.
        let signed = keys.sign(user_id, Uuid::new_v4()).unwrap();
        repo::create_session(&pool, Uuid::new_v4(), user_id, &signed.token, signed.expires_at)
            .await
            .unwrap();
        let header = format!("Bearer {}", signed.token);
        let err = extract_with(&state, Some(&header)).await.unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(AuthFailure::SessionExpired)));
    }
}
