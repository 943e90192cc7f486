use anyhow::Context;
use sqlx::PgPool;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::auth::repo_types::{ActiveSession, User};

const USER_COLUMNS: &str = "id, name, email, password_hash, profile_image, is_active, \
                            deactivated_at, created_at, updated_at";

impl User {
    /// Find a user by email, active or not.
    pub async fn find_by_email(db: &PgPool, email: &str) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = $1"
        ))
        .bind(email)
        .fetch_optional(db)
        .await
        .context("find user by email")?;
        Ok(user)
    }

    pub async fn find_active_by_id(db: &PgPool, id: Uuid) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
        .context("find user by id")?;
        Ok(user)
    }

    /// Create a new user with hashed password.
    pub async fn create(
        db: &PgPool,
        name: &str,
        email: &str,
        password_hash: &str,
    ) -> anyhow::Result<User> {
        let user = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users (name, email, password_hash) VALUES ($1, $2, $3) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(name)
        .bind(email)
        .bind(password_hash)
        .fetch_one(db)
        .await
        .context("insert user")?;
        Ok(user)
    }

    pub async fn update_profile(
        db: &PgPool,
        id: Uuid,
        name: &str,
        profile_image: Option<&str>,
    ) -> anyhow::Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(&format!(
            "UPDATE users SET name = $2, profile_image = $3, updated_at = now() \
             WHERE id = $1 AND is_active RETURNING {USER_COLUMNS}"
        ))
        .bind(id)
        .bind(name)
        .bind(profile_image)
        .fetch_optional(db)
        .await
        .context("update user profile")?;
        Ok(user)
    }

    pub async fn update_password(db: &PgPool, id: Uuid, password_hash: &str) -> anyhow::Result<()> {
        sqlx::query("UPDATE users SET password_hash = $2, updated_at = now() WHERE id = $1")
            .bind(id)
            .bind(password_hash)
            .execute(db)
            .await
            .context("update user password")?;
        Ok(())
    }

    /// Soft-deactivates the account and revokes every session in one transaction.
    pub async fn deactivate(db: &PgPool, id: Uuid) -> anyhow::Result<bool> {
        let mut tx = db.begin().await.context("begin tx")?;
        let updated = sqlx::query(
            "UPDATE users SET is_active = FALSE, deactivated_at = now(), updated_at = now() \
             WHERE id = $1 AND is_active",
        )
        .bind(id)
        .execute(&mut *tx)
        .await
        .context("deactivate user")?
        .rows_affected();
        sqlx::query("UPDATE sessions SET is_active = FALSE WHERE user_id = $1 AND is_active")
            .bind(id)
            .execute(&mut *tx)
            .await
            .context("revoke user sessions")?;
        tx.commit().await.context("commit tx")?;
        Ok(updated == 1)
    }
}

/// Appends one row to the login audit log.
pub async fn record_login(db: &PgPool, user_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("INSERT INTO login_history (user_id) VALUES ($1)")
        .bind(user_id)
        .execute(db)
        .await
        .context("insert login history")?;
    Ok(())
}

pub async fn create_session(
    db: &PgPool,
    session_id: Uuid,
    user_id: Uuid,
    token: &str,
    expires_at: OffsetDateTime,
) -> anyhow::Result<()> {
    sqlx::query(
        "INSERT INTO sessions (id, user_id, token, expires_at, is_active) \
         VALUES ($1, $2, $3, $4, TRUE)",
    )
    .bind(session_id)
    .bind(user_id)
    .bind(token)
    .bind(expires_at)
    .execute(db)
    .await
    .context("insert session")?;
    Ok(())
}

/// Looks up a session that is active, unexpired and owned by an active user.
pub async fn find_active_session(db: &PgPool, token: &str) -> anyhow::Result<Option<ActiveSession>> {
    let session = sqlx::query_as::<_, ActiveSession>(
        r#"
        SELECT s.id, s.user_id
          FROM sessions s
          JOIN users u ON u.id = s.user_id
         WHERE s.token = $1
           AND s.is_active
           AND s.expires_at > now()
           AND u.is_active
        "#,
    )
    .bind(token)
    .fetch_optional(db)
    .await
    .context("find active session")?;
    Ok(session)
}

pub async fn revoke_session(db: &PgPool, session_id: Uuid) -> anyhow::Result<()> {
    sqlx::query("UPDATE sessions SET is_active = FALSE WHERE id = $1")
        .bind(session_id)
        .execute(db)
        .await
        .context("revoke session")?;
    Ok(())
}
