//! Argon2 password digests. The async wrappers run the hashing on the
//! blocking pool.
use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;
use tracing::error;

fn argon2() -> Argon2<'static> {
    Argon2::default()
}

pub(crate) fn digest(plain: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    argon2()
        .hash_password(plain.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| {
            error!(error = %e, "password digest failed");
            anyhow::anyhow!("password digest: {e}")
        })
}

/// `Ok(false)` on a mismatch; `Err` only when the stored digest is unreadable.
pub(crate) fn matches(plain: &str, stored: &str) -> anyhow::Result<bool> {
    let parsed = PasswordHash::new(stored).map_err(|e| {
        error!(error = %e, "stored password digest unreadable");
        anyhow::anyhow!("stored digest: {e}")
    })?;
    Ok(argon2().verify_password(plain.as_bytes(), &parsed).is_ok())
}

pub async fn digest_blocking(plain: String) -> anyhow::Result<String> {
    tokio::task::spawn_blocking(move || digest(&plain)).await?
}

pub async fn matches_blocking(plain: String, stored: String) -> anyhow::Result<bool> {
    tokio::task::spawn_blocking(move || matches(&plain, &stored)).await?
}
