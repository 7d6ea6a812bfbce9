use anyhow::Context;

use argon2::password_hash::SaltString;
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};

use secrecy::{ExposeSecret, Secret};

use serde::Deserialize;

use sqlx::PgPool;

use crate::crypto::SessionClaims;
use crate::domain::EmailAddress;
use crate::error::{RestError, RestResult};
use crate::repo::UsersRepo;
use crate::telemetry::spawn_blocking_with_tracing;

const INVALID_CREDENTIALS: &str = "Invalid email or password";

/// Verified against when the email is unknown, so both paths cost the same
const FALLBACK_PASSWORD_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: Secret<String>,
}

/// Check a login form against the stored argon2 hash
#[tracing::instrument("Validate credentials", skip(pool, form), fields(email = %form.email))]
pub async fn validate_credentials(pool: &PgPool, form: &LoginForm) -> RestResult<SessionClaims> {
    let email: EmailAddress = form
        .email
        .parse()
        .map_err(|_| RestError::Unauthorized(INVALID_CREDENTIALS.into()))?;

    let user = UsersRepo::fetch_credentials_by_email(pool, &email).await?;
    let expected_hash = user
        .as_ref()
        .map(|user| user.password_hash.clone())
        .unwrap_or_else(|| Secret::new(FALLBACK_PASSWORD_HASH.to_string()));
    let password = form.password.clone();

    let verified = spawn_blocking_with_tracing(move || verify_password_hash(password, expected_hash))
        .await
        .context("Failed to spawn blocking task")??;

    match user {
        Some(user) if verified => Ok(SessionClaims {
            user_id: user.id,
            email: user.email,
            role: user.role,
        }),
        _ => Err(RestError::Unauthorized(INVALID_CREDENTIALS.into())),
    }
}

#[tracing::instrument("Verify password hash", skip(password, password_hash))]
fn verify_password_hash(
    password: Secret<String>,
    password_hash: Secret<String>,
) -> anyhow::Result<bool> {
    let password_hash = PasswordHash::new(password_hash.expose_secret())
        .map_err(|e| anyhow::anyhow!("Failed to parse stored password hash: {}", e))?;

    Ok(Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &password_hash)
        .is_ok())
}

/// Hash a password for storage
pub fn compute_password_hash(password: &Secret<String>) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());
    let params = Params::new(15000, 2, 1, None)
        .map_err(|e| anyhow::anyhow!("Invalid argon2 parameters: {}", e))?;

    let hash = Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?
        .to_string();
    Ok(hash)
}
