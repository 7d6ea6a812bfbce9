use chrono::{DateTime, Utc};

use secrecy::Secret;

use serde::Serialize;

use uuid::Uuid;

use crate::domain::{EmailAddress, Role};

#[derive(Debug)]
pub struct NewUser {
    pub email: EmailAddress,
    pub password_hash: String,
    pub role: Role,
}

/// What login needs to check a password
#[derive(Debug)]
pub struct UserCredentials {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub password_hash: Secret<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub created_at: DateTime<Utc>,
}
