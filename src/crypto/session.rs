use chrono::{DateTime, Duration, Utc};

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::domain::Role;

use super::{SigningKey, Token, TokenResult};

/// Identity carried in the admin session cookie
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub user_id: Uuid,
    pub email: String,
    pub role: Role,
}

impl SessionClaims {
    pub fn sign(&self, key: &SigningKey, ttl: Duration) -> TokenResult<Token> {
        Token::builder(self).expires_in(ttl).sign(key.as_ref())
    }

    pub fn verify(key: &SigningKey, token: &str) -> TokenResult<Self> {
        Self::verify_at(key, token, Utc::now())
    }

    pub fn verify_at(key: &SigningKey, token: &str, now: DateTime<Utc>) -> TokenResult<Self> {
        token.parse::<Token>()?.verify_at(key.as_ref(), now)
    }
}
