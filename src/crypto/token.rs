use std::str::FromStr;

use base64::{
    alphabet,
    engine::{self, general_purpose},
    Engine as _,
};

use chrono::{DateTime, Duration, TimeZone, Utc};

use hmac::Mac;

use serde::{de::DeserializeOwned, Deserialize, Serialize};

lazy_static::lazy_static! {
    // Cookie-safe base64
    static ref BASE64_ENGINE: engine::GeneralPurpose =
        engine::GeneralPurpose::new(&alphabet::URL_SAFE, general_purpose::NO_PAD);
}

/// Errors raised while signing or verifying tokens
#[derive(Debug, PartialEq, thiserror::Error)]
pub enum TokenError {
    #[error("Token signature does not match")]
    SignatureMismatch,
    #[error("Token is expired")]
    Expired,
    #[error("Failed to decode or encode token")]
    Malformed,
}

impl From<std::str::Utf8Error> for TokenError {
    fn from(_e: std::str::Utf8Error) -> Self {
        Self::Malformed
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(_e: serde_json::Error) -> Self {
        Self::Malformed
    }
}

impl From<base64::DecodeError> for TokenError {
    fn from(_e: base64::DecodeError) -> Self {
        Self::Malformed
    }
}

pub type TokenResult<T> = Result<T, TokenError>;

/// A serialized, HMAC-signed token of the form `<payload>.<signature>`
#[derive(Debug, Clone, PartialEq)]
pub struct Token(String);

impl Token {
    pub fn builder<T: Serialize>(payload: T) -> TokenBuilder<T> {
        TokenBuilder::new(payload)
    }

    /// Verify the signature and expiry against the current time
    pub fn verify<T, K>(&self, key: &K) -> TokenResult<T>
    where
        T: DeserializeOwned,
        K: Mac + Clone,
    {
        self.verify_at(key, Utc::now())
    }

    /// Verify the signature and expiry against `now`, returning the payload
    pub fn verify_at<T, K>(&self, key: &K, now: DateTime<Utc>) -> TokenResult<T>
    where
        T: DeserializeOwned,
        K: Mac + Clone,
    {
        // Split the token string into its base64 encoded components
        let (msg, sig) = self.0.split_once('.').ok_or(TokenError::Malformed)?;
        // Decode the components
        let msg = BASE64_ENGINE.decode(msg)?;
        let sig = BASE64_ENGINE.decode(sig)?;

        // Verify the signature before touching the message (constant-time)
        key.clone()
            .chain_update(&msg)
            .verify_slice(&sig)
            .map_err(|_| TokenError::SignatureMismatch)?;

        // Deserialize from JSON
        let msg: TokenMessage<T> = serde_json::from_str(std::str::from_utf8(&msg)?)?;
        // Check that the message is not expired
        if msg.is_expired_at(now) {
            return Err(TokenError::Expired);
        }
        Ok(msg.data)
    }
}

impl AsRef<str> for Token {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for Token {
    type Err = TokenError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        if token.is_empty() {
            return Err(TokenError::Malformed);
        }
        Ok(Self(token.to_string()))
    }
}

#[derive(Debug)]
pub struct TokenBuilder<T> {
    expiration: Option<DateTime<Utc>>,
    payload: T,
}

impl<T: Serialize> TokenBuilder<T> {
    pub fn new(payload: T) -> Self {
        Self {
            expiration: None,
            payload,
        }
    }

    pub fn expires_in(self, duration: Duration) -> Self {
        self.expires_at(Utc::now() + duration)
    }

    /// Set the token to expire at a specific date-time
    pub fn expires_at(mut self, timestamp: DateTime<Utc>) -> Self {
        self.expiration = Some(timestamp);
        self
    }

    /// Sign the token with the specified key
    pub fn sign<K>(self, key: &K) -> TokenResult<Token>
    where
        K: Mac + Clone,
    {
        // Serialize the message to a string
        let msg = serde_json::to_string(&TokenMessage {
            exp: self.expiration.map(|date| date.timestamp()),
            data: self.payload,
        })?;
        // Sign the message
        let sig = key.clone().chain_update(msg.as_bytes()).finalize().into_bytes();

        // Base64 encode both halves and join them with a dot
        Ok(Token(format!(
            "{}.{}",
            BASE64_ENGINE.encode(msg),
            BASE64_ENGINE.encode(sig)
        )))
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct TokenMessage<T> {
    exp: Option<i64>,
    data: T,
}

impl<T> TokenMessage<T> {
    /// An unparseable expiry counts as expired
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.exp {
            None => false,
            Some(exp) => Utc
                .timestamp_opt(exp, 0)
                .earliest()
                .map_or(true, |exp| now >= exp),
        }
    }
}
