use std::future::{ready, Ready};

use actix_web::{dev, web, FromRequest, HttpMessage, HttpRequest};

use crate::crypto::{SessionClaims, SigningKey};
use crate::domain::Role;
use crate::error::{RestError, RestResult};

/// Name of the HTTP-only cookie holding the signed session token
pub const SESSION_COOKIE: &str = "session";

/// Verify the session cookie of a request
pub fn session_from_request(req: &HttpRequest) -> RestResult<SessionClaims> {
    if let Some(claims) = req.extensions().get::<SessionClaims>() {
        return Ok(claims.clone());
    }

    // NOTE: Must be registered with the application at startup
    let signing_key = req
        .app_data::<web::Data<SigningKey>>()
        .ok_or_else(|| RestError::InternalError("Signing key not registered".into()))?;

    let cookie = req
        .cookie(SESSION_COOKIE)
        .ok_or_else(|| RestError::Unauthorized("Not authenticated".into()))?;

    SessionClaims::verify(signing_key.get_ref(), cookie.value()).map_err(|e| {
        tracing::debug!(error = %e, "Rejected session cookie");
        RestError::Unauthorized("Invalid or expired session".into())
    })
}

/// An authenticated back-office user
#[derive(Debug)]
pub struct Administrator(SessionClaims);

impl Administrator {
    /// Fail with 403 unless the user holds at least `role`
    pub fn require(&self, role: Role) -> RestResult<()> {
        if self.0.role >= role {
            Ok(())
        } else {
            Err(RestError::Forbidden("Insufficient permissions".into()))
        }
    }

    pub fn claims(&self) -> &SessionClaims {
        &self.0
    }
}

impl FromRequest for Administrator {
    type Error = RestError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(session_from_request(req).map(Administrator))
    }
}
