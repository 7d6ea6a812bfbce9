use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse};

use sqlx::PgPool;

use crate::auth::{validate_credentials, Administrator, LoginForm, SESSION_COOKIE};
use crate::crypto::SigningKey;
use crate::error::{RestError, RestResult};
use crate::settings::SessionSettings;

use super::ok;

fn session_cookie(value: String, settings: &SessionSettings) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, value)
        .path("/")
        .http_only(true)
        .secure(settings.cookie_secure)
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(settings.ttl.num_seconds()))
        .finish()
}

#[tracing::instrument(name = "Log in", skip(pool, signing_key, session, form), fields(email = %form.email))]
#[post("/login")]
async fn login(
    pool: web::Data<PgPool>,
    signing_key: web::Data<SigningKey>,
    session: web::Data<SessionSettings>,
    form: web::Json<LoginForm>,
) -> RestResult<HttpResponse> {
    let claims = validate_credentials(pool.get_ref(), &form).await?;
    let token = claims
        .sign(signing_key.get_ref(), session.ttl)
        .map_err(|e| RestError::InternalError(format!("Failed to sign session: {}", e)))?;

    tracing::info!(user_id = %claims.user_id, "User logged in");

    let mut response = ok(&claims);
    response
        .add_cookie(&session_cookie(token.as_ref().to_string(), &session))
        .map_err(|e| RestError::InternalError(e.to_string()))?;
    Ok(response)
}

#[tracing::instrument(name = "Log out", skip(session))]
#[post("/logout")]
async fn logout(session: web::Data<SessionSettings>) -> RestResult<HttpResponse> {
    let mut cookie = session_cookie(String::new(), &session);
    cookie.make_removal();

    let mut response = super::done("Logged out");
    response
        .add_cookie(&cookie)
        .map_err(|e| RestError::InternalError(e.to_string()))?;
    Ok(response)
}

#[tracing::instrument(name = "Current session")]
#[get("/me")]
async fn me(admin: Administrator) -> HttpResponse {
    ok(admin.claims())
}

/// Session API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/auth")
        .service(login)
        .service(logout)
        .service(me)
}
