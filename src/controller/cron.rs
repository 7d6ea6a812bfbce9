use std::fmt;

use actix_web::dev::HttpServiceFactory;
use actix_web::http::header;
use actix_web::{post, web, HttpRequest, HttpResponse};

use hmac::{Hmac, Mac};

use sha2::Sha256;

use secrecy::{ExposeSecret, Secret};

use sqlx::PgPool;

use crate::client::EmailClient;
use crate::error::{RestError, RestResult};
use crate::settings::NewsletterSettings;

use super::newsletters::dispatch;

const TAG_INPUT: &[u8] = b"cron";

/// Shared secret a scheduler presents as a bearer token, held as an HMAC tag
#[derive(Clone)]
pub struct CronSecret(Vec<u8>);

impl CronSecret {
    pub fn new(secret: &Secret<String>) -> anyhow::Result<Self> {
        let secret = secret.expose_secret();
        if secret.trim().is_empty() {
            anyhow::bail!("Cron secret must not be empty");
        }
        let tag = tag_with(secret)?.finalize().into_bytes().to_vec();
        Ok(Self(tag))
    }

    fn authorize(&self, req: &HttpRequest) -> RestResult<()> {
        let token = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
            .ok_or_else(|| RestError::Unauthorized("Missing bearer token".into()))?;

        let invalid = || RestError::Unauthorized("Invalid bearer token".into());
        let mac = tag_with(token).map_err(|_| invalid())?;
        mac.verify_slice(&self.0).map_err(|_| invalid())
    }
}

fn tag_with(key: &str) -> anyhow::Result<Hmac<Sha256>> {
    let mut mac = Hmac::<Sha256>::new_from_slice(key.as_bytes())
        .map_err(|e| anyhow::anyhow!("Invalid cron secret: {}", e))?;
    mac.update(TAG_INPUT);
    Ok(mac)
}

impl fmt::Debug for CronSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CronSecret(..)")
    }
}

#[tracing::instrument(name = "Scheduled newsletter run", skip(req, secret, pool, email_client, settings))]
#[post("/newsletters")]
async fn newsletters(
    req: HttpRequest,
    secret: web::Data<CronSecret>,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    settings: web::Data<NewsletterSettings>,
) -> RestResult<HttpResponse> {
    secret.authorize(&req)?;
    dispatch(pool.get_ref(), email_client.get_ref(), settings.get_ref()).await
}

/// Scheduler trigger endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/cron").service(newsletters)
}
