use std::net::TcpListener;
use std::sync::Arc;

use actix_web::dev::Server;
use actix_web::{get, HttpRequest, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use chrono::FixedOffset;

use sqlx::PgPool;

use tracing_actix_web::TracingLogger;

use crate::auth::AdminGuard;
use crate::client::EmailClient;
use crate::controller::cron::CronSecret;
use crate::controller::inquiries::NotifyAddress;
use crate::controller::{
    analytics, auth, blogs, catalog, content, coupons, cron, inquiries, newsletters, orders,
    subscribers, tracking,
};
use crate::crypto::SigningKey;
use crate::domain::DeviceParser;
use crate::error::RestError;
use crate::settings::{NewsletterSettings, SessionSettings, Settings};

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Everything the handlers pull out of application data, besides the pool
pub struct AppData {
    pub signing_key: SigningKey,
    /// Shared with the background newsletter worker
    pub email_client: Arc<EmailClient>,
    pub session: SessionSettings,
    pub newsletter: NewsletterSettings,
    pub device_parser: DeviceParser,
    pub utc_offset: FixedOffset,
    pub cron_secret: CronSecret,
    pub notify_address: NotifyAddress,
}

impl AppData {
    pub fn from_settings(settings: &Settings) -> anyhow::Result<Self> {
        let signing_key = SigningKey::new(settings.app.secret_key())?;

        let email_client = Arc::new(EmailClient::new(
            settings.email.sender()?,
            settings.email.api_timeout(),
            settings.email.api_base_url()?,
            settings.email.api_auth_token(),
        )?);

        let device_parser = match settings.analytics.user_agent_regexes() {
            Some(path) => DeviceParser::from_file(path)?,
            None => DeviceParser::keywords_only(),
        };

        Ok(Self {
            signing_key,
            email_client,
            session: settings.app.session(),
            newsletter: settings.newsletter.clone(),
            device_parser,
            utc_offset: settings.analytics.utc_offset()?,
            cron_secret: CronSecret::new(settings.app.cron_secret())?,
            notify_address: NotifyAddress(settings.email.notify_address()?),
        })
    }
}

/// Malformed bodies, paths and queries answer with the JSON error envelope
fn bad_request(err: impl std::fmt::Display, _req: &HttpRequest) -> actix_web::Error {
    RestError::Validation(err.to_string()).into()
}

/// Run the application on a specified TCP listener
pub fn run(listener: TcpListener, pool: PgPool, data: AppData) -> anyhow::Result<Server> {
    // Wrap application data
    let pool = web::Data::new(pool);
    let signing_key = web::Data::new(data.signing_key);
    let email_client = web::Data::from(data.email_client);
    let session = web::Data::new(data.session);
    let newsletter = web::Data::new(data.newsletter);
    let device_parser = web::Data::new(data.device_parser);
    let utc_offset = web::Data::new(data.utc_offset);
    let cron_secret = web::Data::new(data.cron_secret);
    let notify_address = web::Data::new(data.notify_address);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(AdminGuard)
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(|e, req| bad_request(e, req)))
            .app_data(web::PathConfig::default().error_handler(|e, req| bad_request(e, req)))
            .app_data(web::QueryConfig::default().error_handler(|e, req| bad_request(e, req)))
            .app_data(pool.clone())
            .app_data(signing_key.clone())
            .app_data(email_client.clone())
            .app_data(session.clone())
            .app_data(newsletter.clone())
            .app_data(device_parser.clone())
            .app_data(utc_offset.clone())
            .app_data(cron_secret.clone())
            .app_data(notify_address.clone())
            .service(health_check)
            .service(auth::scope())
            .service(tracking::scope())
            .service(subscribers::scope())
            .service(blogs::scope())
            .service(catalog::scope())
            .service(coupons::scope())
            .service(orders::scope())
            .service(content::scope())
            .service(inquiries::scope())
            .service(cron::scope())
            .service(
                web::scope("/api/admin")
                    .service(analytics::admin_scope())
                    .service(blogs::admin_scope())
                    .service(catalog::admin_scope())
                    .service(content::admin_scope())
                    .service(coupons::admin_scope())
                    .service(inquiries::admin_scope())
                    .service(newsletters::admin_scope())
                    .service(orders::admin_scope())
                    .service(subscribers::admin_scope()),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
