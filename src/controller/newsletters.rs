use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpResponse};

use serde::Deserialize;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Administrator;
use crate::client::EmailClient;
use crate::domain::Role;
use crate::error::{RestError, RestResult};
use crate::model::NewNewsletterJob;
use crate::repo::{NewsletterJobsRepo, NewsletterLogsRepo};
use crate::service::{self, DispatchError, DispatchOutcome};
use crate::settings::NewsletterSettings;

use super::{created, ok, required};

#[derive(Debug, Deserialize)]
pub struct EnqueueBody {
    #[serde(default = "default_template")]
    template: String,
    subject: String,
    html: String,
}

fn default_template() -> String {
    "custom".into()
}

/// Run the dispatcher once and shape its outcome for a response
pub async fn dispatch(
    pool: &PgPool,
    email_client: &EmailClient,
    settings: &NewsletterSettings,
) -> RestResult<HttpResponse> {
    let outcome = service::process_next_job(pool, email_client, settings)
        .await
        .map_err(|e| match e {
            DispatchError::Reclaimed { .. } => RestError::Conflict(e.to_string()),
            _ => RestError::InternalError(e.to_string()),
        })?;

    let body = match outcome {
        DispatchOutcome::Idle => serde_json::json!({
            "processed": false,
            "message": "No pending newsletter jobs",
        }),
        DispatchOutcome::Completed(job) => serde_json::json!({
            "processed": true,
            "job": job,
        }),
    };
    Ok(ok(body))
}

#[tracing::instrument(name = "List newsletter jobs", skip(pool))]
#[get("")]
async fn list(admin: Administrator, pool: web::Data<PgPool>) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    Ok(ok(NewsletterJobsRepo::list(pool.get_ref()).await?))
}

#[tracing::instrument(name = "List newsletter logs", skip(pool))]
#[get("/logs")]
async fn logs(admin: Administrator, pool: web::Data<PgPool>) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    Ok(ok(NewsletterLogsRepo::list(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Enqueue a newsletter", skip(pool, body))]
#[post("")]
async fn enqueue(
    admin: Administrator,
    pool: web::Data<PgPool>,
    body: web::Json<EnqueueBody>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    required(&body.subject, "subject")?;
    required(&body.html, "html")?;

    let body = body.into_inner();
    let job = NewsletterJobsRepo::insert(
        pool.get_ref(),
        &NewNewsletterJob {
            template: body.template,
            subject: body.subject,
            html: body.html,
        },
    )
    .await?;
    Ok(created(job))
}

#[tracing::instrument(name = "Get newsletter job", skip(pool))]
#[get("/{id}")]
async fn progress(
    admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    let job = NewsletterJobsRepo::fetch(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| RestError::not_found("Newsletter job"))?;
    Ok(ok(job))
}

#[tracing::instrument(name = "Process a newsletter job", skip(pool, email_client, settings))]
#[post("/process")]
async fn process(
    admin: Administrator,
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    settings: web::Data<NewsletterSettings>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    dispatch(pool.get_ref(), email_client.get_ref(), settings.get_ref()).await
}

/// Admin newsletter endpoints, admin role only
pub fn admin_scope() -> impl HttpServiceFactory {
    web::scope("/newsletters")
        .service(list)
        .service(logs)
        .service(enqueue)
        .service(process)
        .service(progress)
}
