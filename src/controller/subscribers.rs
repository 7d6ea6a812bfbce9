use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, web, HttpResponse};

use serde::Deserialize;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Administrator;
use crate::client::{Email, EmailClient};
use crate::domain::{EmailAddress, Role};
use crate::error::{is_unique_violation, RestError, RestResult};
use crate::repo::SubscribersRepo;

use super::{created, deleted, ok};

#[derive(Debug, Deserialize)]
pub struct SubscribeBody {
    email: String,
}

fn welcome_email(recipient: EmailAddress) -> Email {
    Email {
        recipient,
        subject: "Welcome to our newsletter!".into(),
        html_body: "<h1>Thanks for subscribing!</h1>\
                    <p>You'll be the first to hear about new menus, events and offers.</p>"
            .into(),
        text_body: Some(
            "Thanks for subscribing! You'll be the first to hear about new menus, events and offers."
                .into(),
        ),
    }
}

/// Newsletter signup
#[tracing::instrument(name = "Create a new subscriber", skip(pool, email_client))]
#[post("")]
async fn subscribe(
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    body: web::Json<SubscribeBody>,
) -> RestResult<HttpResponse> {
    let email: EmailAddress = body.email.parse().map_err(RestError::Validation)?;

    let subscriber = match SubscribersRepo::insert(pool.get_ref(), &email).await {
        Ok(subscriber) => subscriber,
        Err(e) if is_unique_violation(&e) => {
            return Err(RestError::Conflict("Email already subscribed".into()))
        }
        Err(e) => return Err(e.into()),
    };

    // The signup stands even if the welcome email bounces
    if let Err(error) = email_client.send(&welcome_email(email)).await {
        tracing::warn!(error.cause_chain = ?error, "Failed to send welcome email");
    }

    Ok(created(subscriber))
}

/// Public subscriber endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/subscribers").service(subscribe)
}

#[tracing::instrument(name = "List subscribers", skip(pool))]
#[get("")]
async fn list(_admin: Administrator, pool: web::Data<PgPool>) -> RestResult<HttpResponse> {
    Ok(ok(SubscribersRepo::list(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Delete subscriber", skip(pool))]
#[delete("/{id}")]
async fn remove(
    admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    deleted(
        SubscribersRepo::delete(pool.get_ref(), path.into_inner()).await?,
        "Subscriber",
    )
}

/// Admin subscriber endpoints
pub fn admin_scope() -> impl HttpServiceFactory {
    web::scope("/subscribers").service(list).service(remove)
}
