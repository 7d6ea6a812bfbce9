use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, patch, post, web, HttpResponse};

use serde::Deserialize;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Administrator;
use crate::client::{Email, EmailClient};
use crate::domain::{ContactStatus, EmailAddress, InquiryStatus};
use crate::error::{RestError, RestResult};
use crate::model::{NewCateringInquiry, NewContactRequest};
use crate::repo::{CateringRepo, ContactsRepo};

use super::{created, deleted, ok, required};

/// Inbox told about new contact requests and catering inquiries, if any
#[derive(Debug, Clone)]
pub struct NotifyAddress(pub Option<EmailAddress>);

async fn notify(
    email_client: &EmailClient,
    notify_address: &NotifyAddress,
    subject: String,
    html_body: String,
) {
    let Some(recipient) = notify_address.0.clone() else {
        return;
    };
    let email = Email {
        recipient,
        subject,
        html_body,
        text_body: None,
    };
    if let Err(error) = email_client.send(&email).await {
        tracing::warn!(error.cause_chain = ?error, "Failed to send staff notification");
    }
}

#[tracing::instrument(name = "Submit contact request", skip(pool, email_client, notify_address, body))]
#[post("/api/contact")]
async fn submit_contact(
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    notify_address: web::Data<NotifyAddress>,
    body: web::Json<NewContactRequest>,
) -> RestResult<HttpResponse> {
    required(&body.subject, "subject")?;
    required(&body.message, "message")?;

    let request = ContactsRepo::insert(pool.get_ref(), &body).await?;
    notify(
        &email_client,
        &notify_address,
        format!("New contact request: {}", request.subject),
        format!(
            "<p><b>{}</b> ({}) wrote:</p><p>{}</p>",
            request.name, request.email, request.message
        ),
    )
    .await;

    Ok(created(request))
}

#[tracing::instrument(name = "Submit catering inquiry", skip(pool, email_client, notify_address, body))]
#[post("/api/catering")]
async fn submit_catering(
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    notify_address: web::Data<NotifyAddress>,
    body: web::Json<NewCateringInquiry>,
) -> RestResult<HttpResponse> {
    required(&body.phone, "phone")?;
    required(&body.event_type, "eventType")?;
    if body.guest_count < 1 {
        return Err(RestError::Validation("guestCount must be at least 1".into()));
    }

    let inquiry = CateringRepo::insert(pool.get_ref(), &body).await?;
    notify(
        &email_client,
        &notify_address,
        format!("New catering inquiry for {}", inquiry.event_date),
        format!(
            "<p><b>{}</b> ({}, {}) asked about a {} for {} guests on {}.</p><p>{}</p>",
            inquiry.name,
            inquiry.email,
            inquiry.phone,
            inquiry.event_type,
            inquiry.guest_count,
            inquiry.event_date,
            inquiry.message
        ),
    )
    .await;

    Ok(created(inquiry))
}

/// Public inquiry endpoints
pub fn scope() -> impl HttpServiceFactory {
    (submit_contact, submit_catering)
}

#[tracing::instrument(name = "List contact requests", skip(pool))]
#[get("")]
async fn list_contacts(
    _admin: Administrator,
    pool: web::Data<PgPool>,
) -> RestResult<HttpResponse> {
    Ok(ok(ContactsRepo::list(pool.get_ref()).await?))
}

#[derive(Debug, Deserialize)]
pub struct ContactStatusBody {
    status: ContactStatus,
}

#[tracing::instrument(name = "Update contact request", skip(pool))]
#[patch("/{id}")]
async fn update_contact(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<ContactStatusBody>,
) -> RestResult<HttpResponse> {
    let request = ContactsRepo::update_status(pool.get_ref(), path.into_inner(), body.status)
        .await?
        .ok_or_else(|| RestError::not_found("Contact request"))?;
    Ok(ok(request))
}

#[tracing::instrument(name = "Delete contact request", skip(pool))]
#[delete("/{id}")]
async fn delete_contact(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    deleted(
        ContactsRepo::delete(pool.get_ref(), path.into_inner()).await?,
        "Contact request",
    )
}

#[tracing::instrument(name = "List catering inquiries", skip(pool))]
#[get("")]
async fn list_catering(
    _admin: Administrator,
    pool: web::Data<PgPool>,
) -> RestResult<HttpResponse> {
    Ok(ok(CateringRepo::list(pool.get_ref()).await?))
}

#[derive(Debug, Deserialize)]
pub struct InquiryStatusBody {
    status: InquiryStatus,
}

#[tracing::instrument(name = "Update catering inquiry", skip(pool))]
#[patch("/{id}")]
async fn update_catering(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<InquiryStatusBody>,
) -> RestResult<HttpResponse> {
    let inquiry = CateringRepo::update_status(pool.get_ref(), path.into_inner(), body.status)
        .await?
        .ok_or_else(|| RestError::not_found("Catering inquiry"))?;
    Ok(ok(inquiry))
}

#[tracing::instrument(name = "Delete catering inquiry", skip(pool))]
#[delete("/{id}")]
async fn delete_catering(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    deleted(
        CateringRepo::delete(pool.get_ref(), path.into_inner()).await?,
        "Catering inquiry",
    )
}

/// Admin inquiry endpoints
pub fn admin_scope() -> impl HttpServiceFactory {
    (
        web::scope("/contacts")
            .service(list_contacts)
            .service(update_contact)
            .service(delete_contact),
        web::scope("/catering")
            .service(list_catering)
            .service(update_catering)
            .service(delete_catering),
    )
}
