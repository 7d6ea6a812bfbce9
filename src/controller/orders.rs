use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, patch, post, web, HttpResponse};

use chrono::Utc;

use serde::Deserialize;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Administrator;
use crate::client::{Email, EmailClient};
use crate::domain::{EmailAddress, OrderStatus, Role};
use crate::error::{RestError, RestResult};
use crate::model::{NewOrder, OrderWithItems};
use crate::repo::OrdersRepo;
use crate::service;

use super::{created, done, ok};

fn confirmation_email(recipient: EmailAddress, placed: &OrderWithItems) -> Email {
    let order = &placed.order;
    let lines: String = placed
        .items
        .iter()
        .map(|item| {
            format!(
                "<li>{} x {} ({:.2})</li>",
                item.quantity, item.title, item.total
            )
        })
        .collect();

    Email {
        recipient,
        subject: format!("Your order {}", order.order_number),
        html_body: format!(
            "<h1>Thanks for your order, {}!</h1><p>Order number: <b>{}</b></p><ul>{}</ul><p>Total: {:.2}</p>",
            order.customer_name, order.order_number, lines, order.total
        ),
        text_body: Some(format!(
            "Thanks for your order! Order number {}, total {:.2}.",
            order.order_number, order.total
        )),
    }
}

#[tracing::instrument(name = "Place an order", skip(pool, email_client, body))]
#[post("")]
async fn place(
    pool: web::Data<PgPool>,
    email_client: web::Data<EmailClient>,
    body: web::Json<NewOrder>,
) -> RestResult<HttpResponse> {
    let order = body.into_inner();
    let placed = service::place_order(pool.get_ref(), &order, Utc::now()).await?;

    let email = confirmation_email(order.customer.email, &placed);
    if let Err(error) = email_client.send(&email).await {
        tracing::warn!(error.cause_chain = ?error, "Failed to send order confirmation");
    }

    Ok(created(placed))
}

#[tracing::instrument(name = "Look up an order", skip(pool))]
#[get("/{order_number}")]
async fn lookup(pool: web::Data<PgPool>, path: web::Path<String>) -> RestResult<HttpResponse> {
    let order = OrdersRepo::fetch_by_number(pool.get_ref(), &path)
        .await?
        .ok_or_else(|| RestError::not_found("Order"))?;
    Ok(ok(service::load_order(pool.get_ref(), order).await?))
}

/// Public checkout endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/orders").service(place).service(lookup)
}

#[derive(Debug, Deserialize)]
pub struct OrderQuery {
    status: Option<OrderStatus>,
}

#[tracing::instrument(name = "List orders", skip(pool))]
#[get("")]
async fn list(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    query: web::Query<OrderQuery>,
) -> RestResult<HttpResponse> {
    Ok(ok(OrdersRepo::list(pool.get_ref(), query.status).await?))
}

#[tracing::instrument(name = "Get order", skip(pool))]
#[get("/{id}")]
async fn fetch(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    let order = OrdersRepo::fetch(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| RestError::not_found("Order"))?;
    Ok(ok(service::load_order(pool.get_ref(), order).await?))
}

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    status: OrderStatus,
}

#[tracing::instrument(name = "Change order status", skip(pool))]
#[patch("/{id}")]
async fn update_status(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<StatusBody>,
) -> RestResult<HttpResponse> {
    let order = service::change_status(pool.get_ref(), path.into_inner(), body.status).await?;
    Ok(ok(order))
}

#[tracing::instrument(name = "Delete order", skip(pool))]
#[delete("/{id}")]
async fn remove(
    admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    service::delete_order(pool.get_ref(), path.into_inner()).await?;
    Ok(done("Order deleted"))
}

/// Admin order endpoints
pub fn admin_scope() -> impl HttpServiceFactory {
    web::scope("/orders")
        .service(list)
        .service(fetch)
        .service(update_status)
        .service(remove)
}
