use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, patch, post, put, web, HttpResponse};

use chrono::Utc;

use serde::Deserialize;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Administrator;
use crate::domain::{normalize_code, CouponKind, Role};
use crate::error::{RestError, RestResult};
use crate::model::CouponInput;
use crate::repo::CouponsRepo;
use crate::service;

use super::{created, deleted, ok};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyBody {
    coupon_code: String,
    total_amount: f64,
}

#[tracing::instrument(name = "Apply coupon code", skip(pool))]
#[post("/apply")]
async fn apply(pool: web::Data<PgPool>, body: web::Json<ApplyBody>) -> RestResult<HttpResponse> {
    let quote =
        service::apply_coupon(pool.get_ref(), &body.coupon_code, body.total_amount, Utc::now())
            .await?;
    Ok(ok(quote))
}

/// Public coupon endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/coupons").service(apply)
}

/// Validate a coupon and return its normalized code
fn prepare(input: &CouponInput) -> RestResult<String> {
    let code = normalize_code(&input.code)
        .ok_or_else(|| RestError::Validation("code must be a single word".into()))?;
    if !input.value.is_finite() || input.value < 0.0 {
        return Err(RestError::Validation("value must be a non-negative number".into()));
    }
    if input.kind == CouponKind::Percentage && input.value > 100.0 {
        return Err(RestError::Validation("percentage cannot exceed 100".into()));
    }
    Ok(code)
}

#[tracing::instrument(name = "List coupons", skip(pool))]
#[get("")]
async fn list(admin: Administrator, pool: web::Data<PgPool>) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    Ok(ok(CouponsRepo::list(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Get coupon", skip(pool))]
#[get("/{id}")]
async fn fetch(
    admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    let coupon = CouponsRepo::fetch(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| RestError::not_found("Coupon"))?;
    Ok(ok(coupon))
}

#[tracing::instrument(name = "Create coupon", skip(pool))]
#[post("")]
async fn create(
    admin: Administrator,
    pool: web::Data<PgPool>,
    body: web::Json<CouponInput>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    let code = prepare(&body)?;
    Ok(created(CouponsRepo::insert(pool.get_ref(), &code, &body).await?))
}

#[tracing::instrument(name = "Replace coupon", skip(pool))]
#[put("/{id}")]
async fn replace(
    admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<CouponInput>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    let code = prepare(&body)?;
    let coupon = CouponsRepo::update(pool.get_ref(), path.into_inner(), &code, &body)
        .await?
        .ok_or_else(|| RestError::not_found("Coupon"))?;
    Ok(ok(coupon))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    active: bool,
}

#[tracing::instrument(name = "Toggle coupon", skip(pool))]
#[patch("/{id}")]
async fn toggle(
    admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<ActiveBody>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    let coupon = CouponsRepo::set_active(pool.get_ref(), path.into_inner(), body.active)
        .await?
        .ok_or_else(|| RestError::not_found("Coupon"))?;
    Ok(ok(coupon))
}

#[tracing::instrument(name = "Delete coupon", skip(pool))]
#[delete("/{id}")]
async fn remove(
    admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    admin.require(Role::Admin)?;
    deleted(
        CouponsRepo::delete(pool.get_ref(), path.into_inner()).await?,
        "Coupon",
    )
}

/// Admin coupon endpoints, admin role only
pub fn admin_scope() -> impl HttpServiceFactory {
    web::scope("/coupons")
        .service(list)
        .service(fetch)
        .service(create)
        .service(replace)
        .service(toggle)
        .service(remove)
}
