use actix_web::dev::HttpServiceFactory;
use actix_web::{get, put, web, HttpResponse};

use sqlx::PgPool;

use crate::auth::Administrator;
use crate::domain::Slug;
use crate::error::{RestError, RestResult};
use crate::repo::ContentRepo;

use super::ok;

#[tracing::instrument(name = "Get content section", skip(pool))]
#[get("/{section}")]
async fn get_section(pool: web::Data<PgPool>, path: web::Path<String>) -> RestResult<HttpResponse> {
    let section = ContentRepo::fetch(pool.get_ref(), &path)
        .await?
        .ok_or_else(|| RestError::not_found("Content section"))?;
    Ok(ok(section))
}

/// Public CMS endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/content").service(get_section)
}

#[tracing::instrument(name = "List content sections", skip(pool))]
#[get("")]
async fn list(_admin: Administrator, pool: web::Data<PgPool>) -> RestResult<HttpResponse> {
    Ok(ok(ContentRepo::list(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Save content section", skip(pool, body))]
#[put("/{section}")]
async fn save(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<String>,
    body: web::Json<serde_json::Value>,
) -> RestResult<HttpResponse> {
    // Section names share the slug alphabet
    let section: Slug = path.parse().map_err(RestError::Validation)?;
    if !body.is_object() {
        return Err(RestError::Validation("Content must be a JSON object".into()));
    }

    let saved = ContentRepo::upsert(pool.get_ref(), section.as_ref(), &body).await?;
    Ok(ok(saved))
}

/// Admin CMS endpoints
pub fn admin_scope() -> impl HttpServiceFactory {
    web::scope("/content").service(list).service(save)
}
