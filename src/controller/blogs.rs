use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, patch, post, put, web, HttpResponse};

use chrono::Utc;

use serde::Deserialize;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Administrator;
use crate::domain::Slug;
use crate::error::{RestError, RestResult};
use crate::model::BlogInput;
use crate::repo::BlogsRepo;

use super::{created, deleted, ok, required};

/// Validate a post and settle on its slug
fn prepare(input: &BlogInput) -> RestResult<Slug> {
    required(&input.title, "title")?;
    required(&input.content, "content")?;
    required(&input.author, "author")?;

    match &input.slug {
        Some(slug) => Ok(slug.clone()),
        None => Slug::from_title(&input.title).map_err(RestError::Validation),
    }
}

#[tracing::instrument(name = "List published blogs", skip(pool))]
#[get("")]
async fn list_published(pool: web::Data<PgPool>) -> RestResult<HttpResponse> {
    Ok(ok(BlogsRepo::list(pool.get_ref(), true).await?))
}

#[tracing::instrument(name = "Get published blog", skip(pool))]
#[get("/{slug}")]
async fn get_published(
    pool: web::Data<PgPool>,
    path: web::Path<String>,
) -> RestResult<HttpResponse> {
    let blog = BlogsRepo::fetch_by_slug(pool.get_ref(), &path, true)
        .await?
        .ok_or_else(|| RestError::not_found("Blog"))?;
    Ok(ok(blog))
}

/// Public blog endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/blogs")
        .service(list_published)
        .service(get_published)
}

#[tracing::instrument(name = "List all blogs", skip(pool))]
#[get("")]
async fn list(_admin: Administrator, pool: web::Data<PgPool>) -> RestResult<HttpResponse> {
    Ok(ok(BlogsRepo::list(pool.get_ref(), false).await?))
}

#[tracing::instrument(name = "Get blog", skip(pool))]
#[get("/{id}")]
async fn fetch(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    let blog = BlogsRepo::fetch_by_id(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| RestError::not_found("Blog"))?;
    Ok(ok(blog))
}

#[tracing::instrument(name = "Create blog", skip(pool, body))]
#[post("")]
async fn create(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    body: web::Json<BlogInput>,
) -> RestResult<HttpResponse> {
    let slug = prepare(&body)?;
    let blog = BlogsRepo::insert(pool.get_ref(), &body, &slug, Utc::now()).await?;
    Ok(created(blog))
}

#[tracing::instrument(name = "Replace blog", skip(pool, body))]
#[put("/{id}")]
async fn replace(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<BlogInput>,
) -> RestResult<HttpResponse> {
    let slug = prepare(&body)?;
    let blog = BlogsRepo::update(pool.get_ref(), path.into_inner(), &body, &slug, Utc::now())
        .await?
        .ok_or_else(|| RestError::not_found("Blog"))?;
    Ok(ok(blog))
}

#[derive(Debug, Deserialize)]
pub struct PublishBody {
    published: bool,
}

#[tracing::instrument(name = "Publish or unpublish blog", skip(pool))]
#[patch("/{id}")]
async fn publish(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<PublishBody>,
) -> RestResult<HttpResponse> {
    let blog =
        BlogsRepo::set_published(pool.get_ref(), path.into_inner(), body.published, Utc::now())
            .await?
            .ok_or_else(|| RestError::not_found("Blog"))?;
    Ok(ok(blog))
}

#[tracing::instrument(name = "Delete blog", skip(pool))]
#[delete("/{id}")]
async fn remove(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    deleted(BlogsRepo::delete(pool.get_ref(), path.into_inner()).await?, "Blog")
}

/// Admin blog endpoints
pub fn admin_scope() -> impl HttpServiceFactory {
    web::scope("/blogs")
        .service(list)
        .service(fetch)
        .service(create)
        .service(replace)
        .service(publish)
        .service(remove)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(title: &str) -> BlogInput {
        BlogInput {
            title: title.into(),
            slug: None,
            excerpt: String::new(),
            content: "Body".into(),
            cover_image: None,
            author: "Staff".into(),
            tags: vec![],
            published: false,
        }
    }

    #[test]
    fn slugs_default_to_the_title() {
        let slug = prepare(&input("Summer Menu 2024")).unwrap();
        assert_eq!("summer-menu-2024", slug.as_ref());
    }

    #[test]
    fn untitled_posts_are_rejected() {
        assert!(matches!(
            prepare(&input(" ")),
            Err(RestError::Validation(_))
        ));
    }
}
