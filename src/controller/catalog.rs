use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, patch, post, put, web, HttpResponse};

use serde::Deserialize;

use sqlx::PgPool;

use uuid::Uuid;

use crate::auth::Administrator;
use crate::domain::Slug;
use crate::error::{RestError, RestResult};
use crate::model::{CategoryInput, ProductInput};
use crate::repo::{CategoriesRepo, ProductsRepo};

use super::{created, deleted, ok, required};

fn validate_product(input: &ProductInput) -> RestResult<()> {
    required(&input.title, "title")?;
    if !input.price.is_finite() || input.price < 0.0 {
        return Err(RestError::Validation("price must be a non-negative number".into()));
    }
    if input.stock < 0 {
        return Err(RestError::Validation("stock cannot be negative".into()));
    }
    Ok(())
}

fn category_slug(input: &CategoryInput) -> RestResult<Slug> {
    required(&input.name, "name")?;
    match &input.slug {
        Some(slug) => Ok(slug.clone()),
        None => Slug::from_title(&input.name).map_err(RestError::Validation),
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductQuery {
    category: Option<String>,
}

#[tracing::instrument(name = "List active products", skip(pool))]
#[get("")]
async fn list_active_products(
    pool: web::Data<PgPool>,
    query: web::Query<ProductQuery>,
) -> RestResult<HttpResponse> {
    let products = ProductsRepo::list(pool.get_ref(), true, query.category.as_deref()).await?;
    Ok(ok(products))
}

#[tracing::instrument(name = "Get active product", skip(pool))]
#[get("/{id}")]
async fn get_active_product(
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    let product = ProductsRepo::fetch(pool.get_ref(), path.into_inner())
        .await?
        .filter(|product| product.active)
        .ok_or_else(|| RestError::not_found("Product"))?;
    Ok(ok(product))
}

#[tracing::instrument(name = "List categories", skip(pool))]
#[get("")]
async fn list_public_categories(pool: web::Data<PgPool>) -> RestResult<HttpResponse> {
    Ok(ok(CategoriesRepo::list(pool.get_ref()).await?))
}

/// Public storefront catalog endpoints
pub fn scope() -> impl HttpServiceFactory {
    (
        web::scope("/api/products")
            .service(list_active_products)
            .service(get_active_product),
        web::scope("/api/categories").service(list_public_categories),
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminProductQuery {
    category: Option<String>,
    #[serde(default)]
    active_only: bool,
}

#[tracing::instrument(name = "List products", skip(pool))]
#[get("")]
async fn list_products(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    query: web::Query<AdminProductQuery>,
) -> RestResult<HttpResponse> {
    let products =
        ProductsRepo::list(pool.get_ref(), query.active_only, query.category.as_deref()).await?;
    Ok(ok(products))
}

#[tracing::instrument(name = "Get product", skip(pool))]
#[get("/{id}")]
async fn get_product(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    let product = ProductsRepo::fetch(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| RestError::not_found("Product"))?;
    Ok(ok(product))
}

#[tracing::instrument(name = "Create product", skip(pool, body))]
#[post("")]
async fn create_product(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    body: web::Json<ProductInput>,
) -> RestResult<HttpResponse> {
    validate_product(&body)?;
    Ok(created(ProductsRepo::insert(pool.get_ref(), &body).await?))
}

#[tracing::instrument(name = "Replace product", skip(pool, body))]
#[put("/{id}")]
async fn replace_product(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<ProductInput>,
) -> RestResult<HttpResponse> {
    validate_product(&body)?;
    let product = ProductsRepo::update(pool.get_ref(), path.into_inner(), &body)
        .await?
        .ok_or_else(|| RestError::not_found("Product"))?;
    Ok(ok(product))
}

#[derive(Debug, Deserialize)]
pub struct ActiveBody {
    active: bool,
}

#[tracing::instrument(name = "Toggle product", skip(pool))]
#[patch("/{id}")]
async fn toggle_product(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<ActiveBody>,
) -> RestResult<HttpResponse> {
    let product = ProductsRepo::set_active(pool.get_ref(), path.into_inner(), body.active)
        .await?
        .ok_or_else(|| RestError::not_found("Product"))?;
    Ok(ok(product))
}

#[tracing::instrument(name = "Delete product", skip(pool))]
#[delete("/{id}")]
async fn delete_product(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    deleted(
        ProductsRepo::delete(pool.get_ref(), path.into_inner()).await?,
        "Product",
    )
}

#[tracing::instrument(name = "List categories for admin", skip(pool))]
#[get("")]
async fn list_categories(
    _admin: Administrator,
    pool: web::Data<PgPool>,
) -> RestResult<HttpResponse> {
    Ok(ok(CategoriesRepo::list(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Get category", skip(pool))]
#[get("/{id}")]
async fn get_category(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    let category = CategoriesRepo::fetch(pool.get_ref(), path.into_inner())
        .await?
        .ok_or_else(|| RestError::not_found("Category"))?;
    Ok(ok(category))
}

#[tracing::instrument(name = "Create category", skip(pool, body))]
#[post("")]
async fn create_category(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    body: web::Json<CategoryInput>,
) -> RestResult<HttpResponse> {
    let slug = category_slug(&body)?;
    Ok(created(
        CategoriesRepo::insert(pool.get_ref(), &body, &slug).await?,
    ))
}

#[tracing::instrument(name = "Replace category", skip(pool, body))]
#[put("/{id}")]
async fn replace_category(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<CategoryInput>,
) -> RestResult<HttpResponse> {
    let slug = category_slug(&body)?;
    let category = CategoriesRepo::update(pool.get_ref(), path.into_inner(), &body, &slug)
        .await?
        .ok_or_else(|| RestError::not_found("Category"))?;
    Ok(ok(category))
}

#[derive(Debug, Deserialize)]
pub struct CategoryPatch {
    name: Option<String>,
    slug: Option<Slug>,
    description: Option<String>,
}

#[tracing::instrument(name = "Patch category", skip(pool, body))]
#[patch("/{id}")]
async fn patch_category(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
    body: web::Json<CategoryPatch>,
) -> RestResult<HttpResponse> {
    let id = path.into_inner();
    let current = CategoriesRepo::fetch(pool.get_ref(), id)
        .await?
        .ok_or_else(|| RestError::not_found("Category"))?;

    let patch = body.into_inner();
    let input = CategoryInput {
        name: patch.name.unwrap_or(current.name),
        slug: None,
        description: patch.description.unwrap_or(current.description),
    };
    required(&input.name, "name")?;
    let slug = match patch.slug {
        Some(slug) => slug,
        None => current.slug.parse().map_err(RestError::Validation)?,
    };

    let category = CategoriesRepo::update(pool.get_ref(), id, &input, &slug)
        .await?
        .ok_or_else(|| RestError::not_found("Category"))?;
    Ok(ok(category))
}

#[tracing::instrument(name = "Delete category", skip(pool))]
#[delete("/{id}")]
async fn delete_category(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    path: web::Path<Uuid>,
) -> RestResult<HttpResponse> {
    deleted(
        CategoriesRepo::delete(pool.get_ref(), path.into_inner()).await?,
        "Category",
    )
}

/// Admin catalog endpoints
pub fn admin_scope() -> impl HttpServiceFactory {
    (
        web::scope("/products")
            .service(list_products)
            .service(get_product)
            .service(create_product)
            .service(replace_product)
            .service(toggle_product)
            .service(delete_product),
        web::scope("/categories")
            .service(list_categories)
            .service(get_category)
            .service(create_category)
            .service(replace_category)
            .service(patch_category)
            .service(delete_category),
    )
}
