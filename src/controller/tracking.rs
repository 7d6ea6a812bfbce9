use actix_web::dev::HttpServiceFactory;
use actix_web::http::header;
use actix_web::{post, web, HttpRequest, HttpResponse};

use chrono::{FixedOffset, Utc};

use serde::Deserialize;

use sqlx::PgPool;

use crate::domain::DeviceParser;
use crate::error::RestResult;
use crate::service::{self, ClientInfo};

use super::{client_ip, ok};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackBody {
    session_id: Option<String>,
    blog_slug: Option<String>,
}

fn client_info(req: &HttpRequest, session_id: Option<String>) -> ClientInfo {
    ClientInfo {
        ip_address: client_ip(req),
        session_id,
        user_agent: req
            .headers()
            .get(header::USER_AGENT)
            .and_then(|ua| ua.to_str().ok())
            .map(str::to_owned),
    }
}

#[tracing::instrument(name = "Track visit", skip(req, pool, parser, offset))]
#[post("/visit")]
async fn visit(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    parser: web::Data<DeviceParser>,
    offset: web::Data<FixedOffset>,
    body: web::Json<TrackBody>,
) -> RestResult<HttpResponse> {
    let body = body.into_inner();
    let client = client_info(&req, body.session_id);

    let outcome =
        service::record_visit(pool.get_ref(), &parser, **offset, &client, Utc::now()).await?;
    Ok(ok(outcome))
}

#[tracing::instrument(name = "Track blog view", skip(req, pool, parser))]
#[post("/blog-view")]
async fn blog_view(
    req: HttpRequest,
    pool: web::Data<PgPool>,
    parser: web::Data<DeviceParser>,
    body: web::Json<TrackBody>,
) -> RestResult<HttpResponse> {
    let body = body.into_inner();
    let client = client_info(&req, body.session_id);

    let outcome = service::record_blog_view(
        pool.get_ref(),
        &parser,
        &client,
        body.blog_slug.as_deref(),
        Utc::now(),
    )
    .await?;
    Ok(ok(outcome))
}

/// Visitor analytics endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/track").service(visit).service(blog_view)
}
