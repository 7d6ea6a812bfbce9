use actix_web::dev::HttpServiceFactory;
use actix_web::{get, web, HttpResponse};

use chrono::{FixedOffset, Utc};

use sqlx::PgPool;

use crate::auth::Administrator;
use crate::domain::DayWindow;
use crate::error::RestResult;
use crate::repo::{AnalyticsRepo, AnalyticsTotals};

use super::ok;

const TOP_BLOGS: i64 = 5;

#[tracing::instrument(name = "Analytics summary", skip(pool, offset))]
#[get("")]
async fn summary(
    _admin: Administrator,
    pool: web::Data<PgPool>,
    offset: web::Data<FixedOffset>,
) -> RestResult<HttpResponse> {
    let pool = pool.get_ref();
    let today = DayWindow::containing(Utc::now(), **offset);

    let totals = AnalyticsTotals {
        total_visitors: AnalyticsRepo::count_visitors(pool, None).await?,
        visitors_today: AnalyticsRepo::count_visitors(pool, Some(&today)).await?,
        total_blog_views: AnalyticsRepo::count_all_views(pool).await?,
        devices: AnalyticsRepo::device_breakdown(pool).await?,
        top_blogs: AnalyticsRepo::top_blogs(pool, TOP_BLOGS).await?,
    };
    Ok(ok(totals))
}

/// Admin analytics endpoints
pub fn admin_scope() -> impl HttpServiceFactory {
    web::scope("/analytics").service(summary)
}
