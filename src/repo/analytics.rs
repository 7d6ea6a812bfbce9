use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::DayWindow;
use crate::model::{BlogViewCount, DeviceCount, NewBlogView, NewVisitor};

pub struct AnalyticsRepo;

/// Headline numbers for the admin dashboard
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsTotals {
    pub total_visitors: i64,
    pub visitors_today: i64,
    pub total_blog_views: i64,
    pub devices: Vec<DeviceCount>,
    pub top_blogs: Vec<BlogViewCount>,
}

impl AnalyticsRepo {
    /// Insert a visitor unless the same ip or session was already seen in `window`.
    ///
    /// Returns `None` when nothing was written, either because an earlier visit
    /// matched or because a concurrent insert won the day bucket.
    #[tracing::instrument(name = "Insert visitor", skip(executor, visitor), fields(session_id = %visitor.session_id))]
    pub async fn insert_visitor_unless_tracked<'con>(
        executor: impl PgExecutor<'con>,
        visitor: &NewVisitor,
        window: &DayWindow,
    ) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar(
            "insert into visitors(ip_address, session_id, device, browser, os, visited_at, visit_day) \
             select $1, $2, $3, $4, $5, $6, $7 \
             where not exists ( \
                 select 1 from visitors \
                 where (session_id = $2 or ($1::text is not null and ip_address = $1)) \
                   and visited_at >= $8 and visited_at < $9 \
             ) \
             on conflict do nothing \
             returning id",
        )
        .bind(&visitor.ip_address)
        .bind(&visitor.session_id)
        .bind(&visitor.device.device)
        .bind(&visitor.device.browser)
        .bind(&visitor.device.os)
        .bind(visitor.visited_at)
        .bind(visitor.visit_day)
        .bind(window.start)
        .bind(window.end)
        .fetch_optional(executor)
        .await
    }

    /// Serialise view tracking per blog until the surrounding transaction ends
    #[tracing::instrument(name = "Lock blog views", skip(executor))]
    pub async fn lock_blog_views<'con>(
        executor: impl PgExecutor<'con>,
        blog_id: Uuid,
    ) -> sqlx::Result<()> {
        sqlx::query("select pg_advisory_xact_lock(hashtext($1::text))")
            .bind(blog_id)
            .execute(executor)
            .await?;
        Ok(())
    }

    /// Insert a blog view unless the same ip or session viewed this blog since `since`
    #[tracing::instrument(name = "Insert blog view", skip(executor, view), fields(blog_id = %view.blog_id))]
    pub async fn insert_view_unless_recent<'con>(
        executor: impl PgExecutor<'con>,
        view: &NewBlogView,
        since: DateTime<Utc>,
    ) -> sqlx::Result<Option<Uuid>> {
        sqlx::query_scalar(
            "insert into blog_views(blog_id, blog_slug, ip_address, session_id, device, browser, os, viewed_at) \
             select $1, $2, $3, $4, $5, $6, $7, $8 \
             where not exists ( \
                 select 1 from blog_views \
                 where blog_id = $1 \
                   and (session_id = $4 or ($3::text is not null and ip_address = $3)) \
                   and viewed_at >= $9 and viewed_at <= $8 \
             ) \
             returning id",
        )
        .bind(view.blog_id)
        .bind(&view.blog_slug)
        .bind(&view.ip_address)
        .bind(&view.session_id)
        .bind(&view.device.device)
        .bind(&view.device.browser)
        .bind(&view.device.os)
        .bind(view.viewed_at)
        .bind(since)
        .fetch_optional(executor)
        .await
    }

    #[tracing::instrument(name = "Count blog views", skip(executor))]
    pub async fn count_views_for_blog<'con>(
        executor: impl PgExecutor<'con>,
        blog_id: Uuid,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar("select count(*) from blog_views where blog_id=$1")
            .bind(blog_id)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Count visitors", skip(executor))]
    pub async fn count_visitors<'con>(
        executor: impl PgExecutor<'con>,
        window: Option<&DayWindow>,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar(
            "select count(*) from visitors \
             where $1::timestamptz is null or (visited_at >= $1 and visited_at < $2)",
        )
        .bind(window.map(|w| w.start))
        .bind(window.map(|w| w.end))
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument(name = "Count total blog views", skip(executor))]
    pub async fn count_all_views<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<i64> {
        sqlx::query_scalar("select count(*) from blog_views")
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Count visitors by device", skip(executor))]
    pub async fn device_breakdown<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Vec<DeviceCount>> {
        sqlx::query_as::<_, DeviceCount>(
            "select device, count(*) as visitors from visitors \
             group by device order by visitors desc, device",
        )
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch most viewed blogs", skip(executor))]
    pub async fn top_blogs<'con>(
        executor: impl PgExecutor<'con>,
        limit: i64,
    ) -> sqlx::Result<Vec<BlogViewCount>> {
        sqlx::query_as::<_, BlogViewCount>(
            "select b.id as blog_id, b.title, b.slug, count(v.id) as views \
             from blogs b join blog_views v on v.blog_id = b.id \
             group by b.id, b.title, b.slug \
             order by views desc, b.title \
             limit $1",
        )
        .bind(limit)
        .fetch_all(executor)
        .await
    }
}
