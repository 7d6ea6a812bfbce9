use chrono::{DateTime, FixedOffset, Utc};

use serde::Serialize;

use sqlx::PgPool;

use thiserror::Error;

use uuid::Uuid;

use crate::domain::{blog_view_window, DayWindow, DeviceParser};
use crate::error::RestError;
use crate::model::{NewBlogView, NewVisitor};
use crate::repo::{AnalyticsRepo, BlogsRepo};

const ALREADY_TRACKED: &str = "Already tracked today";
const RECENTLY_VIEWED: &str = "Recently viewed";

/// Identity of the client being counted
#[derive(Debug, Clone, Default)]
pub struct ClientInfo {
    pub ip_address: Option<String>,
    pub session_id: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientInfo {
    fn session_id(&self) -> Result<&str, TrackingError> {
        self.session_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(TrackingError::MissingSessionId)
    }
}

#[derive(Debug, Error)]
pub enum TrackingError {
    #[error("sessionId is required")]
    MissingSessionId,
    #[error("blogSlug is required")]
    MissingBlogSlug,
    #[error("Blog not found")]
    BlogNotFound,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<TrackingError> for RestError {
    fn from(e: TrackingError) -> Self {
        match e {
            TrackingError::MissingSessionId | TrackingError::MissingBlogSlug => {
                RestError::Validation(e.to_string())
            }
            TrackingError::BlogNotFound => RestError::NotFound(e.to_string()),
            TrackingError::Database(e) => e.into(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VisitOutcome {
    pub tracked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BlogViewOutcome {
    pub tracked: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<&'static str>,
    pub total_views: i64,
}

/// Count a site visit at most once per ip or session per local calendar day
#[tracing::instrument(name = "Record visit", skip(pool, parser, client), fields(session_id = ?client.session_id))]
pub async fn record_visit(
    pool: &PgPool,
    parser: &DeviceParser,
    offset: FixedOffset,
    client: &ClientInfo,
    now: DateTime<Utc>,
) -> Result<VisitOutcome, TrackingError> {
    let session_id = client.session_id()?;
    let window = DayWindow::containing(now, offset);

    let visitor = NewVisitor {
        ip_address: client.ip_address.clone(),
        session_id: session_id.to_string(),
        device: parser.parse(client.user_agent.as_deref()),
        visited_at: now,
        visit_day: window.day,
    };

    let outcome = match AnalyticsRepo::insert_visitor_unless_tracked(pool, &visitor, &window).await? {
        Some(id) => VisitOutcome {
            tracked: true,
            id: Some(id),
            reason: None,
        },
        None => VisitOutcome {
            tracked: false,
            id: None,
            reason: Some(ALREADY_TRACKED),
        },
    };
    Ok(outcome)
}

/// Count a blog view at most once per ip or session per blog in a rolling hour
#[tracing::instrument(name = "Record blog view", skip(pool, parser, client), fields(session_id = ?client.session_id))]
pub async fn record_blog_view(
    pool: &PgPool,
    parser: &DeviceParser,
    client: &ClientInfo,
    blog_slug: Option<&str>,
    now: DateTime<Utc>,
) -> Result<BlogViewOutcome, TrackingError> {
    let session_id = client.session_id()?;
    let blog_slug = blog_slug
        .map(str::trim)
        .filter(|slug| !slug.is_empty())
        .ok_or(TrackingError::MissingBlogSlug)?;

    let blog = BlogsRepo::fetch_by_slug(pool, blog_slug, true)
        .await?
        .ok_or(TrackingError::BlogNotFound)?;

    let view = NewBlogView {
        blog_id: blog.id,
        blog_slug: blog.slug,
        ip_address: client.ip_address.clone(),
        session_id: session_id.to_string(),
        device: parser.parse(client.user_agent.as_deref()),
        viewed_at: now,
    };

    let mut tx = pool.begin().await?;
    AnalyticsRepo::lock_blog_views(&mut *tx, view.blog_id).await?;
    let view_id =
        AnalyticsRepo::insert_view_unless_recent(&mut *tx, &view, now - blog_view_window())
            .await?;
    let total_views = AnalyticsRepo::count_views_for_blog(&mut *tx, view.blog_id).await?;
    tx.commit().await?;

    Ok(BlogViewOutcome {
        tracked: view_id.is_some(),
        view_id,
        reason: view_id.is_none().then_some(RECENTLY_VIEWED),
        total_views,
    })
}
