use chrono::{DateTime, NaiveDate, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::DeviceInfo;

#[derive(Debug, Clone)]
pub struct NewVisitor {
    pub ip_address: Option<String>,
    pub session_id: String,
    pub device: DeviceInfo,
    pub visited_at: DateTime<Utc>,
    /// Site-local calendar day of `visited_at`
    pub visit_day: NaiveDate,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Visitor {
    pub id: Uuid,
    pub ip_address: Option<String>,
    pub session_id: String,
    pub device: String,
    pub browser: String,
    pub os: String,
    pub visited_at: DateTime<Utc>,
    pub visit_day: NaiveDate,
}

#[derive(Debug, Clone)]
pub struct NewBlogView {
    pub blog_id: Uuid,
    pub blog_slug: String,
    pub ip_address: Option<String>,
    pub session_id: String,
    pub device: DeviceInfo,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogView {
    pub id: Uuid,
    pub blog_id: Uuid,
    pub blog_slug: String,
    pub ip_address: Option<String>,
    pub session_id: String,
    pub device: String,
    pub browser: String,
    pub os: String,
    pub viewed_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct DeviceCount {
    pub device: String,
    pub visitors: i64,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct BlogViewCount {
    pub blog_id: Uuid,
    pub title: String,
    pub slug: String,
    pub views: i64,
}
