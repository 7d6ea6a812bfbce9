use chrono::{DateTime, Utc};

use serde::Serialize;

/// A CMS block for one section of the public site
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContentSection {
    pub section: String,
    pub content: serde_json::Value,
    pub updated_at: DateTime<Utc>,
}
