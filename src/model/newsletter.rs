use chrono::{DateTime, Utc};

use serde::Serialize;

use uuid::Uuid;

use crate::domain::JobStatus;

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Subscriber {
    pub id: Uuid,
    pub email: String,
    pub subscribed_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNewsletterJob {
    pub template: String,
    pub subject: String,
    pub html: String,
}

/// A queued bulk send and its progress snapshot
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterJob {
    pub id: Uuid,
    pub template: String,
    pub subject: String,
    pub html: String,
    #[sqlx(try_from = "String")]
    pub status: JobStatus,
    pub total_subscribers: i32,
    pub sent_count: i32,
    pub failed_count: i32,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    /// Last sign of life from the worker holding the job
    pub heartbeat_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NewsletterJob {
    /// The claim this snapshot was taken under, if the job has been claimed
    pub fn lease(&self) -> Option<JobLease> {
        self.started_at.map(|claimed_at| JobLease {
            job_id: self.id,
            claimed_at,
        })
    }
}

/// Proof of ownership of a `processing` job.
///
/// Writes made under a lease only land while the job still carries the same
/// `started_at`, so a worker whose job was reclaimed cannot overwrite the new run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct JobLease {
    pub job_id: Uuid,
    pub claimed_at: DateTime<Utc>,
}

/// Write-once audit record of a finished send
#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct NewsletterLog {
    pub id: Uuid,
    pub job_id: Option<Uuid>,
    pub template: String,
    pub subject: String,
    pub recipient_count: i32,
    pub sent_at: DateTime<Utc>,
}
