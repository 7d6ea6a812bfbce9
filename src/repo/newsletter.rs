use chrono::{DateTime, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::model::{JobLease, NewNewsletterJob, NewsletterJob, NewsletterLog};

const COLUMNS: &str = "id, template, subject, html, status, total_subscribers, sent_count, \
                       failed_count, error, created_at, started_at, heartbeat_at, completed_at";

pub struct NewsletterJobsRepo;

impl NewsletterJobsRepo {
    #[tracing::instrument(name = "Enqueue newsletter job", skip(executor, job), fields(subject = %job.subject))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        job: &NewNewsletterJob,
    ) -> sqlx::Result<NewsletterJob> {
        let query = format!(
            "insert into newsletter_jobs(template, subject, html) values ($1, $2, $3) returning {COLUMNS}"
        );
        sqlx::query_as::<_, NewsletterJob>(&query)
            .bind(&job.template)
            .bind(&job.subject)
            .bind(&job.html)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch newsletter job", skip(executor))]
    pub async fn fetch<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<NewsletterJob>> {
        let query = format!("select {COLUMNS} from newsletter_jobs where id=$1");
        sqlx::query_as::<_, NewsletterJob>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "List newsletter jobs", skip(executor))]
    pub async fn list<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<Vec<NewsletterJob>> {
        let query = format!("select {COLUMNS} from newsletter_jobs order by created_at desc");
        sqlx::query_as::<_, NewsletterJob>(&query)
            .fetch_all(executor)
            .await
    }

    /// Atomically move the oldest claimable job to `processing`.
    ///
    /// A job is claimable when it is `pending`, or `processing` with no heartbeat
    /// since `stale_before`. Reclaimed jobs restart with zeroed counters and a new
    /// lease, which fences out the previous holder.
    #[tracing::instrument(name = "Claim next newsletter job", skip(executor))]
    pub async fn claim_next<'con>(
        executor: impl PgExecutor<'con>,
        now: DateTime<Utc>,
        stale_before: DateTime<Utc>,
    ) -> sqlx::Result<Option<NewsletterJob>> {
        let query = format!(
            "update newsletter_jobs \
             set status='processing', started_at=$1, heartbeat_at=$1, total_subscribers=0, \
                 sent_count=0, failed_count=0, error=null, completed_at=null \
             where id = ( \
                 select id from newsletter_jobs \
                 where status='pending' \
                    or (status='processing' and coalesce(heartbeat_at, started_at) < $2) \
                 order by created_at, id \
                 limit 1 \
                 for update skip locked \
             ) \
             returning {COLUMNS}"
        );
        sqlx::query_as::<_, NewsletterJob>(&query)
            .bind(now)
            .bind(stale_before)
            .fetch_optional(executor)
            .await
    }

    /// Record the audience size. `false` when the lease was lost.
    #[tracing::instrument(name = "Record newsletter audience", skip(executor))]
    pub async fn set_total<'con>(
        executor: impl PgExecutor<'con>,
        lease: &JobLease,
        total_subscribers: i32,
        now: DateTime<Utc>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "update newsletter_jobs set total_subscribers=$3, heartbeat_at=$4 \
             where id=$1 and status='processing' and started_at=$2",
        )
        .bind(lease.job_id)
        .bind(lease.claimed_at)
        .bind(total_subscribers)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Persist running totals after a batch and refresh the heartbeat.
    /// `false` when the lease was lost.
    #[tracing::instrument(name = "Checkpoint newsletter job", skip(executor))]
    pub async fn checkpoint<'con>(
        executor: impl PgExecutor<'con>,
        lease: &JobLease,
        sent_count: i32,
        failed_count: i32,
        now: DateTime<Utc>,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "update newsletter_jobs set sent_count=$3, failed_count=$4, heartbeat_at=$5 \
             where id=$1 and status='processing' and started_at=$2",
        )
        .bind(lease.job_id)
        .bind(lease.claimed_at)
        .bind(sent_count)
        .bind(failed_count)
        .bind(now)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Mark the job `completed`; `None` when the lease was lost
    #[tracing::instrument(name = "Complete newsletter job", skip(executor))]
    pub async fn complete<'con>(
        executor: impl PgExecutor<'con>,
        lease: &JobLease,
        now: DateTime<Utc>,
    ) -> sqlx::Result<Option<NewsletterJob>> {
        let query = format!(
            "update newsletter_jobs set status='completed', completed_at=$3, heartbeat_at=$3 \
             where id=$1 and status='processing' and started_at=$2 returning {COLUMNS}"
        );
        sqlx::query_as::<_, NewsletterJob>(&query)
            .bind(lease.job_id)
            .bind(lease.claimed_at)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    /// Mark the job `failed`. `false` when the lease was lost.
    #[tracing::instrument(name = "Fail newsletter job", skip(executor))]
    pub async fn fail<'con>(
        executor: impl PgExecutor<'con>,
        lease: &JobLease,
        now: DateTime<Utc>,
        error: &str,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query(
            "update newsletter_jobs set status='failed', completed_at=$3, error=$4 \
             where id=$1 and status='processing' and started_at=$2",
        )
        .bind(lease.job_id)
        .bind(lease.claimed_at)
        .bind(now)
        .bind(error)
        .execute(executor)
        .await?;
        Ok(result.rows_affected() == 1)
    }
}

pub struct NewsletterLogsRepo;

impl NewsletterLogsRepo {
    #[tracing::instrument(name = "Insert newsletter log", skip(executor, job), fields(job_id = %job.id))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        job: &NewsletterJob,
        sent_at: DateTime<Utc>,
    ) -> sqlx::Result<NewsletterLog> {
        sqlx::query_as::<_, NewsletterLog>(
            "insert into newsletter_logs(job_id, template, subject, recipient_count, sent_at) \
             values ($1, $2, $3, $4, $5) \
             returning id, job_id, template, subject, recipient_count, sent_at",
        )
        .bind(job.id)
        .bind(&job.template)
        .bind(&job.subject)
        .bind(job.total_subscribers)
        .bind(sent_at)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument(name = "List newsletter logs", skip(executor))]
    pub async fn list<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<Vec<NewsletterLog>> {
        sqlx::query_as::<_, NewsletterLog>(
            "select id, job_id, template, subject, recipient_count, sent_at \
             from newsletter_logs order by sent_at desc",
        )
        .fetch_all(executor)
        .await
    }
}
