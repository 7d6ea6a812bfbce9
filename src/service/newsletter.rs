use anyhow::Context;

use chrono::Utc;

use sqlx::PgPool;

use thiserror::Error;

use uuid::Uuid;

use crate::client::{Email, EmailClient};
use crate::domain::EmailAddress;
use crate::model::{JobLease, NewsletterJob};
use crate::repo::{NewsletterJobsRepo, NewsletterLogsRepo, SubscribersRepo};
use crate::settings::NewsletterSettings;

/// Anything that can deliver a batch of emails, one outcome per email
#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    async fn send_batch(&self, emails: &[Email]) -> Vec<anyhow::Result<()>>;
}

#[async_trait::async_trait]
impl Mailer for EmailClient {
    async fn send_batch(&self, emails: &[Email]) -> Vec<anyhow::Result<()>> {
        EmailClient::send_batch(self, emails)
            .await
            .into_iter()
            .map(|result| result.map_err(anyhow::Error::from))
            .collect()
    }
}

#[derive(Debug)]
pub enum DispatchOutcome {
    /// No job was waiting
    Idle,
    Completed(NewsletterJob),
}

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Failed to claim a newsletter job")]
    Claim(#[source] sqlx::Error),
    #[error("Newsletter job {job_id} was reclaimed by another worker")]
    Reclaimed { job_id: Uuid },
    #[error("Newsletter job {job_id} failed")]
    Job {
        job_id: Uuid,
        #[source]
        source: anyhow::Error,
    },
}

/// Raised when a write under the job's lease finds the job claimed by someone else
#[derive(Debug, Error)]
#[error("Lease on newsletter job {0} was lost")]
struct LeaseLost(Uuid);

fn ensure_leased(held: bool, lease: &JobLease) -> anyhow::Result<()> {
    if held {
        Ok(())
    } else {
        Err(LeaseLost(lease.job_id).into())
    }
}

#[derive(Debug, Default)]
struct Tally {
    sent: i32,
    failed: i32,
}

/// Claim the oldest waiting newsletter job and send it to every subscriber.
///
/// Processes at most one job. If anything but an individual recipient fails,
/// the job is marked `failed` with the error text and the error is returned.
#[tracing::instrument(name = "Process next newsletter job", skip(pool, mailer, settings))]
pub async fn process_next_job<M>(
    pool: &PgPool,
    mailer: &M,
    settings: &NewsletterSettings,
) -> Result<DispatchOutcome, DispatchError>
where
    M: Mailer + ?Sized,
{
    let now = Utc::now();
    let job = NewsletterJobsRepo::claim_next(pool, now, now - settings.stale_after())
        .await
        .map_err(DispatchError::Claim)?;
    let Some(job) = job else {
        return Ok(DispatchOutcome::Idle);
    };
    tracing::info!(job_id = %job.id, subject = %job.subject, "Claimed newsletter job");

    let Some(lease) = job.lease() else {
        return Err(DispatchError::Job {
            job_id: job.id,
            source: anyhow::anyhow!("Claimed job has no start time"),
        });
    };

    match send_job(pool, mailer, settings, &job, &lease).await {
        Ok(completed) => {
            tracing::info!(
                job_id = %completed.id,
                sent = completed.sent_count,
                failed = completed.failed_count,
                "Newsletter job completed"
            );
            Ok(DispatchOutcome::Completed(completed))
        }
        Err(e) if e.downcast_ref::<LeaseLost>().is_some() => {
            // The new holder owns the job's state now
            tracing::warn!(job_id = %job.id, "Newsletter job was reclaimed mid-run, stopping");
            Err(DispatchError::Reclaimed { job_id: job.id })
        }
        Err(e) => {
            tracing::error!(job_id = %job.id, error.cause_chain = ?e, "Newsletter job failed");
            match NewsletterJobsRepo::fail(pool, &lease, Utc::now(), &format!("{:#}", e)).await {
                Ok(true) => {}
                Ok(false) => {
                    tracing::warn!(job_id = %job.id, "Newsletter job was reclaimed before it could be marked failed")
                }
                Err(mark_err) => {
                    tracing::error!(job_id = %job.id, error.cause_chain = ?mark_err, "Failed to mark newsletter job as failed")
                }
            }
            Err(DispatchError::Job {
                job_id: job.id,
                source: e,
            })
        }
    }
}

async fn send_job<M>(
    pool: &PgPool,
    mailer: &M,
    settings: &NewsletterSettings,
    job: &NewsletterJob,
    lease: &JobLease,
) -> anyhow::Result<NewsletterJob>
where
    M: Mailer + ?Sized,
{
    let recipients = SubscribersRepo::fetch_all_emails(pool)
        .await
        .context("Failed to load subscribers")?;
    let total = i32::try_from(recipients.len()).context("Too many subscribers")?;
    let held = NewsletterJobsRepo::set_total(pool, lease, total, Utc::now())
        .await
        .context("Failed to record subscriber count")?;
    ensure_leased(held, lease)?;

    let mut tally = Tally::default();
    let mut batches = recipients.chunks(settings.batch_size.max(1)).peekable();

    while let Some(batch) = batches.next() {
        let mut emails = Vec::with_capacity(batch.len());
        for address in batch {
            match address.parse::<EmailAddress>() {
                Ok(recipient) => emails.push(Email {
                    recipient,
                    subject: job.subject.clone(),
                    html_body: job.html.clone(),
                    text_body: None,
                }),
                Err(error) => {
                    tracing::warn!(%error, "Skipping an invalid subscriber address");
                    tally.failed += 1;
                }
            }
        }

        for (email, result) in emails.iter().zip(mailer.send_batch(&emails).await) {
            match result {
                Ok(()) => tally.sent += 1,
                Err(error) => {
                    tracing::warn!(
                        recipient = %email.recipient,
                        error.cause_chain = ?error,
                        "Failed to deliver newsletter"
                    );
                    tally.failed += 1;
                }
            }
        }

        let held =
            NewsletterJobsRepo::checkpoint(pool, lease, tally.sent, tally.failed, Utc::now())
                .await
                .context("Failed to checkpoint newsletter progress")?;
        ensure_leased(held, lease)?;

        if batches.peek().is_some() {
            tokio::time::sleep(settings.batch_delay()).await;
        }
    }

    let completed_at = Utc::now();
    let mut tx = pool.begin().await?;
    let completed = NewsletterJobsRepo::complete(&mut *tx, lease, completed_at)
        .await
        .context("Failed to complete newsletter job")?;
    let Some(completed) = completed else {
        return Err(LeaseLost(lease.job_id).into());
    };
    NewsletterLogsRepo::insert(&mut *tx, &completed, completed_at)
        .await
        .context("Failed to write newsletter log")?;
    tx.commit().await?;

    Ok(completed)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Mutex;

    use claims::{assert_err, assert_matches};

    use super::*;
    use crate::domain::JobStatus;
    use crate::model::NewNewsletterJob;

    /// Records every delivery, failing for a fixed set of recipients
    #[derive(Default)]
    struct FakeMailer {
        reject: HashSet<String>,
        delivered: Mutex<Vec<String>>,
        batch_sizes: Mutex<Vec<usize>>,
    }

    #[async_trait::async_trait]
    impl Mailer for FakeMailer {
        async fn send_batch(&self, emails: &[Email]) -> Vec<anyhow::Result<()>> {
            self.batch_sizes.lock().unwrap().push(emails.len());
            emails
                .iter()
                .map(|email| {
                    let to = email.recipient.as_ref().to_string();
                    if self.reject.contains(&to) {
                        anyhow::bail!("mailbox unavailable")
                    }
                    self.delivered.lock().unwrap().push(to);
                    Ok(())
                })
                .collect()
        }
    }

    /// Breaks the audit table while sending so completion cannot be recorded
    struct SabotagingMailer {
        pool: PgPool,
    }

    #[async_trait::async_trait]
    impl Mailer for SabotagingMailer {
        async fn send_batch(&self, emails: &[Email]) -> Vec<anyhow::Result<()>> {
            sqlx::query("drop table newsletter_logs")
                .execute(&self.pool)
                .await
                .unwrap();
            emails.iter().map(|_| Ok(())).collect()
        }
    }

    /// Hands the job to another worker mid-send, as a stale reclaim would
    struct ReclaimingMailer {
        pool: PgPool,
    }

    #[async_trait::async_trait]
    impl Mailer for ReclaimingMailer {
        async fn send_batch(&self, emails: &[Email]) -> Vec<anyhow::Result<()>> {
            sqlx::query(
                "update newsletter_jobs \
                 set started_at=started_at + interval '1 second', sent_count=0, failed_count=0",
            )
            .execute(&self.pool)
            .await
            .unwrap();
            emails.iter().map(|_| Ok(())).collect()
        }
    }

    fn settings() -> NewsletterSettings {
        NewsletterSettings {
            batch_delay_milliseconds: 0,
            ..NewsletterSettings::default()
        }
    }

    async fn subscribe(pool: &PgPool, count: usize) {
        for i in 0..count {
            let email: EmailAddress = format!("reader{}@example.com", i).parse().unwrap();
            SubscribersRepo::insert(pool, &email).await.unwrap();
        }
    }

    async fn enqueue(pool: &PgPool) -> NewsletterJob {
        NewsletterJobsRepo::insert(
            pool,
            &NewNewsletterJob {
                template: "monthly".into(),
                subject: "May at the café".into(),
                html: "<p>New seasonal menu</p>".into(),
            },
        )
        .await
        .unwrap()
    }

    #[sqlx::test]
    async fn nothing_to_do_without_pending_jobs(pool: PgPool) {
        let outcome = process_next_job(&pool, &FakeMailer::default(), &settings())
            .await
            .unwrap();
        assert_matches!(outcome, DispatchOutcome::Idle);
    }

    #[sqlx::test]
    async fn every_subscriber_is_sent_in_batches(pool: PgPool) {
        subscribe(&pool, 120).await;
        let job = enqueue(&pool).await;
        let mailer = FakeMailer::default();

        let outcome = process_next_job(&pool, &mailer, &settings()).await.unwrap();

        let DispatchOutcome::Completed(done) = outcome else {
            panic!("Job was not processed");
        };
        assert_eq!(job.id, done.id);
        assert_eq!(JobStatus::Completed, done.status);
        assert_eq!(120, done.total_subscribers);
        assert_eq!(120, done.sent_count);
        assert_eq!(0, done.failed_count);
        assert!(done.completed_at.is_some());
        assert_eq!(vec![50, 50, 20], *mailer.batch_sizes.lock().unwrap());

        let logs = NewsletterLogsRepo::list(&pool).await.unwrap();
        assert_eq!(1, logs.len());
        assert_eq!(120, logs[0].recipient_count);
        assert_eq!(Some(job.id), logs[0].job_id);
    }

    #[sqlx::test]
    async fn recipient_failures_are_counted_not_fatal(pool: PgPool) {
        subscribe(&pool, 60).await;
        enqueue(&pool).await;
        let mailer = FakeMailer {
            reject: ["reader3@example.com", "reader55@example.com"]
                .into_iter()
                .map(String::from)
                .collect(),
            ..FakeMailer::default()
        };

        let outcome = process_next_job(&pool, &mailer, &settings()).await.unwrap();

        let DispatchOutcome::Completed(done) = outcome else {
            panic!("Job was not processed");
        };
        assert_eq!(58, done.sent_count);
        assert_eq!(2, done.failed_count);
        assert_eq!(done.total_subscribers, done.sent_count + done.failed_count);
    }

    #[sqlx::test]
    async fn jobs_are_marked_failed_when_completion_breaks(pool: PgPool) {
        subscribe(&pool, 3).await;
        let job = enqueue(&pool).await;
        let mailer = SabotagingMailer { pool: pool.clone() };

        let result = process_next_job(&pool, &mailer, &settings()).await;
        assert_err!(result);

        let job = NewsletterJobsRepo::fetch(&pool, job.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(JobStatus::Failed, job.status);
        assert!(job.error.is_some());
        assert!(job.completed_at.is_some());
    }

    #[sqlx::test]
    async fn a_reclaimed_job_is_left_to_its_new_worker(pool: PgPool) {
        subscribe(&pool, 3).await;
        let job = enqueue(&pool).await;
        let mailer = ReclaimingMailer { pool: pool.clone() };

        let result = process_next_job(&pool, &mailer, &settings()).await;
        assert_matches!(result, Err(DispatchError::Reclaimed { job_id }) if job_id == job.id);

        let job = NewsletterJobsRepo::fetch(&pool, job.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(JobStatus::Processing, job.status);
        assert_eq!(0, job.sent_count);
        assert!(job.error.is_none());
        assert!(NewsletterLogsRepo::list(&pool).await.unwrap().is_empty());
    }
}
