use std::sync::Arc;
use std::time::Duration;

use sqlx::PgPool;

use crate::service::{self, DispatchOutcome, Mailer};
use crate::settings::NewsletterSettings;

/// Poll for newsletter jobs until the process exits.
///
/// A completed job is followed immediately by another claim, so a backlog drains
/// without waiting out the interval.
pub async fn run_newsletter_worker(
    pool: PgPool,
    mailer: Arc<dyn Mailer>,
    settings: NewsletterSettings,
    every: Duration,
) {
    tracing::info!(interval_secs = every.as_secs(), "Newsletter worker started");

    let mut interval = tokio::time::interval(every);
    loop {
        interval.tick().await;

        loop {
            match service::process_next_job(&pool, mailer.as_ref(), &settings).await {
                Ok(DispatchOutcome::Idle) => break,
                Ok(DispatchOutcome::Completed(job)) => {
                    tracing::info!(job_id = %job.id, sent = job.sent_count, "Newsletter job completed");
                }
                Err(e) => {
                    tracing::error!(error.cause_chain = ?e, "Newsletter worker iteration failed");
                    break;
                }
            }
        }
    }
}
