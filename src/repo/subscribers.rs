use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::EmailAddress;
use crate::model::Subscriber;

pub struct SubscribersRepo;

impl SubscribersRepo {
    #[tracing::instrument(name = "Insert subscriber", skip(executor))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        email: &EmailAddress,
    ) -> sqlx::Result<Subscriber> {
        sqlx::query_as::<_, Subscriber>(
            "insert into subscribers(email) values ($1) returning id, email, subscribed_at",
        )
        .bind(email.as_ref())
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument(name = "List subscribers", skip(executor))]
    pub async fn list<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<Vec<Subscriber>> {
        sqlx::query_as::<_, Subscriber>(
            "select id, email, subscribed_at from subscribers order by subscribed_at desc",
        )
        .fetch_all(executor)
        .await
    }

    /// Every subscriber address, oldest signup first
    #[tracing::instrument(name = "Fetch all subscriber emails", skip(executor))]
    pub async fn fetch_all_emails<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Vec<String>> {
        sqlx::query_scalar("select email from subscribers order by subscribed_at, id")
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Delete subscriber", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from subscribers where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
