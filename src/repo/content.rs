use sqlx::PgExecutor;

use crate::model::ContentSection;

pub struct ContentRepo;

impl ContentRepo {
    #[tracing::instrument(name = "List content sections", skip(executor))]
    pub async fn list<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<Vec<ContentSection>> {
        sqlx::query_as::<_, ContentSection>(
            "select section, content, updated_at from content_sections order by section",
        )
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch content section", skip(executor))]
    pub async fn fetch<'con>(
        executor: impl PgExecutor<'con>,
        section: &str,
    ) -> sqlx::Result<Option<ContentSection>> {
        sqlx::query_as::<_, ContentSection>(
            "select section, content, updated_at from content_sections where section=$1",
        )
        .bind(section)
        .fetch_optional(executor)
        .await
    }

    /// Create or replace the document stored for `section`
    #[tracing::instrument(name = "Upsert content section", skip(executor, content))]
    pub async fn upsert<'con>(
        executor: impl PgExecutor<'con>,
        section: &str,
        content: &serde_json::Value,
    ) -> sqlx::Result<ContentSection> {
        sqlx::query_as::<_, ContentSection>(
            "insert into content_sections(section, content) values ($1, $2) \
             on conflict (section) do update set content=excluded.content, updated_at=now() \
             returning section, content, updated_at",
        )
        .bind(section)
        .bind(content)
        .fetch_one(executor)
        .await
    }
}
