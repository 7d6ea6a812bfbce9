use chrono::{DateTime, Utc};

use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::Slug;
use crate::model::{Blog, BlogInput};

const COLUMNS: &str = "id, title, slug, excerpt, content, cover_image, author, tags, \
                       published, published_at, created_at, updated_at";

pub struct BlogsRepo;

impl BlogsRepo {
    #[tracing::instrument(name = "List blogs", skip(executor))]
    pub async fn list<'con>(
        executor: impl PgExecutor<'con>,
        published_only: bool,
    ) -> sqlx::Result<Vec<Blog>> {
        let query = format!(
            "select {COLUMNS} from blogs where published or not $1 \
             order by coalesce(published_at, created_at) desc"
        );
        sqlx::query_as::<_, Blog>(&query)
            .bind(published_only)
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch blog by slug", skip(executor))]
    pub async fn fetch_by_slug<'con>(
        executor: impl PgExecutor<'con>,
        slug: &str,
        published_only: bool,
    ) -> sqlx::Result<Option<Blog>> {
        let query = format!("select {COLUMNS} from blogs where slug=$1 and (published or not $2)");
        sqlx::query_as::<_, Blog>(&query)
            .bind(slug)
            .bind(published_only)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch blog by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<Blog>> {
        let query = format!("select {COLUMNS} from blogs where id=$1");
        sqlx::query_as::<_, Blog>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Insert blog", skip(executor, input))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        input: &BlogInput,
        slug: &Slug,
        now: DateTime<Utc>,
    ) -> sqlx::Result<Blog> {
        let query = format!(
            "insert into blogs(title, slug, excerpt, content, cover_image, author, tags, published, published_at) \
             values ($1, $2, $3, $4, $5, $6, $7, $8, case when $8 then $9 else null end) \
             returning {COLUMNS}"
        );
        sqlx::query_as::<_, Blog>(&query)
            .bind(&input.title)
            .bind(slug.as_ref())
            .bind(&input.excerpt)
            .bind(&input.content)
            .bind(&input.cover_image)
            .bind(&input.author)
            .bind(&input.tags)
            .bind(input.published)
            .bind(now)
            .fetch_one(executor)
            .await
    }

    /// Replace a post; `published_at` is kept across edits and set on first publication
    #[tracing::instrument(name = "Update blog", skip(executor, input))]
    pub async fn update<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        input: &BlogInput,
        slug: &Slug,
        now: DateTime<Utc>,
    ) -> sqlx::Result<Option<Blog>> {
        let query = format!(
            "update blogs set title=$2, slug=$3, excerpt=$4, content=$5, cover_image=$6, author=$7, \
             tags=$8, published=$9, \
             published_at = case when $9 then coalesce(published_at, $10) else null end, \
             updated_at=$10 \
             where id=$1 returning {COLUMNS}"
        );
        sqlx::query_as::<_, Blog>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(slug.as_ref())
            .bind(&input.excerpt)
            .bind(&input.content)
            .bind(&input.cover_image)
            .bind(&input.author)
            .bind(&input.tags)
            .bind(input.published)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Set blog publication", skip(executor))]
    pub async fn set_published<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        published: bool,
        now: DateTime<Utc>,
    ) -> sqlx::Result<Option<Blog>> {
        let query = format!(
            "update blogs set published=$2, \
             published_at = case when $2 then coalesce(published_at, $3) else null end, \
             updated_at=$3 \
             where id=$1 returning {COLUMNS}"
        );
        sqlx::query_as::<_, Blog>(&query)
            .bind(id)
            .bind(published)
            .bind(now)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Delete blog", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from blogs where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
