use sqlx::PgExecutor;

use uuid::Uuid;

use crate::model::{Coupon, CouponInput};

const COLUMNS: &str = "id, code, kind, value, expires_at, active, created_at";

pub struct CouponsRepo;

impl CouponsRepo {
    #[tracing::instrument(name = "List coupons", skip(executor))]
    pub async fn list<'con>(executor: impl PgExecutor<'con>) -> sqlx::Result<Vec<Coupon>> {
        let query = format!("select {COLUMNS} from coupons order by created_at desc");
        sqlx::query_as::<_, Coupon>(&query)
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch coupon", skip(executor))]
    pub async fn fetch<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
    ) -> sqlx::Result<Option<Coupon>> {
        let query = format!("select {COLUMNS} from coupons where id=$1");
        sqlx::query_as::<_, Coupon>(&query)
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    /// `code` must already be normalized
    #[tracing::instrument(name = "Fetch coupon by code", skip(executor))]
    pub async fn fetch_by_code<'con>(
        executor: impl PgExecutor<'con>,
        code: &str,
    ) -> sqlx::Result<Option<Coupon>> {
        let query = format!("select {COLUMNS} from coupons where code=$1");
        sqlx::query_as::<_, Coupon>(&query)
            .bind(code)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Insert coupon", skip(executor, input))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        code: &str,
        input: &CouponInput,
    ) -> sqlx::Result<Coupon> {
        let query = format!(
            "insert into coupons(code, kind, value, expires_at, active) \
             values ($1, $2, $3, $4, $5) returning {COLUMNS}"
        );
        sqlx::query_as::<_, Coupon>(&query)
            .bind(code)
            .bind(input.kind.as_ref())
            .bind(input.value)
            .bind(input.expires_at)
            .bind(input.active)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "Update coupon", skip(executor, input))]
    pub async fn update<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        code: &str,
        input: &CouponInput,
    ) -> sqlx::Result<Option<Coupon>> {
        let query = format!(
            "update coupons set code=$2, kind=$3, value=$4, expires_at=$5, active=$6 \
             where id=$1 returning {COLUMNS}"
        );
        sqlx::query_as::<_, Coupon>(&query)
            .bind(id)
            .bind(code)
            .bind(input.kind.as_ref())
            .bind(input.value)
            .bind(input.expires_at)
            .bind(input.active)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Set coupon active flag", skip(executor))]
    pub async fn set_active<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        active: bool,
    ) -> sqlx::Result<Option<Coupon>> {
        let query = format!("update coupons set active=$2 where id=$1 returning {COLUMNS}");
        sqlx::query_as::<_, Coupon>(&query)
            .bind(id)
            .bind(active)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Delete coupon", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from coupons where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
