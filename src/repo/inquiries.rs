use sqlx::PgExecutor;

use uuid::Uuid;

use crate::domain::{ContactStatus, InquiryStatus};
use crate::model::{CateringInquiry, ContactRequest, NewCateringInquiry, NewContactRequest};

const CONTACT_COLUMNS: &str = "id, name, email, phone, subject, message, status, created_at";

const CATERING_COLUMNS: &str =
    "id, name, email, phone, event_date, guest_count, event_type, message, status, created_at";

pub struct ContactsRepo;

impl ContactsRepo {
    #[tracing::instrument(name = "Insert contact request", skip(executor, request))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        request: &NewContactRequest,
    ) -> sqlx::Result<ContactRequest> {
        let query = format!(
            "insert into contact_requests(name, email, phone, subject, message) \
             values ($1, $2, $3, $4, $5) returning {CONTACT_COLUMNS}"
        );
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(request.name.as_ref())
            .bind(request.email.as_ref())
            .bind(&request.phone)
            .bind(&request.subject)
            .bind(&request.message)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "List contact requests", skip(executor))]
    pub async fn list<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Vec<ContactRequest>> {
        let query = format!("select {CONTACT_COLUMNS} from contact_requests order by created_at desc");
        sqlx::query_as::<_, ContactRequest>(&query)
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Update contact request status", skip(executor))]
    pub async fn update_status<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        status: ContactStatus,
    ) -> sqlx::Result<Option<ContactRequest>> {
        let query = format!(
            "update contact_requests set status=$2 where id=$1 returning {CONTACT_COLUMNS}"
        );
        sqlx::query_as::<_, ContactRequest>(&query)
            .bind(id)
            .bind(status.as_ref())
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Delete contact request", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from contact_requests where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

pub struct CateringRepo;

impl CateringRepo {
    #[tracing::instrument(name = "Insert catering inquiry", skip(executor, inquiry))]
    pub async fn insert<'con>(
        executor: impl PgExecutor<'con>,
        inquiry: &NewCateringInquiry,
    ) -> sqlx::Result<CateringInquiry> {
        let query = format!(
            "insert into catering_inquiries(name, email, phone, event_date, guest_count, event_type, message) \
             values ($1, $2, $3, $4, $5, $6, $7) returning {CATERING_COLUMNS}"
        );
        sqlx::query_as::<_, CateringInquiry>(&query)
            .bind(inquiry.name.as_ref())
            .bind(inquiry.email.as_ref())
            .bind(&inquiry.phone)
            .bind(inquiry.event_date)
            .bind(inquiry.guest_count)
            .bind(&inquiry.event_type)
            .bind(&inquiry.message)
            .fetch_one(executor)
            .await
    }

    #[tracing::instrument(name = "List catering inquiries", skip(executor))]
    pub async fn list<'con>(
        executor: impl PgExecutor<'con>,
    ) -> sqlx::Result<Vec<CateringInquiry>> {
        let query = format!(
            "select {CATERING_COLUMNS} from catering_inquiries order by event_date, created_at"
        );
        sqlx::query_as::<_, CateringInquiry>(&query)
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Update catering inquiry status", skip(executor))]
    pub async fn update_status<'con>(
        executor: impl PgExecutor<'con>,
        id: Uuid,
        status: InquiryStatus,
    ) -> sqlx::Result<Option<CateringInquiry>> {
        let query = format!(
            "update catering_inquiries set status=$2 where id=$1 returning {CATERING_COLUMNS}"
        );
        sqlx::query_as::<_, CateringInquiry>(&query)
            .bind(id)
            .bind(status.as_ref())
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Delete catering inquiry", skip(executor))]
    pub async fn delete<'con>(executor: impl PgExecutor<'con>, id: Uuid) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from catering_inquiries where id=$1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
