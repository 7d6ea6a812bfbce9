use chrono::{DateTime, NaiveDate, Utc};

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::domain::{ContactStatus, EmailAddress, InquiryStatus, PersonName};

#[derive(Debug, Deserialize)]
pub struct NewContactRequest {
    pub name: PersonName,
    pub email: EmailAddress,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ContactRequest {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: Option<String>,
    pub subject: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub status: ContactStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCateringInquiry {
    pub name: PersonName,
    pub email: EmailAddress,
    pub phone: String,
    pub event_date: NaiveDate,
    pub guest_count: i32,
    pub event_type: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CateringInquiry {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub event_date: NaiveDate,
    pub guest_count: i32,
    pub event_type: String,
    pub message: String,
    #[sqlx(try_from = "String")]
    pub status: InquiryStatus,
    pub created_at: DateTime<Utc>,
}
