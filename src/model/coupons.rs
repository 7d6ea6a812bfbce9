use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use uuid::Uuid;

use crate::domain::{CouponKind, CouponTerms};

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Coupon {
    pub id: Uuid,
    pub code: String,
    #[sqlx(try_from = "String")]
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: f64,
    pub expires_at: Option<DateTime<Utc>>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Coupon {
    pub fn terms(&self) -> CouponTerms {
        CouponTerms {
            kind: self.kind,
            value: self.value,
            active: self.active,
            expires_at: self.expires_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CouponInput {
    pub code: String,
    #[serde(rename = "type")]
    pub kind: CouponKind,
    pub value: f64,
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}
